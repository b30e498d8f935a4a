//! # balltrack-core
//!
//! Wire codec and message model for the balltrack control-plane protocol.
//!
//! This crate provides the protocol primitives:
//! - Command tag vocabulary
//! - Typed request/response records
//! - MessagePack encoding/decoding

pub mod codec;
pub mod command;
pub mod error;
pub mod message;

pub use command::Command;
pub use error::{Error, Result};
pub use message::{Point3D, Request, Response};
