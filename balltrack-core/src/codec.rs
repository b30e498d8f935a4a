//! MessagePack wire codec
//!
//! One message per frame. Structs serialize as named maps (never tuples)
//! so the wire representation stays language-neutral: any MessagePack
//! implementation sees `{"command": ..., field: value, ...}`. Byte blobs
//! use the `bin` family and are NUL-safe.

use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    command::Command,
    error::{Error, Result},
    message::Request,
};

/// Encode a message as one MessagePack frame payload
pub fn encode<T: Serialize>(msg: &T) -> Result<Bytes> {
    let buf = rmp_serde::to_vec_named(msg)?;
    Ok(Bytes::from(buf))
}

/// Decode one frame payload
///
/// An empty payload holds zero messages and decodes to `None`; malformed
/// or truncated input fails with [`Error::Decode`].
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<Option<T>> {
    if bytes.is_empty() {
        return Ok(None);
    }
    Ok(Some(rmp_serde::from_slice(bytes)?))
}

/// Decode a request from the control channel
///
/// Distinguishes a well-formed map whose command tag we do not serve
/// ([`Error::UnknownCommand`], answered with a failed status) from a
/// malformed frame ([`Error::Decode`], dropped).
pub fn decode_request(bytes: &[u8]) -> Result<Option<Request>> {
    if bytes.is_empty() {
        return Ok(None);
    }
    match rmp_serde::from_slice::<Request>(bytes) {
        Ok(req) => Ok(Some(req)),
        Err(err) => {
            if let Some(tag) = probe_command(bytes) {
                match Command::try_from(tag.as_str()) {
                    // Known request tag with bad fields: malformed frame.
                    Ok(cmd) if cmd.is_request() => Err(Error::Decode(err)),
                    // Unknown tag, or a response tag we do not serve here.
                    _ => Err(Error::UnknownCommand(tag)),
                }
            } else {
                Err(Error::Decode(err))
            }
        }
    }
}

#[derive(serde::Deserialize)]
struct CommandProbe {
    command: String,
}

/// Pull just the command tag out of an undecodable map, if there is one
fn probe_command(bytes: &[u8]) -> Option<String> {
    rmp_serde::from_slice::<CommandProbe>(bytes)
        .ok()
        .map(|probe| probe.command)
}
