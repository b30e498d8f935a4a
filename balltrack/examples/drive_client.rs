//! Drive a running device: configure the LED, stream frames, measure fps
//!
//! Set `DEVICE_HOST` to reach a device that is not on loopback.

use std::time::Instant;

use balltrack::{Client, Config};

#[tokio::main]
async fn main() -> balltrack::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = Config::default();
    let host = std::env::var("DEVICE_HOST").unwrap_or_else(|_| config.network.host.clone());

    let mut client = Client::from_config(&config);
    client.connect(&host).await?;

    client.configure_led(500, 50).await?;

    // Pull frames off the feed channel and measure the delivered rate
    client.start_sending_camera_feed().await?;
    let frames = 100;
    let started = Instant::now();
    for _ in 0..frames {
        client.process_camera_feed().await?;
    }
    let fps = f64::from(frames) / started.elapsed().as_secs_f64();
    println!("Feed rate: {fps:.1} fps");
    client.stop_sending_camera_feed().await?;

    // Compare with what the device measures at the sensor
    let device_fps = client.test_camera_fps().await?;
    println!("Device capture rate: {device_fps:.1} fps");

    client.disconnect().await?;
    Ok(())
}
