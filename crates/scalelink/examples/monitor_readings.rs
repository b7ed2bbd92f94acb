//! Monitor scale readings.
//!
//! Demonstrates connecting to a scale and printing every reading as it
//! arrives. Runs against the mock bridge from `scalelink-test-harness`
//! with a feeder task standing in for the device, so no scale hardware
//! is required.
//!
//! # Usage
//!
//! ```sh
//! cargo run -p scalelink --example monitor_readings
//! ```

use std::time::Duration;

use scalelink::ftdi::models::ft232r;
use scalelink::ftdi::FtdiScaleBuilder;
use scalelink::Scale;
use scalelink_test_harness::MockBridge;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let bridge = MockBridge::new();
    bridge.add_device("FT232R USB UART", "A5XK3RJT");

    let mut scale = FtdiScaleBuilder::new(ft232r()).build_with_bridge(bridge.clone())?;

    let start = std::time::Instant::now();
    scale.register_observer(Box::new(move |reading| {
        let elapsed = start.elapsed();
        println!(
            "{:>6}.{:03}s  {:<10} {}",
            elapsed.as_secs(),
            elapsed.subsec_millis(),
            reading.device_id,
            reading.payload
        );
    }));

    println!("Connecting to {}...", scale.info());
    scale.connect_with_retry().await?;
    println!("Connected. Monitoring for 10 seconds...\n");

    println!("{:<12} {:<10} Reading", "Timestamp", "Device");
    println!("{:-<12} {:-<10} {:-<30}", "", "", "");

    // Stand-in for the hardware: push a weight string every half second,
    // like a scale left in continuous-print mode.
    let feeder = tokio::spawn(async move {
        let mut grams: u64 = 12_340;
        loop {
            let line = format!("{:.2} kg\r\n", grams as f64 / 1000.0);
            bridge.push_reading(line.as_bytes());
            grams += 15;
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    });

    tokio::time::sleep(Duration::from_secs(10)).await;
    feeder.abort();

    scale.dispose().await;
    println!("\nMonitoring complete.");
    Ok(())
}
