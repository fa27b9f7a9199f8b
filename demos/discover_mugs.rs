//! Ember device discovery example
//!
//! Scans for nearby Ember mugs and tumblers and prints the address to put in
//! the `[device]` section of the configuration.
//!
//! Run with: cargo run --example discover_mugs
//!
//! To scan longer:
//!   cargo run --example discover_mugs -- --seconds 15

use ember_mug_ble::ble::BleScanner;
use ember_mug_ble::Result;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("warn,ember_mug_ble=info")
        .init();

    let args: Vec<String> = std::env::args().collect();
    let seconds = args
        .iter()
        .position(|arg| arg == "--seconds")
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(5);

    println!("Ember Device Discovery");
    println!("======================\n");
    println!("Scanning for {} seconds...\n", seconds);

    let scanner = BleScanner::new().await?;
    let devices = scanner.discover(Duration::from_secs(seconds)).await?;

    if devices.is_empty() {
        println!("No Ember devices found.");
        println!("Make sure the mug is awake (lift it or place it on the coaster).");
        return Ok(());
    }

    println!("Found {} device(s):\n", devices.len());
    for device in &devices {
        println!("  {}", device.label);
    }

    println!("\nConfigure one with:");
    println!("  [device]");
    println!("  address = \"{}\"", devices[0].address);

    Ok(())
}
