//! Live status example
//!
//! Starts a coordinator for one mug and prints every status update as it is
//! published, in both Celsius and Fahrenheit.
//!
//! Run with: cargo run --example watch_status -- --address C8:2E:47:00:11:22
//!
//! Optional poll interval in seconds (5-300):
//!   cargo run --example watch_status -- --address C8:2E:47:00:11:22 --interval 5

use ember_mug_ble::{
    celsius_to_fahrenheit, BleDeviceReader, Coordinator, DeviceConfig, Error, Result,
};
use serde_json::Value;
use std::sync::Arc;

fn arg(args: &[String], name: &str) -> Option<String> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn format_temp(value: &Value) -> String {
    match value.as_f64() {
        Some(c) => format!("{:.1}°C / {:.1}°F", c, celsius_to_fahrenheit(c)),
        None => "-".to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("warn,ember_mug_ble=info")
        .init();

    let args: Vec<String> = std::env::args().collect();
    let address = arg(&args, "--address").ok_or(Error::Config(
        ember_mug_ble::ConfigError::MissingAddress,
    ))?;
    let interval = arg(&args, "--interval")
        .and_then(|s| s.parse().ok())
        .unwrap_or(15);

    println!("Ember Live Status");
    println!("=================\n");

    let reader = BleDeviceReader::new().await?;
    let config = DeviceConfig::new(address).with_scan_interval(interval);
    let coordinator = Coordinator::start(config, Arc::new(reader)).await?;

    if let Some(status) = coordinator.latest() {
        println!("Initial: {}", status.to_payload());
    } else {
        println!("No status yet; waiting for the next poll...");
    }

    let subscription = coordinator.subscribe();

    loop {
        tokio::select! {
            status = subscription.recv() => {
                let Some(status) = status else { break };
                println!(
                    "Current {} | Target {} | Battery {}% | {}",
                    format_temp(&status["current_temp_c"]),
                    format_temp(&status["target_temp_c"]),
                    status["battery_percent"],
                    status["liquid_state"].as_str().unwrap_or("-"),
                );
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nStopping...");
                break;
            }
        }
    }

    drop(subscription);
    coordinator.shutdown().await;
    Ok(())
}
