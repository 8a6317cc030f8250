//! Sensor discovery example
//!
//! Run with: cargo run --example discover_sensors

use hygrotemp_ble::{DeviceManager, Result};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (minimal)
    tracing_subscriber::fmt().with_env_filter("warn").init();

    println!("Sensor Discovery");
    println!("================\n");
    println!("Scanning for hygrometer sensors...\n");

    let manager = DeviceManager::new().await?;
    manager.start_scanning().await?;

    // Let the scan run for a while
    tokio::time::sleep(Duration::from_secs(10)).await;

    let sensors = manager.sensors();
    if sensors.is_empty() {
        println!("No sensors found.");
    } else {
        println!("Found {} sensor(s):\n", sensors.len());
        for (id, sensor) in sensors {
            println!("  {} ({})", sensor.name(), id);
            println!("    kind: {}", sensor.kind());
            println!("    capabilities: {:?}", sensor.capabilities());
            if let Some(rssi) = sensor.rssi() {
                println!("    rssi: {} dBm", rssi);
            }
            println!();
        }
    }

    manager.shutdown().await?;

    Ok(())
}
