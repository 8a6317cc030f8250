//! One refresh cycle against an in-memory store
//!
//! Run with: cargo run --example refresh_once

use hygrotemp_ble::{DeviceManager, Error, MemoryStore, PersistencePolicy, Result};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!("Refresh Once");
    println!("============\n");
    println!("Scanning for hygrometer sensors...\n");

    let store = Arc::new(MemoryStore::new());

    let manager = DeviceManager::new().await?;
    manager.set_store(store.clone());
    manager.set_persistence(PersistencePolicy {
        local: true,
        remote: false,
    });
    manager.start_scanning().await?;

    tokio::time::sleep(Duration::from_secs(10)).await;

    let sensor = manager
        .sensors()
        .into_values()
        .next()
        .ok_or_else(|| Error::SensorNotFound {
            identifier: "any".to_string(),
        })?;

    println!("Found sensor: {} ({})", sensor.name(), sensor.address());
    println!("Refreshing...\n");

    let mut refresh_rx = sensor.subscribe_refresh_finished();
    sensor.refresh().await?;

    // The cycle completes asynchronously once a reading arrives.
    match tokio::time::timeout(Duration::from_secs(30), refresh_rx.recv()).await {
        Ok(Ok(success)) => println!("Refresh finished, success: {success}"),
        _ => println!("Refresh did not complete in time"),
    }

    println!("\nSensor state:");
    println!("  firmware: {}", sensor.firmware());
    println!("  firmware up to date: {}", sensor.firmware_up_to_date());
    if let Some(temperature) = sensor.temperature() {
        println!("  temperature: {:.1} °C", temperature);
    }
    if let Some(humidity) = sensor.humidity() {
        println!("  humidity: {} %", humidity);
    }

    println!("\nStored rows:");
    for record in store.readings() {
        println!(
            "  {} @ {}: {:.1} °C, {} %",
            record.device_address,
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.temperature,
            record.humidity
        );
    }

    manager.shutdown().await?;

    Ok(())
}
