//! Synthetic sensor process.

use std::time::Duration;

use slopetwin::db::TwinDb;
use slopetwin::sim;
use tokio::sync::watch;

#[tokio::main]
async fn main() {
    env_logger::init();

    let db = match TwinDb::open_with_retry(30, Duration::from_secs(2)) {
        Ok(db) => db,
        Err(e) => {
            log::error!("Store never became ready: {}", e);
            std::process::exit(1);
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    if let Err(e) = sim::run_sensor_sim(db, shutdown_rx).await {
        log::error!("Sensor simulator failed: {}", e);
        std::process::exit(1);
    }
}
