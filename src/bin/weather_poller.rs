//! Weather ingestion process.

use std::time::Duration;

use slopetwin::config::Config;
use slopetwin::db::TwinDb;
use slopetwin::weather;
use tokio::sync::watch;

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = Config::from_env();
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

    weather::run_weather_poller(db, config.weather, shutdown_rx).await;
}
