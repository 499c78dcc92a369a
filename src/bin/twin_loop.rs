//! Control-loop process: predict, update, score, persist, alert.

use slopetwin::alerts::AlertEvaluator;
use slopetwin::config::Config;
use slopetwin::db::TwinDb;
use slopetwin::twin_loop::TwinLoop;
use tokio::sync::watch;

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = Config::from_env();
    let db = match TwinDb::open() {
        Ok(db) => db,
        Err(e) => {
            log::error!("Cannot open store: {}", e);
            std::process::exit(1);
        }
    };

    let evaluator = AlertEvaluator::from_config(&config);
    let mut twin = TwinLoop::new(db, evaluator, &config);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    twin.run(shutdown_rx).await;
}
