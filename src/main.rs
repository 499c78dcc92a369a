//! Query API server.

use slopetwin::config::Config;
use slopetwin::db::TwinDb;
use slopetwin::server;

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = Config::from_env();
    let db_path = match TwinDb::db_path() {
        Ok(path) => path,
        Err(e) => {
            log::error!("Cannot resolve database path: {}", e);
            std::process::exit(1);
        }
    };

    tokio::select! {
        result = server::serve(&config.http_bind, db_path) => {
            if let Err(e) = result {
                log::error!("Query API failed: {}", e);
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            log::info!("Shutdown requested");
        }
    }
}
