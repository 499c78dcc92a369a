//! Synthetic sensor generator.
//!
//! Stands in for the field instrumentation during development: every tick
//! it appends one Gaussian reading per sensor type, clamped non-negative.
//! Like the weather poller, the only fatal condition is the startup store
//! handshake; a failed write is logged and the next tick proceeds.

use std::time::Duration;

use rand_distr::{Distribution, Normal};
use tokio::sync::watch;

use crate::db::TwinDb;
use crate::error::TwinError;
use crate::types::SensorType;

const WRITE_INTERVAL: Duration = Duration::from_secs(5);

struct SensorModel {
    displacement: Normal<f64>,
    velocity: Normal<f64>,
    pore_pressure: Normal<f64>,
}

impl SensorModel {
    fn new() -> Result<Self, TwinError> {
        let normal = |mean: f64, std_dev: f64| {
            Normal::new(mean, std_dev)
                .map_err(|e| TwinError::Configuration(format!("invalid sensor model: {}", e)))
        };
        Ok(Self {
            displacement: normal(3.0, 1.0)?,
            velocity: normal(0.8, 0.2)?,
            pore_pressure: normal(18.0, 5.0)?,
        })
    }

    /// One reading per type, clamped at the physical floor.
    fn sample(&self) -> [(SensorType, f64); 3] {
        let mut rng = rand::rng();
        [
            (
                SensorType::Displacement,
                self.displacement.sample(&mut rng).max(0.0),
            ),
            (
                SensorType::Velocity,
                self.velocity.sample(&mut rng).max(0.0),
            ),
            (
                SensorType::PorePressure,
                self.pore_pressure.sample(&mut rng).max(0.0),
            ),
        ]
    }
}

/// Write synthetic readings until shutdown.
pub async fn run_sensor_sim(db: TwinDb, mut shutdown: watch::Receiver<bool>) -> Result<(), TwinError> {
    let model = SensorModel::new()?;
    log::info!("Sensor simulator started, cadence {}s", WRITE_INTERVAL.as_secs());

    loop {
        let readings = model.sample();
        for (sensor, value) in readings {
            if let Err(e) = db.insert_reading(sensor, value) {
                log::warn!("Sensor write failed for {}: {}", sensor.as_str(), e);
            }
        }
        log::debug!(
            "Sim wrote u={:.2} v={:.2} p={:.2}",
            readings[0].1,
            readings[1].1,
            readings[2].1
        );

        tokio::select! {
            _ = tokio::time::sleep(WRITE_INTERVAL) => {}
            _ = shutdown.changed() => {
                log::info!("Sensor simulator stopping");
                break;
            }
        }
    }
    Ok(())
}
