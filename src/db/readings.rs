use rusqlite::{params, OptionalExtension};

use super::*;
use crate::types::{Measurement, SensorType};

impl TwinDb {
    /// Append one raw sensor reading.
    pub fn insert_reading(&self, sensor: SensorType, value: f64) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO sensor_readings (t, type, value) VALUES (?1, ?2, ?3)",
            params![now_timestamp(), sensor.as_str(), value],
        )?;
        Ok(())
    }

    /// Most recent reading of one sensor type, if any exists yet.
    pub fn latest_reading(&self, sensor: SensorType) -> Result<Option<f64>, DbError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM sensor_readings WHERE type = ?1
                 ORDER BY t DESC LIMIT 1",
                params![sensor.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Latest reading per sensor type, each field independently absent when
    /// no reading of that type exists yet.
    pub fn latest_measurement(&self) -> Result<Measurement, DbError> {
        Ok(Measurement {
            u: self.latest_reading(SensorType::Displacement)?,
            v: self.latest_reading(SensorType::Velocity)?,
            p: self.latest_reading(SensorType::PorePressure)?,
        })
    }
}
