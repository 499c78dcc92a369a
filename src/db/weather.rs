use rusqlite::{params, OptionalExtension};

use super::*;
use crate::types::WeatherObs;

impl TwinDb {
    /// Append one weather observation.
    pub fn insert_weather_obs(
        &self,
        rainfall: f64,
        temp: f64,
        humidity: f64,
    ) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO weather_obs (t, rainfall, temp, humidity) VALUES (?1, ?2, ?3, ?4)",
            params![now_timestamp(), rainfall, temp, humidity],
        )?;
        Ok(())
    }

    /// Most recent weather observation, if any exists yet.
    pub fn latest_weather(&self) -> Result<Option<WeatherObs>, DbError> {
        let row = self
            .conn
            .query_row(
                "SELECT t, rainfall, temp, humidity FROM weather_obs
                 ORDER BY t DESC LIMIT 1",
                [],
                |row| {
                    Ok(WeatherObs {
                        t: row.get(0)?,
                        rainfall: row.get(1)?,
                        temp: row.get(2)?,
                        humidity: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Most recent rainfall figure; 0.0 when no observation exists yet.
    pub fn latest_rainfall(&self) -> Result<f64, DbError> {
        let rain: Option<Option<f64>> = self
            .conn
            .query_row(
                "SELECT rainfall FROM weather_obs ORDER BY t DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(rain.flatten().unwrap_or(0.0))
    }

    /// Observations within the last `hours` hours, ascending by timestamp.
    pub fn weather_since(&self, hours: i64) -> Result<Vec<WeatherObs>, DbError> {
        let cutoff = (chrono::Utc::now() - chrono::Duration::hours(hours))
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string();

        let mut stmt = self.conn.prepare(
            "SELECT t, rainfall, temp, humidity FROM weather_obs
             WHERE t >= ?1
             ORDER BY t ASC",
        )?;
        let rows = stmt
            .query_map(params![cutoff], |row| {
                Ok(WeatherObs {
                    t: row.get(0)?,
                    rainfall: row.get(1)?,
                    temp: row.get(2)?,
                    humidity: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::open_temp_db;

    #[test]
    fn test_latest_weather_empty() {
        let (_dir, db) = open_temp_db();
        assert!(db.latest_weather().unwrap().is_none());
        assert_eq!(db.latest_rainfall().unwrap(), 0.0);
    }

    #[test]
    fn test_latest_weather_picks_newest() {
        let (_dir, db) = open_temp_db();
        db.conn_ref()
            .execute_batch(
                "INSERT INTO weather_obs (t, rainfall, temp, humidity)
                 VALUES ('2026-01-01T00:00:00', 1.0, 20.0, 50.0),
                        ('2026-01-01T01:00:00', 4.5, 19.0, 80.0);",
            )
            .unwrap();

        let latest = db.latest_weather().unwrap().expect("row");
        assert_eq!(latest.rainfall, Some(4.5));
        assert_eq!(db.latest_rainfall().unwrap(), 4.5);
    }

    #[test]
    fn test_weather_since_window_and_order() {
        let (_dir, db) = open_temp_db();
        let recent = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string();
        db.conn_ref()
            .execute_batch(&format!(
                "INSERT INTO weather_obs (t, rainfall, temp, humidity)
                 VALUES ('2000-01-01T00:00:00', 9.0, 10.0, 10.0),
                        ('{recent}', 2.0, 21.0, 60.0);"
            ))
            .unwrap();

        let rows = db.weather_since(24).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].rainfall, Some(2.0));
    }
}
