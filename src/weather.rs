//! Weather ingestion: OpenWeather client plus the polling loop.
//!
//! The poller is one of the auxiliary writers feeding the shared store. A
//! failed fetch — unreachable API, non-200, malformed payload — is logged
//! and the write skipped; the poller retries sooner than its normal cadence
//! but is never fatal. Only the startup store handshake (handled by the
//! binary via `TwinDb::open_with_retry`) can take the process down.

use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;

use crate::config::WeatherConfig;
use crate::db::TwinDb;
use crate::error::TwinError;

/// Normal polling cadence.
const FETCH_INTERVAL: Duration = Duration::from_secs(600);
/// Retry delay after a failed fetch.
const RETRY_INTERVAL: Duration = Duration::from_secs(60);
/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// One fetched observation, already shaped for the store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherSample {
    pub temp: f64,
    pub humidity: f64,
    pub rainfall: f64,
}

pub struct WeatherClient {
    client: reqwest::Client,
    config: WeatherConfig,
}

impl WeatherClient {
    pub fn new(config: WeatherConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    /// Current-conditions URL. Coordinates win over a city name when both
    /// are configured.
    fn request_url(&self) -> Result<String, TwinError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| TwinError::Configuration("OPENWEATHER_API_KEY not set".into()))?;

        if let (Some(lat), Some(lon)) = (self.config.lat.as_deref(), self.config.lon.as_deref()) {
            return Ok(format!(
                "https://api.openweathermap.org/data/2.5/weather?lat={}&lon={}&appid={}&units=metric",
                lat, lon, api_key
            ));
        }
        if let Some(city) = self.config.city.as_deref() {
            return Ok(format!(
                "https://api.openweathermap.org/data/2.5/weather?q={}&appid={}&units=metric",
                city, api_key
            ));
        }
        Err(TwinError::Configuration(
            "Provide CITY or LAT/LON for the weather poller".into(),
        ))
    }

    pub async fn fetch(&self) -> Result<WeatherSample, TwinError> {
        let url = self.request_url()?;

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TwinError::Network(format!("weather request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(200).collect();
            return Err(TwinError::Network(format!(
                "weather API returned {}: {}",
                status, snippet
            )));
        }

        let payload: Value = resp
            .json()
            .await
            .map_err(|e| TwinError::Parse(format!("weather payload not JSON: {}", e)))?;
        parse_payload(&payload)
    }
}

/// Extract temperature, humidity, and the trailing-hour rainfall from an
/// OpenWeather current-conditions payload. `rain.1h` is absent in dry
/// weather and defaults to zero; a payload without `main` is an API error
/// body and is rejected.
pub fn parse_payload(payload: &Value) -> Result<WeatherSample, TwinError> {
    let main = payload
        .get("main")
        .ok_or_else(|| TwinError::Parse(format!("missing 'main' in payload: {}", payload)))?;

    let temp = main.get("temp").and_then(Value::as_f64).unwrap_or(0.0);
    let humidity = main.get("humidity").and_then(Value::as_f64).unwrap_or(0.0);
    let rainfall = payload
        .get("rain")
        .and_then(|r| r.get("1h"))
        .and_then(Value::as_f64)
        .unwrap_or(0.0);

    Ok(WeatherSample {
        temp,
        humidity,
        rainfall,
    })
}

/// Poll the provider and append observations until shutdown.
pub async fn run_weather_poller(
    db: TwinDb,
    config: WeatherConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let client = WeatherClient::new(config);
    log::info!("Weather poller started, cadence {}s", FETCH_INTERVAL.as_secs());

    loop {
        let delay = match client.fetch().await {
            Ok(sample) => {
                match db.insert_weather_obs(sample.rainfall, sample.temp, sample.humidity) {
                    Ok(()) => log::info!(
                        "Weather saved: rain={}mm temp={}C hum={}%",
                        sample.rainfall,
                        sample.temp,
                        sample.humidity
                    ),
                    Err(e) => log::warn!("Weather write failed: {}", e),
                }
                FETCH_INTERVAL
            }
            Err(e) => {
                log::warn!("Weather fetch skipped: {}", e);
                RETRY_INTERVAL
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => {
                log::info!("Weather poller stopping");
                break;
            }
        }
    }
}
