//! Environment-driven configuration
//!
//! Every service reads its settings from the environment at startup and
//! carries them in an explicit `Config` value; nothing consults the
//! environment after construction.

use std::env;

/// SMTP credentials for email dispatch. All fields optional; the email
/// sender reports an error (caught and logged by the evaluator) when the
/// transport is not fully configured.
#[derive(Debug, Clone, Default)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub port: u16,
    pub user: Option<String>,
    pub pass: Option<String>,
}

impl SmtpConfig {
    fn from_env() -> Self {
        Self {
            host: non_empty(env::var("SMTP_HOST").ok()),
            port: env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(587),
            user: non_empty(env::var("SMTP_USER").ok()),
            pass: non_empty(env::var("SMTP_PASS").ok()),
        }
    }
}

/// SMS provider account. `None` when any of the three values is missing;
/// an unconfigured provider is a silent no-op, not a failure.
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub sid: String,
    pub token: String,
    pub from: String,
}

impl TwilioConfig {
    fn from_env() -> Option<Self> {
        let sid = non_empty(env::var("TWILIO_SID").ok())?;
        let token = non_empty(env::var("TWILIO_TOKEN").ok())?;
        let from = non_empty(env::var("TWILIO_FROM").ok())?;
        Some(Self { sid, token, from })
    }
}

/// Weather provider settings: API key plus either a city name or a
/// latitude/longitude pair (coordinates win when both are set).
#[derive(Debug, Clone, Default)]
pub struct WeatherConfig {
    pub api_key: Option<String>,
    pub city: Option<String>,
    pub lat: Option<String>,
    pub lon: Option<String>,
}

impl WeatherConfig {
    fn from_env() -> Self {
        Self {
            api_key: non_empty(env::var("OPENWEATHER_API_KEY").ok()),
            city: non_empty(env::var("CITY").ok()),
            lat: non_empty(env::var("LAT").ok()),
            lon: non_empty(env::var("LON").ok()),
        }
    }
}

/// Full service configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address for the query API.
    pub http_bind: String,
    /// Control-loop period in seconds.
    pub loop_period_secs: u64,
    /// Slope angle fed to the stability proxy.
    pub slope_deg: f64,
    pub smtp: SmtpConfig,
    pub twilio: Option<TwilioConfig>,
    pub weather: WeatherConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            http_bind: env::var("TWIN_HTTP_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            loop_period_secs: env::var("TWIN_LOOP_PERIOD_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|v| (1..=3600).contains(v))
                .unwrap_or(5),
            slope_deg: env::var("TWIN_SLOPE_DEG")
                .ok()
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|v| v.is_finite() && (0.0..90.0).contains(v))
                .unwrap_or(55.0),
            smtp: SmtpConfig::from_env(),
            twilio: TwilioConfig::from_env(),
            weather: WeatherConfig::from_env(),
        }
    }
}

/// Treat empty and whitespace-only environment values as unset.
fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
