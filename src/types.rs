//! Shared type definitions for the twin services.

use serde::{Deserialize, Serialize};

/// One weather observation row, as polled from the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherObs {
    pub t: String,
    pub rainfall: Option<f64>,
    pub temp: Option<f64>,
    pub humidity: Option<f64>,
}

/// Which physical quantity a raw sensor reading represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorType {
    Displacement,
    Velocity,
    PorePressure,
}

impl SensorType {
    /// Stable tag used in the `sensor_readings.type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorType::Displacement => "displacement",
            SensorType::Velocity => "velocity",
            SensorType::PorePressure => "pore_pressure",
        }
    }

    pub const ALL: [SensorType; 3] = [
        SensorType::Displacement,
        SensorType::Velocity,
        SensorType::PorePressure,
    ];
}

/// Latest reading per sensor type. Each field is independently absent when
/// no reading of that type exists yet.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Measurement {
    pub u: Option<f64>,
    pub v: Option<f64>,
    pub p: Option<f64>,
}

impl Measurement {
    pub fn is_empty(&self) -> bool {
        self.u.is_none() && self.v.is_none() && self.p.is_none()
    }
}

/// Three-way risk classification shared by both scorers, persistence, the
/// query API, and the alert trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLabel {
    Low,
    Medium,
    High,
}

impl RiskLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLabel::Low => "Low",
            RiskLabel::Medium => "Medium",
            RiskLabel::High => "High",
        }
    }

    /// Map color used by the dashboard.
    pub fn color(&self) -> &'static str {
        match self {
            RiskLabel::Low => "green",
            RiskLabel::Medium => "yellow",
            RiskLabel::High => "red",
        }
    }

    /// Whether this class triggers notification dispatch.
    pub fn is_alertable(&self) -> bool {
        matches!(self, RiskLabel::Medium | RiskLabel::High)
    }

    /// Parse a persisted `risk_class` value, case-insensitively.
    pub fn parse(s: &str) -> Option<RiskLabel> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Some(RiskLabel::Low),
            "medium" => Some(RiskLabel::Medium),
            "high" => Some(RiskLabel::High),
            _ => None,
        }
    }
}

/// A risk score with its discrete class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub score: f64,
    pub label: RiskLabel,
}

/// One appended `twin_state` row: the estimated slope condition at a point
/// in time, plus the inputs and derived indicators for that cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwinStateRecord {
    pub t: String,
    pub u_mm: f64,
    pub v_mmph: f64,
    pub p_kpa: f64,
    pub r_mm: f64,
    pub fs_hat: f64,
    pub risk_prob: f64,
    pub risk_class: String,
}

/// A row from the `alert_subs` table. Both contacts are optional; a row with
/// neither is accepted at write time and simply never produces a dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertSubscription {
    pub id: i64,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: String,
}
