//! Read-only query API plus the subscription endpoint.
//!
//! Every read opens its own read-only connection against the shared store,
//! so the API never contends with the writers beyond SQLite's own WAL
//! coordination; the subscribe handler is the one write path. The server
//! applies migrations once at startup so the file and schema exist before
//! the first reader arrives.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::TwinDb;
use crate::error::TwinError;
use crate::scorer::weather_risk;
use crate::types::WeatherObs;

pub struct ServerState {
    db_path: PathBuf,
}

impl ServerState {
    fn read_db(&self) -> Result<TwinDb, ApiError> {
        TwinDb::open_readonly_at(&self.db_path).map_err(internal)
    }

    fn write_db(&self) -> Result<TwinDb, ApiError> {
        TwinDb::open_at(self.db_path.clone()).map_err(internal)
    }
}

type ApiError = (StatusCode, Json<Value>);

fn internal(e: impl std::fmt::Display) -> ApiError {
    log::warn!("Query API error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"detail": "internal error"})),
    )
}

fn not_found(detail: &str) -> ApiError {
    (StatusCode::NOT_FOUND, Json(json!({"detail": detail})))
}

fn bad_request(detail: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({"detail": detail})))
}

pub fn router(db_path: PathBuf) -> Router {
    let state = Arc::new(ServerState { db_path });
    Router::new()
        .route("/health", get(health))
        .route("/api/weather/latest", get(weather_latest))
        .route("/api/risk/latest", get(risk_latest))
        .route("/api/timeseries", get(timeseries))
        .route("/api/roads", get(roads))
        .route("/api/risk/zones", get(risk_zones))
        .route("/api/alerts/subscribe", post(subscribe))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(bind: &str, db_path: PathBuf) -> Result<(), TwinError> {
    // Create the file and schema up front so read-only opens succeed.
    TwinDb::open_at(db_path.clone())?;

    let app = router(db_path);
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| TwinError::Configuration(format!("cannot bind {}: {}", bind, e)))?;
    log::info!("Query API listening on http://{}", bind);
    axum::serve(listener, app)
        .await
        .map_err(|e| TwinError::Network(format!("server error: {}", e)))
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn weather_latest(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<WeatherObs>, ApiError> {
    let db = state.read_db()?;
    match db.latest_weather().map_err(internal)? {
        Some(obs) => Ok(Json(obs)),
        None => Err(not_found("No weather data found")),
    }
}

async fn risk_latest(State(state): State<Arc<ServerState>>) -> Result<Json<Value>, ApiError> {
    let db = state.read_db()?;
    let Some(obs) = db.latest_weather().map_err(internal)? else {
        return Err(not_found("No weather data found"));
    };

    let assessment = weather_risk(
        obs.rainfall.unwrap_or(0.0),
        obs.humidity.unwrap_or(0.0),
        obs.temp.unwrap_or(0.0),
    );
    Ok(Json(json!({
        "t": obs.t,
        "score": round3(assessment.score),
        "level": assessment.label.as_str(),
        "color": assessment.label.color(),
    })))
}

#[derive(Debug, Deserialize)]
pub struct TimeseriesParams {
    pub metric: String,
    pub hours: Option<i64>,
}

async fn timeseries(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<TimeseriesParams>,
) -> Result<Json<Value>, ApiError> {
    let hours = params.hours.unwrap_or(24);
    if !(1..=168).contains(&hours) {
        return Err(bad_request("hours must be between 1 and 168"));
    }
    if !matches!(params.metric.as_str(), "rain" | "temp" | "humidity" | "risk") {
        return Err(bad_request(
            "metric must be one of rain, temp, humidity, risk",
        ));
    }

    let db = state.read_db()?;
    let rows = db.weather_since(hours).map_err(internal)?;

    let points: Vec<Value> = rows
        .iter()
        .map(|obs| {
            let value = metric_value(&params.metric, obs);
            json!({"t": obs.t, "value": value})
        })
        .collect();

    Ok(Json(json!({"metric": params.metric, "points": points})))
}

fn metric_value(metric: &str, obs: &WeatherObs) -> Option<f64> {
    match metric {
        "rain" => obs.rainfall,
        "temp" => obs.temp,
        "humidity" => obs.humidity,
        // Weather-only risk over the row, same function the /risk endpoints use
        _ => Some(
            weather_risk(
                obs.rainfall.unwrap_or(0.0),
                obs.humidity.unwrap_or(0.0),
                obs.temp.unwrap_or(0.0),
            )
            .score,
        ),
    }
}

#[derive(Debug, Deserialize)]
pub struct RoadsParams {
    pub country: String,
    pub state: String,
    #[allow(dead_code)]
    pub bbox: String,
}

/// Demo road geometry; the bbox is accepted but not parsed.
async fn roads(Query(params): Query<RoadsParams>) -> Json<Value> {
    Json(json!({
        "country": params.country,
        "state": params.state,
        "roads": [
            {"id": 1, "name": "Highway 44", "coords": [[77.5, 12.9], [77.6, 13.0]]},
            {"id": 2, "name": "NH75", "coords": [[77.55, 12.95], [77.65, 13.05]]},
        ],
    }))
}

#[derive(Debug, Deserialize)]
pub struct ZonesParams {
    pub bbox: String,
}

/// Demo risk-zone geometry.
async fn risk_zones(Query(params): Query<ZonesParams>) -> Json<Value> {
    Json(json!({
        "bbox": params.bbox,
        "zones": [
            {"id": "zone1", "risk": "High", "color": "red", "coords": [[77.55, 12.95]]},
            {"id": "zone2", "risk": "Medium", "color": "yellow", "coords": [[77.60, 13.00]]},
            {"id": "zone3", "risk": "Low", "color": "green", "coords": [[77.65, 13.05]]},
        ],
    }))
}

#[derive(Debug, Deserialize)]
pub struct SubscribeReq {
    pub email: Option<String>,
    pub phone: Option<String>,
}

async fn subscribe(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<SubscribeReq>,
) -> Result<Json<Value>, ApiError> {
    let db = state.write_db()?;
    db.insert_subscription(req.email.as_deref(), req.phone.as_deref())
        .map_err(internal)?;
    Ok(Json(json!({"ok": true})))
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_state() -> (TempDir, Arc<ServerState>) {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("twin.db");
        // Create schema the way serve() does
        TwinDb::open_at(db_path.clone()).expect("open");
        (dir, Arc::new(ServerState { db_path }))
    }

    #[tokio::test]
    async fn test_weather_latest_404_before_first_write() {
        let (_dir, state) = temp_state();
        let err = weather_latest(State(state)).await.err().expect("404");
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_weather_and_risk_latest_after_write() {
        let (_dir, state) = temp_state();
        {
            let db = TwinDb::open_at(state.db_path.clone()).unwrap();
            db.insert_weather_obs(20.0, 25.0, 100.0).unwrap();
        }

        let obs = weather_latest(State(state.clone())).await.expect("200");
        assert_eq!(obs.0.rainfall, Some(20.0));

        let risk = risk_latest(State(state)).await.expect("200");
        assert_eq!(risk.0["level"], "High");
        assert_eq!(risk.0["color"], "red");
        assert_eq!(risk.0["score"], 0.9);
    }

    #[tokio::test]
    async fn test_timeseries_validation() {
        let (_dir, state) = temp_state();

        let bad_hours = timeseries(
            State(state.clone()),
            Query(TimeseriesParams {
                metric: "rain".into(),
                hours: Some(0),
            }),
        )
        .await
        .err()
        .expect("400");
        assert_eq!(bad_hours.0, StatusCode::BAD_REQUEST);

        let bad_metric = timeseries(
            State(state),
            Query(TimeseriesParams {
                metric: "wind".into(),
                hours: None,
            }),
        )
        .await
        .err()
        .expect("400");
        assert_eq!(bad_metric.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_timeseries_risk_metric() {
        let (_dir, state) = temp_state();
        {
            let db = TwinDb::open_at(state.db_path.clone()).unwrap();
            db.insert_weather_obs(10.0, 20.0, 80.0).unwrap();
        }

        let out = timeseries(
            State(state),
            Query(TimeseriesParams {
                metric: "risk".into(),
                hours: Some(24),
            }),
        )
        .await
        .expect("200");

        let points = out.0["points"].as_array().unwrap();
        assert_eq!(points.len(), 1);
        let expected = weather_risk(10.0, 80.0, 20.0).score;
        assert!((points[0]["value"].as_f64().unwrap() - expected).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_subscribe_inserts_row() {
        let (_dir, state) = temp_state();
        let out = subscribe(
            State(state.clone()),
            Json(SubscribeReq {
                email: Some("ops@example.com".into()),
                phone: None,
            }),
        )
        .await
        .expect("200");
        assert_eq!(out.0["ok"], true);

        let db = TwinDb::open_at(state.db_path.clone()).unwrap();
        assert_eq!(db.list_subscriptions().unwrap().len(), 1);
    }

    #[test]
    fn test_round3() {
        assert_eq!(round3(0.66549), 0.665);
        assert_eq!(round3(0.6666), 0.667);
    }
}
