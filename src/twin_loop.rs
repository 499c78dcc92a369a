//! The control loop: one fixed-period predict/update/score/persist cycle.
//!
//! All collaborators live in an explicit `TwinLoop` context constructed once
//! at startup — the store handle, the filter, the alert evaluator, and the
//! site parameters — so nothing is ambient process state. `cycle()` performs
//! exactly one discrete step, which is what tests drive; `run()` is the
//! steady state, sleeping between cycles until the shutdown signal flips.
//!
//! A failure fetching inputs or persisting aborts only the current cycle:
//! the error is logged and the loop continues at the next tick. Alert
//! dispatch failures are handled further down and never reach this level.

use std::time::Duration;

use tokio::sync::watch;

use crate::alerts::AlertEvaluator;
use crate::config::Config;
use crate::db::TwinDb;
use crate::error::TwinError;
use crate::filter::{stability_proxy, TwinFilter};
use crate::scorer::state_risk;
use crate::types::TwinStateRecord;

pub struct TwinLoop {
    db: TwinDb,
    filter: TwinFilter,
    evaluator: AlertEvaluator,
    slope_deg: f64,
    period: Duration,
}

impl TwinLoop {
    pub fn new(db: TwinDb, evaluator: AlertEvaluator, config: &Config) -> Self {
        Self {
            db,
            filter: TwinFilter::new(),
            evaluator,
            slope_deg: config.slope_deg,
            period: Duration::from_secs(config.loop_period_secs),
        }
    }

    /// One full cycle: fetch inputs, predict, update, derive, persist,
    /// evaluate alerts. Ordering is fixed; persistence strictly precedes
    /// alert evaluation.
    pub async fn cycle(&mut self) -> Result<TwinStateRecord, TwinError> {
        let rainfall = self.db.latest_rainfall()?;
        let measurement = self.db.latest_measurement()?;

        self.filter.predict(rainfall);
        self.filter.update(measurement);

        let state = self.filter.state();
        let fs_hat = stability_proxy(state.v, state.p, self.slope_deg);
        let assessment = state_risk(state.v, state.p, rainfall);

        let record = TwinStateRecord {
            t: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
            u_mm: state.u,
            v_mmph: state.v,
            p_kpa: state.p,
            r_mm: rainfall,
            fs_hat,
            risk_prob: assessment.score,
            risk_class: assessment.label.as_str().to_string(),
        };
        self.db.append_twin_state(&record)?;

        self.evaluator.evaluate(&self.db, &assessment).await;

        Ok(record)
    }

    /// Run until the shutdown signal changes. Sleeps `period` between
    /// cycles; a failed cycle is logged and skipped, not fatal.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        log::info!(
            "Control loop started: period {}s, slope {} deg",
            self.period.as_secs(),
            self.slope_deg
        );

        loop {
            match self.cycle().await {
                Ok(record) => {
                    log::info!(
                        "Cycle: u={:.2}mm v={:.2}mm/h p={:.2}kPa rain={:.2}mm Fs={:.3} risk={} ({:.0}%)",
                        record.u_mm,
                        record.v_mmph,
                        record.p_kpa,
                        record.r_mm,
                        record.fs_hat,
                        record.risk_class,
                        record.risk_prob * 100.0
                    );
                }
                Err(e) => {
                    log::error!("Cycle skipped: {}", e);
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.period) => {}
                _ = shutdown.changed() => {
                    log::info!("Control loop stopping");
                    break;
                }
            }
        }
    }
}
