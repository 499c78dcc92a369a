//! Risk scoring.
//!
//! Two independent scorers serve two different consumers and are kept
//! separate on purpose: `state_risk` reads the estimated twin state inside
//! the control loop, `weather_risk` reads a raw weather observation on the
//! query path. Both are pure, total functions over finite inputs; negative
//! inputs clamp rather than reject.

use crate::types::{RiskAssessment, RiskLabel};

/// Risk over the current twin state plus rainfall forcing.
///
/// `prob = min(1, 0.15 + 0.12|v| + 0.006p + 0.01rain)`, monotonically
/// non-decreasing in |v|, p, and rain.
pub fn state_risk(v: f64, p: f64, rainfall: f64) -> RiskAssessment {
    let prob = (0.15 + 0.12 * v.abs() + 0.006 * p + 0.01 * rainfall).min(1.0);
    RiskAssessment {
        score: prob,
        label: state_label(prob),
    }
}

/// Classify a state-based probability. High from 0.7, Medium from 0.4.
fn state_label(prob: f64) -> RiskLabel {
    if prob >= 0.7 {
        RiskLabel::High
    } else if prob >= 0.4 {
        RiskLabel::Medium
    } else {
        RiskLabel::Low
    }
}

/// Weather-only risk over a raw observation, independent of the twin state.
pub fn weather_risk(rainfall: f64, humidity: f64, temp: f64) -> RiskAssessment {
    let rain_score = (rainfall / 20.0).clamp(0.0, 1.0);
    let hum_score = ((humidity - 60.0) / 40.0).clamp(0.0, 1.0);
    let temp_score = ((25.0 - temp) / 10.0).clamp(0.0, 1.0);
    let score = 0.6 * rain_score + 0.3 * hum_score + 0.1 * temp_score;
    RiskAssessment {
        score,
        label: weather_label(score),
    }
}

/// Classify a weather-only score. High from 0.66, Medium from 0.33.
fn weather_label(score: f64) -> RiskLabel {
    if score >= 0.66 {
        RiskLabel::High
    } else if score >= 0.33 {
        RiskLabel::Medium
    } else {
        RiskLabel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_risk_bounds() {
        let calm = state_risk(0.0, 0.0, 0.0);
        assert!((calm.score - 0.15).abs() < 1e-12);
        assert_eq!(calm.label, RiskLabel::Low);

        let extreme = state_risk(100.0, 500.0, 200.0);
        assert_eq!(extreme.score, 1.0);
        assert_eq!(extreme.label, RiskLabel::High);
    }

    #[test]
    fn test_state_risk_monotone() {
        let base = state_risk(1.0, 10.0, 2.0).score;
        assert!(state_risk(2.0, 10.0, 2.0).score >= base);
        assert!(state_risk(1.0, 20.0, 2.0).score >= base);
        assert!(state_risk(1.0, 10.0, 5.0).score >= base);
        // |v| — negative velocity scores like its magnitude
        assert_eq!(
            state_risk(-2.0, 10.0, 2.0).score,
            state_risk(2.0, 10.0, 2.0).score
        );
    }

    #[test]
    fn test_state_risk_in_unit_interval() {
        for v in [0.0, 0.5, 3.0, 50.0] {
            for p in [0.0, 20.0, 200.0] {
                for rain in [0.0, 5.0, 100.0] {
                    let score = state_risk(v, p, rain).score;
                    assert!((0.0..=1.0).contains(&score));
                }
            }
        }
    }

    #[test]
    fn test_state_label_boundaries() {
        assert_eq!(state_label(0.7), RiskLabel::High);
        assert_eq!(state_label(0.6999), RiskLabel::Medium);
        assert_eq!(state_label(0.4), RiskLabel::Medium);
        assert_eq!(state_label(0.3999), RiskLabel::Low);
    }

    #[test]
    fn test_weather_label_boundaries() {
        assert_eq!(weather_label(0.66), RiskLabel::High);
        assert_eq!(weather_label(0.659), RiskLabel::Medium);
        assert_eq!(weather_label(0.33), RiskLabel::Medium);
        assert_eq!(weather_label(0.329), RiskLabel::Low);
    }

    #[test]
    fn test_weather_risk_clamps_negative_inputs() {
        let r = weather_risk(-5.0, -10.0, 40.0);
        assert_eq!(r.score, 0.0);
        assert_eq!(r.label, RiskLabel::Low);

        let saturated = weather_risk(1000.0, 1000.0, -100.0);
        assert!((saturated.score - 1.0).abs() < 1e-12);
        assert_eq!(saturated.label, RiskLabel::High);
    }

    #[test]
    fn test_weather_risk_component_weights() {
        // Each component sits at exactly half scale
        let r = weather_risk(10.0, 80.0, 20.0);
        let expected = 0.6 * 0.5 + 0.3 * 0.5 + 0.1 * 0.5;
        assert!((r.score - expected).abs() < 1e-12);
        assert_eq!(r.label, RiskLabel::Medium);
    }

    #[test]
    fn test_weather_risk_heavy_rain_is_high() {
        let r = weather_risk(20.0, 90.0, 10.0);
        assert!(r.score >= 0.66);
        assert_eq!(r.label, RiskLabel::High);
    }
}
