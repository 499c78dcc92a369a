//! State estimator for the slope twin.
//!
//! Tracks `[u, v, p]` — displacement (mm), velocity (mm/h), pore pressure
//! (kPa) — through a predict/update cycle. `predict` propagates the state
//! forward under the current rainfall forcing and pushes the covariance
//! through the transition Jacobian; `update` blends present measurement
//! fields in at a fixed 0.7/0.3 weight and leaves the covariance alone.
//! The covariance (and the measurement-noise diagonal) are retained for a
//! future gain-based update but are never read by the blend.
//!
//! # State Model
//!
//! ```text
//! v' = max(0, v + alpha·rain)
//! u' = u + v·dt
//! p' = beta·p + gamma·rain
//! F  = [[1, dt, 0], [0, 1, 0], [0, 0, beta]]
//! ```

use crate::types::Measurement;

/// Retained weight of the current estimate in the measurement blend.
const BLEND_RETAIN: f64 = 0.7;
/// Weight given to an incoming measurement field.
const BLEND_MEASURE: f64 = 0.3;

/// 3x3 matrix operations (inline, no external dependency).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat3 {
    m: [[f64; 3]; 3],
}

impl Mat3 {
    pub fn new(m: [[f64; 3]; 3]) -> Self {
        Self { m }
    }

    pub fn diag(a: f64, b: f64, c: f64) -> Self {
        Self::new([[a, 0.0, 0.0], [0.0, b, 0.0], [0.0, 0.0, c]])
    }

    pub fn scaled_identity(s: f64) -> Self {
        Self::diag(s, s, s)
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.m[row][col]
    }

    fn mul(&self, other: &Mat3) -> Mat3 {
        let mut out = [[0.0; 3]; 3];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| self.m[i][k] * other.m[k][j]).sum();
            }
        }
        Mat3::new(out)
    }

    fn transpose(&self) -> Mat3 {
        let mut out = [[0.0; 3]; 3];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = self.m[j][i];
            }
        }
        Mat3::new(out)
    }

    fn add(&self, other: &Mat3) -> Mat3 {
        let mut out = [[0.0; 3]; 3];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = self.m[i][j] + other.m[i][j];
            }
        }
        Mat3::new(out)
    }
}

/// The estimated physical condition of the slope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwinState {
    /// Displacement, mm.
    pub u: f64,
    /// Velocity, mm/h. Clamped >= 0 on predict.
    pub v: f64,
    /// Pore pressure, kPa.
    pub p: f64,
}

/// Fixed-weight predictor/blender over the twin state.
#[derive(Debug, Clone)]
pub struct TwinFilter {
    state: TwinState,
    /// Covariance, propagated by `predict` and never consumed by `update`.
    cov: Mat3,
    /// Process noise added each predict step.
    q: Mat3,
    /// Measurement noise. Inert until a gain-based update exists.
    #[allow(dead_code)]
    r: Mat3,
    /// Pore-pressure decay per step.
    beta: f64,
    /// Rainfall-to-pressure gain.
    gamma: f64,
    /// Rainfall-to-velocity gain.
    alpha: f64,
    /// Step interval, hours.
    dt: f64,
}

impl Default for TwinFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl TwinFilter {
    pub fn new() -> Self {
        Self {
            state: TwinState {
                u: 0.0,
                v: 0.0,
                p: 10.0,
            },
            cov: Mat3::scaled_identity(5.0),
            q: Mat3::diag(0.05, 0.05, 0.1),
            r: Mat3::diag(0.5, 0.5, 0.7),
            beta: 0.97,
            gamma: 0.10,
            alpha: 0.03,
            dt: 1.0 / 12.0,
        }
    }

    pub fn state(&self) -> TwinState {
        self.state
    }

    pub fn covariance(&self) -> Mat3 {
        self.cov
    }

    /// Propagate the state one step under the given rainfall forcing.
    /// Inputs are finite by contract of the caller; this never fails.
    pub fn predict(&mut self, rainfall: f64) {
        let TwinState { u, v, p } = self.state;

        let v_next = (v + self.alpha * rainfall).max(0.0);
        let u_next = u + v * self.dt;
        let p_next = self.beta * p + self.gamma * rainfall;

        let f = Mat3::new([
            [1.0, self.dt, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, self.beta],
        ]);
        self.cov = f.mul(&self.cov).mul(&f.transpose()).add(&self.q);

        self.state = TwinState {
            u: u_next,
            v: v_next,
            p: p_next,
        };
    }

    /// Blend present measurement fields into the state at fixed weights.
    /// Absent fields are left unchanged; the covariance is not touched.
    pub fn update(&mut self, measurement: Measurement) {
        if let Some(u) = measurement.u {
            self.state.u = BLEND_RETAIN * self.state.u + BLEND_MEASURE * u;
        }
        if let Some(v) = measurement.v {
            self.state.v = BLEND_RETAIN * self.state.v + BLEND_MEASURE * v;
        }
        if let Some(p) = measurement.p {
            self.state.p = BLEND_RETAIN * self.state.p + BLEND_MEASURE * p;
        }
    }
}

/// Unitless stand-in for a geotechnical factor of safety; higher is safer.
/// Monotonically decreasing in |v| and p. The slope term is fixed per site,
/// so even a quiescent state sits strictly below 1.
pub fn stability_proxy(v: f64, p: f64, slope_deg: f64) -> f64 {
    (1.0 - (v.abs() / 5.0 + p / 100.0 + slope_deg.to_radians().tan() / 3.0)).max(0.0)
}
