//! Orbit model boundary
//!
//! The screening engine never does orbital mechanics itself. It asks an
//! [`OrbitModel`] for a state at an absolute time and gets back a position,
//! a velocity and a status code. SGP4 through satkit is the production
//! model; tests plug in canned trajectories.

use chrono::{DateTime, Datelike, Timelike, Utc};
use nalgebra::Vector3;
use satkit::sgp4::{sgp4, SGP4Error};
use thiserror::Error;

use crate::data::OrbitalElementSet;

/// Status code of a successful evaluation. SGP4 failures keep satkit's
/// error codes (1 eccentricity, 2 mean motion, 6 decay, ...).
pub const STATUS_OK: i32 = 0;

/// Output of one model evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelState {
    pub position_km: Vector3<f64>,
    pub velocity_km_s: Vector3<f64>,
    /// 0 on success, anything else marks this instant invalid
    pub status: i32,
}

impl ModelState {
    pub fn ok(position_km: Vector3<f64>, velocity_km_s: Vector3<f64>) -> Self {
        Self {
            position_km,
            velocity_km_s,
            status: STATUS_OK,
        }
    }

    pub fn failed(status: i32) -> Self {
        Self {
            position_km: Vector3::repeat(f64::NAN),
            velocity_km_s: Vector3::repeat(f64::NAN),
            status,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}

/// Failures that take a whole object out of the run
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("cannot load elements for {name}: {reason}")]
    InvalidElements { name: String, reason: String },

    #[error("model failure: {0}")]
    Failure(String),
}

/// Maps (element set, absolute time) to a state.
///
/// `load` runs once per object and may do any expensive setup; `state_at`
/// runs once per step. Implementations must be `Send + Sync` so objects can
/// be propagated in parallel.
pub trait OrbitModel: Send + Sync {
    /// Per-object prepared form of the elements
    type Orbit: Send + Sync;

    fn load(&self, elements: &OrbitalElementSet) -> Result<Self::Orbit, ModelError>;

    fn state_at(&self, orbit: &Self::Orbit, time: &DateTime<Utc>) -> Result<ModelState, ModelError>;

    fn name(&self) -> &'static str;
}

/// SGP4 via satkit. States are in the TEME frame, km and km/s.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sgp4Model;

impl OrbitModel for Sgp4Model {
    /// Element set with its SGP4 record already initialised
    type Orbit = satkit::TLE;

    fn load(&self, elements: &OrbitalElementSet) -> Result<Self::Orbit, ModelError> {
        let invalid = |reason: String| ModelError::InvalidElements {
            name: elements.name.clone(),
            reason,
        };

        let mut tle = satkit::TLE::load_2line(&elements.line1, &elements.line2)
            .map_err(|e| invalid(e.to_string()))?;

        // First call runs sgp4init and caches the record on the TLE
        let epoch = tle.epoch;
        let (_, _, errs) = sgp4(&mut tle, &[epoch]);
        match errs.first() {
            Some(SGP4Error::SGP4Success) => Ok(tle),
            Some(err) => Err(invalid(format!("SGP4 initialisation failed: {}", err))),
            None => Err(invalid("SGP4 returned no result".into())),
        }
    }

    fn state_at(&self, orbit: &Self::Orbit, time: &DateTime<Utc>) -> Result<ModelState, ModelError> {
        let instant = to_instant(time)?;

        let mut tle = orbit.clone();
        let (pos, vel, errs) = sgp4(&mut tle, &[instant]);
        match errs.first() {
            Some(SGP4Error::SGP4Success) => {
                // satkit reports metres and m/s
                let pos = pos.column(0);
                let vel = vel.column(0);
                Ok(ModelState::ok(
                    Vector3::new(pos[0], pos[1], pos[2]) / 1000.0,
                    Vector3::new(vel[0], vel[1], vel[2]) / 1000.0,
                ))
            }
            Some(err) => Ok(ModelState::failed(i32::from(err.clone()))),
            None => Err(ModelError::Failure(format!("SGP4 returned no state for {}", time))),
        }
    }

    fn name(&self) -> &'static str {
        "SGP4"
    }
}

fn to_instant(time: &DateTime<Utc>) -> Result<satkit::Instant, ModelError> {
    let seconds = time.second() as f64 + time.nanosecond() as f64 * 1e-9;
    satkit::Instant::from_datetime(
        time.year(),
        time.month() as i32,
        time.day() as i32,
        time.hour() as i32,
        time.minute() as i32,
        seconds,
    )
    .map_err(|e| ModelError::Failure(format!("cannot convert {} to satkit time: {}", time, e)))
}
