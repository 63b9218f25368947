//! Monte-Carlo dispersion of a propagated trajectory
//!
//! The deterministic trajectory is propagated once; each of the N draws adds
//! zero-mean Gaussian noise, independently per axis and per step, to its
//! positions and velocities. The draws are reduced step by step into a mean
//! trajectory plus a per-axis position standard deviation, so memory stays
//! proportional to the number of steps and not to N.

use nalgebra::Vector3;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::data::{StateVector, Trajectory};
use crate::error::{EngineError, Result};

/// Monte-Carlo settings
#[derive(Debug, Clone, PartialEq)]
pub struct MonteCarloConfig {
    /// Number of perturbed draws
    pub runs: usize,
    /// Position noise standard deviation (km)
    pub sigma_position_km: f64,
    /// Velocity noise standard deviation (km/s)
    pub sigma_velocity_km_s: f64,
    /// Base seed; object `i` draws from `seed + i`
    pub seed: u64,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            runs: 100,
            sigma_position_km: 0.1,
            sigma_velocity_km_s: 0.0001,
            seed: 42,
        }
    }
}

impl MonteCarloConfig {
    pub fn validate(&self) -> Result<()> {
        if self.runs == 0 {
            return Err(EngineError::InvalidConfig(
                "monte-carlo runs must be at least 1".into(),
            ));
        }
        for (label, sigma) in [
            ("sigma-pos", self.sigma_position_km),
            ("sigma-vel", self.sigma_velocity_km_s),
        ] {
            if !sigma.is_finite() || sigma < 0.0 {
                return Err(EngineError::InvalidConfig(format!(
                    "{} must be a finite non-negative number, got {}",
                    label, sigma
                )));
            }
        }
        Ok(())
    }
}

/// Running mean/variance (Welford) over 3-vectors
#[derive(Debug, Clone, Copy)]
struct RunningStats {
    count: usize,
    mean: Vector3<f64>,
    m2: Vector3<f64>,
}

impl RunningStats {
    fn new() -> Self {
        Self {
            count: 0,
            mean: Vector3::zeros(),
            m2: Vector3::zeros(),
        }
    }

    fn push(&mut self, sample: &Vector3<f64>) {
        self.count += 1;
        let delta = sample - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = sample - self.mean;
        self.m2 += delta.component_mul(&delta2);
    }

    /// Population standard deviation per axis
    fn std_dev(&self) -> Vector3<f64> {
        if self.count == 0 {
            return Vector3::zeros();
        }
        (self.m2 / self.count as f64).map(f64::sqrt)
    }
}

/// Disperse `baseline` into a mean trajectory with position dispersion.
///
/// Invalid baseline steps stay invalid and consume no draws.
pub fn disperse<R: Rng + ?Sized>(
    baseline: &Trajectory,
    config: &MonteCarloConfig,
    rng: &mut R,
) -> Result<Trajectory> {
    config.validate()?;
    let pos_noise = Normal::new(0.0, config.sigma_position_km)
        .map_err(|e| EngineError::InvalidConfig(format!("sigma-pos: {}", e)))?;
    let vel_noise = Normal::new(0.0, config.sigma_velocity_km_s)
        .map_err(|e| EngineError::InvalidConfig(format!("sigma-vel: {}", e)))?;

    let mut states = Vec::with_capacity(baseline.len());
    for state in baseline.states() {
        if !state.is_valid() {
            states.push(state.clone());
            continue;
        }

        let mut positions = RunningStats::new();
        let mut velocities = RunningStats::new();
        for _ in 0..config.runs {
            let dp = Vector3::from_fn(|_, _| pos_noise.sample(rng));
            let dv = Vector3::from_fn(|_, _| vel_noise.sample(rng));
            positions.push(&(state.position_km() + dp));
            velocities.push(&(state.velocity_km_s() + dv));
        }

        states.push(
            StateVector::new(state.timestamp(), positions.mean, velocities.mean)
                .with_dispersion(positions.std_dev()),
        );
    }

    Ok(Trajectory::new(baseline.name(), states))
}
