//! Fixed-cadence trajectory generation over a batch of element sets

use chrono::{DateTime, Duration, Utc};
use indicatif::ProgressBar;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use super::model::{ModelError, OrbitModel};
use super::monte_carlo::{disperse, MonteCarloConfig};
use crate::data::{OrbitalElementSet, StateVector, Trajectory, TrajectorySet};
use crate::error::{EngineError, Result};
use crate::runtime::{worker_pool, CancellationToken};

/// Propagation settings
#[derive(Debug, Clone, PartialEq)]
pub struct PropagationConfig {
    /// Horizon from each object's own epoch (seconds)
    pub duration_seconds: f64,

    /// Step size (seconds)
    pub step_seconds: f64,

    /// Monte-Carlo dispersion; `None` for plain deterministic output
    pub monte_carlo: Option<MonteCarloConfig>,

    /// Worker threads, 0 = one per core
    pub workers: usize,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 86_400.0, // 1 day
            step_seconds: 60.0,
            monte_carlo: None,
            workers: 0,
        }
    }
}

impl PropagationConfig {
    /// Short horizon for quick looks
    pub fn quick() -> Self {
        Self {
            duration_seconds: 6.0 * 3600.0,
            step_seconds: 120.0,
            ..Default::default()
        }
    }

    /// Enable Monte-Carlo dispersion
    pub fn with_monte_carlo(mut self, monte_carlo: MonteCarloConfig) -> Self {
        self.monte_carlo = Some(monte_carlo);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.step_seconds.is_finite() || self.step_seconds <= 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "step must be > 0 seconds, got {}",
                self.step_seconds
            )));
        }
        if !self.duration_seconds.is_finite() || self.duration_seconds < 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "duration must be >= 0 seconds, got {}",
                self.duration_seconds
            )));
        }
        if let Some(mc) = &self.monte_carlo {
            mc.validate()?;
        }
        Ok(())
    }

    /// Number of samples per object
    pub fn step_count(&self) -> usize {
        (self.duration_seconds / self.step_seconds).floor() as usize
    }

    /// Absolute time of step `index` for an object with the given epoch
    pub fn step_time(&self, epoch: DateTime<Utc>, index: usize) -> DateTime<Utc> {
        let offset_us = (index as f64 * self.step_seconds * 1e6).round() as i64;
        epoch + Duration::microseconds(offset_us)
    }
}

/// Runs an [`OrbitModel`] over element sets at a fixed cadence
pub struct Propagator<M: OrbitModel> {
    model: M,
    config: PropagationConfig,
}

impl<M: OrbitModel> Propagator<M> {
    pub fn new(model: M, config: PropagationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { model, config })
    }

    pub fn config(&self) -> &PropagationConfig {
        &self.config
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Deterministic trajectory for one object, starting at its epoch.
    ///
    /// A non-zero model status invalidates that step only. A model error
    /// aborts this object.
    pub fn propagate(&self, elements: &OrbitalElementSet) -> Result<Trajectory, ModelError> {
        let orbit = self.model.load(elements)?;
        let steps = self.config.step_count();

        let mut states = Vec::with_capacity(steps);
        let mut failed_steps = 0;
        for index in 0..steps {
            let time = self.config.step_time(elements.epoch, index);
            let state = self.model.state_at(&orbit, &time)?;
            if state.is_ok() {
                states.push(StateVector::new(time, state.position_km, state.velocity_km_s));
            } else {
                log::debug!(
                    "{} returned status {} for {} at {}",
                    self.model.name(),
                    state.status,
                    elements.name,
                    time
                );
                failed_steps += 1;
                states.push(StateVector::invalid(time));
            }
        }

        if failed_steps > 0 {
            log::warn!(
                "{}: {} of {} steps invalid",
                elements.name,
                failed_steps,
                steps
            );
        }

        Ok(Trajectory::new(&elements.name, states))
    }

    /// Propagate one object, applying Monte-Carlo dispersion when configured.
    ///
    /// `index` is the object's position in the batch and selects its RNG
    /// stream, so results do not depend on scheduling.
    pub fn propagate_object(&self, elements: &OrbitalElementSet, index: usize) -> Result<Trajectory> {
        let baseline = self.propagate(elements)?;

        match &self.config.monte_carlo {
            Some(mc) => {
                let mut rng = StdRng::seed_from_u64(mc.seed.wrapping_add(index as u64));
                disperse(&baseline, mc, &mut rng)
            }
            None => Ok(baseline),
        }
    }

    /// Propagate a batch on the worker pool.
    ///
    /// Objects whose model fails are logged and left out; the output keeps
    /// input order. If every object fails the batch fails with
    /// [`EngineError::NoElementSets`]. Cancellation is checked before each
    /// object.
    pub fn propagate_all(
        &self,
        sets: &[OrbitalElementSet],
        cancel: &CancellationToken,
        progress: &ProgressBar,
    ) -> Result<TrajectorySet> {
        if sets.is_empty() {
            return Err(EngineError::NoElementSets {
                source_name: "propagation input".into(),
            });
        }

        log::info!(
            "Propagating {} objects with {} ({} steps of {}s{})",
            sets.len(),
            self.model.name(),
            self.config.step_count(),
            self.config.step_seconds,
            match &self.config.monte_carlo {
                Some(mc) => format!(", {} Monte-Carlo runs", mc.runs),
                None => String::new(),
            }
        );

        let pool = worker_pool(self.config.workers)?;
        let results: Vec<(usize, Result<Trajectory>)> = pool.install(|| {
            sets.par_iter()
                .enumerate()
                .map(|(index, elements)| {
                    cancel.check()?;
                    let result = self.propagate_object(elements, index);
                    progress.inc(1);
                    Ok((index, result))
                })
                .collect::<Result<Vec<_>>>()
        })?;

        let mut set = TrajectorySet::new();
        let mut dropped = 0;
        for (index, result) in results {
            match result {
                Ok(trajectory) => set.insert(trajectory),
                Err(e) => {
                    log::error!("[{}] propagation failed: {}", sets[index].name, e);
                    dropped += 1;
                }
            }
        }

        if set.is_empty() {
            return Err(EngineError::NoElementSets {
                source_name: format!("propagation output ({} objects dropped)", dropped),
            });
        }

        log::info!(
            "Propagated {} objects ({} dropped)",
            set.len(),
            dropped
        );
        Ok(set)
    }
}
