//! Tick-by-tick screening of a primary population against a hazard population

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Duration, Utc};
use indicatif::ProgressBar;
use nalgebra::Vector3;
use rayon::prelude::*;

use super::event::ConjunctionEvent;
use super::sink::{EventCatalog, EventSink};
use super::spatial::KdTree;
use crate::data::{StateVector, TrajectorySet};
use crate::error::{EngineError, Result};
use crate::runtime::{worker_pool, CancellationToken};

/// Detection settings
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionConfig {
    /// Neighbours farther than this are not considered (km, inclusive)
    pub threshold_km: f64,

    /// Hazard neighbours queried per primary state
    pub neighbors: usize,

    /// Maximum timestamp offset for two samples to count as simultaneous
    pub tolerance: Duration,

    /// Worker threads, 0 = one per core
    pub workers: usize,
}

impl DetectionConfig {
    /// Default threshold and neighbour count with an explicit alignment tolerance
    pub fn new(tolerance: Duration) -> Self {
        Self {
            threshold_km: 200.0,
            neighbors: 5,
            tolerance,
            workers: 0,
        }
    }

    pub fn with_threshold_km(mut self, threshold_km: f64) -> Self {
        self.threshold_km = threshold_km;
        self
    }

    pub fn with_neighbors(mut self, neighbors: usize) -> Self {
        self.neighbors = neighbors;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.threshold_km.is_finite() || self.threshold_km < 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "threshold must be a non-negative distance, got {} km",
                self.threshold_km
            )));
        }
        if self.neighbors == 0 {
            return Err(EngineError::InvalidConfig(
                "neighbour count must be at least 1".into(),
            ));
        }
        if self.tolerance < Duration::zero() {
            return Err(EngineError::InvalidConfig(format!(
                "alignment tolerance must not be negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Result of one detection run
#[derive(Debug, Clone)]
pub struct DetectionOutcome {
    pub catalog: EventCatalog,

    /// Distinct ticks screened
    pub ticks_total: usize,

    /// Ticks with no aligned hazard state
    pub ticks_skipped: usize,

    /// Smallest spacing between consecutive ticks, if there are two or more
    pub tick_spacing: Option<Duration>,
}

pub struct ConjunctionDetector {
    config: DetectionConfig,
}

/// Hazard objects aligned to one tick
struct TickIndex<'a> {
    names: Vec<&'a str>,
    states: Vec<&'a StateVector>,
    positions: Vec<Vector3<f64>>,
}

impl ConjunctionDetector {
    pub fn new(config: DetectionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Screen every primary tick against the hazard population.
    ///
    /// Ticks are independent and run on the worker pool. Events come back in
    /// canonical order whatever the worker count.
    pub fn detect(
        &self,
        primary: &TrajectorySet,
        hazard: &TrajectorySet,
        cancel: &CancellationToken,
        progress: &ProgressBar,
    ) -> Result<DetectionOutcome> {
        if primary.is_empty() {
            return Err(EngineError::EmptyPopulation { population: "primary" });
        }
        if hazard.is_empty() {
            return Err(EngineError::EmptyPopulation { population: "hazard" });
        }

        let ticks = self.ticks(primary);
        log::info!(
            "Screening {} primary against {} hazard objects over {} ticks (threshold {} km, k={})",
            primary.len(),
            hazard.len(),
            ticks.len(),
            self.config.threshold_km,
            self.config.neighbors
        );
        progress.set_length(ticks.len() as u64);

        let sink = EventSink::new();
        let skipped = AtomicUsize::new(0);

        let pool = worker_pool(self.config.workers)?;
        pool.install(|| {
            ticks.par_iter().try_for_each(|&tick| {
                cancel.check()?;
                match self.screen_tick(tick, primary, hazard) {
                    Some(events) => sink.extend(events),
                    None => {
                        skipped.fetch_add(1, Ordering::Relaxed);
                    }
                }
                progress.inc(1);
                Ok::<(), EngineError>(())
            })
        })?;

        let ticks_skipped = skipped.into_inner();
        if ticks_skipped > 0 {
            log::warn!(
                "{} of {} ticks had no aligned hazard state",
                ticks_skipped,
                ticks.len()
            );
        }

        let catalog = sink.finish();
        log::info!("Detected {} conjunction events", catalog.len());

        Ok(DetectionOutcome {
            catalog,
            ticks_total: ticks.len(),
            ticks_skipped,
            tick_spacing: ticks.windows(2).map(|w| w[1] - w[0]).min(),
        })
    }

    /// Distinct primary timestamps, ascending. A timestamp within tolerance
    /// of the last kept tick is folded into it.
    fn ticks(&self, primary: &TrajectorySet) -> Vec<DateTime<Utc>> {
        let mut all: Vec<DateTime<Utc>> = primary
            .iter()
            .flat_map(|t| t.states().iter().map(|s| s.timestamp()))
            .collect();
        all.sort_unstable();

        let mut ticks: Vec<DateTime<Utc>> = Vec::new();
        for time in all {
            match ticks.last() {
                Some(&last) if time - last <= self.config.tolerance => {}
                _ => ticks.push(time),
            }
        }
        ticks
    }

    fn hazard_index<'a>(&self, tick: DateTime<Utc>, hazard: &'a TrajectorySet) -> TickIndex<'a> {
        let mut index = TickIndex {
            names: Vec::with_capacity(hazard.len()),
            states: Vec::with_capacity(hazard.len()),
            positions: Vec::with_capacity(hazard.len()),
        };
        for trajectory in hazard.iter() {
            if let Some(state) = trajectory
                .state_near(tick, self.config.tolerance)
                .filter(|s| s.is_valid())
            {
                index.names.push(trajectory.name());
                index.states.push(state);
                index.positions.push(*state.position_km());
            }
        }
        index
    }

    /// Events for one tick, or `None` when no hazard state lines up with it
    fn screen_tick(
        &self,
        tick: DateTime<Utc>,
        primary: &TrajectorySet,
        hazard: &TrajectorySet,
    ) -> Option<Vec<ConjunctionEvent>> {
        let index = self.hazard_index(tick, hazard);
        if index.positions.is_empty() {
            log::trace!("{}: no aligned hazard states", tick);
            return None;
        }

        let tree = KdTree::build(&index.positions);
        let mut events = Vec::new();

        for trajectory in primary.iter() {
            let Some(state) = trajectory
                .state_near(tick, self.config.tolerance)
                .filter(|s| s.is_valid())
            else {
                continue;
            };

            for neighbor in tree.nearest(state.position_km(), self.config.neighbors) {
                if neighbor.distance > self.config.threshold_km {
                    // sorted closest first
                    break;
                }
                let event = ConjunctionEvent::new(
                    tick,
                    trajectory.name(),
                    index.names[neighbor.index],
                    state.clone(),
                    index.states[neighbor.index].clone(),
                );
                if let Some(event) = event {
                    events.push(event);
                }
            }
        }

        log::debug!(
            "{}: {} hazard states indexed, {} events",
            tick,
            index.positions.len(),
            events.len()
        );
        Some(events)
    }
}
