//! conjscreen - batch conjunction screening
//!
//! Propagates two-line element sets into fixed-cadence trajectories and
//! screens a primary population (tracked satellites) against a hazard
//! population (debris and other objects) for close approaches, one tick at a
//! time.
//!
//! # Pipeline
//!
//! ```ignore
//! use conjscreen::prelude::*;
//!
//! let sets = load_element_sets("data/eu_sats.tle")?;
//! let propagator = Propagator::new(Sgp4Model, PropagationConfig::default())?;
//! let primary = propagator.propagate_all(&sets, &CancellationToken::new(), &ProgressBar::hidden())?;
//!
//! let detector = ConjunctionDetector::new(DetectionConfig::new(chrono::Duration::milliseconds(1)))?;
//! let outcome = detector.detect(&primary, &hazard, &CancellationToken::new(), &ProgressBar::hidden())?;
//! outcome.catalog.write_tier_files("out/conjunction_events")?;
//! ```

pub mod conjunction;
pub mod data;
pub mod error;
pub mod propagation;
pub mod runtime;

pub use error::{EngineError, Result};

/// Commonly used types, re-exported in one place
pub mod prelude {
    pub use crate::conjunction::{
        classify, merge_intervals, ConjunctionDetector, ConjunctionEvent, ConjunctionInterval,
        DetectionConfig, DetectionOutcome, EventCatalog, EventSink, RiskTier,
    };
    pub use crate::data::{
        load_element_sets, load_trajectory_dir, parse_element_sets, OrbitalElementSet,
        StateVector, Trajectory, TrajectorySet,
    };
    pub use crate::error::{EngineError, Result};
    pub use crate::propagation::{
        MonteCarloConfig, OrbitModel, PropagationConfig, Propagator, Sgp4Model,
    };
    pub use crate::runtime::CancellationToken;
    pub use indicatif::ProgressBar;
}
