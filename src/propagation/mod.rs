//! Orbital propagation
//!
//! Turns element sets into fixed-cadence trajectories. The physics lives
//! behind the [`OrbitModel`] trait: [`Sgp4Model`] wraps satkit's SGP4 for
//! production runs, and any deterministic stand-in can be used in tests.
//!
//! Each object is propagated from its own epoch, so two populations only
//! line up in time if their epochs do.
//!
//! # Example
//!
//! ```ignore
//! use conjscreen::propagation::*;
//!
//! let config = PropagationConfig::default().with_monte_carlo(MonteCarloConfig {
//!     runs: 500,
//!     ..Default::default()
//! });
//! let propagator = Propagator::new(Sgp4Model, config)?;
//! let trajectory = propagator.propagate_object(&elements, 0)?;
//! ```

mod model;
mod monte_carlo;
mod propagator;

pub use model::{ModelError, ModelState, OrbitModel, Sgp4Model, STATUS_OK};
pub use monte_carlo::{disperse, MonteCarloConfig};
pub use propagator::{PropagationConfig, Propagator};
