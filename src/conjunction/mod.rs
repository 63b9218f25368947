//! Conjunction screening
//!
//! For every primary tick, hazard states aligned to that tick are indexed in
//! a [`KdTree`] and each primary state queries its nearest hazard neighbours.
//! Approaches inside the distance threshold are classified into a
//! [`RiskTier`] and collected in an [`EventSink`]; the finished
//! [`EventCatalog`] is canonically ordered and writes one CSV per tier.
//!
//! Merging per-tick events into [`ConjunctionInterval`]s is a separate step
//! run on a finished catalog.

mod detector;
mod event;
mod intervals;
mod risk;
mod sink;
mod spatial;
mod summary;

pub use detector::{ConjunctionDetector, DetectionConfig, DetectionOutcome};
pub use event::ConjunctionEvent;
pub use intervals::{merge_intervals, write_intervals, ConjunctionInterval, INTERVALS_FILE};
pub use risk::{classify, RiskTier};
pub use sink::{EventCatalog, EventSink};
pub use spatial::{nearest_brute_force, KdTree, Neighbor};
pub use summary::{write_summary, DetectionParams, RunSummary, SUMMARY_FILE};
