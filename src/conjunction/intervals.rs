//! Collapse per-tick events into close-approach intervals

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::event::{round6, ConjunctionEvent};
use super::risk::RiskTier;
use crate::data::format_timestamp;
use crate::error::Result;

/// Output file written next to the tier files
pub const INTERVALS_FILE: &str = "conjunction_intervals.csv";

/// A run of events for one (primary, hazard) pair with no gap longer than
/// the merge gap
#[derive(Debug, Clone, PartialEq)]
pub struct ConjunctionInterval {
    pub primary: String,
    pub hazard: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Time of closest approach
    pub tca: DateTime<Utc>,
    pub min_miss_distance_km: f64,
    pub max_relative_velocity_kms: f64,
    /// Tightest tier seen in the interval
    pub tier: RiskTier,
    pub sample_count: usize,
}

impl ConjunctionInterval {
    fn open(event: &ConjunctionEvent) -> Self {
        Self {
            primary: event.primary().to_string(),
            hazard: event.hazard().to_string(),
            start: event.timestamp(),
            end: event.timestamp(),
            tca: event.timestamp(),
            min_miss_distance_km: event.miss_distance_km(),
            max_relative_velocity_kms: event.relative_velocity_km_s(),
            tier: event.risk(),
            sample_count: 1,
        }
    }

    fn accepts(&self, event: &ConjunctionEvent, max_gap: Duration) -> bool {
        self.primary == event.primary()
            && self.hazard == event.hazard()
            && event.timestamp() - self.end <= max_gap
    }

    fn absorb(&mut self, event: &ConjunctionEvent) {
        self.end = event.timestamp();
        if event.miss_distance_km() < self.min_miss_distance_km {
            self.min_miss_distance_km = event.miss_distance_km();
            self.tca = event.timestamp();
        }
        self.max_relative_velocity_kms = self
            .max_relative_velocity_kms
            .max(event.relative_velocity_km_s());
        self.tier = self.tier.min(event.risk());
        self.sample_count += 1;
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Merge events into intervals.
///
/// Events of the same pair whose timestamps are at most `max_gap` apart
/// belong to the same interval. Output is in (primary, hazard, start) order.
pub fn merge_intervals(events: &[ConjunctionEvent], max_gap: Duration) -> Vec<ConjunctionInterval> {
    let mut ordered: Vec<&ConjunctionEvent> = events.iter().collect();
    ordered.sort_by(|a, b| a.canonical_cmp(b));

    let mut intervals: Vec<ConjunctionInterval> = Vec::new();
    for event in ordered {
        match intervals.last_mut() {
            Some(current) if current.accepts(event, max_gap) => current.absorb(event),
            _ => intervals.push(ConjunctionInterval::open(event)),
        }
    }

    log::debug!(
        "Merged {} events into {} intervals (gap {})",
        events.len(),
        intervals.len(),
        max_gap
    );
    intervals
}

#[derive(Debug, Serialize)]
struct IntervalRow<'a> {
    satellite_1: &'a str,
    satellite_2: &'a str,
    start: String,
    end: String,
    tca: String,
    duration_s: f64,
    min_miss_distance_km: f64,
    max_relative_velocity_kms: f64,
    risk_class: RiskTier,
    sample_count: usize,
}

/// Write intervals as CSV
pub fn write_intervals(path: impl AsRef<Path>, intervals: &[ConjunctionInterval]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)?;
    for interval in intervals {
        writer.serialize(IntervalRow {
            satellite_1: &interval.primary,
            satellite_2: &interval.hazard,
            start: format_timestamp(&interval.start),
            end: format_timestamp(&interval.end),
            tca: format_timestamp(&interval.tca),
            duration_s: interval.duration().num_milliseconds() as f64 / 1000.0,
            min_miss_distance_km: round6(interval.min_miss_distance_km),
            max_relative_velocity_kms: round6(interval.max_relative_velocity_kms),
            risk_class: interval.tier,
            sample_count: interval.sample_count,
        })?;
    }
    writer.flush()?;
    log::info!("Saved {} conjunction intervals to {:?}", intervals.len(), path);
    Ok(())
}
