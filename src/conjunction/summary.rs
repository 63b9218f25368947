//! JSON summary of a detection run

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::detector::{DetectionConfig, DetectionOutcome};
use super::risk::RiskTier;
use crate::error::Result;

pub const SUMMARY_FILE: &str = "summary.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionParams {
    pub threshold_km: f64,
    pub neighbors: usize,
    pub tolerance_ms: i64,
}

impl From<&DetectionConfig> for DetectionParams {
    fn from(config: &DetectionConfig) -> Self {
        Self {
            threshold_km: config.threshold_km,
            neighbors: config.neighbors,
            tolerance_ms: config.tolerance.num_milliseconds(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub generated_at: String,
    pub params: DetectionParams,
    pub primary_objects: usize,
    pub hazard_objects: usize,
    pub ticks_total: usize,
    pub ticks_skipped: usize,
    pub total_events: usize,
    pub events_by_tier: BTreeMap<RiskTier, usize>,
    /// Present only when intervals were merged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intervals: Option<usize>,
}

impl RunSummary {
    pub fn new(
        config: &DetectionConfig,
        outcome: &DetectionOutcome,
        primary_objects: usize,
        hazard_objects: usize,
    ) -> Self {
        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            params: config.into(),
            primary_objects,
            hazard_objects,
            ticks_total: outcome.ticks_total,
            ticks_skipped: outcome.ticks_skipped,
            total_events: outcome.catalog.len(),
            events_by_tier: outcome.catalog.counts(),
            intervals: None,
        }
    }

    pub fn with_intervals(mut self, count: usize) -> Self {
        self.intervals = Some(count);
        self
    }
}

/// Write `summary.json` into `dir`
pub fn write_summary(dir: impl AsRef<Path>, summary: &RunSummary) -> Result<PathBuf> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let path = dir.join(SUMMARY_FILE);
    let file = std::fs::File::create(&path)?;
    serde_json::to_writer_pretty(file, summary)?;

    log::info!("Wrote run summary to {:?}", path);
    Ok(path)
}
