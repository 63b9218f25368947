use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::Duration;
use clap::Args;

use conjscreen::conjunction::{
    merge_intervals, write_intervals, write_summary, ConjunctionDetector, DetectionConfig,
    RunSummary, INTERVALS_FILE,
};
use conjscreen::data::load_trajectory_dir;
use conjscreen::runtime::CancellationToken;

use super::progress_bar;

#[derive(Args, Debug, Clone)]
pub struct DetectArgs {
    /// Directory of primary (satellite) trajectory files
    #[arg(long)]
    pub primary: PathBuf,
    /// Directory of hazard (debris) trajectory files
    #[arg(long)]
    pub hazard: PathBuf,
    /// Directory for event files and the run summary
    #[arg(long, default_value = "out/conjunction_events")]
    pub output: PathBuf,
    /// Load at most this many primary trajectories
    #[arg(long, default_value_t = 10)]
    pub max_primary: usize,
    /// Load at most this many hazard trajectories
    #[arg(long, default_value_t = 100)]
    pub max_hazard: usize,
    /// Neighbour distance threshold in kilometers
    #[arg(long, default_value_t = 200.0)]
    pub threshold_km: f64,
    /// Nearest hazard objects checked per primary state
    #[arg(long, default_value_t = 5)]
    pub neighbors: usize,
    /// Largest timestamp offset treated as simultaneous, in milliseconds
    #[arg(long)]
    pub tolerance_ms: i64,
    /// Also write per-pair conjunction intervals
    #[arg(long)]
    pub merge_intervals: bool,
    /// Largest gap inside one interval in seconds; defaults to one step plus the tolerance
    #[arg(long, requires = "merge_intervals")]
    pub merge_gap_sec: Option<f64>,
    /// Worker threads, 0 = one per core
    #[arg(long, default_value_t = 0)]
    pub workers: usize,
}

impl DetectArgs {
    fn config(&self) -> Result<DetectionConfig> {
        let tolerance = Duration::try_milliseconds(self.tolerance_ms)
            .ok_or_else(|| anyhow!("tolerance-ms {} is out of range", self.tolerance_ms))?;
        Ok(DetectionConfig::new(tolerance)
            .with_threshold_km(self.threshold_km)
            .with_neighbors(self.neighbors)
            .with_workers(self.workers))
    }

    /// Interval gap from `--merge-gap-sec`, else one tick spacing plus the tolerance
    fn merge_gap(&self, tick_spacing: Option<Duration>, tolerance: Duration) -> Result<Duration> {
        let Some(seconds) = self.merge_gap_sec else {
            return Ok(tick_spacing.unwrap_or_else(Duration::zero) + tolerance);
        };
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(anyhow!("merge-gap-sec must be a non-negative number, got {}", seconds));
        }
        let millis = (seconds * 1000.0).round();
        if millis >= i64::MAX as f64 {
            return Err(anyhow!("merge-gap-sec {} is out of range", seconds));
        }
        Duration::try_milliseconds(millis as i64)
            .ok_or_else(|| anyhow!("merge-gap-sec {} is out of range", seconds))
    }
}

pub fn run_detect(args: DetectArgs) -> Result<()> {
    let config = args.config()?;
    let detector = ConjunctionDetector::new(config.clone()).context("invalid detection settings")?;

    let primary = load_trajectory_dir(&args.primary, Some(args.max_primary))
        .with_context(|| format!("failed to load primary trajectories from {:?}", args.primary))?;
    let hazard = load_trajectory_dir(&args.hazard, Some(args.max_hazard))
        .with_context(|| format!("failed to load hazard trajectories from {:?}", args.hazard))?;

    let progress = progress_bar(0)?;
    let outcome = detector.detect(&primary, &hazard, &CancellationToken::new(), &progress)?;
    progress.finish_and_clear();

    outcome
        .catalog
        .write_tier_files(&args.output)
        .with_context(|| format!("failed to write event files to {:?}", args.output))?;

    let mut summary = RunSummary::new(&config, &outcome, primary.len(), hazard.len());

    if args.merge_intervals {
        let gap = args.merge_gap(outcome.tick_spacing, config.tolerance)?;
        let intervals = merge_intervals(outcome.catalog.events(), gap);
        write_intervals(args.output.join(INTERVALS_FILE), &intervals)
            .context("failed to write conjunction intervals")?;
        summary = summary.with_intervals(intervals.len());
    }

    write_summary(&args.output, &summary).context("failed to write run summary")?;

    for (tier, count) in &summary.events_by_tier {
        log::info!("  {:<10} {}", tier.label(), count);
    }
    Ok(())
}
