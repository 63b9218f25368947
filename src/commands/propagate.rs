use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use conjscreen::data::{load_element_sets, select_element_sets, write_trajectory_set};
use conjscreen::propagation::{MonteCarloConfig, PropagationConfig, Propagator, Sgp4Model};
use conjscreen::runtime::CancellationToken;
use conjscreen::EngineError;

use super::progress_bar;

#[derive(Args, Debug, Clone)]
pub struct PropagateArgs {
    /// Element-set file (two- or three-line format, optionally .gz)
    #[arg(long)]
    pub tle: PathBuf,
    /// Directory for per-object trajectory CSV files
    #[arg(long)]
    pub output: PathBuf,
    /// Propagation horizon in minutes from each object's epoch
    #[arg(long, default_value_t = 1440.0)]
    pub duration_min: f64,
    /// Step size in seconds
    #[arg(long, default_value_t = 60.0)]
    pub step_sec: f64,
    /// Propagate at most this many objects
    #[arg(long)]
    pub limit: Option<usize>,
    /// Keep only objects whose name contains this text (case-insensitive)
    #[arg(long)]
    pub filter: Option<String>,
    /// Monte-Carlo runs per object; plain SGP4 output when absent
    #[arg(long)]
    pub monte_carlo: Option<usize>,
    /// Position noise standard deviation (km)
    #[arg(long, default_value_t = 0.1)]
    pub sigma_pos: f64,
    /// Velocity noise standard deviation (km/s)
    #[arg(long, default_value_t = 0.0001)]
    pub sigma_vel: f64,
    /// Base RNG seed for Monte-Carlo runs
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
    /// Worker threads, 0 = one per core
    #[arg(long, default_value_t = 0)]
    pub workers: usize,
}

impl PropagateArgs {
    fn config(&self) -> PropagationConfig {
        let config = PropagationConfig {
            duration_seconds: self.duration_min * 60.0,
            step_seconds: self.step_sec,
            monte_carlo: None,
            workers: self.workers,
        };
        match self.monte_carlo {
            Some(runs) => config.with_monte_carlo(MonteCarloConfig {
                runs,
                sigma_position_km: self.sigma_pos,
                sigma_velocity_km_s: self.sigma_vel,
                seed: self.seed,
            }),
            None => config,
        }
    }
}

pub fn run_propagate(args: PropagateArgs) -> Result<()> {
    let propagator = Propagator::new(Sgp4Model, args.config()).context("invalid propagation settings")?;

    let sets = load_element_sets(&args.tle)
        .with_context(|| format!("failed to load element sets from {:?}", args.tle))?;
    let sets = select_element_sets(sets, args.filter.as_deref(), args.limit);
    if sets.is_empty() {
        return Err(EngineError::NoElementSets {
            source_name: args.tle.display().to_string(),
        }
        .into());
    }

    let progress = progress_bar(sets.len() as u64)?;
    let trajectories = propagator.propagate_all(&sets, &CancellationToken::new(), &progress)?;
    progress.finish_and_clear();

    write_trajectory_set(&args.output, &trajectories)
        .with_context(|| format!("failed to write trajectories to {:?}", args.output))?;
    Ok(())
}
