//! Subcommands of the `conjscreen` binary

mod detect;
mod propagate;

pub use detect::{run_detect, DetectArgs};
pub use propagate::{run_propagate, PropagateArgs};

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

fn progress_bar(len: u64) -> Result<ProgressBar> {
    let progress = ProgressBar::new(len);
    progress.set_style(
        ProgressStyle::with_template(
            "{elapsed_precise} {bar:40.cyan/blue} {pos}/{len} {percent}% ETA {eta_precise}",
        )?
        .progress_chars("##-"),
    );
    Ok(progress)
}
