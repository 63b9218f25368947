//! Loading trajectory directories written by the propagate stage

use std::path::{Path, PathBuf};

use super::trajectory::TrajectorySet;
use super::trajectory_file::read_trajectory_file;
use crate::error::{EngineError, Result};

/// List the `.csv` files of a directory in name order
fn csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|source| EngineError::Read {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "csv") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Load every trajectory file in `dir`, keeping at most `limit` of them.
///
/// Unreadable or malformed files are logged and skipped. An empty result is
/// returned as `Ok`; the detector decides whether that is fatal.
pub fn load_trajectory_dir(dir: impl AsRef<Path>, limit: Option<usize>) -> Result<TrajectorySet> {
    let dir = dir.as_ref();
    log::info!("Loading trajectories from {:?}", dir);

    let mut set = TrajectorySet::new();
    let mut skipped = 0;
    for path in csv_files(dir)? {
        if limit.is_some_and(|limit| set.len() >= limit) {
            break;
        }
        match read_trajectory_file(&path) {
            Ok(trajectory) if trajectory.is_empty() => {
                log::warn!("Skipping {:?}: no rows", path);
                skipped += 1;
            }
            Ok(trajectory) => set.insert(trajectory),
            Err(e) => {
                log::warn!("Skipping {:?}: {}", path, e);
                skipped += 1;
            }
        }
    }

    log::info!(
        "Loaded {} trajectories from {:?} ({} files skipped)",
        set.len(),
        dir,
        skipped
    );
    Ok(set)
}

/// Write every trajectory of a set into `dir`
pub fn write_trajectory_set(dir: impl AsRef<Path>, set: &TrajectorySet) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let paths = set
        .iter()
        .map(|trajectory| super::trajectory_file::write_trajectory_file(dir, trajectory))
        .collect::<Result<Vec<_>>>()?;
    log::info!("Saved {} trajectory files to {:?}", paths.len(), dir);
    Ok(paths)
}
