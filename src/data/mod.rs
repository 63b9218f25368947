//! Element sets, trajectories and their on-disk formats

mod elements;
mod loader;
mod trajectory;
mod trajectory_file;

pub use elements::{
    load_element_sets, parse_element_sets, select_element_sets, ElementError, OrbitalElementSet,
};
pub use loader::{load_trajectory_dir, write_trajectory_set};
pub use trajectory::{canonical_name, StateVector, Trajectory, TrajectorySet};
pub use trajectory_file::{
    format_timestamp, parse_timestamp, read_trajectory_file, safe_filename, write_trajectory_file,
};
