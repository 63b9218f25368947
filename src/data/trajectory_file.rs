//! Per-object trajectory CSV files
//!
//! Row layout:
//! `timestamp, x_km, y_km, z_km, vx_km_s, vy_km_s, vz_km_s, name[, sx_km, sy_km, sz_km]`
//! with the dispersion columns only present for Monte-Carlo output.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use nalgebra::Vector3;
use serde::{Deserialize, Deserializer, Serialize};

use super::trajectory::{canonical_name, StateVector, Trajectory};
use crate::error::{EngineError, Result};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

#[derive(Serialize)]
struct StateRow<'a> {
    timestamp: String,
    x_km: f64,
    y_km: f64,
    z_km: f64,
    vx_km_s: f64,
    vy_km_s: f64,
    vz_km_s: f64,
    name: &'a str,
}

#[derive(Serialize)]
struct DispersedStateRow<'a> {
    timestamp: String,
    x_km: f64,
    y_km: f64,
    z_km: f64,
    vx_km_s: f64,
    vy_km_s: f64,
    vz_km_s: f64,
    name: &'a str,
    sx_km: f64,
    sy_km: f64,
    sz_km: f64,
}

#[derive(Debug, Deserialize)]
struct TrajectoryRow {
    #[serde(deserialize_with = "deserialize_timestamp")]
    timestamp: DateTime<Utc>,
    x_km: f64,
    y_km: f64,
    z_km: f64,
    vx_km_s: f64,
    vy_km_s: f64,
    vz_km_s: f64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    sx_km: Option<f64>,
    #[serde(default)]
    sy_km: Option<f64>,
    #[serde(default)]
    sz_km: Option<f64>,
}

impl TrajectoryRow {
    fn into_state(self) -> StateVector {
        let state = StateVector::new(
            self.timestamp,
            Vector3::new(self.x_km, self.y_km, self.z_km),
            Vector3::new(self.vx_km_s, self.vy_km_s, self.vz_km_s),
        );
        // invalid steps are written with NaN dispersion and carry none
        match (self.sx_km, self.sy_km, self.sz_km) {
            (Some(sx), Some(sy), Some(sz))
                if state.is_valid() && sx.is_finite() && sy.is_finite() && sz.is_finite() =>
            {
                state.with_dispersion(Vector3::new(sx, sy, sz))
            }
            _ => state,
        }
    }
}

/// Parse an ISO-8601 timestamp. Strings without an offset are taken as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

pub fn format_timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp {:?}", raw)))
}

/// File-system safe version of an object name
pub fn safe_filename(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '(' | ')' | '[' | ']'))
        .map(|c| match c {
            ' ' | '-' | '/' => '_',
            other => other,
        })
        .collect()
}

/// Write a trajectory into `dir`, returning the file path.
///
/// Dispersed trajectories get an `_mc` suffix and the extra columns.
pub fn write_trajectory_file(dir: impl AsRef<Path>, trajectory: &Trajectory) -> Result<PathBuf> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let dispersed = trajectory.is_dispersed();
    let suffix = if dispersed { "_mc" } else { "" };
    let path = dir.join(format!("{}{}.csv", safe_filename(trajectory.name()), suffix));

    let mut writer = csv::Writer::from_path(&path)?;
    for state in trajectory.states() {
        let pos = state.position_km();
        let vel = state.velocity_km_s();
        let row = StateRow {
            timestamp: format_timestamp(&state.timestamp()),
            x_km: pos.x,
            y_km: pos.y,
            z_km: pos.z,
            vx_km_s: vel.x,
            vy_km_s: vel.y,
            vz_km_s: vel.z,
            name: trajectory.name(),
        };

        if dispersed {
            let sigma = state
                .dispersion_km()
                .copied()
                .unwrap_or_else(|| Vector3::repeat(f64::NAN));
            writer.serialize(DispersedStateRow {
                timestamp: row.timestamp,
                x_km: row.x_km,
                y_km: row.y_km,
                z_km: row.z_km,
                vx_km_s: row.vx_km_s,
                vy_km_s: row.vy_km_s,
                vz_km_s: row.vz_km_s,
                name: row.name,
                sx_km: sigma.x,
                sy_km: sigma.y,
                sz_km: sigma.z,
            })?;
        } else {
            writer.serialize(row)?;
        }
    }
    writer.flush()?;

    log::debug!("Saved {} states to {:?}", trajectory.len(), path);
    Ok(path)
}

/// Read a trajectory file. Any row that does not match the schema fails
/// the whole file with [`EngineError::TrajectoryFile`].
pub fn read_trajectory_file(path: impl AsRef<Path>) -> Result<Trajectory> {
    let path = path.as_ref();
    let file_error = |line: u64, reason: String| EngineError::TrajectoryFile {
        path: path.to_path_buf(),
        line,
        reason,
    };

    let mut reader = csv::Reader::from_path(path)?;
    let mut states = Vec::new();
    let mut name: Option<String> = None;

    for record in reader.deserialize::<TrajectoryRow>() {
        let mut row = record.map_err(|e| {
            let line = e.position().map(|p| p.line()).unwrap_or(0);
            file_error(line, e.to_string())
        })?;

        if name.is_none() {
            name = row.name.take().filter(|n| !n.trim().is_empty());
        }
        states.push(row.into_state());
    }

    let name = match name {
        Some(n) => n,
        None => name_from_stem(path).ok_or_else(|| file_error(0, "no object name".into()))?,
    };

    Ok(Trajectory::new(&name, states))
}

/// Recover an object name from a file stem like `COSMOS_2251_DEB_mc`
fn name_from_stem(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let stem = stem.strip_suffix("_mc").unwrap_or(stem);
    let name = canonical_name(stem);
    (!name.is_empty()).then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::Duration;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 14, 6, 30, 0).unwrap()
            + Duration::microseconds(123_456)
    }

    fn build(dispersed: bool) -> Trajectory {
        let states = (0..5)
            .map(|i| {
                let t = t0() + Duration::seconds(60 * i);
                if i == 2 {
                    return StateVector::invalid(t);
                }
                let s = StateVector::new(
                    t,
                    Vector3::new(6778.137 + i as f64 * 0.1, -12.000001, 0.333333333),
                    Vector3::new(0.001, 7.668558, -0.000042),
                );
                if dispersed {
                    s.with_dispersion(Vector3::new(0.1, 0.2, 0.3))
                } else {
                    s
                }
            })
            .collect();
        Trajectory::new("Cosmos 2251 Deb", states)
    }

    fn assert_same(a: &Trajectory, b: &Trajectory) {
        assert_eq!(a.name(), b.name());
        assert_eq!(a.len(), b.len());
        for (x, y) in a.states().iter().zip(b.states()) {
            assert_eq!(x.timestamp(), y.timestamp());
            assert_eq!(x.is_valid(), y.is_valid());
            assert_eq!(x.dispersion_km(), y.dispersion_km());
            if x.is_valid() {
                for axis in 0..3 {
                    assert_abs_diff_eq!(x.position_km()[axis], y.position_km()[axis], epsilon = 1e-9);
                    assert_abs_diff_eq!(x.velocity_km_s()[axis], y.velocity_km_s()[axis], epsilon = 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_round_trip_standard() {
        let dir = tempfile::tempdir().unwrap();
        let original = build(false);
        let path = write_trajectory_file(dir.path(), &original).unwrap();
        assert_eq!(path.file_name().unwrap(), "COSMOS_2251_DEB.csv");

        let header = std::fs::read_to_string(&path).unwrap();
        assert!(header.starts_with("timestamp,x_km,y_km,z_km,vx_km_s,vy_km_s,vz_km_s,name\n"));

        let restored = read_trajectory_file(&path).unwrap();
        assert_same(&original, &restored);
        assert!(!restored.is_dispersed());
    }

    #[test]
    fn test_round_trip_dispersed() {
        let dir = tempfile::tempdir().unwrap();
        let original = build(true);
        let path = write_trajectory_file(dir.path(), &original).unwrap();
        assert_eq!(path.file_name().unwrap(), "COSMOS_2251_DEB_mc.csv");

        let restored = read_trajectory_file(&path).unwrap();
        assert_same(&original, &restored);
        assert!(restored.is_dispersed());
        assert_eq!(
            restored.states()[0].dispersion_km(),
            Some(&Vector3::new(0.1, 0.2, 0.3))
        );
    }

    #[test]
    fn test_missing_column_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.csv");
        std::fs::write(
            &path,
            "timestamp,x_km,y_km,vx_km_s,vy_km_s,vz_km_s,name\n2024-01-01T00:00:00,1,2,3,4,5,X\n",
        )
        .unwrap();

        let err = read_trajectory_file(&path).unwrap_err();
        assert!(matches!(err, EngineError::TrajectoryFile { .. }), "{err}");
    }

    #[test]
    fn test_naive_timestamps_and_stem_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("FENGYUN_1C_DEB_mc.csv");
        std::fs::write(
            &path,
            "timestamp,x_km,y_km,z_km,vx_km_s,vy_km_s,vz_km_s\n\
             2024-01-01T00:00:00.500000,7000,0,0,0,7.5,0\n\
             2024-01-01 00:01:00,7000,1,0,0,7.5,0\n",
        )
        .unwrap();

        let traj = read_trajectory_file(&path).unwrap();
        assert_eq!(traj.name(), "FENGYUN 1C DEB");
        assert_eq!(traj.len(), 2);
        assert_eq!(
            traj.states()[0].timestamp(),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::milliseconds(500)
        );
    }

    #[test]
    fn test_safe_filename() {
        assert_eq!(safe_filename("ISS (ZARYA)"), "ISS_ZARYA");
        assert_eq!(safe_filename("SL-16 R/B [X]"), "SL_16_R_B_X");
    }
}
