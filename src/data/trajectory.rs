//! Trajectory store: per-object time series of state vectors

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use nalgebra::Vector3;

/// Normalise an object name for use as a store key.
///
/// Underscores count as whitespace (file stems use them in place of
/// spaces), runs of whitespace collapse to one space, and the result is
/// upper-cased.
pub fn canonical_name(raw: &str) -> String {
    raw.split(|c: char| c.is_whitespace() || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Position/velocity of one object at one instant.
///
/// Position and velocity are valid together or invalid together; an
/// invalid step keeps its timestamp so the series stays fixed-cadence.
#[derive(Debug, Clone, PartialEq)]
pub struct StateVector {
    timestamp: DateTime<Utc>,
    position_km: Vector3<f64>,
    velocity_km_s: Vector3<f64>,
    dispersion_km: Option<Vector3<f64>>,
}

impl StateVector {
    /// Create a state. Any non-finite component invalidates the whole state.
    pub fn new(
        timestamp: DateTime<Utc>,
        position_km: Vector3<f64>,
        velocity_km_s: Vector3<f64>,
    ) -> Self {
        if is_finite(&position_km) && is_finite(&velocity_km_s) {
            Self {
                timestamp,
                position_km,
                velocity_km_s,
                dispersion_km: None,
            }
        } else {
            Self::invalid(timestamp)
        }
    }

    /// A placeholder for a step the model could not produce
    pub fn invalid(timestamp: DateTime<Utc>) -> Self {
        let nan = Vector3::repeat(f64::NAN);
        Self {
            timestamp,
            position_km: nan,
            velocity_km_s: nan,
            dispersion_km: None,
        }
    }

    /// Attach Monte-Carlo position dispersion (per-axis standard deviation, km)
    pub fn with_dispersion(mut self, dispersion_km: Vector3<f64>) -> Self {
        self.dispersion_km = Some(dispersion_km);
        self
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn position_km(&self) -> &Vector3<f64> {
        &self.position_km
    }

    pub fn velocity_km_s(&self) -> &Vector3<f64> {
        &self.velocity_km_s
    }

    pub fn dispersion_km(&self) -> Option<&Vector3<f64>> {
        self.dispersion_km.as_ref()
    }

    pub fn is_valid(&self) -> bool {
        is_finite(&self.position_km)
    }
}

fn is_finite(v: &Vector3<f64>) -> bool {
    v.iter().all(|c| c.is_finite())
}

/// Time-ordered states of a single object
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    name: String,
    states: Vec<StateVector>,
}

impl Trajectory {
    /// Build a trajectory. The name is canonicalised and states are put in
    /// time order if they are not already.
    pub fn new(name: &str, mut states: Vec<StateVector>) -> Self {
        if !states.windows(2).all(|w| w[0].timestamp <= w[1].timestamp) {
            states.sort_by_key(|s| s.timestamp);
        }
        Self {
            name: canonical_name(name),
            states,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn states(&self) -> &[StateVector] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Whether the states carry Monte-Carlo dispersion
    pub fn is_dispersed(&self) -> bool {
        self.states.iter().any(|s| s.dispersion_km.is_some())
    }

    /// The sample closest to `time`, if it lies within `tolerance` of it
    pub fn state_near(&self, time: DateTime<Utc>, tolerance: Duration) -> Option<&StateVector> {
        let idx = self.states.partition_point(|s| s.timestamp < time);

        let after = self.states.get(idx);
        let before = idx.checked_sub(1).and_then(|i| self.states.get(i));

        let closest = match (before, after) {
            (Some(b), Some(a)) => {
                if time - b.timestamp <= a.timestamp - time {
                    b
                } else {
                    a
                }
            }
            (Some(b), None) => b,
            (None, Some(a)) => a,
            (None, None) => return None,
        };

        ((closest.timestamp - time).abs() <= tolerance).then_some(closest)
    }
}

/// Canonical name -> trajectory, kept in insertion order
#[derive(Debug, Clone, Default)]
pub struct TrajectorySet {
    trajectories: Vec<Trajectory>,
    index: HashMap<String, usize>,
}

impl TrajectorySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a trajectory. A name that is already present is replaced in place.
    pub fn insert(&mut self, trajectory: Trajectory) {
        match self.index.get(trajectory.name()) {
            Some(&slot) => {
                log::warn!(
                    "Duplicate trajectory for {}, replacing earlier entry",
                    trajectory.name()
                );
                self.trajectories[slot] = trajectory;
            }
            None => {
                self.index
                    .insert(trajectory.name().to_string(), self.trajectories.len());
                self.trajectories.push(trajectory);
            }
        }
    }

    /// Look up by any spelling that canonicalises to a stored name
    pub fn get(&self, name: &str) -> Option<&Trajectory> {
        self.index
            .get(&canonical_name(name))
            .map(|&slot| &self.trajectories[slot])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trajectory> {
        self.trajectories.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.trajectories.iter().map(|t| t.name())
    }

    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }

    /// Keep only the first `limit` trajectories
    pub fn truncate(&mut self, limit: usize) {
        if limit >= self.trajectories.len() {
            return;
        }
        for dropped in self.trajectories.drain(limit..) {
            self.index.remove(dropped.name());
        }
    }
}

impl FromIterator<Trajectory> for TrajectorySet {
    fn from_iter<T: IntoIterator<Item = Trajectory>>(iter: T) -> Self {
        let mut set = Self::new();
        for trajectory in iter {
            set.insert(trajectory);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn sample(offset_s: i64, x: f64) -> StateVector {
        StateVector::new(
            t0() + Duration::seconds(offset_s),
            Vector3::new(x, 0.0, 0.0),
            Vector3::new(0.0, 7.5, 0.0),
        )
    }

    #[test]
    fn test_canonical_name() {
        assert_eq!(canonical_name("  iss (zarya) "), "ISS (ZARYA)");
        assert_eq!(canonical_name("COSMOS_2251__DEB"), "COSMOS 2251 DEB");
        assert_eq!(canonical_name("a\t b"), "A B");
    }

    #[test]
    fn test_partial_nan_invalidates_whole_state() {
        let s = StateVector::new(
            t0(),
            Vector3::new(7000.0, f64::NAN, 0.0),
            Vector3::new(0.0, 7.5, 0.0),
        );
        assert!(!s.is_valid());
        assert!(s.velocity_km_s().iter().all(|c| c.is_nan()));
        assert_eq!(s.timestamp(), t0());
    }

    #[test]
    fn test_state_near_respects_tolerance() {
        let traj = Trajectory::new("sat", vec![sample(0, 1.0), sample(60, 2.0), sample(120, 3.0)]);
        let tol = Duration::milliseconds(1);

        let hit = traj.state_near(t0() + Duration::seconds(60), tol).unwrap();
        assert_eq!(hit.position_km().x, 2.0);

        let near = t0() + Duration::seconds(60) + Duration::microseconds(500);
        assert_eq!(traj.state_near(near, tol).unwrap().position_km().x, 2.0);

        assert!(traj.state_near(t0() + Duration::seconds(30), tol).is_none());
        assert!(traj.state_near(t0() - Duration::seconds(1), tol).is_none());
        assert!(traj
            .state_near(t0() + Duration::seconds(121), Duration::seconds(2))
            .is_some());
    }

    #[test]
    fn test_unordered_states_are_sorted() {
        let traj = Trajectory::new("sat", vec![sample(120, 3.0), sample(0, 1.0), sample(60, 2.0)]);
        let xs: Vec<f64> = traj.states().iter().map(|s| s.position_km().x).collect();
        assert_eq!(xs, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_set_replaces_duplicates_in_place() {
        let mut set = TrajectorySet::new();
        set.insert(Trajectory::new("alpha", vec![sample(0, 1.0)]));
        set.insert(Trajectory::new("beta", vec![sample(0, 2.0)]));
        set.insert(Trajectory::new("  ALPHA ", vec![sample(0, 9.0), sample(60, 9.0)]));

        assert_eq!(set.len(), 2);
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["ALPHA", "BETA"]);
        assert_eq!(set.get("alpha").unwrap().len(), 2);

        set.truncate(1);
        assert_eq!(set.len(), 1);
        assert!(set.get("beta").is_none());
    }
}
