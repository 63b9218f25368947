//! Conjunction events and their CSV row form

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::risk::{classify, RiskTier};
use crate::data::{format_timestamp, StateVector};

/// One close approach between a primary and a hazard object at one tick.
///
/// Created only through [`ConjunctionEvent::new`], which classifies the
/// miss distance and refuses non-reportable approaches.
#[derive(Debug, Clone, PartialEq)]
pub struct ConjunctionEvent {
    timestamp: DateTime<Utc>,
    primary: String,
    hazard: String,
    primary_state: StateVector,
    hazard_state: StateVector,
    miss_distance_km: f64,
    relative_velocity_km_s: f64,
    risk: RiskTier,
}

impl ConjunctionEvent {
    /// Build an event from two aligned states, or `None` if the miss
    /// distance is not reportable.
    pub fn new(
        timestamp: DateTime<Utc>,
        primary: &str,
        hazard: &str,
        primary_state: StateVector,
        hazard_state: StateVector,
    ) -> Option<Self> {
        let miss_distance_km = (primary_state.position_km() - hazard_state.position_km()).norm();
        let risk = classify(miss_distance_km)?;
        let relative_velocity_km_s =
            (primary_state.velocity_km_s() - hazard_state.velocity_km_s()).norm();

        Some(Self {
            timestamp,
            primary: primary.to_string(),
            hazard: hazard.to_string(),
            primary_state,
            hazard_state,
            miss_distance_km,
            relative_velocity_km_s,
            risk,
        })
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn primary(&self) -> &str {
        &self.primary
    }

    pub fn hazard(&self) -> &str {
        &self.hazard
    }

    pub fn primary_state(&self) -> &StateVector {
        &self.primary_state
    }

    pub fn hazard_state(&self) -> &StateVector {
        &self.hazard_state
    }

    pub fn miss_distance_km(&self) -> f64 {
        self.miss_distance_km
    }

    pub fn relative_velocity_km_s(&self) -> f64 {
        self.relative_velocity_km_s
    }

    pub fn risk(&self) -> RiskTier {
        self.risk
    }

    /// Canonical order: primary name, hazard name, timestamp
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.primary
            .cmp(&other.primary)
            .then_with(|| self.hazard.cmp(&other.hazard))
            .then_with(|| self.timestamp.cmp(&other.timestamp))
    }

    pub(crate) fn to_row(&self) -> EventRow<'_> {
        let p1 = self.primary_state.position_km();
        let v1 = self.primary_state.velocity_km_s();
        let p2 = self.hazard_state.position_km();
        let v2 = self.hazard_state.velocity_km_s();
        EventRow {
            timestamp: format_timestamp(&self.timestamp),
            satellite_1: &self.primary,
            satellite_2: &self.hazard,
            x1_km: p1.x,
            y1_km: p1.y,
            z1_km: p1.z,
            vx1_km_s: v1.x,
            vy1_km_s: v1.y,
            vz1_km_s: v1.z,
            x2_km: p2.x,
            y2_km: p2.y,
            z2_km: p2.z,
            vx2_km_s: v2.x,
            vy2_km_s: v2.y,
            vz2_km_s: v2.z,
            miss_distance_km: round6(self.miss_distance_km),
            relative_velocity_kms: round6(self.relative_velocity_km_s),
            risk_class: self.risk,
        }
    }
}

pub(crate) fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

/// Row of a per-tier event file
#[derive(Debug, Serialize)]
pub(crate) struct EventRow<'a> {
    timestamp: String,
    satellite_1: &'a str,
    satellite_2: &'a str,
    x1_km: f64,
    y1_km: f64,
    z1_km: f64,
    vx1_km_s: f64,
    vy1_km_s: f64,
    vz1_km_s: f64,
    x2_km: f64,
    y2_km: f64,
    z2_km: f64,
    vx2_km_s: f64,
    vy2_km_s: f64,
    vz2_km_s: f64,
    miss_distance_km: f64,
    relative_velocity_kms: f64,
    risk_class: RiskTier,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;
    use nalgebra::Vector3;

    fn state(pos: [f64; 3], vel: [f64; 3]) -> StateVector {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        StateVector::new(t, Vector3::from(pos), Vector3::from(vel))
    }

    #[test]
    fn test_event_geometry() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let event = ConjunctionEvent::new(
            t,
            "SAT",
            "DEB",
            state([7000.0, 0.0, 0.0], [0.0, 7.5, 0.0]),
            state([7000.0, 30.0, 40.0], [0.0, -7.5, 0.0]),
        )
        .unwrap();

        assert_abs_diff_eq!(event.miss_distance_km(), 50.0, epsilon = 1e-9);
        assert_abs_diff_eq!(event.relative_velocity_km_s(), 15.0, epsilon = 1e-12);
        assert_eq!(event.risk(), RiskTier::High);
    }

    #[test]
    fn test_unreportable_distance_yields_no_event() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let far = ConjunctionEvent::new(
            t,
            "SAT",
            "DEB",
            state([7000.0, 0.0, 0.0], [0.0, 7.5, 0.0]),
            state([7000.0, 600.0, 0.0], [0.0, 7.5, 0.0]),
        );
        assert!(far.is_none());

        let invalid = ConjunctionEvent::new(
            t,
            "SAT",
            "DEB",
            state([7000.0, 0.0, 0.0], [0.0, 7.5, 0.0]),
            StateVector::invalid(t),
        );
        assert!(invalid.is_none());
    }

    #[test]
    fn test_round6() {
        assert_eq!(round6(0.0500000001), 0.05);
        assert_eq!(round6(123.4567894), 123.456789);
    }
}
