//! End-to-end run through the public API: propagate, persist, reload, detect.

use chrono::{DateTime, Duration, Utc};
use conjscreen::conjunction::{
    merge_intervals, write_summary, RunSummary, SUMMARY_FILE,
};
use conjscreen::data::{load_trajectory_dir, write_trajectory_set};
use conjscreen::prelude::*;
use conjscreen::propagation::{ModelError, ModelState};
use nalgebra::Vector3;

const L1: &str = "1 25544U 98067A   24001.50000000  .00016717  00000-0  10270-3 0  9005";
const L2: &str = "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";

/// Objects move along +y at 7.5 km/s from a per-name starting point
struct CannedModel;

impl OrbitModel for CannedModel {
    type Orbit = (Vector3<f64>, DateTime<Utc>);

    fn load(&self, elements: &OrbitalElementSet) -> Result<Self::Orbit, ModelError> {
        let start = match elements.name.as_str() {
            "SAT ALPHA" => Vector3::new(7000.0, 0.0, 0.0),
            "DEB CLOSE" => Vector3::new(7000.0, 0.0, 0.05),
            "DEB NEAR" => Vector3::new(7000.0, 0.0, 80.0),
            "DEB FAR" => Vector3::new(7000.0, 0.0, 1000.0),
            other => {
                return Err(ModelError::InvalidElements {
                    name: other.to_string(),
                    reason: "unknown object".into(),
                })
            }
        };
        Ok((start, elements.epoch))
    }

    fn state_at(
        &self,
        orbit: &Self::Orbit,
        time: &DateTime<Utc>,
    ) -> Result<ModelState, ModelError> {
        let dt = (*time - orbit.1).num_milliseconds() as f64 / 1000.0;
        let velocity = Vector3::new(0.0, 7.5, 0.0);
        Ok(ModelState::ok(orbit.0 + velocity * dt, velocity))
    }

    fn name(&self) -> &'static str {
        "canned"
    }
}

fn propagate(names: &[&str]) -> TrajectorySet {
    let sets: Vec<OrbitalElementSet> = names
        .iter()
        .map(|name| OrbitalElementSet::new(*name, L1, L2).unwrap())
        .collect();
    let config = PropagationConfig {
        duration_seconds: 600.0,
        step_seconds: 60.0,
        monte_carlo: None,
        workers: 2,
    };
    Propagator::new(CannedModel, config)
        .unwrap()
        .propagate_all(&sets, &CancellationToken::new(), &ProgressBar::hidden())
        .unwrap()
}

#[test]
fn test_propagate_persist_detect() {
    let work = tempfile::tempdir().unwrap();
    let primary_dir = work.path().join("primary");
    let hazard_dir = work.path().join("hazard");
    let out_dir = work.path().join("events");

    write_trajectory_set(&primary_dir, &propagate(&["SAT ALPHA"])).unwrap();
    write_trajectory_set(&hazard_dir, &propagate(&["DEB CLOSE", "DEB NEAR", "DEB FAR", "UNKNOWN"]))
        .unwrap();

    let primary = load_trajectory_dir(&primary_dir, Some(10)).unwrap();
    let hazard = load_trajectory_dir(&hazard_dir, Some(100)).unwrap();
    assert_eq!(primary.len(), 1);
    assert_eq!(hazard.len(), 3);

    let config = DetectionConfig::new(Duration::milliseconds(1));
    let detector = ConjunctionDetector::new(config.clone()).unwrap();
    let outcome = detector
        .detect(&primary, &hazard, &CancellationToken::new(), &ProgressBar::hidden())
        .unwrap();

    assert_eq!(outcome.ticks_total, 10);
    assert_eq!(outcome.ticks_skipped, 0);

    let counts = outcome.catalog.counts();
    assert_eq!(counts[&RiskTier::High], 10);
    assert_eq!(counts[&RiskTier::Moderate], 10);
    assert_eq!(counts[&RiskTier::Low], 0);
    assert!(outcome.catalog.events().iter().all(|e| e.hazard() != "DEB FAR"));
    for event in outcome.catalog.tier(RiskTier::High) {
        assert_eq!(event.hazard(), "DEB CLOSE");
        assert!((event.miss_distance_km() - 0.05).abs() < 1e-6);
        assert!(event.relative_velocity_km_s().abs() < 1e-9);
    }

    let written = outcome.catalog.write_tier_files(&out_dir).unwrap();
    assert_eq!(written.len(), 2);
    assert!(out_dir.join("high_risk_intervals.csv").exists());
    assert!(out_dir.join("moderate_risk_intervals.csv").exists());
    assert!(!out_dir.join("low_risk_intervals.csv").exists());

    let gap = outcome.tick_spacing.unwrap() + config.tolerance;
    let intervals = merge_intervals(outcome.catalog.events(), gap);
    assert_eq!(intervals.len(), 2);
    assert!(intervals.iter().all(|i| i.sample_count == 10));
    assert_eq!(intervals[0].hazard, "DEB CLOSE");
    assert_eq!(intervals[0].duration(), Duration::minutes(9));

    let summary = RunSummary::new(&config, &outcome, primary.len(), hazard.len())
        .with_intervals(intervals.len());
    write_summary(&out_dir, &summary).unwrap();
    assert!(out_dir.join(SUMMARY_FILE).exists());
}

#[test]
fn test_reloaded_detection_matches_in_memory() {
    let primary = propagate(&["SAT ALPHA"]);
    let hazard = propagate(&["DEB CLOSE", "DEB NEAR"]);

    let work = tempfile::tempdir().unwrap();
    write_trajectory_set(work.path().join("p"), &primary).unwrap();
    write_trajectory_set(work.path().join("h"), &hazard).unwrap();
    let primary_back = load_trajectory_dir(work.path().join("p"), None).unwrap();
    let hazard_back = load_trajectory_dir(work.path().join("h"), None).unwrap();

    let detector = ConjunctionDetector::new(DetectionConfig::new(Duration::milliseconds(1))).unwrap();
    let run = |p: &TrajectorySet, h: &TrajectorySet| {
        detector
            .detect(p, h, &CancellationToken::new(), &ProgressBar::hidden())
            .unwrap()
            .catalog
    };

    assert_eq!(run(&primary, &hazard), run(&primary_back, &hazard_back));
}
