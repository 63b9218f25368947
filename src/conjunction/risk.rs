//! Miss-distance risk tiers

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity of a close approach, tightest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskTier {
    High,
    Moderate,
    Low,
    Negligible,
}

impl RiskTier {
    pub const ALL: [RiskTier; 4] = [
        RiskTier::High,
        RiskTier::Moderate,
        RiskTier::Low,
        RiskTier::Negligible,
    ];

    /// Largest miss distance (km, inclusive) that still falls in this tier
    pub fn upper_bound_km(&self) -> f64 {
        match self {
            Self::High => 60.0,
            Self::Moderate => 100.0,
            Self::Low => 200.0,
            Self::Negligible => 500.0,
        }
    }

    /// Upper-case label used in event files
    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Moderate => "MODERATE",
            Self::Low => "LOW",
            Self::Negligible => "NEGLIGIBLE",
        }
    }

    /// File name of this tier's event file
    pub fn file_name(&self) -> String {
        format!("{}_risk_intervals.csv", self.label().to_lowercase())
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify a miss distance.
///
/// Each bound belongs to the tighter tier. Distances beyond the last tier,
/// negative distances and NaN are not reportable.
pub fn classify(miss_distance_km: f64) -> Option<RiskTier> {
    if !(miss_distance_km >= 0.0) {
        return None;
    }
    RiskTier::ALL
        .into_iter()
        .find(|tier| miss_distance_km <= tier.upper_bound_km())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries_are_inclusive() {
        assert_eq!(classify(0.0), Some(RiskTier::High));
        assert_eq!(classify(60.0), Some(RiskTier::High));
        assert_eq!(classify(60.000001), Some(RiskTier::Moderate));
        assert_eq!(classify(100.0), Some(RiskTier::Moderate));
        assert_eq!(classify(150.0), Some(RiskTier::Low));
        assert_eq!(classify(200.0), Some(RiskTier::Low));
        assert_eq!(classify(500.0), Some(RiskTier::Negligible));
        assert_eq!(classify(500.1), None);
    }

    #[test]
    fn test_rejects_nonsense() {
        assert_eq!(classify(-0.001), None);
        assert_eq!(classify(f64::NAN), None);
        assert_eq!(classify(f64::INFINITY), None);
        assert_eq!(classify(f64::NEG_INFINITY), None);
    }

    #[test]
    fn test_tier_order_and_labels() {
        assert!(RiskTier::High < RiskTier::Moderate);
        assert!(RiskTier::Low < RiskTier::Negligible);
        assert_eq!(RiskTier::Moderate.to_string(), "MODERATE");
        assert_eq!(RiskTier::High.file_name(), "high_risk_intervals.csv");
    }
}
