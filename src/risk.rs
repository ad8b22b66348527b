use serde::Serialize;

const GRADE_WEIGHT: f64 = 0.6;
const ATTENDANCE_WEIGHT: f64 = 0.25;
const COMPLETION_WEIGHT: f64 = 0.15;
const MISSING_PENALTY: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Critical,
    AtRisk,
    NeedsAttention,
    OnTrack,
}

/// Display cut points for a tier: the lowest composite score that still
/// lands in it, and the ungraded fallbacks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TierThresholds {
    pub min_composite: f64,
    pub min_missing: u32,
    pub below_attendance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TierInfo {
    pub key: RiskTier,
    pub label: &'static str,
    pub color: &'static str,
    pub thresholds: TierThresholds,
}

/// Ordered highest risk first.
pub static TIERS: [TierInfo; 4] = [
    TierInfo {
        key: RiskTier::Critical,
        label: "Critical",
        color: "#dc2626",
        thresholds: TierThresholds {
            min_composite: 0.0,
            min_missing: 5,
            below_attendance: 70.0,
        },
    },
    TierInfo {
        key: RiskTier::AtRisk,
        label: "At Risk",
        color: "#ea580c",
        thresholds: TierThresholds {
            min_composite: 65.0,
            min_missing: 3,
            below_attendance: 80.0,
        },
    },
    TierInfo {
        key: RiskTier::NeedsAttention,
        label: "Needs Attention",
        color: "#ca8a04",
        thresholds: TierThresholds {
            min_composite: 75.0,
            min_missing: 1,
            below_attendance: 90.0,
        },
    },
    TierInfo {
        key: RiskTier::OnTrack,
        label: "On Track",
        color: "#16a34a",
        thresholds: TierThresholds {
            min_composite: 85.0,
            min_missing: 0,
            below_attendance: 0.0,
        },
    },
];

impl RiskTier {
    pub fn info(self) -> &'static TierInfo {
        match self {
            RiskTier::Critical => &TIERS[0],
            RiskTier::AtRisk => &TIERS[1],
            RiskTier::NeedsAttention => &TIERS[2],
            RiskTier::OnTrack => &TIERS[3],
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            RiskTier::Critical => "critical",
            RiskTier::AtRisk => "at_risk",
            RiskTier::NeedsAttention => "needs_attention",
            RiskTier::OnTrack => "on_track",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskClassification {
    pub tier: RiskTier,
    pub info: TierInfo,
    /// Present only when a grade was available to score.
    pub composite: Option<f64>,
}

pub fn composite_score(grade: f64, missing_assignments: u32, attendance_rate: f64) -> f64 {
    let completion = (100.0 - MISSING_PENALTY * missing_assignments as f64).max(0.0);
    GRADE_WEIGHT * grade + ATTENDANCE_WEIGHT * attendance_rate + COMPLETION_WEIGHT * completion
}

pub fn classify(
    current_grade: Option<f64>,
    missing_assignments: u32,
    attendance_rate: f64,
) -> RiskClassification {
    let (tier, composite) = match current_grade {
        None => (
            classify_without_grade(missing_assignments, attendance_rate),
            None,
        ),
        Some(grade) => {
            let composite = composite_score(grade, missing_assignments, attendance_rate);
            (tier_for_composite(composite), Some(composite))
        }
    };
    RiskClassification {
        tier,
        info: *tier.info(),
        composite,
    }
}

fn classify_without_grade(missing_assignments: u32, attendance_rate: f64) -> RiskTier {
    TIERS
        .iter()
        .take(3)
        .find(|tier| {
            missing_assignments >= tier.thresholds.min_missing
                || attendance_rate < tier.thresholds.below_attendance
        })
        .map_or(RiskTier::OnTrack, |tier| tier.key)
}

fn tier_for_composite(composite: f64) -> RiskTier {
    TIERS
        .iter()
        .rev()
        .find(|tier| composite >= tier.thresholds.min_composite)
        .map_or(RiskTier::Critical, |tier| tier.key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_work_dominates_without_grades() {
        let result = classify(None, 6, 95.0);
        assert_eq!(result.tier, RiskTier::Critical);
        assert_eq!(result.composite, None);
    }

    #[test]
    fn ungraded_tiers_follow_proxy_thresholds() {
        assert_eq!(classify(None, 0, 65.0).tier, RiskTier::Critical);
        assert_eq!(classify(None, 3, 95.0).tier, RiskTier::AtRisk);
        assert_eq!(classify(None, 0, 79.9).tier, RiskTier::AtRisk);
        assert_eq!(classify(None, 1, 100.0).tier, RiskTier::NeedsAttention);
        assert_eq!(classify(None, 0, 89.0).tier, RiskTier::NeedsAttention);
        assert_eq!(classify(None, 0, 90.0).tier, RiskTier::OnTrack);
    }

    #[test]
    fn strong_student_is_on_track() {
        let result = classify(Some(90.0), 0, 100.0);
        assert!((result.composite.unwrap() - 94.0).abs() < 0.001);
        assert_eq!(result.tier, RiskTier::OnTrack);
        assert_eq!(result.info.label, "On Track");
        assert_eq!(result.tier.key(), "on_track");
    }

    #[test]
    fn composite_cut_points() {
        // 0.6*80 + 0.25*90 + 0.15*85 = 48 + 22.5 + 12.75
        assert_eq!(classify(Some(80.0), 1, 90.0).tier, RiskTier::NeedsAttention);
        // 0.6*70 + 0.25*80 + 0.15*70 = 42 + 20 + 10.5
        assert_eq!(classify(Some(70.0), 2, 80.0).tier, RiskTier::AtRisk);
        assert_eq!(classify(Some(40.0), 8, 60.0).tier, RiskTier::Critical);
    }

    #[test]
    fn ungraded_thresholds_are_inclusive_on_missing_and_strict_on_attendance() {
        assert_eq!(classify(None, 5, 100.0).tier, RiskTier::Critical);
        assert_eq!(classify(None, 4, 100.0).tier, RiskTier::AtRisk);
        assert_eq!(classify(None, 3, 100.0).tier, RiskTier::AtRisk);
        assert_eq!(classify(None, 2, 100.0).tier, RiskTier::NeedsAttention);
        assert_eq!(classify(None, 1, 100.0).tier, RiskTier::NeedsAttention);

        assert_eq!(classify(None, 0, 69.9).tier, RiskTier::Critical);
        assert_eq!(classify(None, 0, 70.0).tier, RiskTier::AtRisk);
        assert_eq!(classify(None, 0, 80.0).tier, RiskTier::NeedsAttention);
        assert_eq!(classify(None, 0, 90.0).tier, RiskTier::OnTrack);
    }

    #[test]
    fn composite_cut_points_are_inclusive() {
        assert_eq!(tier_for_composite(85.0), RiskTier::OnTrack);
        assert_eq!(tier_for_composite(84.99), RiskTier::NeedsAttention);
        assert_eq!(tier_for_composite(75.0), RiskTier::NeedsAttention);
        assert_eq!(tier_for_composite(74.99), RiskTier::AtRisk);
        assert_eq!(tier_for_composite(65.0), RiskTier::AtRisk);
        assert_eq!(tier_for_composite(64.99), RiskTier::Critical);
        assert_eq!(tier_for_composite(0.0), RiskTier::Critical);
    }

    #[test]
    fn classify_lands_on_composite_edges() {
        // Seven missing zeroes the completion term, keeping the sums exact.
        // 0.6*100 + 0.25*100 + 0.15*0 = 85
        let edge = classify(Some(100.0), 7, 100.0);
        assert_eq!(edge.composite, Some(85.0));
        assert_eq!(edge.tier, RiskTier::OnTrack);
        // 0.6*100 + 0.25*60 = 75
        let edge = classify(Some(100.0), 7, 60.0);
        assert_eq!(edge.composite, Some(75.0));
        assert_eq!(edge.tier, RiskTier::NeedsAttention);
        // 0.6*100 + 0.25*20 = 65
        let edge = classify(Some(100.0), 7, 20.0);
        assert_eq!(edge.composite, Some(65.0));
        assert_eq!(edge.tier, RiskTier::AtRisk);
    }

    #[test]
    fn missing_penalty_floors_at_zero() {
        assert!((composite_score(0.0, 20, 0.0) - 0.0).abs() < 0.001);
    }

    #[test]
    fn tier_table_is_ordered_by_risk() {
        let keys: Vec<RiskTier> = TIERS.iter().map(|tier| tier.key).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(RiskTier::AtRisk.info().label, "At Risk");
    }
}
