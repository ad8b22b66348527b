//! Quarter and overall grade calculation.
//!
//! Category averages are taken over attempted tasks only, and a category only
//! carries weight once something in it has been attempted. Missing work is
//! never folded into the grade itself; it shows up through the risk tiers.

use serde::Serialize;

use crate::grade_map::{QuarterGradeMap, QuarterScores};
use crate::models::{Category, GradeStructure, Quarter};

/// Result of a grade computation.
///
/// The sentinels keep the distinctions the UI relies on: `NotApplicable`
/// means there is no structure to grade against, `Unscorable` means there is
/// a structure but nothing that could be weighted yet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum GradeValue {
    Percent(f64),
    NotApplicable,
    Unscorable,
    InsufficientData,
}

impl GradeValue {
    /// The percentage as displayed, rounded to one decimal with ties away
    /// from zero. `Display` formats this same value.
    pub fn percent(&self) -> Option<f64> {
        match self {
            GradeValue::Percent(value) => Some(round_one_decimal(*value)),
            _ => None,
        }
    }
}

impl std::fmt::Display for GradeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GradeValue::Percent(value) => write!(f, "{:.1}%", round_one_decimal(*value)),
            GradeValue::NotApplicable => write!(f, "N/A"),
            GradeValue::Unscorable => write!(f, "\u{2014}"),
            GradeValue::InsufficientData => write!(f, "Insufficient Data"),
        }
    }
}

pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[derive(Debug, Default)]
struct WeightedAverage {
    weighted_score: f64,
    total_weight: f64,
}

impl WeightedAverage {
    fn add(&mut self, earned: f64, possible: f64, weight: f64) {
        if possible == 0.0 {
            return;
        }
        self.weighted_score += earned / possible * weight;
        self.total_weight += weight;
    }

    fn finish(self) -> GradeValue {
        if self.total_weight == 0.0 {
            GradeValue::Unscorable
        } else {
            GradeValue::Percent(self.weighted_score / self.total_weight * 100.0)
        }
    }
}

/// Earned and possible points over the attempted tasks of one category.
fn attempted_totals(category: &Category, scores: &QuarterScores) -> (f64, f64) {
    category
        .tasks
        .iter()
        .filter_map(|task| scores.get(&task.id).map(|score| (score, task.total)))
        .fold((0.0, 0.0), |(earned, possible), (score, total)| {
            (earned + score, possible + total)
        })
}

/// Weighted percentage for one quarter, graded on attempted work only.
pub fn compute_quarter_grade(scores: &QuarterScores, structure: &GradeStructure) -> GradeValue {
    if structure.is_empty() {
        return GradeValue::NotApplicable;
    }

    let mut average = WeightedAverage::default();
    for category in structure.categories.iter().filter(|c| c.is_weighted()) {
        let (earned, possible) = attempted_totals(category, scores);
        average.add(earned, possible, category.weight);
    }
    average.finish()
}

/// A quarter is complete once every category that has tasks has at least one
/// of them scored. Weight plays no part here.
pub fn is_quarter_complete(scores: &QuarterScores, structure: &GradeStructure) -> bool {
    structure
        .categories
        .iter()
        .filter(|category| !category.tasks.is_empty())
        .all(|category| {
            category
                .tasks
                .iter()
                .any(|task| scores.get(&task.id).is_some())
        })
}

/// Projects the quarter assuming the student keeps scoring at their current
/// overall rate on every task not yet attempted.
pub fn compute_expected_grade(scores: &QuarterScores, structure: &GradeStructure) -> GradeValue {
    if structure.is_empty() {
        return GradeValue::NotApplicable;
    }

    let (total_earned, total_possible) = structure
        .categories
        .iter()
        .map(|category| attempted_totals(category, scores))
        .fold((0.0, 0.0), |(earned, possible), (e, p)| (earned + e, possible + p));
    if total_possible == 0.0 {
        return GradeValue::InsufficientData;
    }
    let performance_rate = total_earned / total_possible;

    let mut average = WeightedAverage::default();
    for category in structure.categories.iter().filter(|c| c.is_weighted()) {
        let (mut earned, mut possible) = attempted_totals(category, scores);
        for task in &category.tasks {
            if scores.get(&task.id).is_none() && task.total > 0.0 {
                earned += task.total * performance_rate;
                possible += task.total;
            }
        }
        average.add(earned, possible, category.weight);
    }
    average.finish()
}

/// Mean of both quarters, available only once both are complete.
pub fn compute_overall_grade(grades: &QuarterGradeMap, structure: &GradeStructure) -> GradeValue {
    let complete = Quarter::ALL
        .iter()
        .all(|&quarter| is_quarter_complete(grades.quarter(quarter), structure));
    if !complete {
        return GradeValue::Unscorable;
    }

    let first = compute_quarter_grade(&grades.first, structure).percent();
    let second = compute_quarter_grade(&grades.second, structure).percent();
    match (first, second) {
        (Some(first), Some(second)) => GradeValue::Percent((first + second) / 2.0),
        _ => GradeValue::Unscorable,
    }
}

/// All four figures shown for a student in a class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuarterSummary {
    pub quarter: Quarter,
    pub grade: GradeValue,
    pub expected: GradeValue,
    pub complete: bool,
}

pub fn summarize_quarter(
    grades: &QuarterGradeMap,
    structure: &GradeStructure,
    quarter: Quarter,
) -> QuarterSummary {
    let scores = grades.quarter(quarter);
    QuarterSummary {
        quarter,
        grade: compute_quarter_grade(scores, structure),
        expected: compute_expected_grade(scores, structure),
        complete: is_quarter_complete(scores, structure),
    }
}
