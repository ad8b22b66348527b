//! Final-grade prediction from the sequence of scored work.
//!
//! A least-squares line through per-assignment percentages, in the order the
//! grades were recorded, is damped and extrapolated over the work still to
//! come. Confidence is a capped heuristic on sample size.

use serde::Serialize;

use crate::grading::round_one_decimal;

const TREND_THRESHOLD: f64 = 2.0;
const MIN_REMAINING_ASSIGNMENTS: usize = 3;
const SLOPE_DAMPING: f64 = 0.5;
const BASE_CONFIDENCE: f64 = 30.0;
const CONFIDENCE_PER_POINT: f64 = 8.0;
const MAX_CONFIDENCE: f64 = 95.0;
const PASSING_GRADE: f64 = 75.0;

/// One scored piece of work, in recording order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredWork {
    pub score: f64,
    pub total: f64,
}

impl ScoredWork {
    fn percentage(&self) -> f64 {
        if self.total > 0.0 {
            self.score / self.total * 100.0
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Trend {
    Improving,
    Declining,
    Stable,
    #[serde(rename = "unknown")]
    Unknown,
}

impl Trend {
    fn from_slope(slope: f64) -> Self {
        if slope > TREND_THRESHOLD {
            Trend::Improving
        } else if slope < -TREND_THRESHOLD {
            Trend::Declining
        } else {
            Trend::Stable
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Trend::Improving => "Improving",
            Trend::Declining => "Declining",
            Trend::Stable => "Stable",
            Trend::Unknown => "unknown",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub current_grade: Option<f64>,
    pub predicted_grade: Option<f64>,
    pub confidence: f64,
    pub trend: Trend,
    pub trend_slope: f64,
    pub data_points: usize,
    pub message: String,
}

impl Prediction {
    fn not_enough_data() -> Self {
        Self {
            current_grade: None,
            predicted_grade: None,
            confidence: 0.0,
            trend: Trend::Unknown,
            trend_slope: 0.0,
            data_points: 0,
            message: "Not enough data to make a prediction yet. Keep submitting work!"
                .to_string(),
        }
    }
}

/// Ordinary least-squares slope of `y` over `x = 0..n`. A degenerate fit
/// (fewer than two points) has slope zero.
pub fn least_squares_slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let (sum_x, sum_y, sum_xy, sum_xx) = values.iter().enumerate().fold(
        (0.0, 0.0, 0.0, 0.0),
        |(sx, sy, sxy, sxx), (index, &y)| {
            let x = index as f64;
            (sx + x, sy + y, sxy + x * y, sxx + x * x)
        },
    );
    let denominator = n * sum_xx - sum_x * sum_x;
    if denominator == 0.0 {
        return 0.0;
    }
    (n * sum_xy - sum_x * sum_y) / denominator
}

/// Predicts the final grade from chronologically ordered scored work.
///
/// `expected_total` is how many assignments the course is expected to have
/// in all; at least three more are always assumed to remain.
pub fn predict_final_grade(work: &[ScoredWork], expected_total: usize) -> Prediction {
    if work.is_empty() {
        return Prediction::not_enough_data();
    }

    let earned: f64 = work.iter().map(|w| w.score).sum();
    let possible: f64 = work.iter().map(|w| w.total).sum();
    let current = if possible > 0.0 {
        earned / possible * 100.0
    } else {
        0.0
    };

    let percentages: Vec<f64> = work.iter().map(ScoredWork::percentage).collect();
    let slope = least_squares_slope(&percentages);

    let remaining = expected_total
        .saturating_sub(work.len())
        .max(MIN_REMAINING_ASSIGNMENTS);
    let predicted = (current + slope * remaining as f64 * SLOPE_DAMPING).clamp(0.0, 100.0);
    let predicted = round_one_decimal(predicted);
    let confidence = (BASE_CONFIDENCE + CONFIDENCE_PER_POINT * work.len() as f64).min(MAX_CONFIDENCE);
    let trend = Trend::from_slope(slope);

    tracing::debug!(
        data_points = work.len(),
        slope,
        predicted,
        "trend prediction computed"
    );

    Prediction {
        current_grade: Some(round_one_decimal(current)),
        predicted_grade: Some(predicted),
        confidence,
        trend,
        trend_slope: round_one_decimal(slope),
        data_points: work.len(),
        message: prediction_message(predicted, trend).to_string(),
    }
}

fn prediction_message(predicted: f64, trend: Trend) -> &'static str {
    match trend {
        _ if predicted >= 90.0 && trend == Trend::Improving => {
            "Excellent trajectory! You're on track for an outstanding final grade."
        }
        _ if predicted >= 90.0 => "Excellent work. Keep up your current study habits.",
        Trend::Improving if predicted >= 80.0 => {
            "Great progress! Your recent scores are pulling your grade up."
        }
        Trend::Declining if predicted >= 80.0 => {
            "You're in good standing, but recent scores are slipping. Review the latest topics."
        }
        _ if predicted >= 80.0 => "Solid performance. A little extra effort could push you higher.",
        Trend::Declining if predicted >= PASSING_GRADE => {
            "Warning: you're close to the passing mark and trending down. Ask for help early."
        }
        _ if predicted >= PASSING_GRADE => {
            "You're passing. Focus on your weaker areas to build a safer margin."
        }
        Trend::Improving => "Below passing, but improving. Keep pushing to close the gap.",
        _ => "At risk of not passing. Talk to your teacher about a recovery plan.",
    }
}
