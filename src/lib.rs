//! Grade calculation and risk prediction for quarter-based school grading.
//!
//! The engine modules (`grade_map`, `grading`, `attendance`, `risk`, `trend`,
//! `suggestions`, `analytics`) are pure functions over an in-memory snapshot.
//! `db` is the Postgres collaborator that produces those snapshots.

pub mod analytics;
pub mod attendance;
pub mod config;
pub mod db;
pub mod grade_map;
pub mod grading;
pub mod logging;
pub mod models;
pub mod report;
pub mod risk;
pub mod suggestions;
pub mod trend;

pub use grading::{
    compute_expected_grade, compute_overall_grade, compute_quarter_grade, is_quarter_complete,
    GradeValue,
};
pub use risk::{classify, RiskClassification, RiskTier};
pub use trend::{predict_final_grade, Prediction, ScoredWork};
