//! The two views built on the engine: the per-class grade sheet and the
//! per-student analytics report. Both go through `EnrollmentGrades`, so the
//! figures they show for one snapshot always agree.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::attendance::AttendanceSummary;
use crate::config::EngineConfig;
use crate::grade_map::QuarterGradeMap;
use crate::grading::{compute_overall_grade, summarize_quarter, GradeValue, QuarterSummary};
use crate::models::{ClassSnapshot, EnrollmentSnapshot, GradeRecord, GradeStructure, Quarter};
use crate::risk::{classify, RiskClassification, RiskTier};
use crate::suggestions::{AssignmentScore, Suggestion, SuggestionGenerator};
use crate::trend::{predict_final_grade, Prediction, ScoredWork};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrollmentGrades {
    pub first: QuarterSummary,
    pub second: QuarterSummary,
    pub overall: GradeValue,
}

impl EnrollmentGrades {
    pub fn compute(grades: &QuarterGradeMap, structure: &GradeStructure) -> Self {
        Self {
            first: summarize_quarter(grades, structure, Quarter::First),
            second: summarize_quarter(grades, structure, Quarter::Second),
            overall: compute_overall_grade(grades, structure),
        }
    }

    /// The overall grade when both quarters allow it, otherwise the most
    /// recent quarter that has a numeric grade.
    pub fn current_grade(&self) -> Option<f64> {
        self.overall
            .percent()
            .or_else(|| self.second.grade.percent())
            .or_else(|| self.first.grade.percent())
    }
}

fn enrollment_grades(enrollment: &EnrollmentSnapshot, structure: &GradeStructure) -> EnrollmentGrades {
    let grades = QuarterGradeMap::from_records(&enrollment.grades);
    for (quarter, task_id) in grades.stale_keys(structure) {
        tracing::warn!(
            enrollment_id = %enrollment.enrollment_id,
            %quarter,
            task_id = %task_id,
            "score references a task that is no longer in the grade structure"
        );
    }
    EnrollmentGrades::compute(&grades, structure)
}

fn missing_assignments(enrollment: &EnrollmentSnapshot) -> u32 {
    enrollment.grades.iter().filter(|g| g.is_missing()).count() as u32
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassGradeRow {
    pub enrollment_id: Uuid,
    pub student_name: String,
    pub student_email: String,
    pub grades: EnrollmentGrades,
    pub risk: RiskTier,
}

pub fn class_grade_sheet(snapshot: &ClassSnapshot, config: &EngineConfig) -> Vec<ClassGradeRow> {
    let mut rows: Vec<ClassGradeRow> = snapshot
        .enrollments
        .iter()
        .map(|enrollment| {
            let grades = enrollment_grades(enrollment, &snapshot.structure);
            let attendance =
                AttendanceSummary::from_records(&enrollment.attendance, config.attendance_convention);
            let risk = classify(
                grades.current_grade(),
                missing_assignments(enrollment),
                attendance.rate(),
            );
            ClassGradeRow {
                enrollment_id: enrollment.enrollment_id,
                student_name: enrollment.student_name.clone(),
                student_email: enrollment.student_email.clone(),
                grades,
                risk: risk.tier,
            }
        })
        .collect();
    rows.sort_by(|a, b| a.student_name.cmp(&b.student_name));

    tracing::info!(
        class = %snapshot.class_code,
        students = rows.len(),
        "class grade sheet computed"
    );
    rows
}

/// Scored work ordered by insertion sequence. Timestamps can tie for rows
/// written together, so they are not used for ordering.
pub fn chronological_work(grades: &[GradeRecord]) -> Vec<ScoredWork> {
    let mut scored: Vec<&GradeRecord> = grades.iter().filter(|g| g.score.is_some()).collect();
    scored.sort_by_key(|grade| grade.sequence);
    scored
        .into_iter()
        .filter_map(|grade| {
            grade.score.map(|score| ScoredWork {
                score,
                total: grade.total_score,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentAnalytics {
    pub enrollment_id: Uuid,
    pub student_name: String,
    pub student_email: String,
    pub grades: EnrollmentGrades,
    pub current_grade: Option<f64>,
    pub attendance: AttendanceSummary,
    pub attendance_rate: f64,
    pub missing_assignments: u32,
    pub risk: RiskClassification,
    pub prediction: Prediction,
    pub suggestions: Vec<Suggestion>,
}

pub fn student_analytics(
    enrollment: &EnrollmentSnapshot,
    structure: &GradeStructure,
    config: &EngineConfig,
) -> StudentAnalytics {
    let grades = enrollment_grades(enrollment, structure);
    let current_grade = grades.current_grade();
    let attendance =
        AttendanceSummary::from_records(&enrollment.attendance, config.attendance_convention);
    let attendance_rate = attendance.rate();
    let missing = missing_assignments(enrollment);
    let risk = classify(current_grade, missing, attendance_rate);

    let scored = chronological_work(&enrollment.grades);
    let expected_total = structure.task_count() * Quarter::ALL.len();
    let prediction = predict_final_grade(&scored, expected_total);

    let labels: HashMap<&str, &str> = structure
        .tasks()
        .map(|task| (task.id.as_str(), task.label.as_str()))
        .collect();
    let assignments: Vec<AssignmentScore> = enrollment
        .grades
        .iter()
        .map(|grade| AssignmentScore {
            name: labels
                .get(grade.assignment_key.as_str())
                .map_or_else(|| grade.assignment_key.clone(), |label| label.to_string()),
            score: grade.score,
            total: grade.total_score,
        })
        .collect();
    let suggestions = SuggestionGenerator::new(&config.category_keywords, config.focus_threshold)
        .generate(&assignments, attendance_rate, current_grade);

    tracing::info!(
        enrollment_id = %enrollment.enrollment_id,
        tier = risk.tier.key(),
        current_grade = ?current_grade,
        missing,
        "student analytics computed"
    );

    StudentAnalytics {
        enrollment_id: enrollment.enrollment_id,
        student_name: enrollment.student_name.clone(),
        student_email: enrollment.student_email.clone(),
        grades,
        current_grade,
        attendance,
        attendance_rate,
        missing_assignments: missing,
        risk,
        prediction,
        suggestions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttendanceRecord, AttendanceStatus, Category, Task};
    use crate::trend::Trend;
    use chrono::{Duration, NaiveDate, Utc};

    fn structure() -> GradeStructure {
        let category = |id: &str, label: &str, weight: f64, task: (&str, &str, f64)| Category {
            id: id.to_string(),
            label: label.to_string(),
            weight,
            tasks: vec![Task {
                id: task.0.to_string(),
                label: task.1.to_string(),
                total: task.2,
            }],
        };
        GradeStructure {
            categories: vec![
                category("ww", "Written Works", 0.3, ("q1", "Quiz 1", 10.0)),
                category("pt", "Performance Tasks", 0.4, ("p1", "Project 1", 20.0)),
                category("qe", "Quarterly Exam", 0.3, ("e1", "Quarterly Exam", 50.0)),
            ],
        }
    }

    fn enrollment(scores: &[(&str, Option<f64>, f64, Quarter)], statuses: &[AttendanceStatus]) -> EnrollmentSnapshot {
        let enrollment_id = Uuid::new_v4();
        let start = Utc::now() - Duration::days(30);
        let grades = scores
            .iter()
            .enumerate()
            .map(|(index, (key, score, total, quarter))| GradeRecord {
                enrollment_id,
                assignment_key: key.to_string(),
                score: *score,
                total_score: *total,
                quarter: *quarter,
                sequence: index as i64 + 1,
                created_at: start + Duration::hours(index as i64),
                updated_at: start + Duration::hours(index as i64),
            })
            .collect();
        let day = NaiveDate::from_ymd_opt(2026, 8, 3).unwrap();
        let attendance = statuses
            .iter()
            .enumerate()
            .map(|(index, status)| AttendanceRecord {
                enrollment_id,
                date: day + Duration::days(index as i64),
                status: *status,
            })
            .collect();
        EnrollmentSnapshot {
            enrollment_id,
            student_name: "Avery Lee".to_string(),
            student_email: "avery.lee@example.com".to_string(),
            grades,
            attendance,
        }
    }

    #[test]
    fn current_grade_prefers_overall_then_latest_quarter() {
        let structure = structure();
        let first_only = enrollment(&[("q1", Some(8.0), 10.0, Quarter::First)], &[]);
        let analytics = student_analytics(&first_only, &structure, &EngineConfig::default());
        assert_eq!(analytics.current_grade, Some(80.0));
        assert_eq!(analytics.grades.overall, GradeValue::Unscorable);
    }

    #[test]
    fn both_views_agree_on_grades_and_risk() {
        use AttendanceStatus::*;
        let structure = structure();
        let student = enrollment(
            &[
                ("q1", Some(8.0), 10.0, Quarter::First),
                ("p1", Some(18.0), 20.0, Quarter::First),
                ("e1", None, 50.0, Quarter::First),
            ],
            &[Present, Present, Excused, Absent],
        );
        let config = EngineConfig::default();
        let snapshot = ClassSnapshot {
            class_code: "MATH-7A".to_string(),
            subject: "Mathematics".to_string(),
            teacher_name: "R. Santos".to_string(),
            school_year: "2026-2027".to_string(),
            semester: "1".to_string(),
            structure: structure.clone(),
            enrollments: vec![student.clone()],
        };

        let sheet = class_grade_sheet(&snapshot, &config);
        let analytics = student_analytics(&student, &structure, &config);

        assert_eq!(sheet.len(), 1);
        assert_eq!(sheet[0].grades, analytics.grades);
        assert_eq!(sheet[0].risk, analytics.risk.tier);
        assert_eq!(analytics.grades.first.grade.to_string(), "85.7%");
        assert_eq!(analytics.grades.first.expected.to_string(), "86.0%");
        assert!(!analytics.grades.first.complete);
        assert_eq!(analytics.missing_assignments, 1);
        assert!((analytics.attendance_rate - 75.0).abs() < 0.001);
    }

    #[test]
    fn ungraded_student_is_classified_on_proxies() {
        let analytics = student_analytics(
            &enrollment(&[], &[AttendanceStatus::Absent, AttendanceStatus::Present]),
            &structure(),
            &EngineConfig::default(),
        );
        assert_eq!(analytics.current_grade, None);
        assert_eq!(analytics.risk.tier, RiskTier::Critical);
        assert_eq!(analytics.prediction.predicted_grade, None);
    }

    #[test]
    fn suggestions_use_task_labels_for_categories() {
        let analytics = student_analytics(
            &enrollment(&[("e1", Some(20.0), 50.0, Quarter::First)], &[]),
            &structure(),
            &EngineConfig::default(),
        );
        assert!(analytics
            .suggestions
            .iter()
            .any(|s| s.title == "Focus on Quarterly Exam"));
    }

    #[test]
    fn prediction_follows_insertion_sequence_not_row_order() {
        let mut student = enrollment(
            &[
                ("q1", Some(5.0), 10.0, Quarter::First),
                ("p1", Some(14.0), 20.0, Quarter::First),
                ("e1", Some(45.0), 50.0, Quarter::First),
            ],
            &[],
        );
        // Rows written in one transaction share a timestamp and may come
        // back in any order; only the sequence says which came first.
        let written_at = student.grades[0].created_at;
        for (grade, sequence) in student.grades.iter_mut().zip([3, 2, 1]) {
            grade.sequence = sequence;
            grade.created_at = written_at;
        }

        let work = chronological_work(&student.grades);
        assert_eq!(
            work.iter().map(|w| w.score).collect::<Vec<_>>(),
            vec![45.0, 14.0, 5.0]
        );

        let analytics = student_analytics(&student, &structure(), &EngineConfig::default());
        assert_eq!(analytics.prediction.trend, Trend::Declining);
    }
}
