use std::fmt::Write;

use crate::analytics::{ClassGradeRow, StudentAnalytics};
use crate::models::ClassSnapshot;
use crate::risk::{RiskTier, TIERS};

pub fn tier_counts(rows: &[ClassGradeRow]) -> Vec<(RiskTier, usize)> {
    TIERS
        .iter()
        .map(|tier| {
            let count = rows.iter().filter(|row| row.risk == tier.key).count();
            (tier.key, count)
        })
        .collect()
}

pub fn build_class_sheet(snapshot: &ClassSnapshot, rows: &[ClassGradeRow]) -> String {
    let mut output = String::new();

    let _ = writeln!(
        output,
        "# {} ({}) Grade Sheet",
        snapshot.subject, snapshot.class_code
    );
    let _ = writeln!(
        output,
        "Teacher: {} | School year {} | Semester {}",
        snapshot.teacher_name, snapshot.school_year, snapshot.semester
    );
    let _ = writeln!(output);

    if rows.is_empty() {
        let _ = writeln!(output, "No students enrolled in this class.");
        return output;
    }

    let _ = writeln!(
        output,
        "| Student | Q1 | Q1 expected | Q2 | Q2 expected | Overall | Risk |"
    );
    let _ = writeln!(output, "|---|---|---|---|---|---|---|");
    for row in rows {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {} | {} | {} |",
            row.student_name,
            row.grades.first.grade,
            row.grades.first.expected,
            row.grades.second.grade,
            row.grades.second.expected,
            row.grades.overall,
            row.risk.info().label
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Risk Mix");
    for (tier, count) in tier_counts(rows) {
        let _ = writeln!(output, "- {}: {}", tier.info().label, count);
    }

    output
}

pub fn build_student_report(class_label: &str, analytics: &StudentAnalytics) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Student Progress Report");
    let _ = writeln!(
        output,
        "{} ({}) in {}",
        analytics.student_name, analytics.student_email, class_label
    );
    let _ = writeln!(output);

    let _ = writeln!(output, "## Grades");
    for summary in [&analytics.grades.first, &analytics.grades.second] {
        let status = if summary.complete {
            "complete"
        } else {
            "in progress"
        };
        let _ = writeln!(
            output,
            "- {}: {} (expected {}, {})",
            summary.quarter, summary.grade, summary.expected, status
        );
    }
    let _ = writeln!(output, "- Overall: {}", analytics.grades.overall);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Risk");
    let _ = writeln!(output, "- Tier: {}", analytics.risk.info.label);
    if let Some(composite) = analytics.risk.composite {
        let _ = writeln!(output, "- Composite score: {composite:.1}");
    }
    let _ = writeln!(
        output,
        "- Attendance: {:.1}% ({} of {} days)",
        analytics.attendance_rate, analytics.attendance.attended_days, analytics.attendance.total_days
    );
    let _ = writeln!(output, "- Missing assignments: {}", analytics.missing_assignments);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Prediction");
    let prediction = &analytics.prediction;
    match prediction.predicted_grade {
        Some(predicted) => {
            let _ = writeln!(
                output,
                "- Predicted final grade: {predicted:.1}% ({} trend, slope {:.1}, confidence {:.0}%)",
                prediction.trend, prediction.trend_slope, prediction.confidence
            );
        }
        None => {
            let _ = writeln!(output, "- No prediction available.");
        }
    }
    let _ = writeln!(output, "- {}", prediction.message);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Suggestions");
    for suggestion in &analytics.suggestions {
        let _ = writeln!(
            output,
            "### {} ({:?} priority)",
            suggestion.title, suggestion.priority
        );
        let _ = writeln!(output, "{}", suggestion.message);
        for action in &suggestion.actions {
            let _ = writeln!(output, "- {action}");
        }
    }

    output
}
