//! Rule-based study suggestions.
//!
//! Each rule fires independently; the result is ordered by priority with
//! generation order kept among equals, so the study-habits tip always closes
//! the list of low-priority entries.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    FocusArea,
    MissingWork,
    Attendance,
    Excellence,
    Improvement,
    UrgentSupport,
    TimeManagement,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    pub priority: Priority,
    pub title: String,
    pub message: String,
    pub actions: Vec<String>,
}

/// A graded (or still blank) assignment as the student sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentScore {
    pub name: String,
    pub score: Option<f64>,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeywordRule {
    pub category: String,
    pub keywords: Vec<String>,
}

/// Lookup table used to guess an assignment's category from its name.
/// Rules are tried in order; the first keyword hit wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryKeywords {
    pub rules: Vec<KeywordRule>,
    pub fallback: String,
}

impl Default for CategoryKeywords {
    fn default() -> Self {
        let rule = |category: &str, keywords: &[&str]| KeywordRule {
            category: category.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        };
        Self {
            rules: vec![
                rule("Quarterly Exam", &["exam", "quarterly", "periodical"]),
                rule("Performance Tasks", &["performance", "project", "lab", "activity"]),
                rule("Written Works", &["written", "quiz", "seatwork", "assignment"]),
            ],
            fallback: "Other".to_string(),
        }
    }
}

impl CategoryKeywords {
    pub fn categorize(&self, assignment_name: &str) -> &str {
        let name = assignment_name.to_lowercase();
        self.rules
            .iter()
            .find(|rule| {
                rule.keywords
                    .iter()
                    .any(|keyword| name.contains(&keyword.to_lowercase()))
            })
            .map_or(self.fallback.as_str(), |rule| rule.category.as_str())
    }
}

pub struct SuggestionGenerator<'a> {
    keywords: &'a CategoryKeywords,
    focus_threshold: f64,
}

impl<'a> SuggestionGenerator<'a> {
    pub fn new(keywords: &'a CategoryKeywords, focus_threshold: f64) -> Self {
        Self {
            keywords,
            focus_threshold,
        }
    }

    pub fn generate(
        &self,
        assignments: &[AssignmentScore],
        attendance_rate: f64,
        current_grade: Option<f64>,
    ) -> Vec<Suggestion> {
        let mut suggestions = self.focus_areas(assignments);

        let missing = assignments
            .iter()
            .filter(|a| a.score.map_or(true, |score| score == 0.0))
            .count();
        if missing > 0 {
            suggestions.push(missing_work(missing));
        }

        if attendance_rate < 90.0 {
            suggestions.push(attendance(attendance_rate));
        }

        if let Some(suggestion) = current_grade.and_then(grade_band) {
            suggestions.push(suggestion);
        }

        suggestions.push(time_management());

        // Vec::sort_by_key is stable.
        suggestions.sort_by_key(|suggestion| suggestion.priority);
        suggestions
    }

    /// Per-category averages over scored work, in first-seen order.
    fn category_averages(&self, assignments: &[AssignmentScore]) -> Vec<(String, f64)> {
        let mut order: Vec<String> = Vec::new();
        let mut totals: HashMap<String, (f64, f64)> = HashMap::new();
        for assignment in assignments {
            let Some(score) = assignment.score else {
                continue;
            };
            if assignment.total <= 0.0 {
                continue;
            }
            let category = self.keywords.categorize(&assignment.name).to_string();
            let entry = totals.entry(category.clone()).or_insert_with(|| {
                order.push(category);
                (0.0, 0.0)
            });
            entry.0 += score;
            entry.1 += assignment.total;
        }
        order
            .into_iter()
            .map(|category| {
                let (earned, possible) = totals[&category];
                (category, earned / possible * 100.0)
            })
            .collect()
    }

    fn focus_areas(&self, assignments: &[AssignmentScore]) -> Vec<Suggestion> {
        self.category_averages(assignments)
            .into_iter()
            .filter(|(_, average)| *average < self.focus_threshold)
            .map(|(category, average)| Suggestion {
                kind: SuggestionKind::FocusArea,
                priority: Priority::High,
                title: format!("Focus on {category}"),
                message: format!(
                    "Your average in {category} is {average:.1}%. Extra practice here will lift your grade the most."
                ),
                actions: vec![
                    format!("Review feedback on past {category} work"),
                    "Ask your teacher for practice material".to_string(),
                    "Form a study group for this area".to_string(),
                ],
            })
            .collect()
    }
}

fn missing_work(count: usize) -> Suggestion {
    let plural = if count == 1 { "" } else { "s" };
    Suggestion {
        kind: SuggestionKind::MissingWork,
        priority: Priority::High,
        title: "Complete missing work".to_string(),
        message: format!("You have {count} missing or unscored assignment{plural}."),
        actions: vec![
            "List every missing assignment and its deadline".to_string(),
            "Ask your teacher whether late submissions are accepted".to_string(),
            "Tackle the highest-value items first".to_string(),
        ],
    }
}

fn attendance(rate: f64) -> Suggestion {
    let priority = if rate < 80.0 {
        Priority::High
    } else {
        Priority::Medium
    };
    Suggestion {
        kind: SuggestionKind::Attendance,
        priority,
        title: "Improve attendance".to_string(),
        message: format!("Your attendance rate is {rate:.1}%. Regular attendance keeps you from falling behind."),
        actions: vec![
            "Catch up on notes from missed sessions".to_string(),
            "Let your teacher know about any recurring conflicts".to_string(),
        ],
    }
}

fn grade_band(grade: f64) -> Option<Suggestion> {
    let suggestion = if grade >= 90.0 {
        Suggestion {
            kind: SuggestionKind::Excellence,
            priority: Priority::Low,
            title: "Maintain excellence".to_string(),
            message: format!("Outstanding work at {grade:.1}%. Keep challenging yourself."),
            actions: vec![
                "Take on enrichment or advanced problems".to_string(),
                "Help classmates to reinforce your own understanding".to_string(),
            ],
        }
    } else if (75.0..85.0).contains(&grade) {
        Suggestion {
            kind: SuggestionKind::Improvement,
            priority: Priority::Medium,
            title: "Push for a higher grade".to_string(),
            message: format!("You're passing at {grade:.1}%. A focused push can move you up a band."),
            actions: vec![
                "Set a target score for the next assessment".to_string(),
                "Review mistakes from recent quizzes".to_string(),
            ],
        }
    } else if grade < 75.0 {
        Suggestion {
            kind: SuggestionKind::UrgentSupport,
            priority: Priority::High,
            title: "Urgent: get support".to_string(),
            message: format!("Your grade of {grade:.1}% is below passing. Reach out for help now."),
            actions: vec![
                "Schedule a consultation with your teacher".to_string(),
                "Ask about remedial or make-up activities".to_string(),
                "Set aside daily review time".to_string(),
            ],
        }
    } else {
        return None;
    };
    Some(suggestion)
}

fn time_management() -> Suggestion {
    Suggestion {
        kind: SuggestionKind::TimeManagement,
        priority: Priority::Low,
        title: "Build steady study habits".to_string(),
        message: "Short, regular study sessions beat last-minute cramming.".to_string(),
        actions: vec![
            "Plan a weekly study schedule".to_string(),
            "Break large tasks into smaller steps".to_string(),
            "Review notes within a day of each class".to_string(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(name: &str, score: Option<f64>, total: f64) -> AssignmentScore {
        AssignmentScore {
            name: name.to_string(),
            score,
            total,
        }
    }

    fn kinds(suggestions: &[Suggestion]) -> Vec<SuggestionKind> {
        suggestions.iter().map(|s| s.kind).collect()
    }

    #[test]
    fn keyword_table_infers_categories() {
        let keywords = CategoryKeywords::default();
        assert_eq!(keywords.categorize("Periodical Test"), "Quarterly Exam");
        assert_eq!(keywords.categorize("Lab Report 2"), "Performance Tasks");
        assert_eq!(keywords.categorize("quiz_3"), "Written Works");
        assert_eq!(keywords.categorize("Recitation"), "Other");
    }

    #[test]
    fn custom_keyword_table_is_used() {
        let keywords = CategoryKeywords {
            rules: vec![KeywordRule {
                category: "Homework".to_string(),
                keywords: vec!["HW".to_string()],
            }],
            fallback: "Misc".to_string(),
        };
        assert_eq!(keywords.categorize("hw-4"), "Homework");
        assert_eq!(keywords.categorize("quiz"), "Misc");
    }

    #[test]
    fn strong_student_gets_excellence_and_habits_only() {
        let keywords = CategoryKeywords::default();
        let generator = SuggestionGenerator::new(&keywords, 75.0);
        let suggestions = generator.generate(&[assignment("Quiz 1", Some(10.0), 10.0)], 100.0, Some(95.0));
        assert_eq!(
            kinds(&suggestions),
            vec![SuggestionKind::Excellence, SuggestionKind::TimeManagement]
        );
    }

    #[test]
    fn struggling_student_gets_ordered_suggestions() {
        let keywords = CategoryKeywords::default();
        let generator = SuggestionGenerator::new(&keywords, 75.0);
        let suggestions = generator.generate(
            &[
                assignment("Quiz 1", Some(4.0), 10.0),
                assignment("Quarterly Exam", None, 50.0),
                assignment("Project", Some(0.0), 20.0),
            ],
            85.0,
            Some(60.0),
        );
        assert_eq!(
            kinds(&suggestions),
            vec![
                SuggestionKind::FocusArea,
                SuggestionKind::FocusArea,
                SuggestionKind::MissingWork,
                SuggestionKind::UrgentSupport,
                SuggestionKind::Attendance,
                SuggestionKind::TimeManagement,
            ]
        );
        assert_eq!(suggestions[0].title, "Focus on Written Works");
        assert_eq!(suggestions[1].title, "Focus on Performance Tasks");
        assert!(suggestions[2].message.contains("2 missing"));
        assert_eq!(suggestions[4].priority, Priority::Medium);
    }

    #[test]
    fn low_attendance_is_high_priority() {
        let keywords = CategoryKeywords::default();
        let generator = SuggestionGenerator::new(&keywords, 75.0);
        let suggestions = generator.generate(&[], 70.0, None);
        assert_eq!(suggestions[0].kind, SuggestionKind::Attendance);
        assert_eq!(suggestions[0].priority, Priority::High);
    }

    #[test]
    fn time_management_appears_once_and_last() {
        let keywords = CategoryKeywords::default();
        let generator = SuggestionGenerator::new(&keywords, 75.0);
        for grade in [None, Some(50.0), Some(80.0), Some(87.0), Some(99.0)] {
            let suggestions = generator.generate(&[], 100.0, grade);
            let tips: Vec<_> = suggestions
                .iter()
                .filter(|s| s.kind == SuggestionKind::TimeManagement)
                .collect();
            assert_eq!(tips.len(), 1);
            assert_eq!(suggestions.last().map(|s| s.kind), Some(SuggestionKind::TimeManagement));
        }
    }

    #[test]
    fn grade_band_has_no_entry_between_85_and_90() {
        assert!(grade_band(87.0).is_none());
        assert_eq!(grade_band(84.9).map(|s| s.kind), Some(SuggestionKind::Improvement));
    }

    #[test]
    fn suggestion_kind_serializes_as_type() {
        let value = serde_json::to_value(time_management()).unwrap();
        assert_eq!(value["type"], "time_management");
        assert_eq!(value["priority"], "low");
        assert!(value.get("kind").is_none());
    }
}
