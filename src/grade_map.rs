//! Ingress for the stored grade map.
//!
//! The persisted map keys first-quarter scores by bare task id and
//! second-quarter scores by `q2_<task id>`. It is split here into two
//! quarter-scoped maps so nothing downstream ever looks at a key prefix.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::models::{GradeRecord, GradeStructure, Quarter};

pub const SECOND_QUARTER_PREFIX: &str = "q2_";

/// Numeric scores entered for one quarter, keyed by task id.
///
/// Only values that parsed as finite numbers are kept; blanks, nulls and
/// junk strings are indistinguishable from a task nobody has graded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuarterScores {
    scores: HashMap<String, f64>,
}

impl QuarterScores {
    pub fn get(&self, task_id: &str) -> Option<f64> {
        self.scores.get(task_id).copied()
    }

    pub fn insert(&mut self, task_id: impl Into<String>, score: f64) {
        self.scores.insert(task_id.into(), score);
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn task_ids(&self) -> impl Iterator<Item = &str> {
        self.scores.keys().map(String::as_str)
    }
}

impl FromIterator<(String, f64)> for QuarterScores {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            scores: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuarterGradeMap {
    pub first: QuarterScores,
    pub second: QuarterScores,
}

impl QuarterGradeMap {
    pub fn from_raw(raw: &Map<String, Value>) -> Self {
        let mut map = Self::default();
        for (key, value) in raw {
            let Some(score) = parse_score(value) else {
                continue;
            };
            match key.strip_prefix(SECOND_QUARTER_PREFIX) {
                Some(task_id) => map.second.insert(task_id, score),
                None => map.first.insert(key.as_str(), score),
            }
        }
        map
    }

    /// Builds the map from stored grade rows. Later rows for the same task
    /// and quarter replace earlier ones.
    pub fn from_records(records: &[GradeRecord]) -> Self {
        let mut map = Self::default();
        for record in records {
            if let Some(score) = record.score.filter(|score| score.is_finite()) {
                map.quarter_mut(record.quarter)
                    .insert(record.assignment_key.as_str(), score);
            }
        }
        map
    }

    pub fn quarter(&self, quarter: Quarter) -> &QuarterScores {
        match quarter {
            Quarter::First => &self.first,
            Quarter::Second => &self.second,
        }
    }

    fn quarter_mut(&mut self, quarter: Quarter) -> &mut QuarterScores {
        match quarter {
            Quarter::First => &mut self.first,
            Quarter::Second => &mut self.second,
        }
    }

    /// Keys that no longer match any task, typically left behind after a
    /// teacher edits the structure. They are ignored by every calculation.
    pub fn stale_keys(&self, structure: &GradeStructure) -> Vec<(Quarter, String)> {
        let mut stale = Vec::new();
        for quarter in Quarter::ALL {
            for task_id in self.quarter(quarter).task_ids() {
                if !structure.has_task(task_id) {
                    stale.push((quarter, task_id.to_string()));
                }
            }
        }
        stale.sort();
        stale
    }
}

/// Reads a raw stored value as a score. Anything that is not a finite
/// number after trimming counts as "not entered".
pub fn parse_score(value: &Value) -> Option<f64> {
    let score = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => {
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            text.parse::<f64>().ok()?
        }
        _ => return None,
    };
    score.is_finite().then_some(score)
}

pub fn parse_score_text(text: &str) -> Option<f64> {
    parse_score(&Value::String(text.to_string()))
}
