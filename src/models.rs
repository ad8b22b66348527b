use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single gradable item inside a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub label: String,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub label: String,
    pub weight: f64,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Category {
    /// Categories without tasks or weight never take part in a weighted average.
    pub fn is_weighted(&self) -> bool {
        !self.tasks.is_empty() && self.weight != 0.0
    }
}

/// Weighted category/task schema a class is graded against.
///
/// Teachers may add categories and tasks over time; task ids already in use
/// must stay stable so that stored scores keep resolving.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GradeStructure {
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl GradeStructure {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.categories.iter().flat_map(|category| category.tasks.iter())
    }

    pub fn task_count(&self) -> usize {
        self.tasks().count()
    }

    pub fn has_task(&self, task_id: &str) -> bool {
        self.tasks().any(|task| task.id == task_id)
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Quarter {
    First,
    Second,
}

impl Quarter {
    pub const ALL: [Quarter; 2] = [Quarter::First, Quarter::Second];

    pub fn number(self) -> i16 {
        match self {
            Quarter::First => 1,
            Quarter::Second => 2,
        }
    }
}

impl TryFrom<i16> for Quarter {
    type Error = anyhow::Error;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Quarter::First),
            2 => Ok(Quarter::Second),
            other => anyhow::bail!("quarter must be 1 or 2, got {other}"),
        }
    }
}

impl std::fmt::Display for Quarter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Q{}", self.number())
    }
}

/// One scored (or still ungraded) attempt as stored for an enrollment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRecord {
    pub enrollment_id: Uuid,
    pub assignment_key: String,
    pub score: Option<f64>,
    pub total_score: f64,
    pub quarter: Quarter,
    /// Insertion order within the store. Several rows written in one
    /// transaction share `created_at`, so this is the chronological key.
    pub sequence: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GradeRecord {
    pub fn is_missing(&self) -> bool {
        self.score.map_or(true, |score| score == 0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

impl std::str::FromStr for AttendanceStatus {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "present" => Ok(AttendanceStatus::Present),
            "absent" => Ok(AttendanceStatus::Absent),
            "late" => Ok(AttendanceStatus::Late),
            "excused" => Ok(AttendanceStatus::Excused),
            other => anyhow::bail!("unknown attendance status '{other}'"),
        }
    }
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Late => "late",
            AttendanceStatus::Excused => "excused",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub enrollment_id: Uuid,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

/// Everything the engine needs about one student in one class, read at a
/// single point in time.
#[derive(Debug, Clone)]
pub struct EnrollmentSnapshot {
    pub enrollment_id: Uuid,
    pub student_name: String,
    pub student_email: String,
    pub grades: Vec<GradeRecord>,
    pub attendance: Vec<AttendanceRecord>,
}

#[derive(Debug, Clone)]
pub struct ClassSnapshot {
    pub class_code: String,
    pub subject: String,
    pub teacher_name: String,
    pub school_year: String,
    pub semester: String,
    pub structure: GradeStructure,
    pub enrollments: Vec<EnrollmentSnapshot>,
}
