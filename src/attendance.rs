use serde::{Deserialize, Serialize};

use crate::models::{AttendanceRecord, AttendanceStatus};

/// Which statuses count as attended. One convention is applied everywhere
/// a rate is computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceConvention {
    #[default]
    PresentAndExcused,
    PresentOnly,
}

impl AttendanceConvention {
    pub fn counts_as_present(self, status: AttendanceStatus) -> bool {
        match status {
            AttendanceStatus::Present => true,
            AttendanceStatus::Excused => self == AttendanceConvention::PresentAndExcused,
            AttendanceStatus::Absent | AttendanceStatus::Late => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AttendanceSummary {
    pub total_days: usize,
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    pub excused: usize,
    pub attended_days: usize,
}

impl AttendanceSummary {
    pub fn from_records(records: &[AttendanceRecord], convention: AttendanceConvention) -> Self {
        let mut summary = Self::default();
        for record in records {
            summary.total_days += 1;
            match record.status {
                AttendanceStatus::Present => summary.present += 1,
                AttendanceStatus::Absent => summary.absent += 1,
                AttendanceStatus::Late => summary.late += 1,
                AttendanceStatus::Excused => summary.excused += 1,
            }
            if convention.counts_as_present(record.status) {
                summary.attended_days += 1;
            }
        }
        summary
    }

    /// Attended days as a percentage. With no recorded days the student is
    /// treated as fully present so an empty register never flags risk.
    pub fn rate(&self) -> f64 {
        if self.total_days == 0 {
            100.0
        } else {
            self.attended_days as f64 / self.total_days as f64 * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn records(statuses: &[AttendanceStatus]) -> Vec<AttendanceRecord> {
        let enrollment_id = Uuid::new_v4();
        let start = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        statuses
            .iter()
            .enumerate()
            .map(|(offset, status)| AttendanceRecord {
                enrollment_id,
                date: start + chrono::Duration::days(offset as i64),
                status: *status,
            })
            .collect()
    }

    #[test]
    fn excused_days_count_as_present_by_default() {
        use AttendanceStatus::*;
        let summary = AttendanceSummary::from_records(
            &records(&[Present, Excused, Late, Absent]),
            AttendanceConvention::default(),
        );
        assert_eq!(summary.attended_days, 2);
        assert!((summary.rate() - 50.0).abs() < 0.001);
        assert_eq!(summary.late, 1);
    }

    #[test]
    fn present_only_convention_excludes_excused() {
        use AttendanceStatus::*;
        let summary = AttendanceSummary::from_records(
            &records(&[Present, Excused, Present, Present]),
            AttendanceConvention::PresentOnly,
        );
        assert!((summary.rate() - 75.0).abs() < 0.001);
    }

    #[test]
    fn empty_register_is_full_attendance() {
        let summary = AttendanceSummary::from_records(&[], AttendanceConvention::default());
        assert_eq!(summary.total_days, 0);
        assert_eq!(summary.rate(), 100.0);
    }
}
