//! Schedule model.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// The planned working window of an employee for one day.
///
/// Either bound may be missing; checks that need it are skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// The scheduled employee (same identifier space as punch `user_id`).
    pub employee_id: u64,
    /// The day this entry applies to.
    pub schedule_date: NaiveDate,
    /// Scheduled start of work.
    #[serde(default)]
    pub work_start_time: Option<NaiveTime>,
    /// Scheduled end of work.
    #[serde(default)]
    pub work_end_time: Option<NaiveTime>,
}

impl ScheduleEntry {
    /// Creates an entry with both bounds set.
    pub fn new(
        employee_id: u64,
        schedule_date: NaiveDate,
        work_start_time: NaiveTime,
        work_end_time: NaiveTime,
    ) -> Self {
        Self {
            employee_id,
            schedule_date,
            work_start_time: Some(work_start_time),
            work_end_time: Some(work_end_time),
        }
    }
}
