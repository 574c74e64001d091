//! Read-only collaborator interfaces for punch records and schedules.
//!
//! The engine does not own persistence. It reads through these traits,
//! which are blocking and carry no timeout of their own.

mod memory;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::IntegrityResult;
use crate::models::{PunchRecord, ScheduleEntry};

pub use memory::{InMemoryRecordStore, InMemoryScheduleLookup};

/// Read access to stored punch records.
pub trait RecordStore: Send + Sync {
    /// Returns at most `limit` punches for the user and day, newest first.
    fn query_recent_punches(
        &self,
        user_id: u64,
        date: NaiveDate,
        limit: usize,
    ) -> IntegrityResult<Vec<PunchRecord>>;

    /// Returns punches for the user and day whose punch time lies in
    /// `[start, end]`, oldest first.
    fn query_punches_in_window(
        &self,
        user_id: u64,
        date: NaiveDate,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> IntegrityResult<Vec<PunchRecord>>;
}

/// Read access to employee schedules.
pub trait ScheduleLookup: Send + Sync {
    /// Returns the schedule for the employee and day, if one exists.
    fn get_schedule(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> IntegrityResult<Option<ScheduleEntry>>;
}
