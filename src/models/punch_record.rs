//! Punch record model and related types.
//!
//! This module defines the [`PunchRecord`] consumed from the persistence
//! layer and the [`AttendanceStatus`] it carries.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{IntegrityError, IntegrityResult};

/// The attendance status stamped on a record by the persistence layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    /// Punched within the schedule.
    Normal,
    /// Flagged late upstream.
    Late,
    /// Flagged as leaving early upstream.
    EarlyLeave,
    /// No punch and no approved leave.
    Absent,
    /// On approved leave.
    Leave,
    /// Any status this engine does not recognise.
    #[serde(other)]
    Unknown,
}

/// A single clock-in or clock-out event from a user at a device.
///
/// Records are owned by the persistence layer and are never mutated here.
///
/// # Example
///
/// ```
/// use punch_integrity::models::{AttendanceStatus, PunchRecord};
/// use chrono::{NaiveDate, NaiveDateTime};
///
/// let record = PunchRecord {
///     record_id: 1,
///     user_id: 42,
///     department_id: Some(7),
///     device_id: 500,
///     attendance_date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
///     punch_time: Some(
///         NaiveDateTime::parse_from_str("2026-01-15 09:07:00", "%Y-%m-%d %H:%M:%S").unwrap(),
///     ),
///     attendance_status: AttendanceStatus::Normal,
/// };
/// assert!(record.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PunchRecord {
    /// Unique identifier of the record.
    pub record_id: u64,
    /// The user who punched.
    pub user_id: u64,
    /// The user's department, when known.
    #[serde(default)]
    pub department_id: Option<u64>,
    /// The device that captured the punch.
    pub device_id: u64,
    /// The attendance day the punch is booked against.
    pub attendance_date: NaiveDate,
    /// When the punch happened. Absence records may carry none.
    #[serde(default)]
    pub punch_time: Option<NaiveDateTime>,
    /// Status stamped by the persistence layer.
    pub attendance_status: AttendanceStatus,
}

impl PunchRecord {
    /// Returns true if the record is marked absent.
    pub fn is_absent(&self) -> bool {
        self.attendance_status == AttendanceStatus::Absent
    }

    /// Checks that the record is well formed.
    ///
    /// A record that is not an absence must carry a punch time. The punch
    /// time is not required to fall on the attendance date.
    pub fn validate(&self) -> IntegrityResult<()> {
        if self.punch_time.is_none() && !self.is_absent() {
            return Err(IntegrityError::InvalidRecord {
                record_id: self.record_id,
                message: "punch time is missing".to_string(),
            });
        }
        Ok(())
    }
}
