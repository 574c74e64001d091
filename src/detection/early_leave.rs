//! Early leave detection.
//!
//! Mirror image of the late check: a punch is early when it lands more than
//! the grace period before the scheduled end of work.

use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime, Utc};

use crate::config::DetectionConfig;
use crate::models::{Anomaly, AnomalyDetail, PunchRecord};

use super::late::level_for_minutes;

/// Returns how many whole minutes before the scheduled end `punch_time` is,
/// if it is early at all.
///
/// # Example
///
/// ```
/// use punch_integrity::detection::early_leave_minutes;
/// use chrono::{NaiveDateTime, NaiveTime};
///
/// let end = NaiveTime::from_hms_opt(17, 0, 0).unwrap();
/// let punch = NaiveDateTime::parse_from_str("2026-01-15 16:48:00", "%Y-%m-%d %H:%M:%S").unwrap();
/// assert_eq!(early_leave_minutes(punch, end, 5), Some(12));
/// ```
pub fn early_leave_minutes(
    punch_time: NaiveDateTime,
    work_end: NaiveTime,
    grace_minutes: i64,
) -> Option<i64> {
    let scheduled = punch_time.date().and_time(work_end);
    let threshold = Duration::try_minutes(grace_minutes)
        .and_then(|grace| scheduled.checked_sub_signed(grace))?;
    if punch_time < threshold {
        Some((scheduled - punch_time).num_minutes())
    } else {
        None
    }
}

/// Checks one record against the scheduled end of work.
pub fn detect_early_leave(
    record: &PunchRecord,
    work_end: NaiveTime,
    config: &DetectionConfig,
    detection_time: DateTime<Utc>,
) -> Option<Anomaly> {
    let punch_time = record.punch_time?;
    let minutes = early_leave_minutes(punch_time, work_end, config.early_leave_grace_minutes)?;

    Some(Anomaly::for_record(
        record,
        AnomalyDetail::EarlyLeave { minutes },
        level_for_minutes(minutes, config.high_level_threshold_minutes),
        format!("Left {} minutes early", minutes),
        detection_time,
    ))
}
