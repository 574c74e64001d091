//! Late arrival detection.
//!
//! A punch is late when it lands more than the grace period after the
//! scheduled start of work.

use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime, Utc};

use crate::config::DetectionConfig;
use crate::models::{Anomaly, AnomalyDetail, AnomalyLevel, PunchRecord};

/// Returns the anomaly level for a late or early deviation.
///
/// Strictly more than `high_threshold_minutes` is HIGH, anything else MEDIUM.
///
/// # Example
///
/// ```
/// use punch_integrity::detection::level_for_minutes;
/// use punch_integrity::models::AnomalyLevel;
///
/// assert_eq!(level_for_minutes(30, 30), AnomalyLevel::Medium);
/// assert_eq!(level_for_minutes(31, 30), AnomalyLevel::High);
/// ```
pub fn level_for_minutes(minutes: i64, high_threshold_minutes: i64) -> AnomalyLevel {
    if minutes > high_threshold_minutes {
        AnomalyLevel::High
    } else {
        AnomalyLevel::Medium
    }
}

/// Returns how many whole minutes late `punch_time` is, if it is late at all.
///
/// The scheduled start is anchored on the punch's own calendar day, and the
/// result is rounded down. A grace period too large to add to the schedule
/// never reports late.
///
/// # Examples
///
/// ```
/// use punch_integrity::detection::late_minutes;
/// use chrono::{NaiveDateTime, NaiveTime};
///
/// let start = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
/// let punch = |s: &str| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap();
///
/// assert_eq!(late_minutes(punch("2026-01-15 09:07:00"), start, 5), Some(7));
/// assert_eq!(late_minutes(punch("2026-01-15 09:05:00"), start, 5), None);
/// ```
pub fn late_minutes(
    punch_time: NaiveDateTime,
    work_start: NaiveTime,
    grace_minutes: i64,
) -> Option<i64> {
    let scheduled = punch_time.date().and_time(work_start);
    let threshold = Duration::try_minutes(grace_minutes)
        .and_then(|grace| scheduled.checked_add_signed(grace))?;
    if punch_time > threshold {
        Some((punch_time - scheduled).num_minutes())
    } else {
        None
    }
}

/// Checks one record against the scheduled start of work.
///
/// Returns `None` when the record has no punch time or is within grace.
pub fn detect_late(
    record: &PunchRecord,
    work_start: NaiveTime,
    config: &DetectionConfig,
    detection_time: DateTime<Utc>,
) -> Option<Anomaly> {
    let punch_time = record.punch_time?;
    let minutes = late_minutes(punch_time, work_start, config.late_grace_minutes)?;

    Some(Anomaly::for_record(
        record,
        AnomalyDetail::Late { minutes },
        level_for_minutes(minutes, config.high_level_threshold_minutes),
        format!("Late by {} minutes", minutes),
        detection_time,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AttendanceStatus;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn start() -> NaiveTime {
        NaiveTime::from_hms_opt(9, 0, 0).unwrap()
    }

    fn make_record(time: &str) -> PunchRecord {
        let date = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        PunchRecord {
            record_id: 1,
            user_id: 42,
            department_id: Some(7),
            device_id: 500,
            attendance_date: date,
            punch_time: Some(date.and_time(NaiveTime::parse_from_str(time, "%H:%M:%S").unwrap())),
            attendance_status: AttendanceStatus::Normal,
        }
    }

    #[test]
    fn test_seven_minutes_late_is_medium() {
        let anomaly = detect_late(
            &make_record("09:07:00"),
            start(),
            &DetectionConfig::default(),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(anomaly.detail, AnomalyDetail::Late { minutes: 7 });
        assert_eq!(anomaly.level, AnomalyLevel::Medium);
        assert_eq!(anomaly.description, "Late by 7 minutes");
        assert_eq!(anomaly.user_id, 42);
        assert_eq!(anomaly.department_id, Some(7));
    }

    #[test]
    fn test_forty_five_minutes_late_is_high() {
        let anomaly = detect_late(
            &make_record("09:45:00"),
            start(),
            &DetectionConfig::default(),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(anomaly.detail, AnomalyDetail::Late { minutes: 45 });
        assert_eq!(anomaly.level, AnomalyLevel::High);
    }

    #[test]
    fn test_exactly_thirty_minutes_late_is_medium() {
        let anomaly = detect_late(
            &make_record("09:30:00"),
            start(),
            &DetectionConfig::default(),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(anomaly.level, AnomalyLevel::Medium);
    }

    #[test]
    fn test_within_grace_is_not_late() {
        let config = DetectionConfig::default();
        assert!(detect_late(&make_record("09:05:00"), start(), &config, Utc::now()).is_none());
        assert!(detect_late(&make_record("08:50:00"), start(), &config, Utc::now()).is_none());
    }

    #[test]
    fn test_partial_minutes_round_down() {
        let anomaly = detect_late(
            &make_record("09:07:59"),
            start(),
            &DetectionConfig::default(),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(anomaly.detail, AnomalyDetail::Late { minutes: 7 });
    }

    #[test]
    fn test_record_without_punch_time_is_skipped() {
        let mut record = make_record("09:30:00");
        record.punch_time = None;
        assert!(detect_late(&record, start(), &DetectionConfig::default(), Utc::now()).is_none());
    }

    #[test]
    fn test_out_of_range_grace_is_never_late() {
        let punch = make_record("23:59:00").punch_time.unwrap();
        assert_eq!(late_minutes(punch, start(), 200_000_000_000), None);
        assert_eq!(late_minutes(punch, start(), i64::MAX), None);
    }

    proptest! {
        #[test]
        fn prop_late_iff_past_grace(offset_secs in -3600i64..14_400) {
            let date = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
            let scheduled = date.and_time(start());
            let punch = scheduled + Duration::seconds(offset_secs);
            prop_assume!(punch.date() == date);

            let result = late_minutes(punch, start(), 5);
            if offset_secs > 300 {
                let minutes = result.unwrap();
                prop_assert_eq!(minutes, offset_secs / 60);
                let level = level_for_minutes(minutes, 30);
                prop_assert_eq!(level == AnomalyLevel::High, minutes > 30);
            } else {
                prop_assert!(result.is_none());
            }
        }
    }
}
