//! Suspicious punch detection: frequent punching and multi-device punching.
//!
//! Both checks read the same set of the day's most recent punches. By
//! default that set is simply the newest N records of the day, whatever
//! their spread in time. [`narrow_to_window`] optionally restricts it to a
//! true time window around the current punch.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

use crate::models::{Anomaly, AnomalyDetail, AnomalyLevel, PunchRecord};

/// Keeps only punches within `window_minutes` of the record's punch time.
///
/// With no window, or when the record itself has no punch time, the recent
/// set is returned unchanged. Window edges that fall outside the calendar
/// are clamped to it.
pub fn narrow_to_window(
    record: &PunchRecord,
    recent: Vec<PunchRecord>,
    window_minutes: Option<i64>,
) -> Vec<PunchRecord> {
    let (Some(minutes), Some(anchor)) = (window_minutes, record.punch_time) else {
        return recent;
    };
    let window = Duration::try_minutes(minutes).unwrap_or(Duration::MAX);
    let start = anchor
        .checked_sub_signed(window)
        .unwrap_or(NaiveDateTime::MIN);
    let end = anchor
        .checked_add_signed(window)
        .unwrap_or(NaiveDateTime::MAX);

    recent
        .into_iter()
        .filter(|r| r.punch_time.is_some_and(|t| t >= start && t <= end))
        .collect()
}

/// Emits a LOW anomaly when the recent set holds more than `threshold`
/// punches.
pub fn detect_frequent_punch(
    record: &PunchRecord,
    recent: &[PunchRecord],
    threshold: usize,
    detection_time: DateTime<Utc>,
) -> Option<Anomaly> {
    let count = recent.len();
    if count <= threshold {
        return None;
    }

    Some(Anomaly::for_record(
        record,
        AnomalyDetail::FrequentPunch { count },
        AnomalyLevel::Low,
        format!("Punched {} times in a short period", count),
        detection_time,
    ))
}

/// Emits a MEDIUM anomaly when the recent set holds punches from devices
/// other than the record's.
///
/// The reported device count is the number of distinct other devices plus
/// the record's own.
pub fn detect_multi_device_punch(
    record: &PunchRecord,
    recent: &[PunchRecord],
    detection_time: DateTime<Utc>,
) -> Option<Anomaly> {
    let other_devices: BTreeSet<u64> = recent
        .iter()
        .map(|r| r.device_id)
        .filter(|device| *device != record.device_id)
        .collect();
    if other_devices.is_empty() {
        return None;
    }

    let device_count = other_devices.len() + 1;
    Some(Anomaly::for_record(
        record,
        AnomalyDetail::MultiDevicePunch { device_count },
        AnomalyLevel::Medium,
        format!("Punched on {} different devices in a short period", device_count),
        detection_time,
    ))
}
