//! Absence detection.

use chrono::{DateTime, Utc};

use crate::models::{Anomaly, AnomalyDetail, AnomalyLevel, PunchRecord};

/// Emits a HIGH absence anomaly when the record is marked absent.
///
/// Needs no schedule: the status stamped upstream is authoritative.
pub fn detect_absence(record: &PunchRecord, detection_time: DateTime<Utc>) -> Option<Anomaly> {
    if !record.is_absent() {
        return None;
    }

    Some(Anomaly::for_record(
        record,
        AnomalyDetail::Absent,
        AnomalyLevel::High,
        "Absent without punch or approved leave".to_string(),
        detection_time,
    ))
}
