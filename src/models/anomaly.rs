//! Anomaly models for the punch integrity engine.
//!
//! This module contains the [`Anomaly`] type produced by the detector, the
//! closed set of anomaly types and levels, the cached [`AnomalyRecord`] and
//! the [`AnomalyStatistics`] folded over a batch.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::PunchRecord;

/// The kind of deviation an anomaly reports.
///
/// # Example
///
/// ```
/// use punch_integrity::models::AnomalyType;
///
/// assert_eq!(AnomalyType::EarlyLeave.to_string(), "EARLY_LEAVE");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyType {
    /// Punched after the scheduled start plus grace.
    Late,
    /// Punched before the scheduled end minus grace.
    EarlyLeave,
    /// Marked absent.
    Absent,
    /// Too many punches for the day.
    FrequentPunch,
    /// Punches from more than one device.
    MultiDevicePunch,
}

impl AnomalyType {
    /// Every anomaly type, in declaration order.
    pub const ALL: [AnomalyType; 5] = [
        AnomalyType::Late,
        AnomalyType::EarlyLeave,
        AnomalyType::Absent,
        AnomalyType::FrequentPunch,
        AnomalyType::MultiDevicePunch,
    ];

    /// Returns the wire name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyType::Late => "LATE",
            AnomalyType::EarlyLeave => "EARLY_LEAVE",
            AnomalyType::Absent => "ABSENT",
            AnomalyType::FrequentPunch => "FREQUENT_PUNCH",
            AnomalyType::MultiDevicePunch => "MULTI_DEVICE_PUNCH",
        }
    }
}

impl fmt::Display for AnomalyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of an anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyLevel {
    /// Informational.
    Low,
    /// Needs review.
    Medium,
    /// Needs action.
    High,
}

/// The measured quantity behind an anomaly, tagged by its type.
///
/// Flattened into [`Anomaly`] on the wire, so the JSON carries
/// `"type": "LATE", "minutes": 7`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyDetail {
    /// Minutes after the scheduled start, rounded down.
    Late {
        /// Minutes late.
        minutes: i64,
    },
    /// Minutes before the scheduled end, rounded down.
    EarlyLeave {
        /// Minutes early.
        minutes: i64,
    },
    /// No punch and no leave.
    Absent,
    /// Number of punches returned by the recent-punch query.
    FrequentPunch {
        /// Punch count.
        count: usize,
    },
    /// Distinct devices involved, including the current one.
    MultiDevicePunch {
        /// Device count.
        device_count: usize,
    },
}

impl AnomalyDetail {
    /// Returns the anomaly type this detail belongs to.
    pub fn anomaly_type(&self) -> AnomalyType {
        match self {
            AnomalyDetail::Late { .. } => AnomalyType::Late,
            AnomalyDetail::EarlyLeave { .. } => AnomalyType::EarlyLeave,
            AnomalyDetail::Absent => AnomalyType::Absent,
            AnomalyDetail::FrequentPunch { .. } => AnomalyType::FrequentPunch,
            AnomalyDetail::MultiDevicePunch { .. } => AnomalyType::MultiDevicePunch,
        }
    }
}

/// A detected deviation from expected attendance behaviour.
///
/// Created fresh per detection call and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anomaly {
    /// Opaque unique identifier.
    pub anomaly_id: String,
    /// The user the anomaly concerns.
    pub user_id: u64,
    /// The user's department, when known.
    pub department_id: Option<u64>,
    /// The attendance day.
    pub attendance_date: NaiveDate,
    /// Type and measured quantity.
    #[serde(flatten)]
    pub detail: AnomalyDetail,
    /// Severity.
    pub level: AnomalyLevel,
    /// Human-readable summary.
    pub description: String,
    /// When the anomaly was detected.
    pub detection_time: DateTime<Utc>,
}

impl Anomaly {
    /// Creates an anomaly for `record` with a freshly generated ID.
    pub fn for_record(
        record: &PunchRecord,
        detail: AnomalyDetail,
        level: AnomalyLevel,
        description: String,
        detection_time: DateTime<Utc>,
    ) -> Self {
        Self {
            anomaly_id: generate_anomaly_id(detection_time),
            user_id: record.user_id,
            department_id: record.department_id,
            attendance_date: record.attendance_date,
            detail,
            level,
            description,
            detection_time,
        }
    }

    /// Returns the anomaly type.
    pub fn anomaly_type(&self) -> AnomalyType {
        self.detail.anomaly_type()
    }
}

/// Builds an anomaly ID of the form `ANOMALY-<epoch millis>-<uuid>`.
///
/// The full UUID is kept; truncating it trades collision resistance for
/// shorter log lines.
pub fn generate_anomaly_id(at: DateTime<Utc>) -> String {
    format!(
        "ANOMALY-{}-{}",
        at.timestamp_millis(),
        Uuid::new_v4().simple()
    )
}

/// A cached anomaly together with the record that triggered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    /// The anomaly.
    pub anomaly: Anomaly,
    /// The punch record it was detected on.
    pub record: PunchRecord,
    /// When the entry was written to the cache.
    pub record_time: DateTime<Utc>,
}

/// Aggregate counts over a batch detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyStatistics {
    /// Number of records submitted.
    pub total_records: usize,
    /// Number of anomalies detected across the batch.
    pub total_anomalies: usize,
    /// Number of records whose detection failed.
    pub failed_records: usize,
    /// Anomaly count per type. Types with no anomaly are absent.
    pub anomaly_type_count: BTreeMap<AnomalyType, usize>,
    /// When the batch ran.
    pub detection_time: DateTime<Utc>,
}

impl AnomalyStatistics {
    /// Creates empty statistics for a batch of `total_records`.
    pub fn new(total_records: usize, detection_time: DateTime<Utc>) -> Self {
        Self {
            total_records,
            total_anomalies: 0,
            failed_records: 0,
            anomaly_type_count: BTreeMap::new(),
            detection_time,
        }
    }

    /// Folds one record's anomalies into the totals.
    pub fn record(&mut self, anomalies: &[Anomaly]) {
        self.total_anomalies += anomalies.len();
        for anomaly in anomalies {
            *self
                .anomaly_type_count
                .entry(anomaly.anomaly_type())
                .or_insert(0) += 1;
        }
    }

    /// Returns the count for one type, zero when none were seen.
    pub fn count_of(&self, anomaly_type: AnomalyType) -> usize {
        self.anomaly_type_count
            .get(&anomaly_type)
            .copied()
            .unwrap_or(0)
    }

    /// Anomalies per submitted record, rounded to 4 decimal places.
    ///
    /// # Example
    ///
    /// ```
    /// use punch_integrity::models::AnomalyStatistics;
    /// use chrono::Utc;
    /// use rust_decimal::Decimal;
    ///
    /// let mut stats = AnomalyStatistics::new(4, Utc::now());
    /// stats.total_anomalies = 1;
    /// assert_eq!(stats.anomaly_rate(), Decimal::new(25, 2));
    /// ```
    pub fn anomaly_rate(&self) -> Decimal {
        if self.total_records == 0 {
            return Decimal::ZERO;
        }
        (Decimal::from(self.total_anomalies) / Decimal::from(self.total_records)).round_dp(4)
    }
}
