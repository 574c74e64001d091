//! The anomaly detector.
//!
//! Runs every rule against a punch record, caches what it finds, and hands
//! the findings to the event publisher.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::cache::{KeyedLocks, VersionedCache};
use crate::config::{BatchErrorPolicy, CacheConfig, DetectionConfig};
use crate::error::IntegrityResult;
use crate::events::EventPublisher;
use crate::models::{
    Anomaly, AnomalyRecord, AnomalyStatistics, AnomalyType, PunchRecord, ScheduleEntry,
};
use crate::store::{RecordStore, ScheduleLookup};

use super::absence::detect_absence;
use super::early_leave::detect_early_leave;
use super::late::detect_late;
use super::suspicious::{detect_frequent_punch, detect_multi_device_punch, narrow_to_window};

/// Cache slot of an anomaly: one per type, user and day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnomalyCacheKey {
    /// The anomaly type.
    pub anomaly_type: AnomalyType,
    /// The user.
    pub user_id: u64,
    /// The attendance day.
    pub attendance_date: NaiveDate,
}

impl AnomalyCacheKey {
    /// Returns the slot an anomaly is cached in.
    pub fn of(anomaly: &Anomaly) -> Self {
        Self {
            anomaly_type: anomaly.anomaly_type(),
            user_id: anomaly.user_id,
            attendance_date: anomaly.attendance_date,
        }
    }
}

impl fmt::Display for AnomalyCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.anomaly_type, self.user_id, self.attendance_date)
    }
}

/// Detects attendance anomalies on individual punch records.
///
/// Checks run independently: one record may yield several anomaly types.
/// Missing schedules skip the schedule checks (fail-open), and collaborator
/// failures skip only the checks that depend on them.
pub struct AnomalyDetector {
    records: Arc<dyn RecordStore>,
    schedules: Arc<dyn ScheduleLookup>,
    publisher: Arc<dyn EventPublisher>,
    config: DetectionConfig,
    cache: VersionedCache<AnomalyCacheKey, AnomalyRecord>,
    locks: KeyedLocks<(u64, NaiveDate)>,
}

impl AnomalyDetector {
    /// Creates a detector over the given collaborators.
    pub fn new(
        records: Arc<dyn RecordStore>,
        schedules: Arc<dyn ScheduleLookup>,
        publisher: Arc<dyn EventPublisher>,
        config: DetectionConfig,
        cache_config: &CacheConfig,
    ) -> Self {
        Self {
            records,
            schedules,
            publisher,
            config,
            cache: VersionedCache::from_config(cache_config),
            locks: KeyedLocks::new(),
        }
    }

    /// Returns the detector thresholds.
    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Detects every anomaly on `record`.
    ///
    /// Fails only when the record itself is malformed. Lookup failures are
    /// logged and skip the affected checks. Detection, caching and
    /// publishing for one user and day run under a single lock.
    pub fn detect_anomalies(&self, record: &PunchRecord) -> IntegrityResult<Vec<Anomaly>> {
        record.validate()?;

        debug!(
            user_id = record.user_id,
            date = %record.attendance_date,
            record_id = record.record_id,
            "Detecting attendance anomalies"
        );

        let key = (record.user_id, record.attendance_date);
        let anomalies = self.locks.with_lock(&key, || {
            let detection_time = Utc::now();
            let anomalies = self.run_checks(record, detection_time);
            if !anomalies.is_empty() {
                self.record_and_publish(record, &anomalies, detection_time);
            }
            anomalies
        });

        debug!(
            user_id = record.user_id,
            anomalies = anomalies.len(),
            "Anomaly detection finished"
        );
        Ok(anomalies)
    }

    /// Detects anomalies, logging and swallowing any failure.
    ///
    /// An empty result cannot be told apart from a failed detection; prefer
    /// [`AnomalyDetector::detect_anomalies`] where that matters.
    pub fn detect_anomalies_lenient(&self, record: &PunchRecord) -> Vec<Anomaly> {
        self.detect_anomalies(record).unwrap_or_else(|err| {
            warn!(
                user_id = record.user_id,
                record_id = record.record_id,
                error = %err,
                "Anomaly detection failed"
            );
            Vec::new()
        })
    }

    /// Detects anomalies across a batch using the configured error policy.
    pub fn batch_detect_anomalies(
        &self,
        records: &[PunchRecord],
    ) -> IntegrityResult<AnomalyStatistics> {
        self.batch_detect_anomalies_with(records, self.config.batch_error_policy)
    }

    /// Detects anomalies across a batch.
    ///
    /// With [`BatchErrorPolicy::Continue`] a failing record is counted in
    /// `failed_records` and the batch carries on; with
    /// [`BatchErrorPolicy::Abort`] the first failure is returned.
    pub fn batch_detect_anomalies_with(
        &self,
        records: &[PunchRecord],
        policy: BatchErrorPolicy,
    ) -> IntegrityResult<AnomalyStatistics> {
        info!(record_count = records.len(), "Starting batch anomaly detection");

        let mut statistics = AnomalyStatistics::new(records.len(), Utc::now());
        for record in records {
            match self.detect_anomalies(record) {
                Ok(anomalies) => statistics.record(&anomalies),
                Err(err) => match policy {
                    BatchErrorPolicy::Abort => return Err(err),
                    BatchErrorPolicy::Continue => {
                        warn!(
                            record_id = record.record_id,
                            error = %err,
                            "Skipping record in batch detection"
                        );
                        statistics.failed_records += 1;
                    }
                },
            }
        }

        info!(
            record_count = statistics.total_records,
            total_anomalies = statistics.total_anomalies,
            failed_records = statistics.failed_records,
            "Batch anomaly detection finished"
        );
        Ok(statistics)
    }

    /// Returns the cached anomaly of one type for a user and day.
    pub fn get_anomaly_record(
        &self,
        anomaly_type: AnomalyType,
        user_id: u64,
        attendance_date: NaiveDate,
    ) -> Option<AnomalyRecord> {
        self.cache.get(&AnomalyCacheKey {
            anomaly_type,
            user_id,
            attendance_date,
        })
    }

    /// Returns every cached anomaly.
    pub fn get_all_anomaly_records(&self) -> Vec<AnomalyRecord> {
        self.cache.values()
    }

    /// Empties the anomaly cache.
    pub fn clear_anomaly_cache(&self) {
        info!("Clearing anomaly cache");
        self.cache.clear();
    }

    fn run_checks(&self, record: &PunchRecord, detection_time: DateTime<Utc>) -> Vec<Anomaly> {
        let mut anomalies = Vec::new();

        if let Some(schedule) = self.lookup_schedule(record) {
            if let Some(start) = schedule.work_start_time {
                if let Some(anomaly) = detect_late(record, start, &self.config, detection_time) {
                    info!(
                        user_id = record.user_id,
                        date = %record.attendance_date,
                        "Late arrival detected"
                    );
                    anomalies.push(anomaly);
                }
            }
            if let Some(end) = schedule.work_end_time {
                if let Some(anomaly) =
                    detect_early_leave(record, end, &self.config, detection_time)
                {
                    info!(
                        user_id = record.user_id,
                        date = %record.attendance_date,
                        "Early leave detected"
                    );
                    anomalies.push(anomaly);
                }
            }
        }

        if let Some(anomaly) = detect_absence(record, detection_time) {
            warn!(user_id = record.user_id, date = %record.attendance_date, "Absence detected");
            anomalies.push(anomaly);
        }

        anomalies.extend(self.detect_suspicious(record, detection_time));
        anomalies
    }

    fn lookup_schedule(&self, record: &PunchRecord) -> Option<ScheduleEntry> {
        match self
            .schedules
            .get_schedule(record.user_id, record.attendance_date)
        {
            Ok(schedule) => schedule,
            Err(err) => {
                warn!(
                    user_id = record.user_id,
                    date = %record.attendance_date,
                    error = %err,
                    "Schedule lookup failed, skipping late and early leave checks"
                );
                None
            }
        }
    }

    fn detect_suspicious(
        &self,
        record: &PunchRecord,
        detection_time: DateTime<Utc>,
    ) -> Vec<Anomaly> {
        let recent = match self.records.query_recent_punches(
            record.user_id,
            record.attendance_date,
            self.config.recent_punch_limit,
        ) {
            Ok(recent) => recent,
            Err(err) => {
                warn!(
                    user_id = record.user_id,
                    date = %record.attendance_date,
                    error = %err,
                    "Recent punch query failed, skipping suspicious punch checks"
                );
                return Vec::new();
            }
        };
        let recent = narrow_to_window(record, recent, self.config.suspicious_window_minutes);

        let mut anomalies = Vec::new();
        if let Some(anomaly) = detect_frequent_punch(
            record,
            &recent,
            self.config.frequent_punch_threshold,
            detection_time,
        ) {
            warn!(
                user_id = record.user_id,
                date = %record.attendance_date,
                count = recent.len(),
                "Frequent punching detected"
            );
            anomalies.push(anomaly);
        }
        if let Some(anomaly) = detect_multi_device_punch(record, &recent, detection_time) {
            warn!(
                user_id = record.user_id,
                date = %record.attendance_date,
                "Multi-device punching detected"
            );
            anomalies.push(anomaly);
        }
        anomalies
    }

    fn record_and_publish(
        &self,
        record: &PunchRecord,
        anomalies: &[Anomaly],
        detection_time: DateTime<Utc>,
    ) {
        for anomaly in anomalies {
            self.cache.insert(
                AnomalyCacheKey::of(anomaly),
                AnomalyRecord {
                    anomaly: anomaly.clone(),
                    record: record.clone(),
                    record_time: detection_time,
                },
            );
        }

        // Cached anomalies stay cached even if publishing fails.
        if let Err(err) = self.publisher.send_anomaly_event(anomalies) {
            warn!(
                user_id = record.user_id,
                anomalies = anomalies.len(),
                error = %err,
                "Failed to publish anomaly event"
            );
        }
    }
}
