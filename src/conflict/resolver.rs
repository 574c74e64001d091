//! The multi-device conflict resolver.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use tracing::{debug, info, warn};

use crate::cache::{KeyedLocks, Versioned, VersionedCache};
use crate::config::{BatchErrorPolicy, CacheConfig, ConflictConfig};
use crate::error::{IntegrityError, IntegrityResult};
use crate::models::{
    ConflictBatchSummary, ConflictRecord, ConflictResolutionResult, PunchRecord,
};
use crate::store::RecordStore;

use super::policy::{DeviceIdThreshold, PrimaryDevicePolicy};
use super::strategy::{apply_strategy, select_strategy};

/// Resolves punches from several devices that land close together for the
/// same user and day.
///
/// The latest resolution for a user and day is cached; a later one
/// replaces it and carries a higher version.
pub struct ConflictResolver {
    records: Arc<dyn RecordStore>,
    policy: Arc<dyn PrimaryDevicePolicy>,
    config: ConflictConfig,
    cache: VersionedCache<(u64, NaiveDate), ConflictRecord>,
    locks: KeyedLocks<(u64, NaiveDate)>,
}

impl ConflictResolver {
    /// Creates a resolver that treats devices below
    /// `config.primary_device_below` as primary.
    pub fn new(
        records: Arc<dyn RecordStore>,
        config: ConflictConfig,
        cache_config: &CacheConfig,
    ) -> Self {
        let policy = DeviceIdThreshold {
            below: config.primary_device_below,
        };
        Self {
            records,
            policy: Arc::new(policy),
            config,
            cache: VersionedCache::from_config(cache_config),
            locks: KeyedLocks::new(),
        }
    }

    /// Replaces the primary device policy.
    pub fn with_policy(mut self, policy: impl PrimaryDevicePolicy + 'static) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// Returns the resolver settings.
    pub fn config(&self) -> &ConflictConfig {
        &self.config
    }

    /// Resolves conflicts between `new_record` and punches from other
    /// devices within the configured window.
    ///
    /// Returns [`ConflictResolutionResult::NoConflict`] without touching the
    /// cache when no other device punched in the window. Fails when the
    /// record is malformed or the record store cannot be read.
    pub fn resolve_conflict(
        &self,
        new_record: &PunchRecord,
    ) -> IntegrityResult<ConflictResolutionResult> {
        new_record.validate()?;
        let punch_time = new_record
            .punch_time
            .ok_or_else(|| IntegrityError::InvalidRecord {
                record_id: new_record.record_id,
                message: "conflict resolution needs a punch time".to_string(),
            })?;

        let (start, end) = self.window_around(punch_time)?;
        let key = (new_record.user_id, new_record.attendance_date);

        self.locks.with_lock(&key, || -> IntegrityResult<ConflictResolutionResult> {
            let in_window = self.records.query_punches_in_window(
                new_record.user_id,
                new_record.attendance_date,
                start,
                end,
            )?;
            let conflicting: Vec<PunchRecord> = in_window
                .into_iter()
                .filter(|r| r.device_id != new_record.device_id)
                .collect();

            if conflicting.is_empty() {
                debug!(
                    user_id = new_record.user_id,
                    date = %new_record.attendance_date,
                    "No conflicting punches"
                );
                return Ok(ConflictResolutionResult::no_conflict());
            }

            let strategy = select_strategy(
                new_record,
                &conflicting,
                self.policy.as_ref(),
                self.config.fallback_strategy,
            );
            let decision = apply_strategy(strategy, new_record, &conflicting, self.policy.as_ref());

            let mut devices: BTreeSet<u64> = conflicting.iter().map(|r| r.device_id).collect();
            devices.insert(new_record.device_id);
            let detection_time = Utc::now();

            let version = self.cache.insert_with(key, |version| ConflictRecord {
                user_id: new_record.user_id,
                attendance_date: new_record.attendance_date,
                conflicting_devices: devices,
                resolution_strategy: decision.strategy,
                keep_record_id: decision.keep_record_id,
                conflict_record_ids: decision.conflict_record_ids.clone(),
                detection_time,
                version,
            });

            info!(
                user_id = new_record.user_id,
                date = %new_record.attendance_date,
                strategy = %decision.strategy,
                keep_record_id = decision.keep_record_id,
                conflicts = decision.conflict_record_ids.len(),
                version,
                "Punch conflict resolved"
            );
            Ok(ConflictResolutionResult::Conflict(decision))
        })
    }

    /// Resolves conflicts, turning any failure into
    /// [`ConflictResolutionResult::Failure`].
    pub fn resolve_conflict_lenient(&self, new_record: &PunchRecord) -> ConflictResolutionResult {
        self.resolve_conflict(new_record).unwrap_or_else(|err| {
            warn!(
                user_id = new_record.user_id,
                record_id = new_record.record_id,
                error = %err,
                "Conflict resolution failed"
            );
            ConflictResolutionResult::failure(err.to_string())
        })
    }

    /// Resolves a batch using the configured error policy.
    pub fn batch_resolve_conflicts(
        &self,
        records: &[PunchRecord],
    ) -> IntegrityResult<ConflictBatchSummary> {
        self.batch_resolve_conflicts_with(records, self.config.batch_error_policy)
    }

    /// Resolves a batch one record at a time, in order.
    ///
    /// With [`BatchErrorPolicy::Continue`] failures are tallied in
    /// `failed_count`; with [`BatchErrorPolicy::Abort`] the first failure is
    /// returned.
    pub fn batch_resolve_conflicts_with(
        &self,
        records: &[PunchRecord],
        policy: BatchErrorPolicy,
    ) -> IntegrityResult<ConflictBatchSummary> {
        info!(record_count = records.len(), "Starting batch conflict resolution");

        let mut summary = ConflictBatchSummary::new(records.len(), Utc::now());
        for record in records {
            let result = match self.resolve_conflict(record) {
                Ok(result) => result,
                Err(err) => match policy {
                    BatchErrorPolicy::Abort => return Err(err),
                    BatchErrorPolicy::Continue => {
                        warn!(
                            record_id = record.record_id,
                            error = %err,
                            "Skipping record in batch conflict resolution"
                        );
                        ConflictResolutionResult::failure(err.to_string())
                    }
                },
            };
            summary.record(&result);
        }

        info!(
            record_count = summary.total_records,
            conflict_count = summary.conflict_count,
            failed_count = summary.failed_count,
            "Batch conflict resolution finished"
        );
        Ok(summary)
    }

    /// Returns the cached conflict for a user and day.
    pub fn get_conflict_record(
        &self,
        user_id: u64,
        attendance_date: NaiveDate,
    ) -> Option<ConflictRecord> {
        self.cache.get(&(user_id, attendance_date))
    }

    /// Returns the cached conflict for a user and day with its version.
    pub fn get_conflict_record_versioned(
        &self,
        user_id: u64,
        attendance_date: NaiveDate,
    ) -> Option<Versioned<ConflictRecord>> {
        self.cache.get_versioned(&(user_id, attendance_date))
    }

    /// Returns every cached conflict.
    pub fn get_all_conflict_records(&self) -> Vec<ConflictRecord> {
        self.cache.values()
    }

    /// Empties the conflict cache.
    pub fn clear_conflict_cache(&self) {
        info!("Clearing conflict cache");
        self.cache.clear();
    }

    fn window_around(
        &self,
        punch_time: NaiveDateTime,
    ) -> IntegrityResult<(NaiveDateTime, NaiveDateTime)> {
        let minutes = self.config.window_minutes;
        let bounds = Duration::try_minutes(minutes).and_then(|window| {
            Some((
                punch_time.checked_sub_signed(window)?,
                punch_time.checked_add_signed(window)?,
            ))
        });
        bounds.ok_or_else(|| IntegrityError::InvalidConfig {
            field: "conflict.window_minutes".to_string(),
            message: format!("{} minutes around {} is out of range", minutes, punch_time),
        })
    }
}
