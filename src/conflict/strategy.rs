//! Strategy selection and application.
//!
//! Both steps are pure: they see only the new punch and the punches from
//! other devices that collide with it.

use std::collections::BTreeSet;

use crate::models::{ConflictDecision, ConflictStrategy, PunchRecord};

use super::policy::PrimaryDevicePolicy;

/// Picks the strategy for a conflict. The first matching rule wins:
///
/// 1. Any conflicting punch from a primary device: `KEEP_PRIMARY_DEVICE`.
/// 2. The new punch is from a primary device: `KEEP_NEW_PRIMARY`.
/// 3. Otherwise `fallback`.
///
/// # Example
///
/// ```
/// use punch_integrity::conflict::{DeviceIdThreshold, select_strategy};
/// use punch_integrity::models::{AttendanceStatus, ConflictStrategy, PunchRecord};
/// use chrono::NaiveDate;
///
/// let date = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
/// let punch = |record_id, device_id| PunchRecord {
///     record_id,
///     user_id: 42,
///     department_id: None,
///     device_id,
///     attendance_date: date,
///     punch_time: date.and_hms_opt(9, 0, 0),
///     attendance_status: AttendanceStatus::Normal,
/// };
///
/// let strategy = select_strategy(
///     &punch(2, 1500),
///     &[punch(1, 500)],
///     &DeviceIdThreshold::default(),
///     ConflictStrategy::KeepFirstPunch,
/// );
/// assert_eq!(strategy, ConflictStrategy::KeepPrimaryDevice);
/// ```
pub fn select_strategy(
    new_record: &PunchRecord,
    conflicting: &[PunchRecord],
    policy: &dyn PrimaryDevicePolicy,
    fallback: ConflictStrategy,
) -> ConflictStrategy {
    if conflicting.iter().any(|r| policy.is_primary(r.device_id)) {
        ConflictStrategy::KeepPrimaryDevice
    } else if policy.is_primary(new_record.device_id) {
        ConflictStrategy::KeepNewPrimary
    } else {
        fallback
    }
}

/// Applies `strategy`, choosing the record to keep and the records in
/// conflict.
///
/// `conflicting` is expected in ascending punch time order. Whenever the
/// strategy has nothing to pick from, the new record is kept.
pub fn apply_strategy(
    strategy: ConflictStrategy,
    new_record: &PunchRecord,
    conflicting: &[PunchRecord],
    policy: &dyn PrimaryDevicePolicy,
) -> ConflictDecision {
    let all_ids: BTreeSet<u64> = conflicting.iter().map(|r| r.record_id).collect();

    let (keep_record_id, conflict_record_ids) = match strategy {
        ConflictStrategy::KeepFirstPunch => {
            let keep = conflicting
                .iter()
                .min_by_key(|r| r.punch_time)
                .map_or(new_record.record_id, |r| r.record_id);
            (keep, all_ids)
        }
        ConflictStrategy::KeepLastPunch => {
            let keep = conflicting
                .iter()
                .max_by_key(|r| r.punch_time)
                .map_or(new_record.record_id, |r| r.record_id);
            (keep, without(all_ids, keep))
        }
        ConflictStrategy::KeepPrimaryDevice => {
            let keep = conflicting
                .iter()
                .find(|r| policy.is_primary(r.device_id))
                .or_else(|| conflicting.first())
                .map_or(new_record.record_id, |r| r.record_id);
            (keep, without(all_ids, keep))
        }
        ConflictStrategy::KeepNewPrimary => (new_record.record_id, all_ids),
    };

    let description = describe(strategy, keep_record_id, conflict_record_ids.len());
    ConflictDecision {
        strategy,
        keep_record_id,
        conflict_record_ids,
        description,
    }
}

fn without(mut ids: BTreeSet<u64>, id: u64) -> BTreeSet<u64> {
    ids.remove(&id);
    ids
}

fn describe(strategy: ConflictStrategy, keep_record_id: u64, conflicts: usize) -> String {
    let reason = match strategy {
        ConflictStrategy::KeepFirstPunch => "earliest punch",
        ConflictStrategy::KeepLastPunch => "latest punch",
        ConflictStrategy::KeepPrimaryDevice => "punch from primary device",
        ConflictStrategy::KeepNewPrimary => "new punch from primary device",
    };
    format!(
        "Kept record {} ({}), {} conflicting record(s)",
        keep_record_id, reason, conflicts
    )
}
