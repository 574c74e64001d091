//! Conflict resolution models.
//!
//! This module contains the strategy enum, the per-call
//! [`ConflictResolutionResult`], the cached [`ConflictRecord`] and the
//! [`ConflictBatchSummary`] folded over a batch.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The policy used to pick the canonical record out of a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictStrategy {
    /// Keep the earliest conflicting punch.
    KeepFirstPunch,
    /// Keep the latest conflicting punch.
    KeepLastPunch,
    /// Keep the existing punch from a primary device.
    KeepPrimaryDevice,
    /// Keep the new punch because it came from a primary device.
    KeepNewPrimary,
}

impl fmt::Display for ConflictStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConflictStrategy::KeepFirstPunch => "KEEP_FIRST_PUNCH",
            ConflictStrategy::KeepLastPunch => "KEEP_LAST_PUNCH",
            ConflictStrategy::KeepPrimaryDevice => "KEEP_PRIMARY_DEVICE",
            ConflictStrategy::KeepNewPrimary => "KEEP_NEW_PRIMARY",
        };
        f.write_str(name)
    }
}

/// The canonical-record decision for one detected conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictDecision {
    /// The strategy that was applied.
    pub strategy: ConflictStrategy,
    /// The record to treat as canonical.
    pub keep_record_id: u64,
    /// The records considered in conflict.
    pub conflict_record_ids: BTreeSet<u64>,
    /// Human-readable summary.
    pub description: String,
}

/// The outcome of one resolution call.
///
/// # Example
///
/// ```
/// use punch_integrity::models::ConflictResolutionResult;
///
/// let result = ConflictResolutionResult::failure("store unavailable");
/// assert!(!result.has_conflict());
/// assert!(result.is_failure());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ConflictResolutionResult {
    /// No other device punched inside the window.
    NoConflict,
    /// A conflict was found and resolved.
    Conflict(ConflictDecision),
    /// Resolution could not be carried out.
    Failure {
        /// Why resolution failed.
        message: String,
    },
}

impl ConflictResolutionResult {
    /// Creates the no-conflict outcome.
    pub fn no_conflict() -> Self {
        ConflictResolutionResult::NoConflict
    }

    /// Creates a failure outcome.
    pub fn failure(message: impl Into<String>) -> Self {
        ConflictResolutionResult::Failure {
            message: message.into(),
        }
    }

    /// Returns true if a conflict was found.
    pub fn has_conflict(&self) -> bool {
        matches!(self, ConflictResolutionResult::Conflict(_))
    }

    /// Returns true if resolution failed.
    pub fn is_failure(&self) -> bool {
        matches!(self, ConflictResolutionResult::Failure { .. })
    }

    /// Returns the decision, if a conflict was found.
    pub fn decision(&self) -> Option<&ConflictDecision> {
        match self {
            ConflictResolutionResult::Conflict(decision) => Some(decision),
            _ => None,
        }
    }
}

/// The cached summary of the latest conflict for a user and day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictRecord {
    /// The user.
    pub user_id: u64,
    /// The attendance day.
    pub attendance_date: NaiveDate,
    /// Every device involved, including the new punch's.
    pub conflicting_devices: BTreeSet<u64>,
    /// The strategy that was applied.
    pub resolution_strategy: ConflictStrategy,
    /// The record kept as canonical.
    pub keep_record_id: u64,
    /// The records considered in conflict.
    pub conflict_record_ids: BTreeSet<u64>,
    /// When the conflict was resolved.
    pub detection_time: DateTime<Utc>,
    /// Cache version at which this record was written. Zero until cached.
    pub version: u64,
}

/// Aggregate counts over a batch resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictBatchSummary {
    /// Number of records submitted.
    pub total_records: usize,
    /// Records that produced a conflict.
    pub conflict_count: usize,
    /// Records with no conflict.
    pub no_conflict_count: usize,
    /// Records whose resolution failed.
    pub failed_count: usize,
    /// Conflicts per applied strategy.
    pub strategy_count: BTreeMap<ConflictStrategy, usize>,
    /// When the batch ran.
    pub detection_time: DateTime<Utc>,
}

impl ConflictBatchSummary {
    /// Creates an empty summary for a batch of `total_records`.
    pub fn new(total_records: usize, detection_time: DateTime<Utc>) -> Self {
        Self {
            total_records,
            conflict_count: 0,
            no_conflict_count: 0,
            failed_count: 0,
            strategy_count: BTreeMap::new(),
            detection_time,
        }
    }

    /// Folds one outcome into the tallies.
    pub fn record(&mut self, result: &ConflictResolutionResult) {
        match result {
            ConflictResolutionResult::NoConflict => self.no_conflict_count += 1,
            ConflictResolutionResult::Conflict(decision) => {
                self.conflict_count += 1;
                *self.strategy_count.entry(decision.strategy).or_insert(0) += 1;
            }
            ConflictResolutionResult::Failure { .. } => self.failed_count += 1,
        }
    }

    /// Conflicts per submitted record, rounded to 4 decimal places.
    pub fn conflict_rate(&self) -> Decimal {
        if self.total_records == 0 {
            return Decimal::ZERO;
        }
        (Decimal::from(self.conflict_count) / Decimal::from(self.total_records)).round_dp(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(strategy: ConflictStrategy) -> ConflictDecision {
        ConflictDecision {
            strategy,
            keep_record_id: 1,
            conflict_record_ids: BTreeSet::from([2]),
            description: "test".to_string(),
        }
    }

    #[test]
    fn test_result_predicates() {
        let conflict =
            ConflictResolutionResult::Conflict(decision(ConflictStrategy::KeepFirstPunch));
        assert!(conflict.has_conflict());
        assert!(!conflict.is_failure());
        assert_eq!(conflict.decision().unwrap().keep_record_id, 1);

        let none = ConflictResolutionResult::no_conflict();
        assert!(!none.has_conflict());
        assert!(!none.is_failure());
        assert!(none.decision().is_none());
    }

    #[test]
    fn test_strategy_display_matches_wire_name() {
        for strategy in [
            ConflictStrategy::KeepFirstPunch,
            ConflictStrategy::KeepLastPunch,
            ConflictStrategy::KeepPrimaryDevice,
            ConflictStrategy::KeepNewPrimary,
        ] {
            let wire = serde_json::to_value(strategy).unwrap();
            assert_eq!(wire.as_str().unwrap(), strategy.to_string());
        }
    }

    #[test]
    fn test_summary_tallies_each_outcome() {
        let mut summary = ConflictBatchSummary::new(4, Utc::now());
        summary.record(&ConflictResolutionResult::Conflict(decision(
            ConflictStrategy::KeepPrimaryDevice,
        )));
        summary.record(&ConflictResolutionResult::Conflict(decision(
            ConflictStrategy::KeepPrimaryDevice,
        )));
        summary.record(&ConflictResolutionResult::no_conflict());
        summary.record(&ConflictResolutionResult::failure("boom"));

        assert_eq!(summary.conflict_count, 2);
        assert_eq!(summary.no_conflict_count, 1);
        assert_eq!(summary.failed_count, 1);
        assert_eq!(
            summary.strategy_count.get(&ConflictStrategy::KeepPrimaryDevice),
            Some(&2)
        );
        assert_eq!(summary.conflict_rate(), Decimal::new(5, 1));
    }

    #[test]
    fn test_result_serializes_with_outcome_tag() {
        let json = serde_json::to_value(ConflictResolutionResult::no_conflict()).unwrap();
        assert_eq!(json["outcome"], "no_conflict");
    }
}
