//! Core data models for the punch integrity engine.
//!
//! This module contains the records consumed from collaborators and the
//! anomalies, conflicts and statistics produced by the engine.

mod anomaly;
mod conflict;
mod punch_record;
mod schedule;

pub use anomaly::{
    Anomaly, AnomalyDetail, AnomalyLevel, AnomalyRecord, AnomalyStatistics, AnomalyType,
    generate_anomaly_id,
};
pub use conflict::{
    ConflictBatchSummary, ConflictDecision, ConflictRecord, ConflictResolutionResult,
    ConflictStrategy,
};
pub use punch_record::{AttendanceStatus, PunchRecord};
pub use schedule::ScheduleEntry;
