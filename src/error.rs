//! Error types for the punch integrity engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for every failure the detector and resolver can observe.

use chrono::NaiveDate;
use thiserror::Error;

/// The main error type for the punch integrity engine.
///
/// Lookup failures (schedule or record store) are normally absorbed at the
/// check level; the remaining variants surface through the public entry
/// points so callers can tell "nothing found" apart from "could not check".
///
/// # Example
///
/// ```
/// use punch_integrity::error::IntegrityError;
///
/// let error = IntegrityError::ConfigNotFound {
///     path: "/missing/detection.yaml".to_string(),
/// };
/// assert_eq!(error.to_string(), "Configuration file not found: /missing/detection.yaml");
/// ```
#[derive(Debug, Error)]
pub enum IntegrityError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// A configuration value was out of range.
    #[error("Invalid configuration value '{field}': {message}")]
    InvalidConfig {
        /// The offending field.
        field: String,
        /// Why the value was rejected.
        message: String,
    },

    /// A punch record was malformed.
    #[error("Invalid punch record {record_id}: {message}")]
    InvalidRecord {
        /// The ID of the malformed record.
        record_id: u64,
        /// A description of what made the record invalid.
        message: String,
    },

    /// The schedule lookup failed.
    #[error("Schedule lookup failed for employee {employee_id} on {date}: {message}")]
    ScheduleLookupFailed {
        /// The employee whose schedule was requested.
        employee_id: u64,
        /// The schedule date.
        date: NaiveDate,
        /// The underlying failure.
        message: String,
    },

    /// The punch record store failed to answer a query.
    #[error("Record query failed for user {user_id} on {date}: {message}")]
    RecordQueryFailed {
        /// The user whose punches were requested.
        user_id: u64,
        /// The attendance date.
        date: NaiveDate,
        /// The underlying failure.
        message: String,
    },

    /// The anomaly event sink rejected an event.
    #[error("Failed to publish anomaly event: {message}")]
    PublishFailed {
        /// The underlying failure.
        message: String,
    },
}

impl IntegrityError {
    /// Returns true for failures of the schedule or record collaborators.
    pub fn is_lookup_failure(&self) -> bool {
        matches!(
            self,
            IntegrityError::ScheduleLookupFailed { .. } | IntegrityError::RecordQueryFailed { .. }
        )
    }
}

/// A type alias for Results that return IntegrityError.
pub type IntegrityResult<T> = Result<T, IntegrityError>;
