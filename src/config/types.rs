//! Configuration types for the punch integrity engine.
//!
//! This module contains the strongly-typed configuration structures that
//! are deserialized from YAML configuration files. Every field has a
//! default, so a file only needs to name what it overrides.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{IntegrityError, IntegrityResult};
use crate::models::ConflictStrategy;

/// Upper bound for every grace and window setting: one day.
pub const MAX_WINDOW_MINUTES: i64 = 24 * 60;

/// What a batch does when one record fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchErrorPolicy {
    /// Log the failure, count it, and carry on with the rest of the batch.
    #[default]
    Continue,
    /// Stop at the first failure and return it.
    Abort,
}

/// Thresholds for the anomaly detector.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Minutes after the scheduled start before a punch counts as late.
    pub late_grace_minutes: i64,
    /// Minutes before the scheduled end before a punch counts as early.
    pub early_leave_grace_minutes: i64,
    /// Late or early minutes above which the anomaly is HIGH.
    pub high_level_threshold_minutes: i64,
    /// Punch count above which FREQUENT_PUNCH fires.
    pub frequent_punch_threshold: usize,
    /// How many of the day's most recent punches the suspicious checks read.
    pub recent_punch_limit: usize,
    /// When set, suspicious checks only consider punches within this many
    /// minutes of the current punch. When unset, the whole recent set counts.
    pub suspicious_window_minutes: Option<i64>,
    /// Failure handling for batch detection.
    pub batch_error_policy: BatchErrorPolicy,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            late_grace_minutes: 5,
            early_leave_grace_minutes: 5,
            high_level_threshold_minutes: 30,
            frequent_punch_threshold: 3,
            recent_punch_limit: 50,
            suspicious_window_minutes: None,
            batch_error_policy: BatchErrorPolicy::Continue,
        }
    }
}

/// Settings for the multi-device conflict resolver.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConflictConfig {
    /// Half-width of the window around a new punch, in minutes.
    pub window_minutes: i64,
    /// Devices with an ID below this are primary.
    pub primary_device_below: u64,
    /// Strategy used when no primary device is involved.
    pub fallback_strategy: ConflictStrategy,
    /// Failure handling for batch resolution.
    pub batch_error_policy: BatchErrorPolicy,
}

impl Default for ConflictConfig {
    fn default() -> Self {
        Self {
            window_minutes: 5,
            primary_device_below: 1000,
            fallback_strategy: ConflictStrategy::KeepFirstPunch,
            batch_error_policy: BatchErrorPolicy::Continue,
        }
    }
}

/// Bounds for one cache.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum live entries; the oldest is evicted beyond it.
    pub max_entries: Option<usize>,
    /// Entry lifetime in seconds.
    pub ttl_seconds: Option<u64>,
}

impl CacheConfig {
    /// Returns the entry lifetime as a [`Duration`].
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_seconds.map(Duration::from_secs)
    }
}

/// The `cache.yaml` file structure.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// Bounds for the anomaly cache.
    pub anomaly: CacheConfig,
    /// Bounds for the conflict cache.
    pub conflict: CacheConfig,
}

/// The complete engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IntegrityConfig {
    /// Detector thresholds.
    pub detection: DetectionConfig,
    /// Resolver settings.
    pub conflict: ConflictConfig,
    /// Cache bounds.
    pub cache: CacheSection,
}

impl IntegrityConfig {
    /// Rejects values the engine cannot run with.
    pub fn validate(&self) -> IntegrityResult<()> {
        let d = &self.detection;
        non_negative("detection.late_grace_minutes", d.late_grace_minutes)?;
        within_day("detection.late_grace_minutes", d.late_grace_minutes)?;
        non_negative("detection.early_leave_grace_minutes", d.early_leave_grace_minutes)?;
        within_day("detection.early_leave_grace_minutes", d.early_leave_grace_minutes)?;
        non_negative(
            "detection.high_level_threshold_minutes",
            d.high_level_threshold_minutes,
        )?;
        if d.recent_punch_limit == 0 {
            return Err(invalid("detection.recent_punch_limit", "must be at least 1"));
        }
        if let Some(window) = d.suspicious_window_minutes {
            positive("detection.suspicious_window_minutes", window)?;
            within_day("detection.suspicious_window_minutes", window)?;
        }

        positive("conflict.window_minutes", self.conflict.window_minutes)?;
        within_day("conflict.window_minutes", self.conflict.window_minutes)?;
        if !matches!(
            self.conflict.fallback_strategy,
            ConflictStrategy::KeepFirstPunch | ConflictStrategy::KeepLastPunch
        ) {
            return Err(invalid(
                "conflict.fallback_strategy",
                "must be KEEP_FIRST_PUNCH or KEEP_LAST_PUNCH",
            ));
        }

        for (field, cache) in [
            ("cache.anomaly.max_entries", &self.cache.anomaly),
            ("cache.conflict.max_entries", &self.cache.conflict),
        ] {
            if cache.max_entries == Some(0) {
                return Err(invalid(field, "must be at least 1"));
            }
        }
        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> IntegrityError {
    IntegrityError::InvalidConfig {
        field: field.to_string(),
        message: message.to_string(),
    }
}

fn non_negative(field: &str, value: i64) -> IntegrityResult<()> {
    if value < 0 {
        return Err(invalid(field, &format!("must not be negative, got {}", value)));
    }
    Ok(())
}

fn positive(field: &str, value: i64) -> IntegrityResult<()> {
    if value <= 0 {
        return Err(invalid(field, &format!("must be positive, got {}", value)));
    }
    Ok(())
}

fn within_day(field: &str, value: i64) -> IntegrityResult<()> {
    if value > MAX_WINDOW_MINUTES {
        return Err(invalid(
            field,
            &format!("must be at most {} minutes, got {}", MAX_WINDOW_MINUTES, value),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_constants() {
        let config = IntegrityConfig::default();
        assert_eq!(config.detection.late_grace_minutes, 5);
        assert_eq!(config.detection.early_leave_grace_minutes, 5);
        assert_eq!(config.detection.high_level_threshold_minutes, 30);
        assert_eq!(config.detection.frequent_punch_threshold, 3);
        assert_eq!(config.detection.recent_punch_limit, 50);
        assert_eq!(config.detection.suspicious_window_minutes, None);
        assert_eq!(config.conflict.window_minutes, 5);
        assert_eq!(config.conflict.primary_device_below, 1000);
        assert_eq!(
            config.conflict.fallback_strategy,
            ConflictStrategy::KeepFirstPunch
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let detection: DetectionConfig =
            serde_yaml::from_str("late_grace_minutes: 10\nbatch_error_policy: abort\n").unwrap();
        assert_eq!(detection.late_grace_minutes, 10);
        assert_eq!(detection.recent_punch_limit, 50);
        assert_eq!(detection.batch_error_policy, BatchErrorPolicy::Abort);
    }

    #[test]
    fn test_primary_fallback_strategy_is_rejected() {
        let mut config = IntegrityConfig::default();
        config.conflict.fallback_strategy = ConflictStrategy::KeepPrimaryDevice;

        match config.validate() {
            Err(IntegrityError::InvalidConfig { field, .. }) => {
                assert_eq!(field, "conflict.fallback_strategy");
            }
            other => panic!("Expected InvalidConfig, got {:?}", other),
        }
    }

    #[test]
    fn test_minute_settings_above_one_day_are_rejected() {
        let cases: [(&str, fn(&mut IntegrityConfig)); 4] = [
            ("detection.late_grace_minutes", |c| {
                c.detection.late_grace_minutes = 200_000_000_000
            }),
            ("detection.early_leave_grace_minutes", |c| {
                c.detection.early_leave_grace_minutes = MAX_WINDOW_MINUTES + 1
            }),
            ("detection.suspicious_window_minutes", |c| {
                c.detection.suspicious_window_minutes = Some(i64::MAX)
            }),
            ("conflict.window_minutes", |c| {
                c.conflict.window_minutes = 200_000_000_000
            }),
        ];

        for (expected, apply) in cases {
            let mut config = IntegrityConfig::default();
            apply(&mut config);
            match config.validate() {
                Err(IntegrityError::InvalidConfig { field, .. }) => assert_eq!(field, expected),
                other => panic!("Expected InvalidConfig for {}, got {:?}", expected, other),
            }
        }
    }

    #[test]
    fn test_one_day_window_is_accepted() {
        let mut config = IntegrityConfig::default();
        config.detection.late_grace_minutes = MAX_WINDOW_MINUTES;
        config.detection.suspicious_window_minutes = Some(MAX_WINDOW_MINUTES);
        config.conflict.window_minutes = MAX_WINDOW_MINUTES;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_recent_limit_is_rejected() {
        let mut config = IntegrityConfig::default();
        config.detection.recent_punch_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_cache_capacity_is_rejected() {
        let mut config = IntegrityConfig::default();
        config.cache.conflict.max_entries = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cache_ttl_converts_to_duration() {
        let cache = CacheConfig {
            max_entries: None,
            ttl_seconds: Some(90),
        };
        assert_eq!(cache.ttl(), Some(Duration::from_secs(90)));
        assert_eq!(CacheConfig::default().ttl(), None);
    }
}
