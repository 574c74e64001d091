//! Anomaly detection for attendance punches.
//!
//! This module contains the individual rule functions (late arrival, early
//! leave, absence, frequent punching and multi-device punching) and the
//! [`AnomalyDetector`] that runs them against a record, caches the findings
//! and publishes them.

mod absence;
mod detector;
mod early_leave;
mod late;
mod suspicious;

pub use absence::detect_absence;
pub use detector::{AnomalyCacheKey, AnomalyDetector};
pub use early_leave::{detect_early_leave, early_leave_minutes};
pub use late::{detect_late, late_minutes, level_for_minutes};
pub use suspicious::{detect_frequent_punch, detect_multi_device_punch, narrow_to_window};
