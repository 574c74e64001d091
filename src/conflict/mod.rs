//! Multi-device punch conflict resolution.
//!
//! When a user punches on several devices within a few minutes of each
//! other, one punch is chosen as canonical. Strategy selection and
//! application are pure functions; [`ConflictResolver`] wires them to the
//! record store and the conflict cache.

mod policy;
mod resolver;
mod strategy;

pub use policy::{DeviceIdThreshold, PrimaryDevicePolicy};
pub use resolver::ConflictResolver;
pub use strategy::{apply_strategy, select_strategy};
