//! Configuration loading and management for the punch integrity engine.
//!
//! This module loads detector thresholds, resolver settings and cache
//! bounds from YAML files.
//!
//! # Example
//!
//! ```no_run
//! use punch_integrity::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/default").unwrap();
//! println!("Conflict window: {} minutes", config.conflict().window_minutes);
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    BatchErrorPolicy, CacheConfig, CacheSection, ConflictConfig, DetectionConfig, IntegrityConfig,
    MAX_WINDOW_MINUTES,
};
