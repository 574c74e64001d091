//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading engine
//! configuration from YAML files.

use std::fs;
use std::path::Path;

use crate::error::{IntegrityError, IntegrityResult};

use super::types::{CacheSection, ConflictConfig, DetectionConfig, IntegrityConfig};

/// Loads and provides access to engine configuration.
///
/// # Directory Structure
///
/// ```text
/// config/default/
/// ├── detection.yaml   # Anomaly thresholds
/// ├── conflict.yaml    # Conflict window and primary-device rule
/// └── cache.yaml       # Cache bounds
/// ```
///
/// # Example
///
/// ```no_run
/// use punch_integrity::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/default")?;
/// println!("Late grace: {} minutes", loader.detection().late_grace_minutes);
/// # Ok::<(), punch_integrity::error::IntegrityError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: IntegrityConfig,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// Returns an error if any file is missing, contains invalid YAML, or
    /// holds a value that fails validation.
    pub fn load<P: AsRef<Path>>(path: P) -> IntegrityResult<Self> {
        let path = path.as_ref();

        let detection = Self::load_yaml::<DetectionConfig>(&path.join("detection.yaml"))?;
        let conflict = Self::load_yaml::<ConflictConfig>(&path.join("conflict.yaml"))?;
        let cache = Self::load_yaml::<CacheSection>(&path.join("cache.yaml"))?;

        let config = IntegrityConfig {
            detection,
            conflict,
            cache,
        };
        config.validate()?;

        Ok(Self { config })
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> IntegrityResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| IntegrityError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| IntegrityError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Returns the loaded configuration.
    pub fn config(&self) -> &IntegrityConfig {
        &self.config
    }

    /// Consumes the loader and returns the configuration.
    pub fn into_config(self) -> IntegrityConfig {
        self.config
    }

    /// Returns the detector thresholds.
    pub fn detection(&self) -> &DetectionConfig {
        &self.config.detection
    }

    /// Returns the resolver settings.
    pub fn conflict(&self) -> &ConflictConfig {
        &self.config.conflict
    }

    /// Returns the cache bounds.
    pub fn cache(&self) -> &CacheSection {
        &self.config.cache
    }
}
