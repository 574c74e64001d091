//! The punch integrity engine.
//!
//! Bundles the detector and the resolver behind one cloneable handle that
//! shares configuration and collaborators, so callers can assess a punch
//! in a single call.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::config::{ConfigLoader, IntegrityConfig};
use crate::conflict::ConflictResolver;
use crate::detection::AnomalyDetector;
use crate::error::IntegrityResult;
use crate::events::EventPublisher;
use crate::models::{Anomaly, ConflictResolutionResult, PunchRecord};
use crate::store::{RecordStore, ScheduleLookup};

/// Everything the engine found out about one punch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PunchAssessment {
    /// Correlation ID for the assessment.
    pub assessment_id: Uuid,
    /// The punch record ID.
    pub record_id: u64,
    /// Anomalies detected on the punch.
    pub anomalies: Vec<Anomaly>,
    /// The conflict resolution outcome.
    pub conflict: ConflictResolutionResult,
}

/// Shared handle to the detector and the resolver.
#[derive(Clone)]
pub struct IntegrityEngine {
    detector: Arc<AnomalyDetector>,
    resolver: Arc<ConflictResolver>,
}

impl IntegrityEngine {
    /// Builds an engine from a complete configuration.
    pub fn new(
        config: IntegrityConfig,
        records: Arc<dyn RecordStore>,
        schedules: Arc<dyn ScheduleLookup>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        let detector = AnomalyDetector::new(
            Arc::clone(&records),
            schedules,
            publisher,
            config.detection,
            &config.cache.anomaly,
        );
        let resolver = ConflictResolver::new(records, config.conflict, &config.cache.conflict);
        Self::from_parts(detector, resolver)
    }

    /// Builds an engine from a loaded configuration directory.
    pub fn from_loader(
        loader: ConfigLoader,
        records: Arc<dyn RecordStore>,
        schedules: Arc<dyn ScheduleLookup>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self::new(loader.into_config(), records, schedules, publisher)
    }

    /// Builds an engine from an already configured detector and resolver.
    pub fn from_parts(detector: AnomalyDetector, resolver: ConflictResolver) -> Self {
        Self {
            detector: Arc::new(detector),
            resolver: Arc::new(resolver),
        }
    }

    /// Returns the anomaly detector.
    pub fn detector(&self) -> &AnomalyDetector {
        &self.detector
    }

    /// Returns the conflict resolver.
    pub fn resolver(&self) -> &ConflictResolver {
        &self.resolver
    }

    /// Detects anomalies on a punch and resolves its device conflicts.
    pub fn assess_punch(&self, record: &PunchRecord) -> IntegrityResult<PunchAssessment> {
        let assessment_id = Uuid::new_v4();
        info!(
            assessment_id = %assessment_id,
            record_id = record.record_id,
            user_id = record.user_id,
            "Assessing punch"
        );

        let anomalies = self.detector.detect_anomalies(record)?;
        let conflict = if record.punch_time.is_some() {
            self.resolver.resolve_conflict(record)?
        } else {
            // Absences without a punch cannot collide with anything.
            ConflictResolutionResult::no_conflict()
        };

        info!(
            assessment_id = %assessment_id,
            anomalies = anomalies.len(),
            has_conflict = conflict.has_conflict(),
            "Punch assessed"
        );
        Ok(PunchAssessment {
            assessment_id,
            record_id: record.record_id,
            anomalies,
            conflict,
        })
    }
}
