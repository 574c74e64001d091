//! Anomaly event publishing.
//!
//! Detected anomalies are pushed to a downstream notification or audit
//! channel through [`EventPublisher`]. Publishing is best effort: the
//! detector logs a failed publish and keeps its cache writes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{IntegrityError, IntegrityResult};
use crate::models::Anomaly;

/// A sink for detected anomalies.
pub trait EventPublisher: Send + Sync {
    /// Publishes the anomalies found on one record. Must not block on the
    /// consumer.
    fn send_anomaly_event(&self, anomalies: &[Anomaly]) -> IntegrityResult<()>;
}

/// One published batch of anomalies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyEvent {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// The anomalies found on one record.
    pub anomalies: Vec<Anomaly>,
    /// When the event was handed to the channel.
    pub published_at: DateTime<Utc>,
}

/// Publishes anomaly events onto an unbounded tokio channel.
///
/// Sending never waits on the receiver, so synchronous detection code can
/// hand events to an async consumer.
///
/// # Example
///
/// ```
/// use punch_integrity::events::{ChannelEventPublisher, EventPublisher};
///
/// let (publisher, mut receiver) = ChannelEventPublisher::channel();
/// publisher.send_anomaly_event(&[]).unwrap();
/// assert!(receiver.try_recv().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ChannelEventPublisher {
    sender: mpsc::UnboundedSender<AnomalyEvent>,
}

impl ChannelEventPublisher {
    /// Wraps an existing sender.
    pub fn new(sender: mpsc::UnboundedSender<AnomalyEvent>) -> Self {
        Self { sender }
    }

    /// Creates a publisher and the receiver its events arrive on.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AnomalyEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl EventPublisher for ChannelEventPublisher {
    fn send_anomaly_event(&self, anomalies: &[Anomaly]) -> IntegrityResult<()> {
        let event = AnomalyEvent {
            event_id: Uuid::new_v4(),
            anomalies: anomalies.to_vec(),
            published_at: Utc::now(),
        };
        let event_id = event.event_id;

        self.sender
            .send(event)
            .map_err(|_| IntegrityError::PublishFailed {
                message: "anomaly event receiver has been dropped".to_string(),
            })?;

        debug!(event_id = %event_id, anomalies = anomalies.len(), "Anomaly event published");
        Ok(())
    }
}

/// Writes anomaly events to the log as JSON.
///
/// Useful when no downstream consumer is wired up; the events land in
/// whatever `tracing` subscriber the host installs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEventPublisher;

impl EventPublisher for LogEventPublisher {
    fn send_anomaly_event(&self, anomalies: &[Anomaly]) -> IntegrityResult<()> {
        let payload =
            serde_json::to_string(anomalies).map_err(|e| IntegrityError::PublishFailed {
                message: format!("failed to encode anomaly event: {}", e),
            })?;
        info!(anomalies = anomalies.len(), payload = %payload, "Anomaly event");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnomalyDetail, AnomalyLevel};
    use chrono::NaiveDate;

    fn make_anomaly() -> Anomaly {
        Anomaly {
            anomaly_id: "ANOMALY-1-abc".to_string(),
            user_id: 42,
            department_id: None,
            attendance_date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            detail: AnomalyDetail::Absent,
            level: AnomalyLevel::High,
            description: "Absent without leave".to_string(),
            detection_time: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_published_event_reaches_async_consumer() {
        let (publisher, mut receiver) = ChannelEventPublisher::channel();
        let anomaly = make_anomaly();

        let consumer = tokio::spawn(async move { receiver.recv().await });
        publisher.send_anomaly_event(&[anomaly.clone()]).unwrap();

        let event = consumer.await.unwrap().unwrap();
        assert_eq!(event.anomalies, vec![anomaly]);
    }

    #[test]
    fn test_dropped_receiver_is_publish_failure() {
        let (publisher, receiver) = ChannelEventPublisher::channel();
        drop(receiver);

        match publisher.send_anomaly_event(&[make_anomaly()]) {
            Err(IntegrityError::PublishFailed { message }) => {
                assert!(message.contains("dropped"));
            }
            other => panic!("Expected PublishFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_log_publisher_accepts_events() {
        assert!(LogEventPublisher.send_anomaly_event(&[make_anomaly()]).is_ok());
        assert!(LogEventPublisher.send_anomaly_event(&[]).is_ok());
    }
}
