use crate::classify::{Severity, ThresholdTable};
use crate::errors::Error;
use crate::metrics::{BATCHES_TOTAL, BROADCASTS_TOTAL, EVENTS_TOTAL, HUB_ERRORS_TOTAL, SEVERITY_TOTAL};
use crate::model::HubEvent;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Channel every telemetry payload is broadcast on.
pub const CHANNEL: &str = "iot-data";

/// Receives what the hub consumer delivers.
///
/// Batches arrive one at a time; `process_events` is awaited before the next
/// batch is handed over.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn process_events(&self, events: Vec<HubEvent>);

    fn process_error(&self, err: &Error);
}

/// One-to-many push to connected viewers. Must not block.
pub trait Broadcaster: Send + Sync {
    fn emit(&self, channel: &str, payload: &Value);
}

/// Forwards hub events to viewers unchanged.
pub struct Relay<B> {
    broadcaster: B,
    thresholds: Arc<ThresholdTable>,
}

impl<B: Broadcaster> Relay<B> {
    pub fn new(broadcaster: B, thresholds: Arc<ThresholdTable>) -> Self {
        Self {
            broadcaster,
            thresholds,
        }
    }

    pub fn handle_batch(&self, events: &[HubEvent]) {
        BATCHES_TOTAL.inc();
        debug!("Relaying batch of {} events", events.len());

        for event in events {
            EVENTS_TOTAL.inc();
            info!(
                "Telemetry received from {}: {}",
                event.device_id.as_deref().unwrap_or("unknown device"),
                event.body
            );

            self.broadcaster.emit(CHANNEL, &event.body);
            BROADCASTS_TOTAL.inc();

            self.observe(event);
        }
    }

    pub fn handle_error(&self, err: &Error) {
        HUB_ERRORS_TOTAL.inc();
        error!("Hub consumption error: {}", err);
    }

    /// Severity accounting only; forwarding never depends on it.
    fn observe(&self, event: &HubEvent) {
        let Some(record) = event.record() else {
            debug!("Payload is not a telemetry record, skipping severity check");
            return;
        };

        let assessment = self.thresholds.assess(&record);
        for (metric, severity) in assessment.iter() {
            SEVERITY_TOTAL
                .with_label_values(&[metric, severity.as_str()])
                .inc();
        }

        if assessment.worst() == Severity::Critical {
            warn!(
                "Critical reading from {}: {:?}",
                record.device_id, assessment
            );
        }
    }
}

#[async_trait]
impl<B: Broadcaster> EventHandler for Relay<B> {
    async fn process_events(&self, events: Vec<HubEvent>) {
        self.handle_batch(&events);
    }

    fn process_error(&self, err: &Error) {
        self.handle_error(err);
    }
}
