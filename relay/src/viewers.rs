use crate::metrics::VIEWER_DROPPED_TOTAL;
use crate::model::ViewerMessage;
use crate::relay::Broadcaster;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

/// Fan-out point for connected viewers.
///
/// Each viewer gets a bounded buffer of `capacity` frames. A viewer that falls
/// further behind loses its oldest frames and resumes with the newest.
#[derive(Debug, Clone)]
pub struct ViewerHub {
    tx: broadcast::Sender<String>,
}

impl ViewerHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.clamp(1, usize::MAX / 4));
        Self { tx }
    }

    pub fn subscribe(&self) -> Viewer {
        Viewer {
            rx: self.tx.subscribe(),
        }
    }

    pub fn viewer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Broadcaster for ViewerHub {
    fn emit(&self, channel: &str, payload: &Value) {
        let frame = match serde_json::to_string(&ViewerMessage { channel, payload }) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to serialize viewer frame: {}", e);
                return;
            }
        };

        // Err only means nobody is watching right now.
        if self.tx.send(frame).is_err() {
            debug!("No viewers connected, frame on {} discarded", channel);
        }
    }
}

/// Receiving side held by one viewer connection.
pub struct Viewer {
    rx: broadcast::Receiver<String>,
}

impl Viewer {
    /// Next frame for this viewer, or `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<String> {
        loop {
            match self.rx.recv().await {
                Ok(frame) => return Some(frame),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Viewer fell behind, dropped {} frames", skipped);
                    VIEWER_DROPPED_TOTAL.inc_by(skipped as f64);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
