use crate::errors::Result;
use crate::model::HubEvent;
use crate::relay::EventHandler;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info};

/// Groups hub events into batches and hands them to `handler` one batch at a
/// time, in arrival order. A batch is delivered when it reaches `max_batch`
/// events or `max_wait_ms` elapses, whichever comes first. Errors go straight
/// to `process_error`.
pub async fn run_batcher<H>(
    mut rx: mpsc::Receiver<Result<HubEvent>>,
    handler: Arc<H>,
    max_batch: usize,
    max_wait_ms: u64,
) where
    H: EventHandler + ?Sized,
{
    info!(
        "Starting batcher with max_batch={}, max_wait_ms={}",
        max_batch, max_wait_ms
    );

    let max_batch = max_batch.max(1);
    let period = Duration::from_millis(max_wait_ms.max(1));
    let mut buffer: Vec<HubEvent> = Vec::with_capacity(max_batch);
    let mut ticker = interval_at(Instant::now() + period, period);

    loop {
        tokio::select! {
            message = rx.recv() => {
                match message {
                    Some(Ok(event)) => {
                        buffer.push(event);

                        if buffer.len() >= max_batch {
                            flush_batch(handler.as_ref(), &mut buffer).await;
                        }
                    }
                    Some(Err(e)) => handler.process_error(&e),
                    None => {
                        info!("Hub channel closed, flushing remaining batch");
                        flush_batch(handler.as_ref(), &mut buffer).await;
                        break;
                    }
                }
            }

            _ = ticker.tick() => {
                if !buffer.is_empty() {
                    flush_batch(handler.as_ref(), &mut buffer).await;
                }
            }
        }
    }

    info!("Batcher stopped");
}

async fn flush_batch<H>(handler: &H, buffer: &mut Vec<HubEvent>)
where
    H: EventHandler + ?Sized,
{
    if buffer.is_empty() {
        return;
    }

    debug!("Flushing batch of {} events", buffer.len());
    let batch = std::mem::take(buffer);
    handler.process_events(batch).await;
}
