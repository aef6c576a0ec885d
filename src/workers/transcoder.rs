use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tracing::{error, info, warn};

use crate::infrastructure::queue::rabbitmq::Acknowledge;
use crate::modules::job::model::{Job, Notification};
use crate::modules::job::service::JobProcessor;
use crate::state::AppState;

/// Longest slice of a malformed payload echoed into the logs.
const PAYLOAD_LOG_LIMIT: usize = 512;

/// Serves deliveries one at a time until `shutdown` resolves. Reconnects when
/// the broker drops the consumer; fails only when a connection cannot be
/// (re)established within the attempt budget.
pub async fn start_transcoder_worker<S>(state: AppState, shutdown: S) -> anyhow::Result<()>
where
    S: std::future::Future<Output = ()>,
{
    info!("🎥 Starting transcoder worker...");
    tokio::pin!(shutdown);

    loop {
        let mut stream = tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("Transcoder worker stopped while connecting");
                return Ok(());
            }
            stream = state.queue.open() => stream?,
        };
        info!(queue = %state.config.broker.queue, "🐰 Waiting for jobs");

        loop {
            let delivery = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Transcoder worker stopped");
                    return Ok(());
                }
                delivery = stream.next_delivery() => delivery,
            };

            match delivery {
                Some(Ok(delivery)) => {
                    handle_delivery(&state.processor, &delivery.data, &delivery).await;
                }
                Some(Err(e)) => {
                    warn!(error = %e, "Lost connection to RabbitMQ");
                    break;
                }
                None => {
                    warn!("RabbitMQ consumer closed");
                    break;
                }
            }
        }
    }
}

/// Processes one delivery and acknowledges it exactly once, whatever happened
/// while processing. Returns the notification sent for a decodable job.
/// Stage panics are already reported by `JobProcessor::process`; the guard
/// here only keeps the ack from being skipped.
pub async fn handle_delivery<A>(
    processor: &JobProcessor,
    payload: &[u8],
    acker: &A,
) -> Option<Notification>
where
    A: Acknowledge + ?Sized,
{
    let outcome = AssertUnwindSafe(process_payload(processor, payload))
        .catch_unwind()
        .await;

    if let Err(e) = acker.acknowledge().await {
        error!(error = %e, "Failed to ack message");
    }

    match outcome {
        Ok(notification) => notification,
        Err(_) => {
            error!("Delivery handling panicked outside the job pipeline; message acked");
            None
        }
    }
}

async fn process_payload(processor: &JobProcessor, payload: &[u8]) -> Option<Notification> {
    match Job::from_slice(payload) {
        Ok(job) => {
            info!(job_id = %job.id, input_url = %job.input_url, "📦 Received transcoding job");
            Some(processor.process(&job).await)
        }
        Err(e) => {
            let shown = &payload[..payload.len().min(PAYLOAD_LOG_LIMIT)];
            error!(
                error = %e,
                payload = %String::from_utf8_lossy(shown),
                "❌ Failed to parse job, dropping message"
            );
            None
        }
    }
}
