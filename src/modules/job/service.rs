use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;
use tracing::{debug, error, info, warn};

use super::model::{Job, Notification};
use crate::common::error::WorkerResult;

/// Scratch file the source media is downloaded to. Fixed per process, which
/// is only safe while jobs run strictly one at a time.
pub const INPUT_FILE_NAME: &str = "input";

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Streams `url` into `dest`, replacing its contents. Returns bytes written.
    async fn fetch(&self, url: &str, dest: &Path) -> WorkerResult<u64>;
}

#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Runs the engine on `input` and returns the produced file.
    async fn transcode(&self, input: &Path, job: &Job) -> WorkerResult<PathBuf>;
}

#[async_trait]
pub trait Publisher: Send + Sync {
    /// Uploads `path` under `key` and returns the stored key.
    async fn publish(&self, path: &Path, key: &str) -> WorkerResult<String>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, url: &str, notification: &Notification) -> WorkerResult<()>;
}

/// Runs one decoded job through fetch, transcode and publish, then reports a
/// single terminal status.
pub struct JobProcessor {
    fetcher: Arc<dyn Fetcher>,
    transcoder: Arc<dyn Transcoder>,
    publisher: Arc<dyn Publisher>,
    notifier: Arc<dyn Notifier>,
    scratch_dir: PathBuf,
    callback_url: String,
}

impl JobProcessor {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        transcoder: Arc<dyn Transcoder>,
        publisher: Arc<dyn Publisher>,
        notifier: Arc<dyn Notifier>,
        scratch_dir: PathBuf,
        callback_url: String,
    ) -> Self {
        Self {
            fetcher,
            transcoder,
            publisher,
            notifier,
            scratch_dir,
            callback_url,
        }
    }

    /// Never fails: every pipeline error, including a panicking stage, becomes
    /// a `failed` notification. The notification is returned whether or not
    /// the backend received it.
    pub async fn process(&self, job: &Job) -> Notification {
        info!(job_id = %job.id, format = %job.output_format, "Processing job");

        let notification = match AssertUnwindSafe(self.run(job)).catch_unwind().await {
            Ok(Ok(key)) => {
                info!(job_id = %job.id, key = %key, "✅ Job completed successfully");
                Notification::completed(&job.id, key)
            }
            Ok(Err(e)) => {
                error!(job_id = %job.id, error = %e, "❌ Job failed");
                Notification::failed(&job.id, e.notification_message())
            }
            Err(_) => {
                error!(job_id = %job.id, "❌ Job processing panicked");
                Notification::failed(&job.id, "Job processing panicked".to_string())
            }
        };

        if let Some(requested) = job.callback_url.as_deref().filter(|u| *u != self.callback_url) {
            debug!(job_id = %job.id, requested, "Ignoring per-job callback url");
        }

        if let Err(e) = self.notifier.notify(&self.callback_url, &notification).await {
            warn!(job_id = %job.id, error = %e, "Failed to notify backend, status update dropped");
        }

        notification
    }

    async fn run(&self, job: &Job) -> WorkerResult<String> {
        let input = self.scratch_dir.join(INPUT_FILE_NAME);

        info!(job_id = %job.id, url = %job.input_url, "⬇️ Downloading source");
        let bytes = self.fetcher.fetch(&job.input_url, &input).await?;
        info!(job_id = %job.id, bytes, "Downloaded source");

        let output = self.transcoder.transcode(&input, job).await?;

        let result = self.publisher.publish(&output, &job.processed_key()).await;

        if let Err(e) = tokio::fs::remove_file(&output).await {
            warn!(path = %output.display(), error = %e, "Failed to remove scratch output");
        }

        result
    }
}
