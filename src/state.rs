use std::sync::Arc;

use crate::config::settings::AppConfig;
use crate::infrastructure::engine::FfmpegTranscoder;
use crate::infrastructure::http::{self, HttpFetcher, HttpNotifier};
use crate::infrastructure::queue::RabbitMqService;
use crate::infrastructure::storage::S3Publisher;
use crate::modules::job::service::JobProcessor;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub queue: RabbitMqService,
    pub processor: Arc<JobProcessor>,
}

impl AppState {
    pub fn new(config: AppConfig, queue: RabbitMqService, processor: Arc<JobProcessor>) -> Self {
        Self {
            config,
            queue,
            processor,
        }
    }

    /// Wires the production collaborators. The storage client itself is only
    /// built on the first upload.
    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let fetcher = HttpFetcher::new(http::fetch_client()?);
        let notifier = HttpNotifier::new(http::notify_client(config.notify_timeout)?);
        let transcoder = FfmpegTranscoder::new(config.ffmpeg_path.clone(), config.scratch_dir.clone());
        let publisher = S3Publisher::new(config.storage.clone());

        let processor = JobProcessor::new(
            Arc::new(fetcher),
            Arc::new(transcoder),
            Arc::new(publisher),
            Arc::new(notifier),
            config.scratch_dir.clone(),
            config.callback_url.clone(),
        );

        let queue = RabbitMqService::new(config.broker.clone());

        Ok(Self::new(config, queue, Arc::new(processor)))
    }
}
