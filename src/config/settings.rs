use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::config::env::{self, EnvKey, ProcessEnv, Source};

pub const DEFAULT_CALLBACK_URL: &str = "http://backend:8080/api/v1/jobs/worker-callback";

#[derive(Clone, Debug)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub queue: String,
    pub durable: bool,
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl BrokerConfig {
    /// AMQP URI for the default vhost, with credentials percent-encoded.
    pub fn amqp_url(&self) -> anyhow::Result<String> {
        let mut url = Url::parse(&format!("amqp://{}:{}/%2f", self.host, self.port))?;
        url.set_username(&self.user)
            .map_err(|_| anyhow::anyhow!("Cannot set username on broker url"))?;
        url.set_password(Some(&self.password))
            .map_err(|_| anyhow::anyhow!("Cannot set password on broker url"))?;
        Ok(url.to_string())
    }
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub endpoint: Option<String>,
    pub region: String,
    pub bucket: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub broker: BrokerConfig,
    pub storage: StorageConfig,
    pub callback_url: String,
    pub notify_timeout: Duration,
    pub ffmpeg_path: String,
    pub scratch_dir: PathBuf,
}

impl AppConfig {
    pub fn new() -> Self {
        Self::from_source(&ProcessEnv)
    }

    pub fn from_source(source: &dyn Source) -> Self {
        Self {
            broker: BrokerConfig {
                host: env::get_or(source, EnvKey::RabbitMqHost, "rabbitmq"),
                port: env::get_parsed(source, EnvKey::RabbitMqPort, 5672),
                user: env::get_or(source, EnvKey::RabbitMqUser, "guest"),
                password: env::get_or(source, EnvKey::RabbitMqPass, "guest"),
                queue: env::get_or(source, EnvKey::QueueName, "media_jobs"),
                durable: env::get_flag(source, EnvKey::QueueDurable, false),
                max_attempts: env::get_parsed(source, EnvKey::RabbitMqMaxRetries, 10u32).max(1),
                retry_delay: Duration::from_secs(env::get_parsed(
                    source,
                    EnvKey::RabbitMqRetryDelaySecs,
                    5,
                )),
            },
            storage: StorageConfig {
                endpoint: env::get(source, EnvKey::StorageEndpoint),
                region: env::get_or(source, EnvKey::StorageRegion, "us-east-1"),
                bucket: env::get_or(source, EnvKey::StorageBucket, "media-processed"),
                access_key: env::get(source, EnvKey::StorageAccessKey),
                secret_key: env::get(source, EnvKey::StorageSecretKey),
            },
            callback_url: env::get_or(source, EnvKey::BackendUpdateUrl, DEFAULT_CALLBACK_URL),
            notify_timeout: Duration::from_secs(env::get_parsed(
                source,
                EnvKey::NotifyTimeoutSecs,
                10,
            )),
            ffmpeg_path: env::get_or(source, EnvKey::FfmpegPath, "ffmpeg"),
            scratch_dir: PathBuf::from(env::get_or(source, EnvKey::ScratchDir, "/tmp")),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_source(&std::collections::HashMap::<String, String>::new())
    }
}
