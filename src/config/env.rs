use std::collections::HashMap;
use std::env;
use std::str::FromStr;

pub enum EnvKey {
    RabbitMqHost,
    RabbitMqPort,
    RabbitMqUser,
    RabbitMqPass,
    QueueName,
    QueueDurable,
    RabbitMqMaxRetries,
    RabbitMqRetryDelaySecs,
    BackendUpdateUrl,
    NotifyTimeoutSecs,
    StorageEndpoint,
    StorageRegion,
    StorageBucket,
    StorageAccessKey,
    StorageSecretKey,
    FfmpegPath,
    ScratchDir,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::RabbitMqHost => "RABBITMQ_HOST",
            EnvKey::RabbitMqPort => "RABBITMQ_PORT",
            EnvKey::RabbitMqUser => "RABBITMQ_USER",
            EnvKey::RabbitMqPass => "RABBITMQ_PASS",
            EnvKey::QueueName => "QUEUE_NAME",
            EnvKey::QueueDurable => "QUEUE_DURABLE",
            EnvKey::RabbitMqMaxRetries => "RABBITMQ_MAX_RETRIES",
            EnvKey::RabbitMqRetryDelaySecs => "RABBITMQ_RETRY_DELAY_SECS",
            EnvKey::BackendUpdateUrl => "BACKEND_UPDATE_URL",
            EnvKey::NotifyTimeoutSecs => "NOTIFY_TIMEOUT_SECS",
            EnvKey::StorageEndpoint => "STORAGE_ENDPOINT",
            EnvKey::StorageRegion => "STORAGE_REGION",
            EnvKey::StorageBucket => "STORAGE_BUCKET",
            EnvKey::StorageAccessKey => "AWS_ACCESS_KEY_ID",
            EnvKey::StorageSecretKey => "AWS_SECRET_ACCESS_KEY",
            EnvKey::FfmpegPath => "FFMPEG_PATH",
            EnvKey::ScratchDir => "SCRATCH_DIR",
        }
    }
}

/// Where configuration values are read from. The process environment in
/// production, a plain map in tests.
pub trait Source {
    fn var(&self, key: &str) -> Option<String>;
}

pub struct ProcessEnv;

impl Source for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

impl Source for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Empty values count as unset.
pub fn get(source: &dyn Source, key: EnvKey) -> Option<String> {
    source
        .var(key.as_str())
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

pub fn get_or(source: &dyn Source, key: EnvKey, default: &str) -> String {
    get(source, key).unwrap_or_else(|| default.to_string())
}

pub fn get_parsed<T: FromStr>(source: &dyn Source, key: EnvKey, default: T) -> T {
    match get(source, key) {
        Some(val) => val.parse::<T>().unwrap_or(default),
        None => default,
    }
}

pub fn get_flag(source: &dyn Source, key: EnvKey, default: bool) -> bool {
    match get(source, key).map(|val| val.to_ascii_lowercase()) {
        Some(val) if matches!(val.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(val) if matches!(val.as_str(), "0" | "false" | "no" | "off") => false,
        _ => default,
    }
}
