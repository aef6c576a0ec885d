use std::future::Future;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::{
    message::Delivery, options::*, types::FieldTable, Channel, Connection, ConnectionProperties,
    Consumer,
};
use tracing::{error, info, warn};

use crate::config::settings::BrokerConfig;

/// Something a finished delivery can be acknowledged through.
#[async_trait(?Send)]
pub trait Acknowledge {
    async fn acknowledge(&self) -> Result<()>;
}

#[async_trait(?Send)]
impl Acknowledge for Delivery {
    async fn acknowledge(&self) -> Result<()> {
        self.acker
            .ack(BasicAckOptions::default())
            .await
            .map(|_| ())
            .map_err(|e| anyhow!("Failed to ack delivery {}: {}", self.delivery_tag, e))
    }
}

/// Retries `attempt` up to `max_attempts` times with a fixed `delay` between
/// tries. Returns the last error when the budget is exhausted.
pub async fn retry_bounded<T, F, Fut>(max_attempts: u32, delay: Duration, mut attempt: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut n = 1;
    loop {
        match attempt(n).await {
            Ok(value) => return Ok(value),
            Err(e) if n >= max_attempts => {
                error!("Giving up after {} attempts: {}", max_attempts, e);
                return Err(e);
            }
            Err(e) => {
                warn!("Attempt {}/{} failed: {}", n, max_attempts, e);
                tokio::time::sleep(delay).await;
                n += 1;
            }
        }
    }
}

/// An open consumer. The connection is held so it stays up while deliveries
/// are pulled from the stream.
pub struct JobStream {
    _conn: Connection,
    _channel: Channel,
    consumer: Consumer,
}

impl JobStream {
    /// `None` once the broker closes the consumer.
    pub async fn next_delivery(&mut self) -> Option<Result<Delivery>> {
        self.consumer
            .next()
            .await
            .map(|delivery| delivery.map_err(|e| anyhow!("Consumer error: {}", e)))
    }
}

#[derive(Clone)]
pub struct RabbitMqService {
    config: BrokerConfig,
}

impl RabbitMqService {
    pub fn new(config: BrokerConfig) -> Self {
        Self { config }
    }

    async fn connect(url: &str) -> Result<(Connection, Channel)> {
        let conn = Connection::connect(url, ConnectionProperties::default())
            .await
            .map_err(|e| anyhow!("Failed to connect to RabbitMQ: {}", e))?;

        let channel = conn
            .create_channel()
            .await
            .map_err(|e| anyhow!("Failed to create channel: {}", e))?;

        Ok((conn, channel))
    }

    /// Declares the queue (idempotent), limits the channel to one unacked
    /// delivery and starts consuming.
    async fn subscribe(&self, channel: &Channel, consumer_tag: &str) -> Result<Consumer> {
        channel
            .queue_declare(
                &self.config.queue,
                QueueDeclareOptions {
                    durable: self.config.durable,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| anyhow!("Failed to declare queue: {}", e))?;

        channel
            .basic_qos(1, BasicQosOptions::default())
            .await
            .map_err(|e| anyhow!("Failed to set prefetch: {}", e))?;

        channel
            .basic_consume(
                &self.config.queue,
                consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| anyhow!("Failed to create consumer: {}", e))
    }

    /// Connects and subscribes within the configured attempt budget.
    pub async fn open(&self) -> Result<JobStream> {
        let url = self.config.amqp_url()?;
        let consumer_tag = format!("media_worker-{}", uuid::Uuid::new_v4());

        info!(host = %self.config.host, port = self.config.port, "Connecting to RabbitMQ");

        retry_bounded(self.config.max_attempts, self.config.retry_delay, |attempt| {
            let url = url.clone();
            let consumer_tag = consumer_tag.clone();
            async move {
                let (conn, channel) = Self::connect(&url).await?;
                let consumer = self.subscribe(&channel, &consumer_tag).await?;
                info!(attempt, queue = %self.config.queue, "✅ Connected to RabbitMQ");
                Ok(JobStream {
                    _conn: conn,
                    _channel: channel,
                    consumer,
                })
            }
        })
        .await
        .map_err(|e| {
            anyhow!(
                "Could not connect to RabbitMQ after {} attempts: {}",
                self.config.max_attempts,
                e
            )
        })
    }
}
