use async_trait::async_trait;
use reqwest::Client;
use tracing::info;

use crate::common::error::{WorkerError, WorkerResult};
use crate::modules::job::model::Notification;
use crate::modules::job::service::Notifier;

/// Posts terminal job status to the backend. A single attempt; the client's
/// timeout bounds how long a slow backend can hold up the worker.
#[derive(Clone)]
pub struct HttpNotifier {
    client: Client,
}

impl HttpNotifier {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify(&self, url: &str, notification: &Notification) -> WorkerResult<()> {
        info!(
            job_id = %notification.job_id,
            status = ?notification.status,
            url,
            "Notifying backend"
        );

        let response = self
            .client
            .post(url)
            .json(notification)
            .send()
            .await
            .map_err(|e| WorkerError::notify(e.to_string()))?;

        let status = response.status();
        info!(job_id = %notification.job_id, %status, "Backend response");

        if !status.is_success() {
            return Err(WorkerError::notify(format!("backend responded with {}", status)));
        }

        Ok(())
    }
}
