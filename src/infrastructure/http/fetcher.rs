use std::path::Path;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::common::error::{WorkerError, WorkerResult};
use crate::modules::job::service::Fetcher;

/// Downloads source media chunk by chunk. One attempt, no retry, no timeout.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> WorkerResult<u64> {
        let url = Url::parse(url)
            .map_err(|e| WorkerError::fetch(format!("invalid input url '{}': {}", url, e)))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| WorkerError::fetch(e.to_string()))?
            .error_for_status()
            .map_err(|e| WorkerError::fetch(e.to_string()))?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| WorkerError::fetch(format!("stream interrupted: {}", e)))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;
        Ok(written)
    }
}
