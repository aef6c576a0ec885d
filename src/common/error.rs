use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Invalid job payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Transcoder exited with {}: {stderr}", exit_label(.status))]
    Transcode { status: Option<i32>, stderr: String },

    #[error("Upload failed: {0}")]
    Publish(String),

    #[error("Notify failed: {0}")]
    Notify(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_label(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("status {}", code),
        None => "no status (killed by signal)".to_string(),
    }
}

impl WorkerError {
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    pub fn publish(msg: impl Into<String>) -> Self {
        Self::Publish(msg.into())
    }

    pub fn notify(msg: impl Into<String>) -> Self {
        Self::Notify(msg.into())
    }

    /// Text reported to the backend in a failed notification. Engine failures
    /// report the captured stderr verbatim.
    pub fn notification_message(&self) -> String {
        match self {
            WorkerError::Transcode { stderr, .. } => stderr.clone(),
            other => other.to_string(),
        }
    }
}
