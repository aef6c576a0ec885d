use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::common::error::WorkerResult;

/// A transcode request as published by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    pub id: String,
    pub input_url: String,
    pub output_format: String,
    /// `None` when the field is absent, `Some(None)` for an explicit `null`.
    #[serde(default, deserialize_with = "present")]
    pub output_quality: Option<Option<String>>,
    #[serde(default)]
    pub settings: Option<JobSettings>,
    /// Decoded but never used as a destination; status always goes to the
    /// configured callback URL.
    #[serde(default)]
    pub callback_url: Option<String>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl Job {
    /// Decodes a message body. The format must be a plain extension since it
    /// ends up in scratch paths and storage keys.
    pub fn from_slice(payload: &[u8]) -> WorkerResult<Self> {
        let mut job: Job = serde_json::from_slice(payload)?;
        job.output_format = job.output_format.trim().to_ascii_lowercase();

        let plain = !job.output_format.is_empty()
            && job
                .output_format
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit());
        if !plain {
            return Err(<serde_json::Error as serde::de::Error>::custom(format!(
                "invalid output_format {:?}",
                job.output_format
            ))
            .into());
        }

        Ok(job)
    }

    pub fn quality(&self) -> Quality {
        match &self.output_quality {
            None => Quality::High,
            Some(requested) => Quality::from_requested(requested.as_deref()),
        }
    }

    pub fn processed_key(&self) -> String {
        format!("processed/{}/output.{}", self.id, self.output_format)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Low,
    Medium,
    High,
}

impl Quality {
    /// Resolves a quality that was present in the message. `null` and
    /// anything unrecognised resolve to `Medium`.
    pub fn from_requested(requested: Option<&str>) -> Self {
        match requested {
            Some("low") => Quality::Low,
            Some("medium") => Quality::Medium,
            Some("high") => Quality::High,
            Some(_) | None => Quality::Medium,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobSettings {
    #[serde(default)]
    pub resize: Option<SettingValue>,
    #[serde(default)]
    pub width: Option<SettingValue>,
    #[serde(default)]
    pub height: Option<SettingValue>,
}

/// A loosely typed setting. The backend sends strings, but numbers and
/// booleans are tolerated.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct SettingValue(Value);

impl SettingValue {
    pub fn as_text(&self) -> Option<String> {
        match &self.0 {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Only the string `"true"` counts; a JSON boolean does not.
    pub fn is_literal_true(&self) -> bool {
        matches!(&self.0, Value::String(s) if s == "true")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Completed,
    Failed,
}

/// Terminal status reported to the backend. Exactly one of
/// `processed_file_key` and `error_message` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub job_id: String,
    pub status: JobStatus,
    pub processed_file_key: Option<String>,
    pub error_message: Option<String>,
}

impl Notification {
    pub fn completed(job_id: &str, processed_file_key: String) -> Self {
        Self {
            job_id: job_id.to_string(),
            status: JobStatus::Completed,
            processed_file_key: Some(processed_file_key),
            error_message: None,
        }
    }

    pub fn failed(job_id: &str, error_message: String) -> Self {
        Self {
            job_id: job_id.to_string(),
            status: JobStatus::Failed,
            processed_file_key: None,
            error_message: Some(error_message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::WorkerError;
    use serde_json::json;

    #[test]
    fn decodes_full_payload() {
        let payload = json!({
            "id": "j1",
            "input_url": "http://files/input.png",
            "output_format": "WEBP",
            "output_quality": "low",
            "settings": {"resize": "true", "width": "640", "height": 480},
            "callback_url": "http://backend/cb"
        });

        let job = Job::from_slice(payload.to_string().as_bytes()).unwrap();

        assert_eq!(job.id, "j1");
        assert_eq!(job.output_format, "webp");
        assert_eq!(job.quality(), Quality::Low);
        assert_eq!(job.callback_url.as_deref(), Some("http://backend/cb"));
        let settings = job.settings.unwrap();
        assert_eq!(settings.width.unwrap().as_text().as_deref(), Some("640"));
        assert_eq!(settings.height.unwrap().as_text().as_deref(), Some("480"));
    }

    #[test]
    fn optional_fields_default_quietly() {
        let job = Job::from_slice(
            br#"{"id":"j2","input_url":"http://x","output_format":"png","settings":null,"extra":1}"#,
        )
        .unwrap();

        assert_eq!(job.quality(), Quality::High);
        assert!(job.settings.is_none());
        assert!(job.callback_url.is_none());
    }

    #[test]
    fn null_quality_is_medium_but_absent_is_high() {
        let null = Job::from_slice(
            br#"{"id":"j2","input_url":"http://x","output_format":"png","output_quality":null}"#,
        )
        .unwrap();
        let absent =
            Job::from_slice(br#"{"id":"j2","input_url":"http://x","output_format":"png"}"#)
                .unwrap();

        assert_eq!(null.quality(), Quality::Medium);
        assert_eq!(absent.quality(), Quality::High);
    }

    #[test]
    fn unknown_quality_maps_to_medium() {
        assert_eq!(Quality::from_requested(Some("ultra")), Quality::Medium);
        assert_eq!(Quality::from_requested(Some("")), Quality::Medium);
        assert_eq!(Quality::from_requested(Some("HIGH")), Quality::Medium);
        assert_eq!(Quality::from_requested(None), Quality::Medium);
    }

    #[test]
    fn output_format_must_be_a_plain_extension() {
        for format in ["../x", "png/evil", "", "  ", "we bp", "png."] {
            let payload = json!({"id": "j4", "input_url": "http://x", "output_format": format});
            let err = Job::from_slice(payload.to_string().as_bytes()).unwrap_err();
            assert!(
                matches!(err, WorkerError::Decode(_)),
                "{format:?} gave {err:?}"
            );
        }

        let job = Job::from_slice(br#"{"id":"j4","input_url":"http://x","output_format":" MP4 "}"#)
            .unwrap();
        assert_eq!(job.output_format, "mp4");
    }

    #[test]
    fn rejects_malformed_bodies() {
        assert!(Job::from_slice(b"not json").is_err());
        assert!(Job::from_slice(br#"{"id":"j3","output_format":"png"}"#).is_err());
    }

    #[test]
    fn processed_key_is_deterministic() {
        let job = Job::from_slice(br#"{"id":"abc","input_url":"http://x","output_format":"Jpg"}"#)
            .unwrap();
        assert_eq!(job.processed_key(), "processed/abc/output.jpg");
    }

    #[test]
    fn notification_serializes_explicit_nulls() {
        let completed = serde_json::to_value(Notification::completed(
            "j1",
            "processed/j1/output.png".to_string(),
        ))
        .unwrap();
        assert_eq!(
            completed,
            json!({
                "job_id": "j1",
                "status": "completed",
                "processed_file_key": "processed/j1/output.png",
                "error_message": null
            })
        );

        let failed = serde_json::to_value(Notification::failed("j1", "boom".to_string())).unwrap();
        assert_eq!(failed["status"], "failed");
        assert_eq!(failed["processed_file_key"], Value::Null);
        assert_eq!(failed["error_message"], "boom");
    }
}
