use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{error, info};

use crate::common::error::{WorkerError, WorkerResult};
use crate::modules::job::model::Job;
use crate::modules::job::params;
use crate::modules::job::service::Transcoder;

/// Full engine invocation for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodePlan {
    pub program: String,
    pub args: Vec<String>,
    pub output_path: PathBuf,
}

impl TranscodePlan {
    /// `<program> -y -i <input> [resize] [quality] <scratch>/output.<format>`
    pub fn build(program: &str, input: &Path, scratch_dir: &Path, job: &Job) -> Self {
        let output_path = scratch_dir.join(format!("output.{}", job.output_format));

        let mut args = vec![
            "-y".to_string(),
            "-i".to_string(),
            input.to_string_lossy().into_owned(),
        ];
        args.extend(params::resolve(
            &job.output_format,
            job.quality(),
            job.settings.as_ref(),
        ));
        args.push(output_path.to_string_lossy().into_owned());

        Self {
            program: program.to_string(),
            args,
            output_path,
        }
    }
}

impl fmt::Display for TranscodePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.program, self.args.join(" "))
    }
}

pub struct FfmpegTranscoder {
    program: String,
    scratch_dir: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<String>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            scratch_dir: scratch_dir.into(),
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, input: &Path, job: &Job) -> WorkerResult<PathBuf> {
        let plan = TranscodePlan::build(&self.program, input, &self.scratch_dir, job);
        info!(job_id = %job.id, command = %plan, "Running transcoder");

        let output = Command::new(&plan.program)
            .args(&plan.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            error!(job_id = %job.id, status = ?output.status.code(), "Transcoder failed: {}", stderr);
            return Err(WorkerError::Transcode {
                status: output.status.code(),
                stderr,
            });
        }

        info!(job_id = %job.id, output = %plan.output_path.display(), "Transcode finished");
        Ok(plan.output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(json: &str) -> Job {
        Job::from_slice(json.as_bytes()).unwrap()
    }

    #[test]
    fn plan_orders_arguments() {
        let job = job(
            r#"{"id":"j1","input_url":"http://x","output_format":"jpeg","output_quality":"low",
                "settings":{"resize":"true","width":"800","height":"600"}}"#,
        );

        let plan = TranscodePlan::build("ffmpeg", Path::new("/tmp/input"), Path::new("/tmp"), &job);

        assert_eq!(
            plan.args,
            [
                "-y",
                "-i",
                "/tmp/input",
                "-vf",
                "scale=800:600",
                "-q:v",
                "25",
                "/tmp/output.jpeg"
            ]
        );
        assert_eq!(plan.output_path, PathBuf::from("/tmp/output.jpeg"));
        assert_eq!(
            plan.to_string(),
            "ffmpeg -y -i /tmp/input -vf scale=800:600 -q:v 25 /tmp/output.jpeg"
        );
    }

    #[test]
    fn unknown_format_plan_has_no_quality_flag() {
        let job = job(r#"{"id":"j1","input_url":"http://x","output_format":"mp4"}"#);

        let plan = TranscodePlan::build("ffmpeg", Path::new("/s/input"), Path::new("/s"), &job);

        assert_eq!(plan.args, ["-y", "-i", "/s/input", "/s/output.mp4"]);
    }

    #[tokio::test]
    async fn missing_engine_binary_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let transcoder = FfmpegTranscoder::new("definitely-not-an-engine-binary", dir.path());
        let job = job(r#"{"id":"j1","input_url":"http://x","output_format":"png"}"#);

        let err = transcoder
            .transcode(&dir.path().join("input"), &job)
            .await
            .unwrap_err();

        assert!(matches!(err, WorkerError::Io(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_captures_stderr() {
        // `sh` rejects the leading `-y`, exits non-zero and explains why on stderr.
        let dir = tempfile::tempdir().unwrap();
        let transcoder = FfmpegTranscoder::new("sh", dir.path());
        let job = job(r#"{"id":"j1","input_url":"http://x","output_format":"png"}"#);

        let err = transcoder
            .transcode(&dir.path().join("input"), &job)
            .await
            .unwrap_err();

        match err {
            WorkerError::Transcode { status, stderr } => {
                assert_ne!(status, Some(0));
                assert!(!stderr.trim().is_empty());
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn zero_exit_returns_output_path() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-engine");
        std::fs::write(&script, "#!/bin/sh\nfor last; do :; done\ntouch \"$last\"\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let transcoder = FfmpegTranscoder::new(script.to_string_lossy(), dir.path());
        let job = job(r#"{"id":"j1","input_url":"http://x","output_format":"webp"}"#);

        let output = transcoder
            .transcode(&dir.path().join("input"), &job)
            .await
            .unwrap();

        assert_eq!(output, dir.path().join("output.webp"));
        assert!(output.exists());
    }
}
