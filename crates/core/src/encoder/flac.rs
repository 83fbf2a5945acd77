//! `flac` command line encoder.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::debug;

use super::error::EncoderError;
use super::traits::Encoder;
use super::types::{EncodeJob, EncodeReport};
use crate::config::EncoderConfig;

/// Fixed flags: best compression (`-8`) and overwrite an existing output (`-f`).
pub const FLAC_ARGS: [&str; 2] = ["-8", "-f"];

/// Keep at most this much of the encoder's stderr for error messages.
const STDERR_TAIL_BYTES: usize = 4096;

/// Encoder backed by the reference `flac` executable.
pub struct FlacEncoder {
    config: EncoderConfig,
}

impl FlacEncoder {
    /// Creates a new encoder with the given configuration.
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    /// Creates an encoder that runs `flac` from `PATH`.
    pub fn with_defaults() -> Self {
        Self::new(EncoderConfig::default())
    }

    pub fn binary(&self) -> &Path {
        &self.config.path
    }

    /// Builds the argument list: `-8 -f -o <destination> <source>`.
    ///
    /// Paths are passed through as raw OS strings, byte for byte.
    pub fn build_args(job: &EncodeJob) -> Vec<OsString> {
        let mut args: Vec<OsString> = FLAC_ARGS.iter().map(OsString::from).collect();
        args.extend([
            OsString::from("-o"),
            job.destination_path.clone().into_os_string(),
            job.source_path.clone().into_os_string(),
        ]);
        args
    }

    fn launch_error(&self, e: std::io::Error) -> EncoderError {
        EncoderError::launch_failed(&self.config.path, e.to_string())
    }
}

/// Drains `reader`, keeping only the last `limit` bytes.
async fn read_tail<R: AsyncRead + Unpin>(
    mut reader: R,
    limit: usize,
) -> std::io::Result<Vec<u8>> {
    let mut tail = VecDeque::with_capacity(limit);
    let mut chunk = [0u8; 4096];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        tail.extend(&chunk[..n]);
        let excess = tail.len().saturating_sub(limit);
        tail.drain(..excess);
    }
    Ok(tail.into())
}

fn stderr_tail(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }
    let start = bytes.len().saturating_sub(STDERR_TAIL_BYTES);
    Some(String::from_utf8_lossy(&bytes[start..]).to_string())
}

#[async_trait]
impl Encoder for FlacEncoder {
    fn name(&self) -> &str {
        "flac"
    }

    async fn encode(&self, job: &EncodeJob) -> Result<EncodeReport, EncoderError> {
        let start = Instant::now();
        let args = Self::build_args(job);
        debug!(task = %job.task_id, binary = ?self.config.path, ?args, "Starting encoder");

        let mut child = Command::new(&self.config.path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.launch_error(e))?;

        // flac reports progress on stderr; only the tail is kept
        let stderr = match child.stderr.take() {
            Some(pipe) => read_tail(pipe, STDERR_TAIL_BYTES)
                .await
                .unwrap_or_else(|e| {
                    debug!(task = %job.task_id, "Failed to read encoder stderr: {}", e);
                    Vec::new()
                }),
            None => Vec::new(),
        };
        let status = child.wait().await.map_err(|e| self.launch_error(e))?;

        if !status.success() {
            return Err(EncoderError::encoding_failed(
                status.code(),
                stderr_tail(&stderr),
            ));
        }

        let output_size_bytes = tokio::fs::metadata(&job.destination_path)
            .await
            .ok()
            .map(|m| m.len());

        Ok(EncodeReport {
            task_id: job.task_id,
            duration_ms: start.elapsed().as_millis() as u64,
            output_size_bytes,
        })
    }

    async fn validate(&self) -> Result<(), EncoderError> {
        let output = Command::new(&self.config.path)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.launch_error(e))?;

        if !output.status.success() {
            return Err(EncoderError::encoding_failed(
                output.status.code(),
                stderr_tail(&output.stderr),
            ));
        }

        debug!(
            version = %String::from_utf8_lossy(&output.stdout).trim(),
            "Encoder available"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskId;
    use std::path::PathBuf;

    #[test]
    fn test_build_args_exact_order() {
        let job = EncodeJob::new(TaskId(1), "/a/b/song.wav", "/a/b/song.flac");
        assert_eq!(
            FlacEncoder::build_args(&job),
            vec!["-8", "-f", "-o", "/a/b/song.flac", "/a/b/song.wav"]
        );
    }

    #[test]
    fn test_build_args_keeps_spaces_in_paths() {
        let job = EncodeJob::new(TaskId(2), "/my music/a b.wav", "/my music/a b.flac");
        let args = FlacEncoder::build_args(&job);
        assert_eq!(args[3], "/my music/a b.flac");
        assert_eq!(args[4], "/my music/a b.wav");
    }

    #[cfg(unix)]
    #[test]
    fn test_build_args_keeps_non_utf8_paths() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let source = PathBuf::from(OsStr::from_bytes(b"/m/caf\xe9.wav"));
        let destination = PathBuf::from(OsStr::from_bytes(b"/m/caf\xe9.flac"));
        let job = EncodeJob::new(TaskId(3), &source, &destination);

        let args = FlacEncoder::build_args(&job);
        assert_eq!(args[3].as_bytes(), b"/m/caf\xe9.flac");
        assert_eq!(args[4].as_bytes(), b"/m/caf\xe9.wav");
    }

    #[tokio::test]
    async fn test_read_tail_keeps_last_bytes() {
        let mut input = vec![b'a'; 10_000];
        input.extend_from_slice(b"ERROR: bad header");

        let tail = read_tail(input.as_slice(), 64).await.unwrap();
        assert_eq!(tail.len(), 64);
        assert!(tail.ends_with(b"ERROR: bad header"));

        let short = read_tail(&b"done"[..], 64).await.unwrap();
        assert_eq!(short, b"done");
    }

    #[test]
    fn test_stderr_tail() {
        assert_eq!(stderr_tail(b""), None);
        assert_eq!(stderr_tail(b"oops").as_deref(), Some("oops"));

        let long = vec![b'x'; STDERR_TAIL_BYTES + 10];
        assert_eq!(stderr_tail(&long).unwrap().len(), STDERR_TAIL_BYTES);
    }

    #[tokio::test]
    async fn test_missing_binary_is_launch_failure() {
        let encoder = FlacEncoder::new(EncoderConfig {
            path: PathBuf::from("/nonexistent/definitely-not-flac"),
            ..Default::default()
        });
        let job = EncodeJob::new(TaskId(1), "/tmp/a.wav", "/tmp/a.flac");

        let err = encoder.encode(&job).await.unwrap_err();
        assert!(matches!(err, EncoderError::LaunchFailed { .. }));

        let err = encoder.validate().await.unwrap_err();
        assert!(matches!(err, EncoderError::LaunchFailed { .. }));
    }
}
