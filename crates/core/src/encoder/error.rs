//! Error types for the encoder module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while running the encoder.
#[derive(Debug, Clone, Error)]
pub enum EncoderError {
    /// The encoder process could not be started or waited on.
    #[error("Failed to launch encoder {path}: {reason}")]
    LaunchFailed { path: PathBuf, reason: String },

    /// The encoder ran and exited with a non-zero code (or was killed).
    #[error("Encoder exited with {}", describe_exit(.exit_code))]
    EncodingFailed {
        /// `None` when the process was terminated by a signal.
        exit_code: Option<i32>,
        stderr: Option<String>,
    },
}

fn describe_exit(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

impl EncoderError {
    /// Creates a new launch failure.
    pub fn launch_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::LaunchFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new encoding failure.
    pub fn encoding_failed(exit_code: Option<i32>, stderr: Option<String>) -> Self {
        Self::EncodingFailed { exit_code, stderr }
    }

    /// Exit code reported by the encoder, if it ran at all.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::EncodingFailed { exit_code, .. } => *exit_code,
            Self::LaunchFailed { .. } => None,
        }
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LaunchFailed { .. } => "launch_failed",
            Self::EncodingFailed { .. } => "encoding_failed",
        }
    }

    /// Message shown next to a failed task: the error plus the last stderr line.
    pub fn user_message(&self) -> String {
        match self {
            Self::EncodingFailed {
                stderr: Some(stderr),
                ..
            } => match stderr.lines().rev().find(|l| !l.trim().is_empty()) {
                Some(last) => format!("{}: {}", self, last.trim()),
                None => self.to_string(),
            },
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_failed_display() {
        let err = EncoderError::encoding_failed(Some(1), None);
        assert_eq!(err.to_string(), "Encoder exited with code 1");
        assert_eq!(err.exit_code(), Some(1));
        assert_eq!(err.kind(), "encoding_failed");
    }

    #[test]
    fn test_signal_termination_display() {
        let err = EncoderError::encoding_failed(None, None);
        assert!(err.to_string().contains("terminated by signal"));
    }

    #[test]
    fn test_launch_failed_display() {
        let err = EncoderError::launch_failed("/opt/flac", "No such file or directory");
        assert_eq!(
            err.to_string(),
            "Failed to launch encoder /opt/flac: No such file or directory"
        );
        assert_eq!(err.exit_code(), None);
        assert_eq!(err.user_message(), err.to_string());
    }

    #[test]
    fn test_user_message_uses_last_stderr_line() {
        let err = EncoderError::encoding_failed(
            Some(1),
            Some("flac 1.4.3\n\nERROR: input file has an unsupported format\n\n".to_string()),
        );
        assert_eq!(
            err.user_message(),
            "Encoder exited with code 1: ERROR: input file has an unsupported format"
        );
    }
}
