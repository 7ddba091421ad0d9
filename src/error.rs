//! Error types for the baton ring.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::stage::StageId;

/// Errors that can occur while setting up or running the ring.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("cannot open input '{}': {source}", .path.display())]
    SourceUnavailable { path: PathBuf, source: io::Error },

    #[error("cannot create output '{}': {source}", .path.display())]
    SinkUnavailable { path: PathBuf, source: io::Error },

    #[error("cannot start {stage} stage: {source}")]
    Spawn { stage: StageId, source: io::Error },

    #[error("cannot create transport: {0}")]
    Transport(io::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{stage} stage I/O error: {source}")]
    Io { stage: StageId, source: io::Error },

    #[error("line {line} is {len} bytes, limit is {max}")]
    LineTooLong { line: usize, len: usize, max: usize },

    #[error("line {line} is not valid UTF-8")]
    InvalidUtf8 { line: usize },

    #[error("{stage} stage panicked")]
    StagePanicked { stage: StageId },

    #[error("pipeline cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Wrap an I/O error raised during a stage's turn.
    pub fn io(stage: StageId, source: io::Error) -> Self {
        PipelineError::Io { stage, source }
    }

    /// Process exit code for this error.
    ///
    /// Resource errors get distinct codes so scripts can tell a missing
    /// input apart from a failed run.
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Transport(_) | PipelineError::InvalidConfig(_) => 2,
            PipelineError::SourceUnavailable { .. } => 3,
            PipelineError::SinkUnavailable { .. } => 4,
            PipelineError::Spawn { .. } => 5,
            PipelineError::Cancelled => 130,
            PipelineError::Io { .. }
            | PipelineError::LineTooLong { .. }
            | PipelineError::InvalidUtf8 { .. }
            | PipelineError::StagePanicked { .. } => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_for_resources() {
        let source = PipelineError::SourceUnavailable {
            path: PathBuf::from("data.txt"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        let sink = PipelineError::SinkUnavailable {
            path: PathBuf::from("src.txt"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        let spawn = PipelineError::Spawn {
            stage: StageId::Transporter,
            source: io::Error::from(io::ErrorKind::OutOfMemory),
        };
        assert_eq!(source.exit_code(), 3);
        assert_eq!(sink.exit_code(), 4);
        assert_eq!(spawn.exit_code(), 5);
        assert_eq!(PipelineError::Cancelled.exit_code(), 130);
    }

    #[test]
    fn test_display_names_stage() {
        let err = PipelineError::io(StageId::Writer, io::Error::other("disk full"));
        assert_eq!(err.to_string(), "writer stage I/O error: disk full");
    }

    #[test]
    fn test_display_line_too_long() {
        let err = PipelineError::LineTooLong {
            line: 4,
            len: 300,
            max: 200,
        };
        assert_eq!(err.to_string(), "line 4 is 300 bytes, limit is 200");
    }
}
