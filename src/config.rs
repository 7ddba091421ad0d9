//! Ring configuration: line bound, header sentinel, and transport selection.

use clap::ValueEnum;

use crate::error::{PipelineError, Result};
use crate::transport::PIPE_LINE_LIMIT;

/// Default maximum record length in bytes, excluding the line terminator.
pub const DEFAULT_MAX_LINE_LEN: usize = 200;

/// Largest accepted `max_line_len`: 1 MiB.
pub const MAX_LINE_LEN_CEILING: usize = 1 << 20;

/// Default line that separates the header from the body.
pub const DEFAULT_SENTINEL: &str = "end_header";

/// How a record is compared against the sentinel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SentinelMatch {
    /// The whole record must equal the sentinel.
    #[default]
    Exact,
    /// The record must start with the sentinel.
    Prefix,
}

impl SentinelMatch {
    pub fn matches(self, record: &str, sentinel: &str) -> bool {
        match self {
            SentinelMatch::Exact => record == sentinel,
            SentinelMatch::Prefix => record.starts_with(sentinel),
        }
    }
}

/// What to do with a line longer than `max_line_len`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OverlongPolicy {
    /// Keep the first `max_line_len` bytes and drop the rest of the line.
    #[default]
    Truncate,
    /// Fail the run.
    Fail,
}

/// Medium between the Reader and the Transporter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum TransportKind {
    /// In-process channel.
    #[default]
    Channel,
    /// Anonymous OS pipe.
    Pipe,
}

/// Settings for one ring run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingConfig {
    pub max_line_len: usize,
    pub sentinel: String,
    pub sentinel_match: SentinelMatch,
    pub overlong: OverlongPolicy,
    pub transport: TransportKind,
    /// Record the baton sequence into the run report.
    pub trace: bool,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            max_line_len: DEFAULT_MAX_LINE_LEN,
            sentinel: DEFAULT_SENTINEL.to_string(),
            sentinel_match: SentinelMatch::default(),
            overlong: OverlongPolicy::default(),
            transport: TransportKind::default(),
            trace: false,
        }
    }
}

impl RingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line_len(mut self, max_line_len: usize) -> Self {
        self.max_line_len = max_line_len;
        self
    }

    pub fn with_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.sentinel = sentinel.into();
        self
    }

    pub fn with_sentinel_match(mut self, sentinel_match: SentinelMatch) -> Self {
        self.sentinel_match = sentinel_match;
        self
    }

    pub fn with_overlong(mut self, overlong: OverlongPolicy) -> Self {
        self.overlong = overlong;
        self
    }

    pub fn with_transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Check the settings before any resource is acquired.
    pub fn validate(&self) -> Result<()> {
        if self.max_line_len == 0 {
            return Err(PipelineError::InvalidConfig(
                "max line length must be at least 1".to_string(),
            ));
        }
        if self.max_line_len > MAX_LINE_LEN_CEILING {
            return Err(PipelineError::InvalidConfig(format!(
                "max line length must be at most {MAX_LINE_LEN_CEILING}, got {}",
                self.max_line_len
            )));
        }
        if self.sentinel.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "sentinel must not be empty".to_string(),
            ));
        }
        if self.sentinel.contains(['\n', '\r']) {
            return Err(PipelineError::InvalidConfig(
                "sentinel must not contain a line terminator".to_string(),
            ));
        }
        // One record plus its terminator must fit in a single atomic pipe write.
        if self.transport == TransportKind::Pipe && self.max_line_len >= PIPE_LINE_LIMIT {
            return Err(PipelineError::InvalidConfig(format!(
                "pipe transport supports lines up to {} bytes, got {}",
                PIPE_LINE_LIMIT - 1,
                self.max_line_len
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RingConfig::default();
        assert_eq!(config.max_line_len, 200);
        assert_eq!(config.sentinel, "end_header");
        assert_eq!(config.sentinel_match, SentinelMatch::Exact);
        assert_eq!(config.overlong, OverlongPolicy::Truncate);
        assert_eq!(config.transport, TransportKind::Channel);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_exact_match() {
        let exact = SentinelMatch::Exact;
        assert!(exact.matches("end_header", DEFAULT_SENTINEL));
        assert!(!exact.matches("end_header2", DEFAULT_SENTINEL));
        assert!(!exact.matches("END_HEADER", DEFAULT_SENTINEL));
        assert!(!exact.matches("end_head", DEFAULT_SENTINEL));
    }

    #[test]
    fn test_prefix_match() {
        let prefix = SentinelMatch::Prefix;
        assert!(prefix.matches("end_header", DEFAULT_SENTINEL));
        assert!(prefix.matches("end_header: v2", DEFAULT_SENTINEL));
        assert!(!prefix.matches(" end_header", DEFAULT_SENTINEL));
        assert!(!prefix.matches("End_header", DEFAULT_SENTINEL));
    }

    #[test]
    fn test_rejects_zero_line_len() {
        let config = RingConfig::new().with_max_line_len(0);
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_line_len_above_ceiling() {
        assert!(RingConfig::new().with_max_line_len(MAX_LINE_LEN_CEILING).validate().is_ok());
        for len in [MAX_LINE_LEN_CEILING + 1, 1 << 40, usize::MAX] {
            let config = RingConfig::new().with_max_line_len(len);
            assert!(matches!(
                config.validate(),
                Err(PipelineError::InvalidConfig(_))
            ));
            let pipe = config.with_transport(TransportKind::Pipe);
            assert!(pipe.validate().is_err());
        }
    }

    #[test]
    fn test_rejects_bad_sentinel() {
        assert!(RingConfig::new().with_sentinel("").validate().is_err());
        assert!(RingConfig::new().with_sentinel("end\n").validate().is_err());
    }

    #[test]
    fn test_pipe_line_limit() {
        let ok = RingConfig::new()
            .with_transport(TransportKind::Pipe)
            .with_max_line_len(PIPE_LINE_LIMIT - 1);
        assert!(ok.validate().is_ok());

        let too_big = ok.with_max_line_len(PIPE_LINE_LIMIT);
        assert!(too_big.validate().is_err());

        // The channel transport has no such limit.
        let channel = RingConfig::new().with_max_line_len(PIPE_LINE_LIMIT * 4);
        assert!(channel.validate().is_ok());
    }
}
