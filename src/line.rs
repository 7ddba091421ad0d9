//! Bounded line reading.
//!
//! Lines are split on `\n`; a trailing `\r` is stripped as well, so both
//! Unix and DOS terminators normalise to the bare record. A final line with
//! no terminator is still a record.
//!
//! A line longer than the configured bound never spills into the next
//! record. Under [`OverlongPolicy::Truncate`] the record keeps its first
//! `max_len` bytes (cut back to a character boundary) and the rest of the
//! physical line is consumed and dropped. Under [`OverlongPolicy::Fail`] the
//! read fails with [`PipelineError::LineTooLong`].

use std::io::{self, BufRead};

use crate::config::OverlongPolicy;
use crate::error::{PipelineError, Result};
use crate::stage::StageId;

/// One normalised record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    /// Original length in bytes when the line was truncated.
    pub truncated_from: Option<usize>,
}

/// Reads bounded, terminator-stripped lines from a buffered source.
pub struct LineReader<R> {
    inner: R,
    max_len: usize,
    policy: OverlongPolicy,
    line_no: usize,
    buf: Vec<u8>,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(inner: R, max_len: usize, policy: OverlongPolicy) -> Self {
        Self {
            inner,
            max_len,
            policy,
            line_no: 0,
            buf: Vec::new(),
        }
    }

    /// Number of records returned so far.
    pub fn line_no(&self) -> usize {
        self.line_no
    }

    /// Read the next record, or `None` at end of input.
    pub fn read_line(&mut self) -> Result<Option<Line>> {
        self.buf.clear();
        // Room for a trailing '\r' past the bound.
        let keep = self.max_len.saturating_add(1);
        let mut total = 0usize;
        let mut last_byte = None;
        let mut saw_any = false;

        loop {
            let (used, done) = {
                let available = match self.inner.fill_buf() {
                    Ok(bytes) => bytes,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(PipelineError::io(StageId::Reader, e)),
                };
                if available.is_empty() {
                    break;
                }
                saw_any = true;

                let (chunk, used, done) = match available.iter().position(|&b| b == b'\n') {
                    Some(i) => (&available[..i], i + 1, true),
                    None => (available, available.len(), false),
                };
                if let Some(&b) = chunk.last() {
                    last_byte = Some(b);
                }
                total += chunk.len();
                let room = keep.saturating_sub(self.buf.len());
                self.buf.extend_from_slice(&chunk[..chunk.len().min(room)]);
                (used, done)
            };
            self.inner.consume(used);
            if done {
                break;
            }
        }

        if !saw_any {
            return Ok(None);
        }
        self.line_no += 1;

        let len = if last_byte == Some(b'\r') { total - 1 } else { total };
        let truncated_from = if len > self.max_len {
            if self.policy == OverlongPolicy::Fail {
                return Err(PipelineError::LineTooLong {
                    line: self.line_no,
                    len,
                    max: self.max_len,
                });
            }
            Some(len)
        } else {
            None
        };
        self.buf.truncate(len.min(self.max_len));

        let text = self.decode(truncated_from.is_some())?;
        Ok(Some(Line {
            text,
            truncated_from,
        }))
    }

    fn decode(&mut self, truncated: bool) -> Result<String> {
        let bytes = std::mem::take(&mut self.buf);
        match String::from_utf8(bytes) {
            Ok(text) => Ok(text),
            Err(e) => {
                let err = e.utf8_error();
                // A cut through a multi-byte character leaves an incomplete
                // sequence at the very end; drop it.
                if truncated && err.error_len().is_none() {
                    let mut bytes = e.into_bytes();
                    bytes.truncate(err.valid_up_to());
                    String::from_utf8(bytes)
                        .map_err(|_| PipelineError::InvalidUtf8 { line: self.line_no })
                } else {
                    Err(PipelineError::InvalidUtf8 { line: self.line_no })
                }
            }
        }
    }
}
