//! Header filter state machine.
//!
//! Every record before and including the first sentinel is header. After
//! that, every record is body except further sentinel lines, which are
//! never emitted.

use crate::config::{RingConfig, SentinelMatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    InHeader,
    InBody,
}

/// What the filter decided about one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// A header line; discarded.
    Header,
    /// A sentinel line; discarded.
    Sentinel,
    /// A body line; written to the output.
    Body,
}

#[derive(Debug, Clone)]
pub struct HeaderFilter {
    state: FilterState,
    sentinel: String,
    matcher: SentinelMatch,
}

impl HeaderFilter {
    pub fn new(sentinel: impl Into<String>, matcher: SentinelMatch) -> Self {
        Self {
            state: FilterState::InHeader,
            sentinel: sentinel.into(),
            matcher,
        }
    }

    pub fn from_config(config: &RingConfig) -> Self {
        Self::new(config.sentinel.clone(), config.sentinel_match)
    }

    pub fn state(&self) -> FilterState {
        self.state
    }

    /// Classify `record`, advancing the state when the sentinel is seen.
    pub fn accept(&mut self, record: &str) -> Disposition {
        let is_sentinel = self.matcher.matches(record, &self.sentinel);
        match self.state {
            FilterState::InHeader if is_sentinel => {
                self.state = FilterState::InBody;
                Disposition::Sentinel
            }
            FilterState::InHeader => Disposition::Header,
            FilterState::InBody if is_sentinel => Disposition::Sentinel,
            FilterState::InBody => Disposition::Body,
        }
    }
}
