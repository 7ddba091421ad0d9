//! Cross-stage state: the single record slot and the termination flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// The single record slot shared by the ring.
///
/// The slot travels inside the baton, so whichever stage holds the baton
/// owns it outright. There is never a second reference to contend with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedBuffer {
    record: String,
    end_of_stream: bool,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the slot contents with `record`.
    pub fn fill(&mut self, record: String) {
        self.record = record;
        self.end_of_stream = false;
    }

    /// Mark the slot as holding no record because input has ended.
    pub fn mark_end_of_stream(&mut self) {
        self.record.clear();
        self.end_of_stream = true;
    }

    /// Empty the slot at the start of a new cycle.
    pub fn clear(&mut self) {
        self.record.clear();
        self.end_of_stream = false;
    }

    /// The current record, or `None` if the slot holds the end-of-stream marker.
    pub fn record(&self) -> Option<&str> {
        if self.end_of_stream {
            None
        } else {
            Some(&self.record)
        }
    }
}

/// Set-once flag raised by the stage that observes the end of input.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct TerminationFlag(Arc<AtomicBool>);

impl TerminationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
