//! The stage abstraction driven by the ring executor.

use std::fmt;

use crate::buffer::SharedBuffer;
use crate::error::Result;

/// Position of a stage in the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageId {
    Reader,
    Transporter,
    Writer,
}

impl StageId {
    /// Ring order, starting with the stage that receives the first baton.
    pub const RING: [StageId; 3] = [StageId::Reader, StageId::Transporter, StageId::Writer];

    pub fn name(self) -> &'static str {
        match self {
            StageId::Reader => "reader",
            StageId::Transporter => "transporter",
            StageId::Writer => "writer",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of one unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Keep cycling.
    Continue,
    /// The stage's termination condition fired.
    Done,
}

/// How a stage's loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The stage reported [`Step::Done`].
    Drained,
    /// The stage was told to stop by a halt baton, a cancel request, or a
    /// vanished upstream.
    Halted,
    /// The stage's own work failed.
    Failed,
}

/// One node in the ring.
///
/// The executor calls `run_once` exactly once per baton it holds, handing
/// over the shared slot for the duration of the call. `finish` runs once,
/// after the stage has released its last baton.
pub trait Stage {
    fn id(&self) -> StageId;

    /// Perform one unit of work.
    fn run_once(&mut self, slot: &mut SharedBuffer) -> Result<Step>;

    /// Termination action.
    fn finish(&mut self, _outcome: Outcome) -> Result<()> {
        Ok(())
    }
}
