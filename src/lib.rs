//! # baton-ring
//!
//! Strips a variable-length header from a line-oriented record file and
//! copies the body to an output file, using a fixed ring of three stages
//! that pass a single baton around.
//!
//! ## Overview
//!
//! - **Reader**: reads one bounded line per turn and sends it down the
//!   transport (an in-process channel or an OS pipe).
//! - **Transporter**: moves one record per turn from the transport into the
//!   shared slot.
//! - **Writer**: drops everything up to and including the `end_header`
//!   sentinel and appends the remaining lines to the output.
//!
//! Only the stage holding the baton does any work, so turns are strictly
//! ordered reader, transporter, writer, reader, ... End of input drains
//! through the ring in the same order, and a failure anywhere halts every
//! stage without leaving one blocked.
//!
//! ## Example
//!
//! ```
//! use baton_ring::{Coordinator, RingConfig};
//! use std::io::Cursor;
//!
//! let input = "a\nb\nend_header\n1,2,3\n4,5,6\n";
//! let mut output = Vec::new();
//!
//! let coordinator = Coordinator::new(RingConfig::default()).unwrap();
//! let report = coordinator
//!     .run(Cursor::new(input.as_bytes()), &mut output)
//!     .unwrap();
//!
//! assert_eq!(output, b"1,2,3\n4,5,6\n");
//! assert_eq!(report.lines_written, 2);
//! ```

pub mod baton;
pub mod buffer;
pub mod config;
pub mod coordinator;
pub mod debug_trace;
pub mod error;
pub mod executor;
pub mod header;
pub mod line;
pub mod stage;
pub mod stages;
pub mod transport;

pub use baton::{Baton, Turn};
pub use buffer::{SharedBuffer, TerminationFlag};
pub use config::{
    DEFAULT_MAX_LINE_LEN, DEFAULT_SENTINEL, MAX_LINE_LEN_CEILING, OverlongPolicy, RingConfig,
    SentinelMatch, TransportKind,
};
pub use coordinator::{Coordinator, RunReport};
pub use debug_trace::{TurnKind, TurnRecord, TurnTrace};
pub use error::{PipelineError, Result};
pub use executor::{CancelHandle, StageExit, run_stage};
pub use header::{Disposition, FilterState, HeaderFilter};
pub use line::{Line, LineReader};
pub use stage::{Outcome, Stage, StageId, Step};
pub use stages::{ReaderStage, TransporterStage, WriterStage};
