//! Ring executor.
//!
//! [`run_stage`] drives one stage: wait for the inbound baton, run one unit
//! of work, release the outbound baton, repeat until the stage is done. All
//! three stages run this same loop on their own threads, and since only one
//! turn circulates, their work is totally ordered: reader, transporter,
//! writer, reader, ...
//!
//! A failing stage still releases its baton, marked [`Baton::Halt`], so the
//! stages downstream skip their work and exit instead of waiting forever. A
//! stage whose upstream has exited without passing a baton on exits too.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error, trace};

use crate::baton::{Baton, StageLinks};
use crate::debug_trace::{TurnKind, TurnRecord};
use crate::error::PipelineError;
use crate::stage::{Outcome, Stage, StageId, Step};

/// Request that a running ring stop at the next baton hand-off.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// How a stage left the ring.
#[derive(Debug)]
pub struct StageExit {
    pub stage: StageId,
    pub outcome: Outcome,
    /// First error raised by the stage's work or its termination action.
    pub error: Option<PipelineError>,
    /// Number of batons acquired, halts included.
    pub taken: u64,
    /// Turns taken, when tracing was requested.
    pub turns: Vec<TurnRecord>,
}

/// Drive `stage` until it is done, halted, or failed, then run its
/// termination action.
pub fn run_stage<S: Stage>(
    stage: &mut S,
    links: StageLinks,
    cancel: &CancelHandle,
    record_turns: bool,
) -> StageExit {
    let id = stage.id();
    let StageLinks { inbound, outbound } = links;
    let mut taken = 0u64;
    let mut turns = Vec::new();
    let mut note = |seq: u64, kind: TurnKind| {
        if record_turns {
            turns.push(TurnRecord {
                seq,
                stage: id,
                kind,
            });
        }
    };

    debug!(stage = %id, "stage started");

    let (mut outcome, mut failure) = loop {
        let Some(mut turn) = inbound.acquire() else {
            debug!(stage = %id, "upstream exited without a baton");
            break (Outcome::Halted, None);
        };
        let seq = turn.seq;
        turn.seq += 1;
        taken += 1;

        if turn.baton == Baton::Halt || cancel.is_cancelled() {
            note(seq, TurnKind::Halted);
            turn.baton = Baton::Halt;
            outbound.release(turn);
            break (Outcome::Halted, None);
        }

        trace!(stage = %id, seq, "turn");
        match stage.run_once(&mut turn.slot) {
            Ok(Step::Continue) => {
                note(seq, TurnKind::Continued);
                outbound.release(turn);
            }
            Ok(Step::Done) => {
                note(seq, TurnKind::Finished);
                outbound.release(turn);
                break (Outcome::Drained, None);
            }
            Err(e) => {
                error!(stage = %id, seq, error = %e, "stage failed");
                note(seq, TurnKind::Failed);
                turn.baton = Baton::Halt;
                outbound.release(turn);
                break (Outcome::Failed, Some(e));
            }
        }
    };

    if let Err(e) = stage.finish(outcome) {
        error!(stage = %id, error = %e, "termination action failed");
        if outcome == Outcome::Drained {
            outcome = Outcome::Failed;
        }
        failure.get_or_insert(e);
    }

    debug!(stage = %id, ?outcome, "stage exited");
    StageExit {
        stage: id,
        outcome,
        error: failure,
        taken,
        turns,
    }
}
