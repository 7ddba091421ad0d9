//! Turn-by-turn trace of a ring run.
//!
//! Each stage records the turns it takes; the sequence number stamped on
//! the circulating turn lets the coordinator merge the per-stage logs into
//! one global order after the run.

use crate::stage::StageId;

/// What a stage did with one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    /// Ran its work function and kept cycling.
    Continued,
    /// Ran its work function and reached its termination condition.
    Finished,
    /// Ran its work function, which failed.
    Failed,
    /// Skipped its work function and passed a halt on.
    Halted,
}

/// One turn as seen by the stage that took it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnRecord {
    pub seq: u64,
    pub stage: StageId,
    pub kind: TurnKind,
}

/// All turns of a run in baton order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnTrace {
    pub turns: Vec<TurnRecord>,
}

impl TurnTrace {
    /// Merge per-stage logs into one trace ordered by sequence number.
    pub fn merge(parts: impl IntoIterator<Item = Vec<TurnRecord>>) -> Self {
        let mut turns: Vec<TurnRecord> = parts.into_iter().flatten().collect();
        turns.sort_by_key(|t| t.seq);
        Self { turns }
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// True when turns are numbered 0, 1, 2, ... with no gaps or repeats and
    /// rotate reader, transporter, writer, reader, ...
    pub fn is_round_robin(&self) -> bool {
        self.turns.iter().enumerate().all(|(i, t)| {
            t.seq == i as u64 && t.stage == StageId::RING[i % StageId::RING.len()]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(seq: u64, stage: StageId) -> TurnRecord {
        TurnRecord {
            seq,
            stage,
            kind: TurnKind::Continued,
        }
    }

    #[test]
    fn test_merge_orders_by_seq() {
        let trace = TurnTrace::merge(vec![
            vec![record(0, StageId::Reader), record(3, StageId::Reader)],
            vec![record(1, StageId::Transporter)],
            vec![record(2, StageId::Writer)],
        ]);
        let seqs: Vec<u64> = trace.turns.iter().map(|t| t.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2, 3]);
        assert!(trace.is_round_robin());
    }

    #[test]
    fn test_gap_is_not_round_robin() {
        let trace = TurnTrace::merge(vec![vec![
            record(0, StageId::Reader),
            record(2, StageId::Transporter),
        ]]);
        assert!(!trace.is_round_robin());
    }

    #[test]
    fn test_repeated_seq_is_not_round_robin() {
        let trace = TurnTrace::merge(vec![
            vec![record(0, StageId::Reader)],
            vec![record(0, StageId::Transporter)],
        ]);
        assert!(!trace.is_round_robin());
    }

    #[test]
    fn test_empty_trace() {
        let trace = TurnTrace::default();
        assert!(trace.is_empty());
        assert!(trace.is_round_robin());
    }
}
