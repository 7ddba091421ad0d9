//! Baton hand-off between adjacent stages.
//!
//! Each link in the ring is a unit-capacity channel. Exactly one [`Turn`]
//! exists per run: the coordinator creates it and injects it at the reader,
//! and from then on it is only ever moved from one link to the next. Since
//! the turn carries the [`SharedBuffer`] by value, the stage holding the
//! baton is the only one that can touch the buffer.

use crossbeam_channel::{Receiver, Sender, bounded};

use crate::buffer::SharedBuffer;

/// What the holder of a turn is told to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Baton {
    /// Perform one unit of work.
    Go,
    /// Do no work, pass the halt on, and exit.
    Halt,
}

/// The single token circulating in the ring.
#[derive(Debug)]
pub struct Turn {
    pub baton: Baton,
    /// Number of turns taken before this one.
    pub seq: u64,
    pub slot: SharedBuffer,
}

impl Turn {
    /// The turn injected to start a run.
    pub fn first() -> Self {
        Self {
            baton: Baton::Go,
            seq: 0,
            slot: SharedBuffer::new(),
        }
    }

    /// A turn that stops every stage it reaches.
    pub fn halt() -> Self {
        Self {
            baton: Baton::Halt,
            ..Self::first()
        }
    }
}

/// Sending half of a link.
#[derive(Debug, Clone)]
pub struct BatonTx(Sender<Turn>);

/// Receiving half of a link.
#[derive(Debug)]
pub struct BatonRx(Receiver<Turn>);

impl BatonTx {
    /// Hand the turn to the next stage.
    ///
    /// Returns `false` if the next stage has already exited. The link is
    /// always empty when a turn is released, so this never blocks.
    pub fn release(&self, turn: Turn) -> bool {
        self.0.send(turn).is_ok()
    }
}

impl BatonRx {
    /// Block until the previous stage releases the turn.
    ///
    /// Returns `None` once every sender of the link is gone.
    pub fn acquire(&self) -> Option<Turn> {
        self.0.recv().ok()
    }
}

/// Create one link.
pub fn link() -> (BatonTx, BatonRx) {
    let (tx, rx) = bounded(1);
    (BatonTx(tx), BatonRx(rx))
}

/// The two link ends a stage owns.
#[derive(Debug)]
pub struct StageLinks {
    pub inbound: BatonRx,
    pub outbound: BatonTx,
}

/// All links of the three-stage ring.
#[derive(Debug)]
pub struct RingLinks {
    pub reader: StageLinks,
    pub transporter: StageLinks,
    pub writer: StageLinks,
    /// A second sender into the reader's inbound link, used by the
    /// coordinator to inject the first turn.
    pub inject: BatonTx,
}

/// Wire reader → transporter → writer → reader.
pub fn ring() -> RingLinks {
    let (reader_tx, reader_rx) = link();
    let (transporter_tx, transporter_rx) = link();
    let (writer_tx, writer_rx) = link();
    RingLinks {
        reader: StageLinks {
            inbound: reader_rx,
            outbound: transporter_tx,
        },
        transporter: StageLinks {
            inbound: transporter_rx,
            outbound: writer_tx,
        },
        writer: StageLinks {
            inbound: writer_rx,
            outbound: reader_tx.clone(),
        },
        inject: reader_tx,
    }
}
