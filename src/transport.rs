//! Record hand-off media between the Reader and the Transporter.
//!
//! The Reader pushes at most one record per turn and the Transporter pulls
//! at most one per turn, so neither side ever finds the medium full.
//! Closing the writing half is how the Reader tells the Transporter that no
//! further records will follow.

use std::io::{self, BufRead, BufReader, PipeReader, PipeWriter, Write};

use crossbeam_channel::{Receiver, Sender, bounded};

use crate::config::TransportKind;
use crate::error::{PipelineError, Result};

/// Largest single write (record plus terminator) the pipe transport accepts.
pub const PIPE_LINE_LIMIT: usize = 4096;

/// Sending half, owned by the Reader.
pub trait TransportWriter: Send {
    fn send(&mut self, record: String) -> io::Result<()>;

    /// Signal that no further records will be sent.
    fn close(&mut self) -> io::Result<()>;
}

/// Receiving half, owned by the Transporter.
pub trait TransportReader: Send {
    /// The next record, or `None` once the writing half is closed and drained.
    fn recv(&mut self) -> io::Result<Option<String>>;

    fn close(&mut self);
}

/// Create a connected writer/reader pair on the requested medium.
pub fn open(kind: TransportKind) -> Result<(Box<dyn TransportWriter>, Box<dyn TransportReader>)> {
    let pair: (Box<dyn TransportWriter>, Box<dyn TransportReader>) = match kind {
        TransportKind::Channel => {
            let (tx, rx) = bounded(1);
            (
                Box::new(ChannelWriter { tx: Some(tx) }),
                Box::new(ChannelReader { rx: Some(rx) }),
            )
        }
        TransportKind::Pipe => {
            let (rx, tx) = io::pipe().map_err(PipelineError::Transport)?;
            (
                Box::new(PipeLineWriter { pipe: Some(tx) }),
                Box::new(PipeLineReader {
                    pipe: Some(BufReader::new(rx)),
                    line: String::new(),
                }),
            )
        }
    };
    Ok(pair)
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "transport closed")
}

// ---------------------------------------------------------------------------
// In-process channel
// ---------------------------------------------------------------------------

pub struct ChannelWriter {
    tx: Option<Sender<String>>,
}

impl TransportWriter for ChannelWriter {
    fn send(&mut self, record: String) -> io::Result<()> {
        let tx = self.tx.as_ref().ok_or_else(closed)?;
        tx.send(record).map_err(|_| closed())
    }

    fn close(&mut self) -> io::Result<()> {
        self.tx = None;
        Ok(())
    }
}

pub struct ChannelReader {
    rx: Option<Receiver<String>>,
}

impl TransportReader for ChannelReader {
    fn recv(&mut self) -> io::Result<Option<String>> {
        match &self.rx {
            Some(rx) => Ok(rx.recv().ok()),
            None => Ok(None),
        }
    }

    fn close(&mut self) {
        self.rx = None;
    }
}

// ---------------------------------------------------------------------------
// OS pipe
// ---------------------------------------------------------------------------

pub struct PipeLineWriter {
    pipe: Option<PipeWriter>,
}

impl TransportWriter for PipeLineWriter {
    fn send(&mut self, record: String) -> io::Result<()> {
        let pipe = self.pipe.as_mut().ok_or_else(closed)?;
        let mut bytes = record.into_bytes();
        bytes.push(b'\n');
        pipe.write_all(&bytes)
    }

    fn close(&mut self) -> io::Result<()> {
        match self.pipe.take() {
            Some(mut pipe) => pipe.flush(),
            None => Ok(()),
        }
    }
}

pub struct PipeLineReader {
    pipe: Option<BufReader<PipeReader>>,
    line: String,
}

impl TransportReader for PipeLineReader {
    fn recv(&mut self) -> io::Result<Option<String>> {
        let Some(pipe) = self.pipe.as_mut() else {
            return Ok(None);
        };
        self.line.clear();
        if pipe.read_line(&mut self.line)? == 0 {
            return Ok(None);
        }
        if self.line.ends_with('\n') {
            self.line.pop();
        }
        Ok(Some(std::mem::take(&mut self.line)))
    }

    fn close(&mut self) {
        self.pipe = None;
    }
}
