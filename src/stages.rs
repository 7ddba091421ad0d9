//! The three ring stages.
//!
//! - [`ReaderStage`] pulls one bounded line per turn from the input and
//!   sends it down the transport.
//! - [`TransporterStage`] moves one record per turn from the transport
//!   into the shared slot, and raises the termination flag when the
//!   transport runs dry.
//! - [`WriterStage`] runs the header filter over the slot and appends body
//!   lines to the output.

use std::io::{BufRead, Write};

use crossbeam_channel::Sender;
use tracing::{debug, warn};

use crate::buffer::{SharedBuffer, TerminationFlag};
use crate::config::RingConfig;
use crate::error::{PipelineError, Result};
use crate::header::{Disposition, HeaderFilter};
use crate::line::LineReader;
use crate::stage::{Outcome, Stage, StageId, Step};
use crate::transport::{TransportReader, TransportWriter};

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

pub struct ReaderStage<R> {
    lines: LineReader<R>,
    tx: Box<dyn TransportWriter>,
    max_line_len: usize,
    lines_read: usize,
    lines_truncated: usize,
}

impl<R: BufRead> ReaderStage<R> {
    pub fn new(input: R, config: &RingConfig, tx: Box<dyn TransportWriter>) -> Self {
        Self {
            lines: LineReader::new(input, config.max_line_len, config.overlong),
            tx,
            max_line_len: config.max_line_len,
            lines_read: 0,
            lines_truncated: 0,
        }
    }

    pub fn lines_read(&self) -> usize {
        self.lines_read
    }

    pub fn lines_truncated(&self) -> usize {
        self.lines_truncated
    }
}

impl<R: BufRead> Stage for ReaderStage<R> {
    fn id(&self) -> StageId {
        StageId::Reader
    }

    fn run_once(&mut self, slot: &mut SharedBuffer) -> Result<Step> {
        slot.clear();
        let Some(line) = self.lines.read_line()? else {
            return Ok(Step::Done);
        };
        self.lines_read += 1;
        if let Some(len) = line.truncated_from {
            self.lines_truncated += 1;
            warn!(
                line = self.lines.line_no(),
                len,
                max = self.max_line_len,
                "line truncated"
            );
        }
        self.tx
            .send(line.text)
            .map_err(|e| PipelineError::io(StageId::Reader, e))?;
        Ok(Step::Continue)
    }

    /// Close the transport so the Transporter sees the end of input.
    fn finish(&mut self, _outcome: Outcome) -> Result<()> {
        self.tx
            .close()
            .map_err(|e| PipelineError::io(StageId::Reader, e))
    }
}

// ---------------------------------------------------------------------------
// Transporter
// ---------------------------------------------------------------------------

pub struct TransporterStage {
    rx: Box<dyn TransportReader>,
    flag: TerminationFlag,
    records_transported: usize,
}

impl TransporterStage {
    pub fn new(rx: Box<dyn TransportReader>, flag: TerminationFlag) -> Self {
        Self {
            rx,
            flag,
            records_transported: 0,
        }
    }

    pub fn records_transported(&self) -> usize {
        self.records_transported
    }
}

impl Stage for TransporterStage {
    fn id(&self) -> StageId {
        StageId::Transporter
    }

    fn run_once(&mut self, slot: &mut SharedBuffer) -> Result<Step> {
        match self
            .rx
            .recv()
            .map_err(|e| PipelineError::io(StageId::Transporter, e))?
        {
            Some(record) => {
                slot.fill(record);
                self.records_transported += 1;
                Ok(Step::Continue)
            }
            None => {
                slot.mark_end_of_stream();
                self.flag.set();
                debug!(records = self.records_transported, "transport drained");
                Ok(Step::Done)
            }
        }
    }

    fn finish(&mut self, _outcome: Outcome) -> Result<()> {
        self.rx.close();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

pub struct WriterStage<W> {
    out: W,
    filter: HeaderFilter,
    flag: TerminationFlag,
    done: Sender<Outcome>,
    header_lines: usize,
    lines_written: usize,
}

impl<W: Write> WriterStage<W> {
    pub fn new(out: W, config: &RingConfig, flag: TerminationFlag, done: Sender<Outcome>) -> Self {
        Self {
            out,
            filter: HeaderFilter::from_config(config),
            flag,
            done,
            header_lines: 0,
            lines_written: 0,
        }
    }

    /// Lines discarded by the filter, sentinels included.
    pub fn header_lines(&self) -> usize {
        self.header_lines
    }

    pub fn lines_written(&self) -> usize {
        self.lines_written
    }
}

impl<W: Write> Stage for WriterStage<W> {
    fn id(&self) -> StageId {
        StageId::Writer
    }

    fn run_once(&mut self, slot: &mut SharedBuffer) -> Result<Step> {
        if self.flag.is_set() {
            return Ok(Step::Done);
        }
        let Some(record) = slot.record() else {
            return Ok(Step::Done);
        };
        match self.filter.accept(record) {
            Disposition::Header | Disposition::Sentinel => self.header_lines += 1,
            Disposition::Body => {
                self.out
                    .write_all(record.as_bytes())
                    .and_then(|()| self.out.write_all(b"\n"))
                    .map_err(|e| PipelineError::io(StageId::Writer, e))?;
                self.lines_written += 1;
            }
        }
        Ok(Step::Continue)
    }

    /// Flush the output and report completion to the coordinator.
    fn finish(&mut self, outcome: Outcome) -> Result<()> {
        let flushed = self
            .out
            .flush()
            .map_err(|e| PipelineError::io(StageId::Writer, e));
        let reported = if flushed.is_ok() {
            outcome
        } else {
            Outcome::Failed
        };
        // The coordinator may have stopped listening after a failed start.
        let _ = self.done.send(reported);
        flushed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OverlongPolicy, TransportKind};
    use crate::transport;
    use crossbeam_channel::bounded;
    use std::io::{self, Cursor};

    fn channel_pair() -> (Box<dyn TransportWriter>, Box<dyn TransportReader>) {
        transport::open(TransportKind::Channel).unwrap()
    }

    #[test]
    fn test_reader_sends_one_line_per_turn() {
        let (tx, mut rx) = channel_pair();
        let config = RingConfig::new();
        let mut reader = ReaderStage::new(Cursor::new(b"a\r\nb\n".to_vec()), &config, tx);
        let mut slot = SharedBuffer::new();

        assert_eq!(reader.run_once(&mut slot).unwrap(), Step::Continue);
        assert_eq!(rx.recv().unwrap().as_deref(), Some("a"));
        assert_eq!(reader.run_once(&mut slot).unwrap(), Step::Continue);
        assert_eq!(rx.recv().unwrap().as_deref(), Some("b"));
        assert_eq!(reader.run_once(&mut slot).unwrap(), Step::Done);

        reader.finish(Outcome::Drained).unwrap();
        assert_eq!(rx.recv().unwrap(), None);
        assert_eq!(reader.lines_read(), 2);
    }

    #[test]
    fn test_reader_clears_slot() {
        let (tx, _rx) = channel_pair();
        let mut reader = ReaderStage::new(Cursor::new(Vec::<u8>::new()), &RingConfig::new(), tx);
        let mut slot = SharedBuffer::new();
        slot.fill("previous".to_string());
        assert_eq!(reader.run_once(&mut slot).unwrap(), Step::Done);
        assert_eq!(slot.record(), Some(""));
    }

    #[test]
    fn test_reader_counts_truncations() {
        let (tx, mut rx) = channel_pair();
        let config = RingConfig::new()
            .with_max_line_len(3)
            .with_overlong(OverlongPolicy::Truncate);
        let mut reader = ReaderStage::new(Cursor::new(b"abcdef\n".to_vec()), &config, tx);
        let mut slot = SharedBuffer::new();
        reader.run_once(&mut slot).unwrap();
        assert_eq!(rx.recv().unwrap().as_deref(), Some("abc"));
        assert_eq!(reader.lines_truncated(), 1);
    }

    #[test]
    fn test_transporter_moves_and_drains() {
        let (mut tx, rx) = channel_pair();
        let flag = TerminationFlag::new();
        let mut transporter = TransporterStage::new(rx, flag.clone());
        let mut slot = SharedBuffer::new();

        tx.send("1,2,3".to_string()).unwrap();
        assert_eq!(transporter.run_once(&mut slot).unwrap(), Step::Continue);
        assert_eq!(slot.record(), Some("1,2,3"));
        assert!(!flag.is_set());

        tx.close().unwrap();
        assert_eq!(transporter.run_once(&mut slot).unwrap(), Step::Done);
        assert_eq!(slot.record(), None);
        assert!(flag.is_set());
        assert_eq!(transporter.records_transported(), 1);
    }

    #[test]
    fn test_writer_filters_header() {
        let (done_tx, done_rx) = bounded(1);
        let flag = TerminationFlag::new();
        let mut out = Vec::new();
        let mut writer = WriterStage::new(&mut out, &RingConfig::new(), flag.clone(), done_tx);
        let mut slot = SharedBuffer::new();

        for record in ["a", "b", "end_header", "1,2,3", "4,5,6"] {
            slot.fill(record.to_string());
            assert_eq!(writer.run_once(&mut slot).unwrap(), Step::Continue);
        }
        flag.set();
        slot.mark_end_of_stream();
        assert_eq!(writer.run_once(&mut slot).unwrap(), Step::Done);
        writer.finish(Outcome::Drained).unwrap();

        assert_eq!(writer.header_lines(), 3);
        assert_eq!(writer.lines_written(), 2);
        assert_eq!(done_rx.recv().unwrap(), Outcome::Drained);
        drop(writer);
        assert_eq!(out, b"1,2,3\n4,5,6\n");
    }

    struct FailingSink;

    impl Write for FailingSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::other("disk full"))
        }
    }

    #[test]
    fn test_writer_reports_sink_failure() {
        let (done_tx, done_rx) = bounded(1);
        let mut writer =
            WriterStage::new(FailingSink, &RingConfig::new(), TerminationFlag::new(), done_tx);
        let mut slot = SharedBuffer::new();

        slot.fill("end_header".to_string());
        writer.run_once(&mut slot).unwrap();
        slot.fill("body".to_string());
        let err = writer.run_once(&mut slot).unwrap_err();
        assert!(matches!(err, PipelineError::Io { stage: StageId::Writer, .. }));

        assert!(writer.finish(Outcome::Failed).is_err());
        assert_eq!(done_rx.recv().unwrap(), Outcome::Failed);
    }
}
