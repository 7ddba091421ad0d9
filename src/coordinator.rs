//! Coordinator: builds the ring, starts the stages, and waits for the
//! writer to report completion.
//!
//! The coordinator owns the input and output handles for the whole run.
//! Stages only borrow them, on scoped threads, so the handles are released
//! on every exit path once the scope ends.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::thread::{self, Scope, ScopedJoinHandle};

use crossbeam_channel::bounded;
use tracing::{debug, info, warn};

use crate::baton::{self, StageLinks, Turn};
use crate::buffer::TerminationFlag;
use crate::config::RingConfig;
use crate::debug_trace::TurnTrace;
use crate::error::{PipelineError, Result};
use crate::executor::{CancelHandle, StageExit, run_stage};
use crate::stage::{Outcome, Stage, StageId};
use crate::stages::{ReaderStage, TransporterStage, WriterStage};
use crate::transport;

/// Counts from a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub lines_read: usize,
    pub lines_truncated: usize,
    pub records_transported: usize,
    /// Lines dropped by the header filter, sentinels included.
    pub header_lines: usize,
    pub lines_written: usize,
    /// Turns taken across all stages.
    pub turns: u64,
    pub trace: Option<TurnTrace>,
}

/// Checked just before each stage thread is spawned.
type StartGate = fn(StageId) -> io::Result<()>;

fn open_gate(_: StageId) -> io::Result<()> {
    Ok(())
}

pub struct Coordinator {
    config: RingConfig,
    cancel: CancelHandle,
    start_gate: StartGate,
}

impl Coordinator {
    pub fn new(config: RingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cancel: CancelHandle::new(),
            start_gate: open_gate,
        })
    }

    #[cfg(test)]
    fn with_start_gate(mut self, start_gate: StartGate) -> Self {
        self.start_gate = start_gate;
        self
    }

    /// Handle that stops the ring at the next baton hand-off.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Open `input`, create `output`, and run the ring between them.
    ///
    /// Both files are acquired before any stage starts.
    pub fn run_files(&self, input: &Path, output: &Path) -> Result<RunReport> {
        let source = File::open(input).map_err(|source| PipelineError::SourceUnavailable {
            path: input.to_path_buf(),
            source,
        })?;
        let sink = File::create(output).map_err(|source| PipelineError::SinkUnavailable {
            path: output.to_path_buf(),
            source,
        })?;
        debug!(input = %input.display(), output = %output.display(), "files opened");

        let mut reader = BufReader::new(source);
        let mut writer = BufWriter::new(sink);
        let report = self.run(&mut reader, &mut writer)?;
        writer
            .flush()
            .map_err(|e| PipelineError::io(StageId::Writer, e))?;
        Ok(report)
    }

    /// Run the ring from `input` to `output`.
    pub fn run<R, W>(&self, input: R, output: W) -> Result<RunReport>
    where
        R: BufRead + Send,
        W: Write + Send,
    {
        let (tx, rx) = transport::open(self.config.transport)?;
        let flag = TerminationFlag::new();
        let (done_tx, done_rx) = bounded(1);

        let reader = ReaderStage::new(input, &self.config, tx);
        let transporter = TransporterStage::new(rx, flag.clone());
        let writer = WriterStage::new(output, &self.config, flag, done_tx);

        let links = baton::ring();
        let inject = links.inject;
        let record_turns = self.config.trace;
        let gate = self.start_gate;

        thread::scope(|scope| {
            let mut reader_handle = None;
            let mut transporter_handle = None;
            let mut writer_handle = None;

            let started: Result<()> = 'spawn: {
                match spawn_stage(scope, reader, links.reader, gate, &self.cancel, record_turns) {
                    Ok(h) => reader_handle = Some(h),
                    Err(e) => break 'spawn Err(e),
                }
                match spawn_stage(
                    scope,
                    transporter,
                    links.transporter,
                    gate,
                    &self.cancel,
                    record_turns,
                ) {
                    Ok(h) => transporter_handle = Some(h),
                    Err(e) => break 'spawn Err(e),
                }
                match spawn_stage(scope, writer, links.writer, gate, &self.cancel, record_turns) {
                    Ok(h) => writer_handle = Some(h),
                    Err(e) => break 'spawn Err(e),
                }
                Ok(())
            };

            match &started {
                Ok(()) => {
                    inject.release(Turn::first());
                    drop(inject);
                    match done_rx.recv() {
                        Ok(outcome) => debug!(?outcome, "ring reported completion"),
                        Err(_) => warn!("writer exited without reporting completion"),
                    }
                }
                Err(e) => {
                    warn!(error = %e, "stage start failed, halting started stages");
                    inject.release(Turn::halt());
                    drop(inject);
                }
            }

            let reader = join_stage(reader_handle, StageId::Reader);
            let transporter = join_stage(transporter_handle, StageId::Transporter);
            let writer = join_stage(writer_handle, StageId::Writer);
            started?;
            let (reader, reader_exit) = reader?;
            let (transporter, transporter_exit) = transporter?;
            let (writer, writer_exit) = writer?;

            let mut exits = [reader_exit, transporter_exit, writer_exit];
            if let Some(e) = exits.iter_mut().find_map(|exit| exit.error.take()) {
                return Err(e);
            }
            if exits.iter().any(|exit| exit.outcome != Outcome::Drained) {
                if self.cancel.is_cancelled() {
                    return Err(PipelineError::Cancelled);
                }
                let stage = exits
                    .iter()
                    .find(|exit| exit.outcome != Outcome::Drained)
                    .map_or(StageId::Writer, |exit| exit.stage);
                return Err(PipelineError::StagePanicked { stage });
            }

            let turns = exits.iter().map(|exit| exit.taken).sum();
            let trace =
                TurnTrace::merge(exits.iter_mut().map(|exit| std::mem::take(&mut exit.turns)));
            let report = RunReport {
                lines_read: reader.lines_read(),
                lines_truncated: reader.lines_truncated(),
                records_transported: transporter.records_transported(),
                header_lines: writer.header_lines(),
                lines_written: writer.lines_written(),
                turns,
                trace: record_turns.then_some(trace),
            };
            info!(
                read = report.lines_read,
                header = report.header_lines,
                written = report.lines_written,
                truncated = report.lines_truncated,
                "pipeline drained"
            );
            Ok(report)
        })
    }
}

type StageHandle<'scope, S> = ScopedJoinHandle<'scope, (S, StageExit)>;

fn spawn_stage<'scope, 'env, S>(
    scope: &'scope Scope<'scope, 'env>,
    mut stage: S,
    links: StageLinks,
    gate: StartGate,
    cancel: &CancelHandle,
    record_turns: bool,
) -> Result<StageHandle<'scope, S>>
where
    S: Stage + Send + 'scope,
{
    let id = stage.id();
    gate(id).map_err(|source| PipelineError::Spawn { stage: id, source })?;
    let cancel = cancel.clone();
    thread::Builder::new()
        .name(format!("ring-{id}"))
        .spawn_scoped(scope, move || {
            let exit = run_stage(&mut stage, links, &cancel, record_turns);
            (stage, exit)
        })
        .map_err(|source| PipelineError::Spawn { stage: id, source })
}

/// Join a stage. One that was never started reports as a start failure.
fn join_stage<S>(handle: Option<StageHandle<'_, S>>, stage: StageId) -> Result<(S, StageExit)> {
    match handle {
        Some(handle) => handle
            .join()
            .map_err(|_| PipelineError::StagePanicked { stage }),
        None => Err(PipelineError::Spawn {
            stage,
            source: io::Error::other("stage was not started"),
        }),
    }
}
