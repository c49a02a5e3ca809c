//! The trace correlator
//!
//! A [`TraceSession`] receives every event of the traced thread, keeps the
//! run's [`RunState`] in step with the host's call stack, and turns each
//! `line` event into one [`SnapshotRecord`] for its sink.

use super::filter::FileFilter;
use super::guard::PauseGuard;
use super::run::RunState;
use crate::config::TraceConfig;
use crate::error::{Result, TraceError};
use crate::frame::builder::FrameBuilder;
use crate::host::{Instrumentation, LiveFrame, TraceEvent, TraceHook};
use crate::serializer::Serializer;
use crate::sink::{SnapshotRecord, SnapshotSink};
use crate::value::{Heap, Value};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// Outcome of a finished session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    /// Snapshots the sink accepted and did not later lose
    pub snapshots: usize,
    /// Snapshots rejected by the sink or discarded from its buffer
    pub sink_failures: usize,
    /// Deepest call nesting observed above the starting frame
    pub max_depth: usize,
    pub aborted: bool,
    /// Error of the final sink flush, if it failed
    pub flush_error: Option<String>,
}

/// One tracing run from `start` to `finish`
pub struct TraceSession<S: SnapshotSink> {
    run: RunState,
    builder: FrameBuilder,
    serializer: Serializer,
    sink: S,
    instrumentation: Arc<dyn Instrumentation>,
    filter: FileFilter,
    emitted: usize,
    sink_failures: usize,
    max_depth: usize,
    aborted: bool,
    finished: bool,
    flush_error: Option<String>,
}

impl<S: SnapshotSink> TraceSession<S> {
    /// Start a run and enable the host's instrumentation
    ///
    /// # Arguments
    ///
    /// * `instrumentation` - Switch of the host hook this session is registered on
    /// * `sink` - Receiver of every emitted snapshot
    /// * `config` - Serializer, opcode and filename filter settings
    pub fn start(
        instrumentation: Arc<dyn Instrumentation>,
        sink: S,
        config: TraceConfig,
    ) -> Result<Self> {
        let filter = FileFilter::new(&config.include, &config.exclude)?;
        let run = RunState::new();

        info!(
            run_id = run.run_id(),
            trace_opcodes = config.trace_opcodes,
            "Starting trace session"
        );
        instrumentation.set_enabled(true);

        Ok(Self {
            run,
            builder: FrameBuilder::new(config.trace_opcodes),
            serializer: Serializer::new(config.serializer),
            sink,
            instrumentation,
            filter,
            emitted: 0,
            sink_failures: 0,
            max_depth: 0,
            aborted: false,
            finished: false,
            flush_error: None,
        })
    }

    pub fn run_id(&self) -> &str {
        self.run.run_id()
    }

    /// Serializer used for locals, e.g. to register extra hooks
    pub fn serializer_mut(&mut self) -> &mut Serializer {
        &mut self.serializer
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Handle one event delivered by the host
    ///
    /// Sink failures are returned and the session keeps going. Correlation
    /// failures abort the session; every later event is refused.
    pub fn handle_event(
        &mut self,
        heap: &Heap,
        frame: &mut dyn LiveFrame,
        event: TraceEvent,
        arg: Option<&Value>,
    ) -> Result<()> {
        if self.aborted {
            return Err(TraceError::SessionAborted(self.run.run_id().to_string()));
        }

        self.builder.arm(frame);

        match event {
            TraceEvent::Call => {
                self.run.enter();
                self.max_depth = self.max_depth.max(self.run.depth());
                trace!(depth = self.run.depth(), "call");
                Ok(())
            }
            TraceEvent::Line => self.on_line(heap, frame),
            TraceEvent::Return => {
                if let Err(e) = self.run.leave() {
                    self.abort(&e);
                    return Err(e);
                }
                trace!(depth = self.run.depth(), returned = ?arg, "return");
                Ok(())
            }
            TraceEvent::Exception => {
                trace!(exception = ?arg, line = frame.lineno(), "exception");
                Ok(())
            }
            TraceEvent::Opcode => Ok(()),
        }
    }

    /// Handle an event named by its host-side kind string
    ///
    /// An unrecognized kind aborts the session.
    pub fn dispatch(
        &mut self,
        heap: &Heap,
        frame: &mut dyn LiveFrame,
        kind: &str,
        arg: Option<&Value>,
    ) -> Result<()> {
        let event = match kind.parse::<TraceEvent>() {
            Ok(event) => event,
            Err(e) => {
                self.abort(&e);
                return Err(e);
            }
        };
        self.handle_event(heap, frame, event, arg)
    }

    fn on_line(&mut self, heap: &Heap, frame: &mut dyn LiveFrame) -> Result<()> {
        let code = self.builder.code_for(frame);
        if !self.filter.allows(&code.filename) {
            trace!(filename = code.filename.as_str(), "Skipping filtered frame");
            return Ok(());
        }

        let instrumentation = Arc::clone(&self.instrumentation);
        let _pause = PauseGuard::new(instrumentation.as_ref());

        let (id, back_id) = self.run.next_frame();
        let snapshot = self.builder.build_frame(frame, id, back_id);
        let record = SnapshotRecord::capture(self.run.run_id(), &snapshot, &self.serializer, heap);

        match self.sink.emit(&record) {
            Ok(()) => {
                self.emitted += 1;
                Ok(())
            }
            Err(e) => {
                // A lost batch includes this record, which was never counted
                let earlier = e.lost_records().saturating_sub(1);
                self.record_loss(earlier, 1);
                warn!(frame_id = id, error = %e, "Failed to emit snapshot");
                Err(e)
            }
        }
    }

    /// Move `earlier` accepted snapshots plus `rejected` new ones to the
    /// failure count
    fn record_loss(&mut self, earlier: usize, rejected: usize) {
        let earlier = earlier.min(self.emitted);
        self.emitted -= earlier;
        self.sink_failures += earlier + rejected;
    }

    fn abort(&mut self, cause: &TraceError) {
        self.aborted = true;
        error!(run_id = self.run.run_id(), error = %cause, "Aborting trace session");
        self.instrumentation.set_enabled(false);
    }

    /// Counters of the run so far
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            run_id: self.run.run_id().to_string(),
            snapshots: self.emitted,
            sink_failures: self.sink_failures,
            max_depth: self.max_depth,
            aborted: self.aborted,
            flush_error: self.flush_error.clone(),
        }
    }

    /// Disable instrumentation, flush the sink and report the run
    ///
    /// A failed final flush does not hide the summary; it is reported in
    /// [`RunSummary::flush_error`] with the lost snapshots counted as failures.
    pub fn finish(mut self) -> RunSummary {
        self.close();
        let summary = self.summary();
        info!(
            run_id = summary.run_id.as_str(),
            snapshots = summary.snapshots,
            sink_failures = summary.sink_failures,
            "Finished trace session"
        );
        summary
    }

    fn close(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.instrumentation.set_enabled(false);

        if let Err(e) = self.sink.flush() {
            self.record_loss(e.lost_records(), 0);
            warn!(run_id = self.run.run_id(), error = %e, "Failed to flush snapshot sink");
            self.flush_error = Some(e.to_string());
        }
    }
}

impl<S: SnapshotSink> TraceHook for TraceSession<S> {
    fn on_event(
        &mut self,
        heap: &Heap,
        frame: &mut dyn LiveFrame,
        event: TraceEvent,
        arg: Option<&Value>,
    ) -> Result<()> {
        self.handle_event(heap, frame, event, arg)
    }
}

impl<S: SnapshotSink> Drop for TraceSession<S> {
    fn drop(&mut self) {
        if !self.finished {
            debug!(run_id = self.run.run_id(), "Closing unfinished trace session");
            self.close();
        }
    }
}
