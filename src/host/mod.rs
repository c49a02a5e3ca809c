//! Interface to the instrumented host runtime
//!
//! The host owns the real frames and the heap their values live in. It calls a
//! registered [`TraceHook`] for every event on the traced thread, passing a
//! mutable handle to the frame the event belongs to. Before each event it
//! checks its [`Instrumentation`] switch; the tracer turns that switch off while
//! it is doing its own work so that work never shows up as traced events.

pub mod sim;

use crate::error::{Result, TraceError};
use crate::frame::{Code, CodeId, TraceFlags};
use crate::value::{Heap, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The five event kinds a host delivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceEvent {
    Call,
    Line,
    Return,
    Exception,
    Opcode,
}

impl TraceEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraceEvent::Call => "call",
            TraceEvent::Line => "line",
            TraceEvent::Return => "return",
            TraceEvent::Exception => "exception",
            TraceEvent::Opcode => "opcode",
        }
    }
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TraceEvent {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "call" => Ok(TraceEvent::Call),
            "line" => Ok(TraceEvent::Line),
            "return" => Ok(TraceEvent::Return),
            "exception" => Ok(TraceEvent::Exception),
            "opcode" => Ok(TraceEvent::Opcode),
            other => Err(TraceError::UnknownEvent(other.to_string())),
        }
    }
}

/// Handle to a frame that is currently executing in the host
pub trait LiveFrame {
    /// Identity of the code unit the frame runs
    fn code_id(&self) -> CodeId;

    /// Full descriptor of the code unit; only asked once per [`CodeId`]
    fn describe_code(&self) -> Code;

    /// Current local bindings, as live handles into the host heap
    fn locals(&self) -> Vec<(String, Value)>;

    /// Offset of the instruction being executed
    fn lasti(&self) -> u32;

    fn lineno(&self) -> u32;

    fn trace_flags(&self) -> TraceFlags;

    fn set_trace_flags(&mut self, flags: TraceFlags);
}

/// Callback the host invokes for every event while instrumentation is enabled
pub trait TraceHook {
    fn on_event(
        &mut self,
        heap: &Heap,
        frame: &mut dyn LiveFrame,
        event: TraceEvent,
        arg: Option<&Value>,
    ) -> Result<()>;
}

/// Registration switch of the host's instrumentation hook
pub trait Instrumentation: Send + Sync {
    fn is_enabled(&self) -> bool;

    fn set_enabled(&self, enabled: bool);
}

/// Shared on/off flag a host polls before delivering each event
#[derive(Debug, Clone, Default)]
pub struct TraceSwitch {
    enabled: Arc<AtomicBool>,
}

impl TraceSwitch {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Instrumentation for TraceSwitch {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }
}
