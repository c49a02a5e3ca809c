//! Immutable snapshots of code units and execution frames
//!
//! A [`Code`] describes one compiled unit and is shared between every frame
//! running it. A [`Frame`] captures one execution context at one line event;
//! its locals stay live [`Value`] handles until [`Frame::render_locals`] runs
//! them through the serializer.

pub mod builder;

pub use builder::FrameBuilder;

use crate::serializer::Serializer;
use crate::value::{Heap, Value};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Identity of a compiled unit inside the host runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodeId(pub u64);

/// Monotonic frame snapshot id within a run
pub type FrameId = u64;

/// Compilation attribute bits of a code unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CodeFlags(pub u32);

impl CodeFlags {
    pub const VARARGS: u32 = 0x04;
    pub const VARKEYWORDS: u32 = 0x08;
    pub const GENERATOR: u32 = 0x20;

    pub fn contains(&self, bit: u32) -> bool {
        self.0 & bit == bit
    }

    pub fn has_varargs(&self) -> bool {
        self.contains(Self::VARARGS)
    }

    pub fn has_varkeywords(&self) -> bool {
        self.contains(Self::VARKEYWORDS)
    }

    pub fn is_generator(&self) -> bool {
        self.contains(Self::GENERATOR)
    }
}

/// Descriptor of one compiled executable unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Code {
    pub name: String,
    /// Positional parameters, including positional-only ones
    pub arg_count: u32,
    pub posonly_arg_count: u32,
    pub kwonly_arg_count: u32,
    /// Local slots, parameters included
    pub nlocals: u32,
    /// Instruction blob
    pub code: Vec<u8>,
    pub filename: String,
    pub first_line: u32,
    /// Instruction offset to source line mapping
    pub line_table: Vec<u8>,
    pub stack_size: u32,
    pub flags: CodeFlags,
}

impl Code {
    /// Minimal descriptor for a unit known only by name and location
    pub fn new(name: impl Into<String>, filename: impl Into<String>, first_line: u32) -> Self {
        Self {
            name: name.into(),
            arg_count: 0,
            posonly_arg_count: 0,
            kwonly_arg_count: 0,
            nlocals: 0,
            code: Vec::new(),
            filename: filename.into(),
            first_line,
            line_table: Vec::new(),
            stack_size: 0,
            flags: CodeFlags::default(),
        }
    }
}

/// Event granularity requested on a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TraceFlags {
    pub lines: bool,
    pub opcodes: bool,
}

/// Snapshot of one execution context at one line event
#[derive(Debug, Clone)]
pub struct Frame {
    pub id: FrameId,
    /// Snapshot id of the caller frame, `None` at the traced root
    pub back_id: Option<FrameId>,
    pub code: Arc<Code>,
    /// Live local bindings in host order
    pub locals: Vec<(String, Value)>,
    pub lasti: u32,
    pub lineno: u32,
    pub flags: TraceFlags,
}

impl Frame {
    pub fn filename(&self) -> &str {
        &self.code.filename
    }

    pub fn function(&self) -> &str {
        &self.code.name
    }

    /// Serialize the locals against the heap as it is right now
    pub fn render_locals(&self, serializer: &Serializer, heap: &Heap) -> serde_json::Value {
        serializer.serialize_locals(heap, &self.locals)
    }
}
