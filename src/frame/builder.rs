//! Turns live host frames into immutable [`Frame`] snapshots

use super::{Code, CodeId, Frame, FrameId, TraceFlags};
use crate::host::LiveFrame;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Builds frame snapshots, caching code descriptors by identity
pub struct FrameBuilder {
    codes: HashMap<CodeId, Arc<Code>>,
    trace_opcodes: bool,
}

impl FrameBuilder {
    /// Create a builder
    ///
    /// # Arguments
    ///
    /// * `trace_opcodes` - Whether armed frames also request per-instruction events
    pub fn new(trace_opcodes: bool) -> Self {
        Self {
            codes: HashMap::new(),
            trace_opcodes,
        }
    }

    /// Shared descriptor of the frame's code unit, described on first sight
    pub fn code_for(&mut self, frame: &dyn LiveFrame) -> Arc<Code> {
        let code_id = frame.code_id();
        Arc::clone(self.codes.entry(code_id).or_insert_with(|| {
            trace!(code_id = code_id.0, "Caching new code unit");
            Arc::new(frame.describe_code())
        }))
    }

    /// Request line events (and opcode events if configured) for the rest of
    /// the frame's lifetime
    pub fn arm(&self, frame: &mut dyn LiveFrame) {
        let wanted = TraceFlags {
            lines: true,
            opcodes: self.trace_opcodes,
        };
        if frame.trace_flags() != wanted {
            frame.set_trace_flags(wanted);
        }
    }

    /// Snapshot the frame under the given ids and re-arm its trace flags
    pub fn build_frame(
        &mut self,
        frame: &mut dyn LiveFrame,
        id: FrameId,
        back_id: Option<FrameId>,
    ) -> Frame {
        self.arm(frame);
        Frame {
            id,
            back_id,
            code: self.code_for(frame),
            locals: frame.locals(),
            lasti: frame.lasti(),
            lineno: frame.lineno(),
            flags: frame.trace_flags(),
        }
    }

    /// Number of distinct code units seen so far
    pub fn cached_codes(&self) -> usize {
        self.codes.len()
    }
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::sim::SimFrame;
    use crate::value::Value;

    fn frame(code_id: u64, name: &str) -> SimFrame {
        SimFrame::new(CodeId(code_id), Code::new(name, "main.py", 1))
    }

    #[test]
    fn test_build_frame_copies_state() {
        let mut builder = FrameBuilder::default();
        let mut live = frame(1, "fn");
        live.assign("a", Value::Int(3));
        live.goto_line(4);

        let snapshot = builder.build_frame(&mut live, 7, Some(3));
        assert_eq!(snapshot.id, 7);
        assert_eq!(snapshot.back_id, Some(3));
        assert_eq!(snapshot.code.name, "fn");
        assert_eq!(snapshot.lineno, 4);
        assert_eq!(snapshot.locals, vec![("a".to_string(), Value::Int(3))]);
    }

    #[test]
    fn test_code_cached_by_identity() {
        let mut builder = FrameBuilder::default();
        let mut first = frame(1, "fn");
        let mut second = frame(1, "fn");
        let mut other = frame(2, "other");

        let a = builder.build_frame(&mut first, 1, None);
        let b = builder.build_frame(&mut second, 2, None);
        let c = builder.build_frame(&mut other, 3, None);

        assert!(Arc::ptr_eq(&a.code, &b.code));
        assert!(!Arc::ptr_eq(&a.code, &c.code));
        assert_eq!(builder.cached_codes(), 2);
    }

    #[test]
    fn test_arm_sets_flags() {
        let mut live = frame(1, "fn");
        assert_eq!(live.trace_flags(), TraceFlags::default());

        FrameBuilder::new(false).arm(&mut live);
        assert_eq!(
            live.trace_flags(),
            TraceFlags {
                lines: true,
                opcodes: false
            }
        );

        FrameBuilder::new(true).arm(&mut live);
        assert!(live.trace_flags().opcodes);
    }

    #[test]
    fn test_snapshot_records_armed_flags() {
        let mut builder = FrameBuilder::new(true);
        let mut live = frame(1, "fn");
        let snapshot = builder.build_frame(&mut live, 1, None);
        assert!(snapshot.flags.lines);
        assert!(snapshot.flags.opcodes);
    }
}
