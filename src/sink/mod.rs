//! Consumers of emitted snapshots
//!
//! Every captured frame becomes one [`SnapshotRecord`] handed to a
//! [`SnapshotSink`], in strict emission order. Sinks may buffer, but must not
//! reorder records or drop them without returning an error.
//!
//! - **PrintSink**: renders each snapshot as it arrives
//! - **SqliteSink**: durable store, one row per snapshot
//! - **MemorySink**: thread-safe in-process store with queries and callbacks
//! - **NullSink**: discards everything

pub mod memory;
pub mod null;
pub mod print;
pub mod sqlite;

pub use memory::{MemorySink, SnapshotCallback};
pub use null::NullSink;
pub use print::PrintSink;
pub use sqlite::SqliteSink;

use crate::error::Result;
use crate::frame::{Frame, FrameId};
use crate::serializer::Serializer;
use crate::value::Heap;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// The persisted unit: one frame at one line event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub run_id: String,
    pub frame_id: FrameId,
    pub back_frame_id: Option<FrameId>,
    pub filename: String,
    pub line: u32,
    pub function: String,
    /// Serialized local bindings
    pub locals: serde_json::Value,
    pub captured_at: DateTime<Utc>,
}

impl SnapshotRecord {
    /// Render a frame snapshot, serializing its locals against the heap now
    pub fn capture(run_id: &str, frame: &Frame, serializer: &Serializer, heap: &Heap) -> Self {
        Self {
            run_id: run_id.to_string(),
            frame_id: frame.id,
            back_frame_id: frame.back_id,
            filename: frame.filename().to_string(),
            line: frame.lineno,
            function: frame.function().to_string(),
            locals: frame.render_locals(serializer, heap),
            captured_at: Utc::now(),
        }
    }

    /// Get a formatted one-line summary of the snapshot
    pub fn printable_summary(&self) -> String {
        let time_str = self
            .captured_at
            .with_timezone(&Local)
            .format("%H:%M:%S%.3f")
            .to_string();
        let back = match self.back_frame_id {
            Some(id) => format!("#{id}"),
            None => "root".to_string(),
        };
        format!(
            "[{}] #{} <- {}  {}:{} in {}",
            time_str, self.frame_id, back, self.filename, self.line, self.function
        )
    }
}

/// Receiver of emitted snapshots
///
/// A buffering sink that fails to write records it already accepted reports
/// them with [`TraceError::BatchLost`](crate::TraceError::BatchLost), counting
/// the record being emitted if it was part of the batch.
pub trait SnapshotSink {
    fn emit(&mut self, record: &SnapshotRecord) -> Result<()>;

    /// Push buffered records to their destination
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: SnapshotSink + ?Sized> SnapshotSink for &mut S {
    fn emit(&mut self, record: &SnapshotRecord) -> Result<()> {
        (**self).emit(record)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

impl<S: SnapshotSink + ?Sized> SnapshotSink for Box<S> {
    fn emit(&mut self, record: &SnapshotRecord) -> Result<()> {
        (**self).emit(record)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

/// Fan out to two sinks; both always see the record
///
/// When both fail, the error losing more records wins, then the first.
impl<A: SnapshotSink, B: SnapshotSink> SnapshotSink for (A, B) {
    fn emit(&mut self, record: &SnapshotRecord) -> Result<()> {
        let first = self.0.emit(record);
        let second = self.1.emit(record);
        worse_of(first, second)
    }

    fn flush(&mut self) -> Result<()> {
        let first = self.0.flush();
        let second = self.1.flush();
        worse_of(first, second)
    }
}

fn worse_of(first: Result<()>, second: Result<()>) -> Result<()> {
    match (first, second) {
        (Err(a), Err(b)) if b.lost_records() > a.lost_records() => Err(b),
        (Err(a), _) => Err(a),
        (Ok(()), second) => second,
    }
}


#[cfg(test)]
mod tests {
    use super::testing::record;
    use super::*;
    use crate::error::TraceError;
    use crate::frame::{Code, TraceFlags};
    use crate::value::Value;
    use serde_json::json;
    use std::sync::Arc;

    struct FailingSink;

    impl SnapshotSink for FailingSink {
        fn emit(&mut self, _record: &SnapshotRecord) -> Result<()> {
            Err(TraceError::Sink("rejected".to_string()))
        }
    }

    #[test]
    fn test_capture_renders_locals() {
        let mut heap = Heap::new();
        let list = heap.list(vec![Value::Int(1), Value::Int(2)]);
        let frame = Frame {
            id: 4,
            back_id: Some(2),
            code: Arc::new(Code::new("fn", "main.py", 1)),
            locals: vec![("xs".to_string(), list)],
            lasti: 6,
            lineno: 3,
            flags: TraceFlags::default(),
        };

        let record = SnapshotRecord::capture("run", &frame, &Serializer::default(), &heap);
        assert_eq!(record.run_id, "run");
        assert_eq!(record.frame_id, 4);
        assert_eq!(record.back_frame_id, Some(2));
        assert_eq!(record.filename, "main.py");
        assert_eq!(record.line, 3);
        assert_eq!(record.function, "fn");
        assert_eq!(record.locals, json!({"xs": [1, 2]}));
    }

    #[test]
    fn test_printable_summary() {
        let summary = record("run", 3, Some(1)).printable_summary();
        assert!(summary.contains("#3 <- #1"));
        assert!(summary.contains("main.py:4 in fn"));

        let root = record("run", 1, None).printable_summary();
        assert!(root.contains("#1 <- root"));
    }

    #[test]
    fn test_record_serde() {
        let original = record("run", 2, None);
        let text = serde_json::to_string(&original).unwrap();
        let parsed: SnapshotRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, original);
        assert!(text.contains("\"back_frame_id\":null"));
    }

    #[test]
    fn test_mut_ref_and_box_forward() {
        fn emit_into<S: SnapshotSink>(mut sink: S, record: &SnapshotRecord) -> Result<()> {
            sink.emit(record)
        }

        let mut memory = MemorySink::default();
        emit_into(&mut memory, &record("run", 1, None)).unwrap();
        let mut boxed: Box<dyn SnapshotSink> = Box::new(memory.clone());
        boxed.emit(&record("run", 2, Some(1))).unwrap();
        boxed.flush().unwrap();
        assert_eq!(memory.len(), 2);
    }

    struct LosingSink;

    impl SnapshotSink for LosingSink {
        fn emit(&mut self, _record: &SnapshotRecord) -> Result<()> {
            Err(TraceError::BatchLost {
                lost: 4,
                source: Box::new(TraceError::Sink("disk full".to_string())),
            })
        }
    }

    #[test]
    fn test_pair_keeps_lost_count_when_both_fail() {
        let mut pair = (FailingSink, LosingSink);
        let err = pair.emit(&record("run", 1, None)).unwrap_err();
        assert_eq!(err.lost_records(), 4);

        let mut pair = (LosingSink, FailingSink);
        let err = pair.emit(&record("run", 1, None)).unwrap_err();
        assert_eq!(err.lost_records(), 4);
    }

    #[test]
    fn test_pair_reaches_both_sinks_even_on_failure() {
        let memory = MemorySink::default();
        let mut pair = (FailingSink, memory.clone());
        assert!(pair.emit(&record("run", 1, None)).is_err());
        assert_eq!(memory.len(), 1);
        assert!(pair.flush().is_ok());
    }
}
