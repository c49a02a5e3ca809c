pub mod config;
pub mod error;
pub mod frame;
pub mod host;
pub mod serializer;
pub mod sink;
pub mod tracer;
pub mod value;

pub use error::{Result, TraceError};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::{SerializerConfig, SqliteConfig, TraceConfig};
    pub use crate::error::{Result, TraceError};
    pub use crate::frame::{Code, Frame, FrameId};
    pub use crate::host::{Instrumentation, LiveFrame, TraceEvent, TraceHook, TraceSwitch};
    pub use crate::serializer::{Serializer, UnstructureHook};
    pub use crate::sink::{MemorySink, PrintSink, SnapshotRecord, SnapshotSink, SqliteSink};
    pub use crate::tracer::{RunSummary, TraceSession};
    pub use crate::value::{Heap, Value};
}
