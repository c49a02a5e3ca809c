//! Trace correlation for observability and debugging
//!
//! The tracer turns the host's raw event stream into frame snapshots linked by
//! back ids. Every `line` event of a traced frame produces one snapshot whose
//! back id points at the latest snapshot of its caller, so walking the links
//! reconstructs the call stack at that moment.
//!
//! # Architecture
//!
//! - **TraceSession**: receives events, owns the run state and the sink
//! - **RunState**: frame-id counter and parent stack of one run
//! - **PauseGuard**: keeps instrumentation off while a snapshot is rendered
//! - **FileFilter**: glob include/exclude rules over source filenames
//!
//! # Usage Example
//!
//! ```rust
//! use framelog::config::TraceConfig;
//! use framelog::frame::Code;
//! use framelog::host::sim::{SimHost, Step};
//! use framelog::host::TraceSwitch;
//! use framelog::sink::MemorySink;
//! use framelog::tracer::TraceSession;
//! use framelog::value::Value;
//! use std::sync::Arc;
//!
//! let mut host = SimHost::new(TraceSwitch::new());
//! let square = host.define(Code::new("square", "main.py", 10));
//!
//! let sink = MemorySink::default();
//! let mut session =
//!     TraceSession::start(Arc::new(host.switch().clone()), sink.clone(), TraceConfig::default())?;
//!
//! host.run(
//!     &[
//!         Step::Line(2),
//!         Step::Call(square),
//!         Step::assign("x", 4),
//!         Step::Line(11),
//!         Step::Return(Value::Int(16)),
//!     ],
//!     &mut session,
//! )?;
//!
//! let summary = session.finish();
//! assert_eq!(summary.snapshots, 2);
//! assert_eq!(sink.get(&summary.run_id, 2).unwrap().back_frame_id, Some(1));
//! # Ok::<(), framelog::TraceError>(())
//! ```

pub mod filter;
pub mod guard;
pub mod run;
pub mod session;

pub use filter::FileFilter;
pub use guard::PauseGuard;
pub use run::RunState;
pub use session::{RunSummary, TraceSession};
