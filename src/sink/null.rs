//! Null sink implementation following the Null Object Pattern
//!
//! A NullSink accepts every snapshot and keeps none, so a session can run with
//! persistence switched off without conditional checks in the correlator.

use super::{SnapshotRecord, SnapshotSink};
use crate::error::Result;

/// A no-op sink that silently discards all snapshots
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl NullSink {
    /// Create a new null sink
    pub fn new() -> Self {
        Self
    }
}

impl SnapshotSink for NullSink {
    fn emit(&mut self, _record: &SnapshotRecord) -> Result<()> {
        Ok(())
    }
}
