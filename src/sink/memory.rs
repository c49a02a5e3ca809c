//! In-process snapshot storage with callbacks and filtering
//!
//! This module provides thread-safe snapshot storage with support for callbacks,
//! filtering by run, custom predicates, and back-chain walks.

use super::{SnapshotRecord, SnapshotSink};
use crate::error::Result;
use crate::frame::FrameId;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Type alias for snapshot callback functions
pub type SnapshotCallback = Arc<dyn Fn(&SnapshotRecord) + Send + Sync>;

/// Store for capturing and querying snapshots
///
/// MemorySink provides thread-safe storage for snapshot records with support for:
/// - Callbacks triggered on each stored snapshot
/// - Filtering by run id
/// - Custom filter predicates
/// - Query for last N snapshots
/// - Walking the back chain of a snapshot
///
/// Clones share the same storage.
#[derive(Clone)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<SnapshotRecord>>>,
    on_emit_callback: Option<SnapshotCallback>,
}

impl MemorySink {
    /// Create a new memory sink
    ///
    /// # Arguments
    ///
    /// * `on_emit_callback` - Optional callback function called whenever a snapshot is stored
    pub fn new(on_emit_callback: Option<SnapshotCallback>) -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            on_emit_callback,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SnapshotRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count snapshots matching a filter
    ///
    /// # Arguments
    ///
    /// * `filter_func` - Custom filter function to apply to snapshots
    pub fn count(&self, filter_func: Option<&dyn Fn(&SnapshotRecord) -> bool>) -> usize {
        let records = self.lock();
        match filter_func {
            Some(filter) => records.iter().filter(|r| filter(r)).count(),
            None => records.len(),
        }
    }

    /// Get a copy of every stored snapshot, in emission order
    pub fn records(&self) -> Vec<SnapshotRecord> {
        self.lock().clone()
    }

    /// Get the snapshots emitted by one run
    pub fn for_run(&self, run_id: &str) -> Vec<SnapshotRecord> {
        self.lock()
            .iter()
            .filter(|r| r.run_id == run_id)
            .cloned()
            .collect()
    }

    /// Look up one snapshot
    pub fn get(&self, run_id: &str, frame_id: FrameId) -> Option<SnapshotRecord> {
        self.lock()
            .iter()
            .find(|r| r.run_id == run_id && r.frame_id == frame_id)
            .cloned()
    }

    /// Get summaries of snapshots matching a filter
    pub fn summaries(&self, filter_func: Option<&dyn Fn(&SnapshotRecord) -> bool>) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|r| filter_func.map_or(true, |filter| filter(r)))
            .map(SnapshotRecord::printable_summary)
            .collect()
    }

    /// Get the last N snapshot summaries, optionally filtered
    ///
    /// # Arguments
    ///
    /// * `n` - Number of snapshots to return
    /// * `filter_func` - Optional custom filter function
    pub fn last_n_summaries(
        &self,
        n: usize,
        filter_func: Option<&dyn Fn(&SnapshotRecord) -> bool>,
    ) -> Vec<String> {
        let summaries = self.summaries(filter_func);
        let start_idx = summaries.len().saturating_sub(n);
        summaries[start_idx..].to_vec()
    }

    /// Walk from a snapshot to the outermost traced caller
    ///
    /// The chain starts with the requested snapshot itself. Every link must
    /// point at a strictly smaller frame id, so the walk always terminates.
    pub fn back_chain(&self, run_id: &str, frame_id: FrameId) -> Vec<SnapshotRecord> {
        let records = self.lock();
        let mut chain = Vec::new();
        let mut next = Some(frame_id);

        while let Some(id) = next {
            let Some(record) = records.iter().find(|r| r.run_id == run_id && r.frame_id == id) else {
                break;
            };
            next = record.back_frame_id.filter(|back| *back < id);
            chain.push(record.clone());
        }

        chain
    }

    /// Clear all snapshots from the store
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Get the total number of snapshots in the store
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new(None)
    }
}

impl SnapshotSink for MemorySink {
    fn emit(&mut self, record: &SnapshotRecord) -> Result<()> {
        if let Some(callback) = &self.on_emit_callback {
            callback(record);
        }

        self.lock().push(record.clone());
        Ok(())
    }
}
