//! Per-session correlation state

use crate::error::{Result, TraceError};
use crate::frame::FrameId;
use uuid::Uuid;

/// Frame-id counter and parent stack of one tracing run
///
/// `parents` always holds one entry per active call plus the root entry, so
/// `parents.len() == depth + 1`. Each entry is the back id handed to snapshots
/// of the frame at that depth. `current` is the latest snapshot id of the
/// frame executing right now.
#[derive(Debug, Clone)]
pub struct RunState {
    run_id: String,
    counter: FrameId,
    parents: Vec<Option<FrameId>>,
    current: Option<FrameId>,
}

impl RunState {
    /// Start a run with a fresh UUID v4 identifier
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4().to_string())
    }

    pub fn with_id(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            counter: 0,
            parents: vec![None],
            current: None,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Calls currently open on top of the root
    pub fn depth(&self) -> usize {
        self.parents.len() - 1
    }

    /// Highest frame id handed out so far (0 before the first line)
    pub fn last_frame_id(&self) -> FrameId {
        self.counter
    }

    /// Back id that the next snapshot would carry
    pub fn back_id(&self) -> Option<FrameId> {
        self.parents.last().copied().flatten()
    }

    /// A `call` event: the caller's latest snapshot becomes the new frame's
    /// back id. A caller that has not emitted yet passes its own back id on.
    pub fn enter(&mut self) {
        let back = self.current.or(self.back_id());
        self.parents.push(back);
        self.current = None;
    }

    /// A `line` event: hand out the next frame id with its back id
    pub fn next_frame(&mut self) -> (FrameId, Option<FrameId>) {
        self.counter += 1;
        self.current = Some(self.counter);
        (self.counter, self.back_id())
    }

    /// A `return` event: restore the caller's latest snapshot
    pub fn leave(&mut self) -> Result<()> {
        if self.parents.len() <= 1 {
            return Err(TraceError::StackUnderflow {
                depth: self.depth(),
            });
        }
        self.current = self.parents.pop().flatten();
        Ok(())
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_run() {
        let run = RunState::new();
        assert_eq!(run.depth(), 0);
        assert_eq!(run.last_frame_id(), 0);
        assert_eq!(run.back_id(), None);
        assert!(Uuid::parse_str(run.run_id()).is_ok());
    }

    #[test]
    fn test_distinct_run_ids() {
        assert_ne!(RunState::new().run_id(), RunState::new().run_id());
    }

    #[test]
    fn test_nested_call_sequence() {
        // call, line, call, line, return, line, return
        let mut run = RunState::with_id("run");
        run.enter();
        assert_eq!(run.next_frame(), (1, None));
        run.enter();
        assert_eq!(run.next_frame(), (2, Some(1)));
        run.leave().unwrap();
        assert_eq!(run.next_frame(), (3, None));
        run.leave().unwrap();
        assert_eq!(run.depth(), 0);
    }

    #[test]
    fn test_sibling_calls_share_caller() {
        let mut run = RunState::with_id("run");
        assert_eq!(run.next_frame(), (1, None));

        run.enter();
        assert_eq!(run.next_frame(), (2, Some(1)));
        assert_eq!(run.next_frame(), (3, Some(1)));
        run.leave().unwrap();

        run.enter();
        assert_eq!(run.next_frame(), (4, Some(1)));
        run.leave().unwrap();

        assert_eq!(run.next_frame(), (5, None));
    }

    #[test]
    fn test_silent_caller_passes_back_id_through() {
        let mut run = RunState::with_id("run");
        assert_eq!(run.next_frame(), (1, None));
        run.enter();
        run.enter();
        assert_eq!(run.next_frame(), (2, Some(1)));
        assert_eq!(run.depth(), 2);
    }

    #[test]
    fn test_depth_tracks_parent_stack() {
        let mut run = RunState::with_id("run");
        for expected in 1..=5 {
            run.enter();
            assert_eq!(run.depth(), expected);
        }
        for expected in (0..5).rev() {
            run.leave().unwrap();
            assert_eq!(run.depth(), expected);
        }
    }

    #[test]
    fn test_underflow() {
        let mut run = RunState::with_id("run");
        let err = run.leave().unwrap_err();
        assert!(matches!(err, TraceError::StackUnderflow { depth: 0 }));
        assert_eq!(run.depth(), 0);
    }
}
