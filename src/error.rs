//! Error types and result aliases for the framelog library.
//!
//! This module defines the core error type [`TraceError`] and the [`Result`] type alias
//! used throughout the library. Errors fall into two classes: correlation failures,
//! which abort the tracing session, and sink failures, which are reported to the
//! caller while the session keeps running. See [`TraceError::is_fatal`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Return event with an empty parent stack (depth {depth})")]
    StackUnderflow { depth: usize },

    #[error("Unknown trace event kind: {0}")]
    UnknownEvent(String),

    #[error("Session {0} was aborted after a correlation failure")]
    SessionAborted(String),

    #[error("Sink error: {0}")]
    Sink(String),

    #[error("Lost {lost} buffered snapshots: {source}")]
    BatchLost {
        lost: usize,
        #[source]
        source: Box<TraceError>,
    },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Host error: {0}")]
    Host(String),
}

impl TraceError {
    /// Whether the error invalidates the call-stack correlation of its session.
    ///
    /// Fatal errors abort the session: continuing would emit snapshots whose
    /// back ids can no longer be trusted. Everything else (sink writes, config)
    /// leaves the correlator state intact.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TraceError::StackUnderflow { .. }
                | TraceError::UnknownEvent(_)
                | TraceError::SessionAborted(_)
        )
    }

    /// Number of already accepted snapshots this failure discarded
    pub fn lost_records(&self) -> usize {
        match self {
            TraceError::BatchLost { lost, .. } => *lost,
            _ => 0,
        }
    }
}

pub type Result<T> = std::result::Result<T, TraceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_underflow_display() {
        let err = TraceError::StackUnderflow { depth: 0 };
        assert_eq!(err.to_string(), "Return event with an empty parent stack (depth 0)");
    }

    #[test]
    fn test_unknown_event_display() {
        let err = TraceError::UnknownEvent("c_call".to_string());
        assert_eq!(err.to_string(), "Unknown trace event kind: c_call");
    }

    #[test]
    fn test_sink_error_display() {
        let err = TraceError::Sink("disk full".to_string());
        assert_eq!(err.to_string(), "Sink error: disk full");
    }

    #[test]
    fn test_config_error_display() {
        let err = TraceError::Config("FRAMELOG_MAX_DEPTH=abc".to_string());
        assert_eq!(err.to_string(), "Invalid configuration: FRAMELOG_MAX_DEPTH=abc");
    }

    #[test]
    fn test_batch_lost_reports_count() {
        let err = TraceError::BatchLost {
            lost: 3,
            source: Box::new(TraceError::Sink("disk full".to_string())),
        };
        assert_eq!(err.to_string(), "Lost 3 buffered snapshots: Sink error: disk full");
        assert_eq!(err.lost_records(), 3);
        assert!(!err.is_fatal());
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(TraceError::Sink("x".to_string()).lost_records(), 0);
    }

    #[test]
    fn test_decode_error_display() {
        let err = TraceError::Decode("invalid base85 character '\"'".to_string());
        assert!(err.to_string().starts_with("Decode error: "));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_fatal_classification() {
        assert!(TraceError::StackUnderflow { depth: 0 }.is_fatal());
        assert!(TraceError::UnknownEvent("x".to_string()).is_fatal());
        assert!(TraceError::SessionAborted("run".to_string()).is_fatal());
        assert!(!TraceError::Sink("x".to_string()).is_fatal());
        assert!(!TraceError::Config("x".to_string()).is_fatal());
    }

    #[test]
    fn test_serialization_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: TraceError = json_err.into();

        match err {
            TraceError::Serialization(_) => {}
            _ => panic!("Expected Serialization"),
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TraceError = io_err.into();

        match err {
            TraceError::Io(_) => {}
            _ => panic!("Expected Io"),
        }
        assert!(!TraceError::Io(std::io::Error::other("x")).is_fatal());
    }

    #[test]
    fn test_pattern_error_conversion() {
        let pattern_err = glob::Pattern::new("[").unwrap_err();
        let err: TraceError = pattern_err.into();
        assert!(err.to_string().starts_with("Invalid glob pattern"));
    }

    #[test]
    fn test_result_type() {
        let ok_result: Result<i32> = Ok(42);
        assert!(ok_result.is_ok());

        let err_result: Result<i32> = Err(TraceError::Sink("test".to_string()));
        assert!(err_result.is_err());
    }
}
