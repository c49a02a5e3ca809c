//! Configuration for serializers, sessions and sinks
//!
//! Every config struct has a `Default` that reads `FRAMELOG_*` environment
//! variables and falls back to built-in values. Malformed variables are logged
//! and ignored so a typo in the environment never stops a traced program.

use crate::serializer::BytesEncoding;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_MAX_DEPTH: usize = 64;
pub const DEFAULT_MAX_NODES: usize = 100_000;
pub const DEFAULT_BATCH_SIZE: usize = 256;
pub const DEFAULT_DB_PATH: &str = "framelog.sqlite3";

/// Configuration for value serialization
#[derive(Debug, Clone)]
pub struct SerializerConfig {
    /// Deepest acyclic object nesting rendered before a placeholder
    pub max_depth: usize,
    /// Upper limit on objects rendered by one top-level call
    pub max_nodes: usize,
    pub bytes_encoding: BytesEncoding,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        let bytes_encoding = match std::env::var("FRAMELOG_BYTES_ENCODING").as_deref() {
            Ok("base64") => BytesEncoding::Base64,
            _ => BytesEncoding::Base85,
        };
        Self {
            max_depth: env_or("FRAMELOG_MAX_DEPTH", DEFAULT_MAX_DEPTH),
            max_nodes: env_or("FRAMELOG_MAX_NODES", DEFAULT_MAX_NODES),
            bytes_encoding,
        }
    }
}

/// Configuration for a tracing session
#[derive(Debug, Clone)]
pub struct TraceConfig {
    pub serializer: SerializerConfig,
    /// Request per-instruction events on every touched frame
    pub trace_opcodes: bool,
    /// Glob patterns a frame's filename must match (empty means everything)
    pub include: Vec<String>,
    /// Glob patterns excluding a frame's filename
    pub exclude: Vec<String>,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            serializer: SerializerConfig::default(),
            trace_opcodes: env_or("FRAMELOG_TRACE_OPCODES", false),
            include: env_list("FRAMELOG_INCLUDE"),
            exclude: env_list("FRAMELOG_EXCLUDE"),
        }
    }
}

/// Configuration for the SQLite snapshot store
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    pub path: PathBuf,
    /// Rows buffered before an implicit flush
    pub batch_size: usize,
    /// Drop and recreate the snapshots table on open
    pub reset: bool,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: std::env::var("FRAMELOG_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_DB_PATH)),
            batch_size: env_or("FRAMELOG_BATCH_SIZE", DEFAULT_BATCH_SIZE).max(1),
            reset: env_or("FRAMELOG_RESET", false),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = raw.as_str(), "Ignoring malformed environment variable");
            default
        }),
        Err(_) => default,
    }
}

fn env_list(key: &str) -> Vec<String> {
    std::env::var(key)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}
