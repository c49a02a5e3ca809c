//! Durable snapshot store backed by SQLite
//!
//! One row per snapshot in the `snapshots` table. Rows are buffered and written
//! in a single transaction once the buffer reaches the configured batch size,
//! and whenever the sink is flushed. A failed transaction discards the whole
//! buffer and reports how many rows went with it.

use super::{SnapshotRecord, SnapshotSink};
use crate::config::{SqliteConfig, DEFAULT_BATCH_SIZE};
use crate::error::{Result, TraceError};
use crate::frame::FrameId;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, warn};

const SCHEMA_SQL: &str = "
    CREATE TABLE IF NOT EXISTS snapshots (
        id INTEGER PRIMARY KEY,
        run_id TEXT NOT NULL,
        frame_id INTEGER NOT NULL,
        back_frame_id INTEGER,
        filename TEXT NOT NULL,
        line INTEGER NOT NULL,
        function TEXT NOT NULL,
        locals TEXT NOT NULL,
        captured_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS snapshots_run ON snapshots (run_id, frame_id);
";

const INSERT_SQL: &str = "
    INSERT INTO snapshots (run_id, frame_id, back_frame_id, filename, line, function, locals, captured_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
";

const SELECT_COLUMNS: &str =
    "SELECT run_id, frame_id, back_frame_id, filename, line, function, locals, captured_at FROM snapshots";

/// Columns of one row before JSON and timestamp decoding
type RawRow = (String, i64, Option<i64>, String, i64, String, String, String);

pub struct SqliteSink {
    conn: Connection,
    pending: Vec<SnapshotRecord>,
    batch_size: usize,
}

impl SqliteSink {
    /// Open (or create) the database file named by the config
    pub fn open(config: &SqliteConfig) -> Result<Self> {
        let conn = Connection::open(&config.path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
        debug!(path = %config.path.display(), "Opened snapshot database");
        Self::from_connection(conn, config.batch_size, config.reset)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, DEFAULT_BATCH_SIZE, false)
    }

    fn from_connection(conn: Connection, batch_size: usize, reset: bool) -> Result<Self> {
        let mut sink = Self {
            conn,
            pending: Vec::new(),
            batch_size: batch_size.max(1),
        };
        if reset {
            sink.reset()?;
        } else {
            sink.conn.execute_batch(SCHEMA_SQL)?;
        }
        Ok(sink)
    }

    /// Drop every stored snapshot and recreate the schema
    pub fn reset(&mut self) -> Result<()> {
        self.pending.clear();
        self.conn.execute_batch("DROP TABLE IF EXISTS snapshots;")?;
        self.conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    /// Number of snapshots waiting for the next write
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Distinct run ids in the order their first snapshot was stored
    pub fn run_ids(&mut self) -> Result<Vec<String>> {
        self.write_pending()?;
        let mut stmt = self
            .conn
            .prepare("SELECT run_id FROM snapshots GROUP BY run_id ORDER BY MIN(id)")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    /// All snapshots of one run, in emission order
    pub fn snapshots_for_run(&mut self, run_id: &str) -> Result<Vec<SnapshotRecord>> {
        self.write_pending()?;
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_COLUMNS} WHERE run_id = ?1 ORDER BY frame_id"))?;
        let rows = stmt
            .query_map(params![run_id], raw_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(decode_row).collect()
    }

    pub fn get(&mut self, run_id: &str, frame_id: FrameId) -> Result<Option<SnapshotRecord>> {
        self.write_pending()?;
        let row = self
            .conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE run_id = ?1 AND frame_id = ?2"),
                params![run_id, frame_id as i64],
                raw_row,
            )
            .optional()?;
        row.map(decode_row).transpose()
    }

    /// Walk from a snapshot to the outermost traced caller
    ///
    /// Links that do not point at a strictly smaller frame id end the walk.
    pub fn back_chain(&mut self, run_id: &str, frame_id: FrameId) -> Result<Vec<SnapshotRecord>> {
        let mut chain = Vec::new();
        let mut next = Some(frame_id);

        while let Some(id) = next {
            let Some(record) = self.get(run_id, id)? else {
                break;
            };
            next = record.back_frame_id.filter(|back| *back < id);
            chain.push(record);
        }

        Ok(chain)
    }

    fn write_pending(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let result = insert_all(&mut self.conn, &self.pending);
        let count = self.pending.len();
        self.pending.clear();

        match result {
            Ok(()) => {
                debug!(rows = count, "Wrote snapshot batch");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, lost = count, "Failed to write snapshot batch");
                Err(TraceError::BatchLost {
                    lost: count,
                    source: Box::new(e),
                })
            }
        }
    }
}

impl SnapshotSink for SqliteSink {
    fn emit(&mut self, record: &SnapshotRecord) -> Result<()> {
        self.pending.push(record.clone());
        if self.pending.len() >= self.batch_size {
            self.write_pending()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.write_pending()
    }
}

fn insert_all(conn: &mut Connection, records: &[SnapshotRecord]) -> Result<()> {
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare_cached(INSERT_SQL)?;
        for record in records {
            stmt.execute(params![
                record.run_id,
                record.frame_id as i64,
                record.back_frame_id.map(|id| id as i64),
                record.filename,
                record.line as i64,
                record.function,
                serde_json::to_string(&record.locals)?,
                record.captured_at.to_rfc3339(),
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

fn raw_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn decode_row(raw: RawRow) -> Result<SnapshotRecord> {
    let (run_id, frame_id, back_frame_id, filename, line, function, locals, captured_at) = raw;
    let captured_at = DateTime::parse_from_rfc3339(&captured_at)
        .map_err(|e| TraceError::Sink(format!("bad captured_at {captured_at:?}: {e}")))?
        .with_timezone(&Utc);

    Ok(SnapshotRecord {
        run_id,
        frame_id: frame_id as FrameId,
        back_frame_id: back_frame_id.map(|id| id as FrameId),
        filename,
        line: line as u32,
        function,
        locals: serde_json::from_str(&locals)?,
        captured_at,
    })
}
