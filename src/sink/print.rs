//! Interactive display of snapshots as they arrive

use super::{SnapshotRecord, SnapshotSink};
use crate::error::Result;
use std::io::{self, Write};

/// Writes a summary line and the pretty-printed locals of each snapshot
pub struct PrintSink<W: Write> {
    writer: W,
}

impl<W: Write> PrintSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl PrintSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> SnapshotSink for PrintSink<W> {
    fn emit(&mut self, record: &SnapshotRecord) -> Result<()> {
        writeln!(self.writer, "{}", record.printable_summary())?;
        serde_json::to_writer_pretty(&mut self.writer, &record.locals)?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TraceError;
    use crate::sink::testing::record;

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_renders_summary_and_locals() {
        let mut sink = PrintSink::new(Vec::new());
        sink.emit(&record("run", 2, Some(1))).unwrap();
        sink.flush().unwrap();

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let mut lines = output.lines();
        assert!(lines.next().unwrap().contains("#2 <- #1"));
        assert!(output.contains("\"a\": 2"));
        assert!(output.ends_with("}\n"));
    }

    #[test]
    fn test_write_failure_surfaces() {
        let mut sink = PrintSink::new(BrokenPipe);
        let err = sink.emit(&record("run", 1, None)).unwrap_err();
        assert!(matches!(err, TraceError::Io(_)));
        assert!(!err.is_fatal());
    }
}
