//! Snapshot sinks: serialize a grid generation for offline inspection.
//!
//! Rows arrive most-significant first (the top of the domain leads the
//! file). The file sink writes one `grid{rank}_{identifier}.txt` per rank
//! per snapshot: rows of fixed-width floats, a blank line at the end.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::HaloGridError;
use crate::topology::Rank;

/// Receives one grid generation, row by row.
pub trait SnapshotSink {
    /// Consume the next row, top of the domain first.
    fn write_row(&mut self, row: &[f64]) -> Result<(), HaloGridError>;

    /// Called once after the last row.
    fn finish(&mut self) -> Result<(), HaloGridError> {
        Ok(())
    }
}

/// Text-file sink, one file per rank per snapshot.
pub struct FileSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FileSink {
    /// Create `grid{rank}_{identifier}.txt` under `dir`, truncating any
    /// previous snapshot of the same name.
    pub fn create<P: AsRef<Path>>(
        dir: P,
        rank: Rank,
        identifier: &str,
    ) -> Result<Self, HaloGridError> {
        let path = dir.as_ref().join(format!("grid{rank}_{identifier}.txt"));
        let file = File::create(&path).map_err(|e| {
            HaloGridError::Snapshot(format!("could not create `{}`: {e}", path.display()))
        })?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    /// Where this sink writes.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotSink for FileSink {
    fn write_row(&mut self, row: &[f64]) -> Result<(), HaloGridError> {
        for value in row {
            write!(self.writer, "{value:5.3} ").map_err(io_err)?;
        }
        writeln!(self.writer).map_err(io_err)
    }

    fn finish(&mut self) -> Result<(), HaloGridError> {
        writeln!(self.writer).map_err(io_err)?;
        self.writer.flush().map_err(io_err)
    }
}

fn io_err(e: std::io::Error) -> HaloGridError {
    HaloGridError::Snapshot(e.to_string())
}

/// In-memory sink for tests and for reassembling a global grid from
/// per-rank snapshots.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    /// Captured rows, top of the domain first.
    pub rows: Vec<Vec<f64>>,
    /// Set once `finish` has run.
    pub finished: bool,
}

impl SnapshotSink for MemorySink {
    fn write_row(&mut self, row: &[f64]) -> Result<(), HaloGridError> {
        self.rows.push(row.to_vec());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), HaloGridError> {
        self.finished = true;
        Ok(())
    }
}
