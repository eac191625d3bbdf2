//! Timestamped CSV archives
//!
//! The control loops write one row per archived tick. Record types carry a
//! `time_s` field filled from [`crate::session::get_elapsed_seconds`] so that
//! archives from the two loops can be merged.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use csv::{Writer, WriterBuilder};
use serde::Serialize;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object used to write CSV archive files.
pub struct Archiver {
    writer: Writer<File>,

    /// Only every `decimation`th record passed to `serialise` is written.
    decimation: usize,

    count: usize
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Cannot create the archive file: {0}")]
    CreateError(std::io::Error),

    #[error("Cannot write the archive record: {0}")]
    WriteError(csv::Error),

    #[error("Cannot flush the archive: {0}")]
    FlushError(std::io::Error)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver {
    /// Create a new archiver from a paricular path relative to the session's
    /// archive root.
    pub fn from_path<P: AsRef<Path>>(
        session: &Session,
        path: P
    ) -> Result<Self, ArchiveError> {
        Self::create(session.arch_root.join(path), 1)
    }

    /// Create an archiver writing to an explicit path, keeping one record in
    /// every `decimation`.
    pub fn create<P: AsRef<Path>>(
        path: P,
        decimation: usize
    ) -> Result<Self, ArchiveError> {
        let file = File::create(path).map_err(ArchiveError::CreateError)?;

        let writer = WriterBuilder::new()
            .has_headers(true)
            .from_writer(file);

        Ok(Self {
            writer,
            decimation: decimation.max(1),
            count: 0
        })
    }

    /// Change the decimation of this archiver.
    pub fn with_decimation(mut self, decimation: usize) -> Self {
        self.decimation = decimation.max(1);
        self
    }

    /// Serialise a record into the archive.
    ///
    /// Records skipped by the decimation return `Ok(false)`.
    pub fn serialise<T: Serialize>(&mut self, record: T) -> Result<bool, ArchiveError> {
        let keep = self.count % self.decimation == 0;
        self.count = self.count.wrapping_add(1);

        if !keep {
            return Ok(false);
        }

        self.writer
            .serialize(record)
            .map_err(ArchiveError::WriteError)?;

        Ok(true)
    }

    /// Flush buffered records to disk.
    pub fn flush(&mut self) -> Result<(), ArchiveError> {
        self.writer.flush().map_err(ArchiveError::FlushError)
    }
}

impl Drop for Archiver {
    fn drop(&mut self) {
        self.writer.flush().ok();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Serialize)]
    struct Row {
        time_s: f64,
        value: f64
    }

    #[test]
    fn test_decimation() {
        let path = std::env::temp_dir().join("util_archive_decimation.csv");
        {
            let mut arch = Archiver::create(&path, 3).unwrap();
            let written: Vec<bool> = (0..7)
                .map(|i| arch.serialise(Row { time_s: i as f64, value: 0.5 }).unwrap())
                .collect();
            assert_eq!(written, vec![true, false, false, true, false, false, true]);
        }

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "time_s,value");
        assert_eq!(lines.len(), 4);
        std::fs::remove_file(&path).ok();
    }
}
