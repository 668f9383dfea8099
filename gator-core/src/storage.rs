//! Local persistence of raw capture data.
//!
//! Files are named by a 10-digit zero-padded sequence number inside the
//! capture directory and receive raw capture payloads verbatim.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::GatorError;

/// Width of the zero-padded data file name.
pub const DATA_FILE_NAME_WIDTH: usize = 10;

/// `0000000000`, `0000000001`, ...
pub fn data_file_name(sequence: u32) -> String {
    format!("{sequence:0width$}", width = DATA_FILE_NAME_WIDTH)
}

/// An open capture data file.
#[derive(Debug)]
pub struct DataFile {
    path: PathBuf,
    file: File,
}

impl DataFile {
    /// Create (or truncate) the data file for `sequence` under `dir`.
    pub fn create(dir: &Path, sequence: u32) -> Result<Self, GatorError> {
        let path = dir.join(data_file_name(sequence));
        let file = File::create(&path).map_err(|source| GatorError::DataFileOpen {
            path: path.clone(),
            source,
        })?;
        info!("writing capture data to {}", path.display());
        Ok(Self { path, file })
    }

    /// Append `data`. Anything short of the full payload is an error.
    pub fn write_payload(&mut self, data: &[u8]) -> Result<(), GatorError> {
        self.file
            .write_all(data)
            .and_then(|()| self.file.flush())
            .map_err(|source| GatorError::DataFileWrite {
                path: self.path.clone(),
                source,
            })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush to disk and close.
    pub fn close(self) -> Result<(), GatorError> {
        self.file.sync_all().map_err(|source| GatorError::DataFileWrite {
            path: self.path.clone(),
            source,
        })
    }
}
