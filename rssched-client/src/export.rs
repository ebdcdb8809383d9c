//! Run-scoped output files.
//!
//! Every run writes into `{output}/rep_{run_id}/`, each file named
//! `{run_id}.{name}`.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::composer::{LineSelection, write_selection};
use crate::passenger::{Entry, write_entries};
use crate::request::Request;
use crate::response::Response;
use crate::scenario::Timetable;

const DIRECTORY_PREFIX: &str = "rep";

pub const REQUEST_FILE: &str = "scheduler_request.json";
pub const RESPONSE_FILE: &str = "scheduler_response.json";
pub const PASSENGER_FILE: &str = "passenger.csv";
pub const CONFIG_FILE: &str = "request_config.json";
pub const LINE_SELECTION_FILE: &str = "line_selection.csv";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Output directory of one run.
#[derive(Debug, Clone)]
pub struct OutputDirectory {
    path: PathBuf,
    run_id: String,
}

impl OutputDirectory {
    /// Create the run directory below `output`, including missing parents.
    pub fn create(output: impl AsRef<Path>, run_id: &str) -> Result<Self, ExportError> {
        let path = output
            .as_ref()
            .join(format!("{DIRECTORY_PREFIX}_{run_id}"));
        std::fs::create_dir_all(&path).map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            path,
            run_id: run_id.to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the run's file with the given name.
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.path.join(format!("{}.{name}", self.run_id))
    }

    pub fn write_request(&self, request: &Request) -> Result<PathBuf, ExportError> {
        self.write_json(REQUEST_FILE, request)
    }

    pub fn write_response(&self, response: &Response) -> Result<PathBuf, ExportError> {
        self.write_json(RESPONSE_FILE, response)
    }

    /// Keep the configuration a request was composed with next to it.
    pub fn write_config<T: Serialize>(&self, config: &T) -> Result<PathBuf, ExportError> {
        self.write_json(CONFIG_FILE, config)
    }

    pub fn write_passengers(
        &self,
        entries: &[Entry],
        timetable: &Timetable,
    ) -> Result<PathBuf, ExportError> {
        let path = self.file_path(PASSENGER_FILE);
        info!(path = %path.display(), entries = entries.len(), "Exporting passenger CSV");
        let file = File::create(&path).map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;
        write_entries(BufWriter::new(file), entries, timetable).map_err(|source| {
            ExportError::Csv {
                path: path.clone(),
                source,
            }
        })?;
        Ok(path)
    }

    pub fn write_line_selection(&self, selection: &LineSelection) -> Result<PathBuf, ExportError> {
        let path = self.file_path(LINE_SELECTION_FILE);
        info!(path = %path.display(), lines = selection.len(), "Exporting line selection CSV");
        let file = File::create(&path).map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;
        write_selection(BufWriter::new(file), selection).map_err(|source| ExportError::Csv {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf, ExportError> {
        let path = self.file_path(name);
        info!(path = %path.display(), "Exporting JSON");
        let json = serde_json::to_string_pretty(value).map_err(|source| ExportError::Json {
            path: path.clone(),
            source,
        })?;
        std::fs::write(&path, json).map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}
