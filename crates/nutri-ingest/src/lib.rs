//! Nutri Ingest - Dataset ingestion and normalization
//!
//! Reads every file declared in a `DatasetManifest`, normalizes rows into
//! `Record`s tagged with provenance, and routes them into the meal or
//! guidance corpus. A file that cannot be read is tallied in the
//! `IngestionReport` and skipped; it never aborts the load.

pub mod loader;
pub mod manifest;
pub mod normalize;

pub use loader::{DatasetLoader, FileFailure, FolderReport, IngestionReport, LoadedCorpus};
pub use manifest::{DatasetManifest, FileSpec, FolderSpec};
pub use normalize::{normalize_polarity, RowNormalizer};

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while ingesting a single file or manifest
#[derive(Error, Debug)]
pub enum IngestionError {
    /// None of the candidate names exist
    #[error("File not found: {0}")]
    Missing(String),

    /// IO error reading a file
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Parser failure (undecodable, unsupported or malformed)
    #[error(transparent)]
    Parse(#[from] nutri_parser::ParserError),

    /// File parsed but produced no usable rows
    #[error("No rows in {0}")]
    Empty(String),

    /// Manifest could not be parsed
    #[error("Invalid manifest {path}: {message}")]
    Manifest { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, IngestionError>;
