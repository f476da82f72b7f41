//! Dataset loader
//!
//! Walks the manifest folder by folder and turns each file into records.
//! Failures are recovered per file and recorded in the report.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use nutri_core::{DatasetConfig, Polarity, Record, RecordKind};
use nutri_parser::ParserRegistry;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::manifest::{DatasetManifest, FileSpec};
use crate::normalize::RowNormalizer;
use crate::{IngestionError, Result};

// ============================================================================
// Report
// ============================================================================

/// A file that could not be loaded
#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub file: String,
    pub reason: String,
}

/// Per-folder tally
#[derive(Debug, Clone, Default, Serialize)]
pub struct FolderReport {
    pub name: String,
    pub label: String,
    pub loaded_rows: usize,
    pub loaded_files: usize,
    pub failed_files: usize,
    /// Folder itself is absent
    pub missing: bool,
    pub failures: Vec<FileFailure>,
}

/// Outcome of one ingestion pass
#[derive(Debug, Clone, Serialize)]
pub struct IngestionReport {
    pub root: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_meals: usize,
    pub total_guidance: usize,
    pub folders: Vec<FolderReport>,
}

impl IngestionReport {
    /// Total rows loaded across all folders
    pub fn loaded_rows(&self) -> usize {
        self.folders.iter().map(|f| f.loaded_rows).sum()
    }

    /// Total files loaded
    pub fn loaded_files(&self) -> usize {
        self.folders.iter().map(|f| f.loaded_files).sum()
    }

    /// Total files skipped
    pub fn failed_files(&self) -> usize {
        self.folders.iter().map(|f| f.failed_files).sum()
    }

    /// Folder tally by name
    pub fn folder(&self, name: &str) -> Option<&FolderReport> {
        self.folders.iter().find(|f| f.name == name)
    }
}

/// Records produced by an ingestion pass
#[derive(Debug, Clone)]
pub struct LoadedCorpus {
    pub meals: Vec<Record>,
    pub guidance: Vec<Record>,
    pub report: IngestionReport,
}

// ============================================================================
// Loader
// ============================================================================

/// Loads every file in a manifest from a dataset root
pub struct DatasetLoader {
    root: PathBuf,
    manifest: DatasetManifest,
    registry: ParserRegistry,
    unrecognized_polarity: Polarity,
}

impl DatasetLoader {
    /// Create a loader for the built-in layout
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            manifest: DatasetManifest::builtin(),
            registry: ParserRegistry::with_defaults(),
            unrecognized_polarity: Polarity::Dont,
        }
    }

    /// Create a loader from configuration, reading the manifest file if one is set
    pub fn from_config(config: &DatasetConfig) -> Result<Self> {
        let mut loader = Self::new(config.root.clone())
            .with_unrecognized_polarity(config.unrecognized_polarity);
        if let Some(path) = &config.manifest_path {
            loader = loader.with_manifest(DatasetManifest::from_file(path)?);
        }
        Ok(loader)
    }

    /// Replace the manifest
    pub fn with_manifest(mut self, manifest: DatasetManifest) -> Self {
        self.manifest = manifest;
        self
    }

    /// Replace the parser registry
    pub fn with_registry(mut self, registry: ParserRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Polarity for guidance rows whose type is unrecognized
    pub fn with_unrecognized_polarity(mut self, polarity: Polarity) -> Self {
        self.unrecognized_polarity = polarity;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest(&self) -> &DatasetManifest {
        &self.manifest
    }

    /// Run a full ingestion pass
    pub fn load(&self) -> LoadedCorpus {
        let started_at = Utc::now();
        let mut meals = Vec::new();
        let mut guidance = Vec::new();
        let mut folders = Vec::with_capacity(self.manifest.folders.len());

        for folder in &self.manifest.folders {
            let folder_path = self.root.join(&folder.name);
            let mut tally = FolderReport {
                name: folder.name.clone(),
                label: folder.label.clone(),
                ..Default::default()
            };

            if !folder_path.is_dir() {
                debug!("Dataset folder missing: {}", folder_path.display());
                tally.missing = true;
                folders.push(tally);
                continue;
            }

            for spec in &folder.files {
                match self.load_file(&folder.name, &folder_path, spec) {
                    Ok(records) => {
                        tally.loaded_files += 1;
                        tally.loaded_rows += records.len();
                        match spec.kind {
                            RecordKind::Meal => meals.extend(records),
                            RecordKind::Guidance => guidance.extend(records),
                        }
                    }
                    Err(e) => {
                        debug!("Skipping {}/{}: {}", folder.name, spec.name, e);
                        tally.failed_files += 1;
                        tally.failures.push(FileFailure {
                            file: spec.name.clone(),
                            reason: e.to_string(),
                        });
                    }
                }
            }

            folders.push(tally);
        }

        let report = IngestionReport {
            root: self.root.clone(),
            started_at,
            finished_at: Utc::now(),
            total_meals: meals.len(),
            total_guidance: guidance.len(),
            folders,
        };

        if report.loaded_files() == 0 {
            warn!("No dataset files loaded from {}", self.root.display());
        }
        info!(
            "Ingested {} meals and {} guidance items ({} files loaded, {} failed)",
            report.total_meals,
            report.total_guidance,
            report.loaded_files(),
            report.failed_files()
        );

        LoadedCorpus {
            meals,
            guidance,
            report,
        }
    }

    /// Load a single manifest entry
    fn load_file(&self, folder: &str, folder_path: &Path, spec: &FileSpec) -> Result<Vec<Record>> {
        let path = spec
            .resolve(folder_path)
            .ok_or_else(|| IngestionError::Missing(spec.name.clone()))?;

        let source_file = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&spec.name)
            .to_string();

        let table = self.registry.parse(&path)?;
        if table.is_empty() {
            return Err(IngestionError::Empty(source_file));
        }

        let rows = RowNormalizer::new(spec, folder, &source_file)
            .with_unrecognized_polarity(self.unrecognized_polarity)
            .normalize(&table);

        if rows.unnamed > 0 {
            debug!("{}: {} rows without a name column", source_file, rows.unnamed);
        }
        if rows.records.is_empty() {
            return Err(IngestionError::Empty(source_file));
        }

        Ok(rows.records)
    }
}
