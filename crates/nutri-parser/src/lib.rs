//! Nutri Parser - Tabular dataset parsing
//!
//! Supports parsing of:
//! - Comma and tab separated files in UTF-8, Windows-1252 or ISO-8859-1
//! - Microsoft Excel (XLSX, XLS)
//!
//! Each parser implements the `TableParser` trait and produces a `Table`
//! with normalized column names and no fully-empty rows.

pub mod delimited;
pub mod excel;

pub use delimited::{DelimitedParser, TextEncoding};
pub use excel::ExcelParser;

use std::path::Path;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during table parsing
#[derive(Error, Debug)]
pub enum ParserError {
    /// File format is not supported
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// IO error while reading the file
    #[error("IO error reading file: {path}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// No configured encoding could decode the file
    #[error("Could not decode {path} with any of: {tried}")]
    Undecodable { path: String, tried: String },

    /// Delimited reader failed on the header row
    #[error("CSV parsing error: {0}")]
    CsvError(String),

    /// Excel parsing error
    #[error("Excel parsing error: {0}")]
    ExcelError(String),
}

pub type Result<T> = std::result::Result<T, ParserError>;

// ============================================================================
// Table Types
// ============================================================================

/// Supported file types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Csv,
    Tsv,
    Xlsx,
    Xls,
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "csv" => Self::Csv,
            "tsv" | "tab" => Self::Tsv,
            "xlsx" => Self::Xlsx,
            "xls" => Self::Xls,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from path
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Csv => write!(f, "csv"),
            Self::Tsv => write!(f, "tsv"),
            Self::Xlsx => write!(f, "xlsx"),
            Self::Xls => write!(f, "xls"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Normalize a column name: trimmed, lowercased, spaces become underscores
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// A parsed table
#[derive(Debug, Clone, Default)]
pub struct Table {
    /// Normalized column headers
    pub headers: Vec<String>,

    /// Data rows, each padded to the header width
    pub rows: Vec<Vec<String>>,

    /// Rows the reader rejected as malformed
    pub skipped_rows: usize,

    /// Name of the encoding that decoded the file (delimited files only)
    pub encoding: Option<&'static str>,
}

impl Table {
    /// Create a new table
    pub fn new() -> Self {
        Self::default()
    }

    /// Set headers, normalizing each one
    pub fn with_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.headers = headers
            .into_iter()
            .map(|h| normalize_header(h.as_ref()))
            .collect();
        self
    }

    /// Add a row, dropping it if every cell is blank
    ///
    /// Returns whether the row was kept.
    pub fn add_row(&mut self, mut row: Vec<String>) -> bool {
        if row.iter().all(|cell| cell.trim().is_empty()) {
            return false;
        }
        if row.len() < self.headers.len() {
            row.resize(self.headers.len(), String::new());
        }
        self.rows.push(row);
        true
    }

    /// Get number of columns
    pub fn num_columns(&self) -> usize {
        self.headers.len()
    }

    /// Get number of rows
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Check whether the table has no data rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a normalized column
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    /// Iterate rows as (column, value) pairs
    pub fn iter_rows(&self) -> impl Iterator<Item = Vec<(&str, &str)>> + '_ {
        self.rows.iter().map(move |row| {
            self.headers
                .iter()
                .zip(row.iter())
                .map(|(h, v)| (h.as_str(), v.as_str()))
                .collect()
        })
    }
}

// ============================================================================
// Parser Trait
// ============================================================================

/// Trait for table parsers
pub trait TableParser: Send + Sync {
    /// Parse a table from a file path
    fn parse(&self, path: &Path) -> Result<Table>;

    /// Get supported file types
    fn supported_types(&self) -> &[FileType];

    /// Check if this parser can handle a file type
    fn can_parse(&self, file_type: FileType) -> bool {
        self.supported_types().contains(&file_type)
    }
}

// ============================================================================
// Parser Registry
// ============================================================================

/// Registry of available parsers
pub struct ParserRegistry {
    parsers: Vec<Box<dyn TableParser>>,
}

impl ParserRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    /// Registry with the delimited and Excel parsers
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(DelimitedParser::new());
        registry.register(ExcelParser::new());
        registry
    }

    /// Register a parser
    pub fn register<P: TableParser + 'static>(&mut self, parser: P) {
        self.parsers.push(Box::new(parser));
    }

    /// Find a parser for a file type
    pub fn find_parser(&self, file_type: FileType) -> Option<&dyn TableParser> {
        self.parsers
            .iter()
            .find(|p| p.can_parse(file_type))
            .map(|p| p.as_ref())
    }

    /// Parse a file using the appropriate parser
    pub fn parse(&self, path: &Path) -> Result<Table> {
        let file_type = FileType::from_path(path);

        if file_type == FileType::Unknown {
            return Err(ParserError::UnsupportedFormat(
                path.extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("none")
                    .to_string(),
            ));
        }

        let parser = self
            .find_parser(file_type)
            .ok_or_else(|| ParserError::UnsupportedFormat(file_type.to_string()))?;

        parser.parse(path)
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ============================================================================
// Tests
// ============================================================================
