//! Delimited text parser using csv and encoding_rs
//!
//! Tries each configured encoding in order until one decodes the whole
//! file, then reads it with a flexible csv reader. Rows with more fields
//! than the header are treated as malformed and skipped.

use std::path::Path;

use csv::ReaderBuilder;
use tracing::debug;

use crate::{FileType, ParserError, Result, Table, TableParser};

/// Text encodings tried when decoding delimited files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Windows1252,
    Latin1,
}

impl TextEncoding {
    /// Default fallback order
    pub const DEFAULT_ORDER: [TextEncoding; 3] = [
        TextEncoding::Utf8,
        TextEncoding::Windows1252,
        TextEncoding::Latin1,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Windows1252 => "windows-1252",
            Self::Latin1 => "iso-8859-1",
        }
    }

    /// Decode without replacement characters; `None` if any byte is invalid
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            Self::Utf8 => {
                let text = std::str::from_utf8(bytes).ok()?;
                Some(text.strip_prefix('\u{feff}').unwrap_or(text).to_string())
            }
            Self::Windows1252 => encoding_rs::WINDOWS_1252
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|text| text.into_owned()),
            // encoding_rs maps the latin1 label onto windows-1252, so the
            // byte-to-codepoint mapping is done directly.
            Self::Latin1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

/// Delimited (CSV/TSV) table parser
pub struct DelimitedParser {
    /// Encodings tried in order
    pub encodings: Vec<TextEncoding>,
    /// Field delimiter override (None = by extension)
    pub delimiter: Option<u8>,
}

impl DelimitedParser {
    /// Create a new parser with the default encoding order
    pub fn new() -> Self {
        Self {
            encodings: TextEncoding::DEFAULT_ORDER.to_vec(),
            delimiter: None,
        }
    }

    /// Replace the encoding order
    pub fn with_encodings(mut self, encodings: Vec<TextEncoding>) -> Self {
        self.encodings = encodings;
        self
    }

    /// Force a field delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Decode raw bytes with the first encoding that accepts them
    pub fn decode(&self, bytes: &[u8]) -> Option<(TextEncoding, String)> {
        self.encodings
            .iter()
            .find_map(|enc| enc.decode(bytes).map(|text| (*enc, text)))
    }

    /// Parse already-decoded text
    pub fn parse_text(&self, text: &str, delimiter: u8) -> Result<Table> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(text.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| ParserError::CsvError(e.to_string()))?
            .clone();

        let mut table = Table::new().with_headers(headers.iter());
        if table.headers.iter().all(String::is_empty) {
            return Ok(Table::new());
        }
        let width = table.num_columns();

        for result in reader.records() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    debug!("Skipping unreadable row: {}", e);
                    table.skipped_rows += 1;
                    continue;
                }
            };

            if record.len() > width {
                table.skipped_rows += 1;
                continue;
            }

            table.add_row(record.iter().map(|cell| cell.trim().to_string()).collect());
        }

        Ok(table)
    }

    fn delimiter_for(&self, path: &Path) -> u8 {
        self.delimiter.unwrap_or(match FileType::from_path(path) {
            FileType::Tsv => b'\t',
            _ => b',',
        })
    }
}

impl Default for DelimitedParser {
    fn default() -> Self {
        Self::new()
    }
}

impl TableParser for DelimitedParser {
    fn parse(&self, path: &Path) -> Result<Table> {
        let bytes = std::fs::read(path).map_err(|e| ParserError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        let (encoding, text) = self.decode(&bytes).ok_or_else(|| ParserError::Undecodable {
            path: path.display().to_string(),
            tried: self
                .encodings
                .iter()
                .map(TextEncoding::name)
                .collect::<Vec<_>>()
                .join(", "),
        })?;

        let mut table = self.parse_text(&text, self.delimiter_for(path))?;
        table.encoding = Some(encoding.name());

        debug!(
            "Parsed {} ({}): {} rows, {} skipped",
            path.display(),
            encoding.name(),
            table.num_rows(),
            table.skipped_rows
        );

        Ok(table)
    }

    fn supported_types(&self) -> &[FileType] {
        &[FileType::Csv, FileType::Tsv]
    }
}
