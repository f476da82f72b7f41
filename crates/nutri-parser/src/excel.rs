//! Excel table parser using calamine
//!
//! Reads the first worksheet (or a named one) with its first row as header.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use crate::{FileType, ParserError, Result, Table, TableParser};

/// Excel table parser
pub struct ExcelParser {
    /// Sheet to read (None = first sheet)
    pub sheet: Option<String>,
}

impl ExcelParser {
    /// Create a new Excel parser with default settings
    pub fn new() -> Self {
        Self { sheet: None }
    }

    /// Read a specific sheet
    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }

    /// Convert a Data cell to string
    fn cell_to_string(cell: &Data) -> String {
        match cell {
            Data::Empty => String::new(),
            Data::String(s) => s.trim().to_string(),
            Data::Float(f) => {
                // Format without unnecessary decimals
                if f.fract() == 0.0 {
                    format!("{}", *f as i64)
                } else {
                    format!("{f}")
                }
            }
            Data::Int(i) => format!("{i}"),
            Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            Data::Error(_) => String::new(),
            Data::DateTime(dt) => format!("{dt}"),
            Data::DateTimeIso(s) => s.clone(),
            Data::DurationIso(s) => s.clone(),
        }
    }

    /// Convert a worksheet range into a table
    fn range_to_table(range: &calamine::Range<Data>) -> Table {
        let mut rows_iter = range.rows();

        let Some(header_row) = rows_iter.next() else {
            return Table::new();
        };

        let mut table =
            Table::new().with_headers(header_row.iter().map(Self::cell_to_string));
        let width = table.num_columns();

        for row in rows_iter {
            let mut cells: Vec<String> = row.iter().map(Self::cell_to_string).collect();
            cells.truncate(width);
            table.add_row(cells);
        }

        table
    }
}

impl Default for ExcelParser {
    fn default() -> Self {
        Self::new()
    }
}

impl TableParser for ExcelParser {
    fn parse(&self, path: &Path) -> Result<Table> {
        let mut workbook =
            open_workbook_auto(path).map_err(|e| ParserError::ExcelError(e.to_string()))?;

        let sheet_name = match &self.sheet {
            Some(name) => name.clone(),
            None => workbook
                .sheet_names()
                .first()
                .cloned()
                .ok_or_else(|| ParserError::ExcelError("workbook has no sheets".to_string()))?,
        };

        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| ParserError::ExcelError(e.to_string()))?;

        Ok(Self::range_to_table(&range))
    }

    fn supported_types(&self) -> &[FileType] {
        &[FileType::Xlsx, FileType::Xls]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excel_parser_creation() {
        let parser = ExcelParser::new();
        assert!(parser.sheet.is_none());

        let parser = parser.with_sheet("Meals");
        assert_eq!(parser.sheet.as_deref(), Some("Meals"));
    }

    #[test]
    fn test_cell_to_string() {
        assert_eq!(ExcelParser::cell_to_string(&Data::Empty), "");
        assert_eq!(
            ExcelParser::cell_to_string(&Data::String(" Poha ".to_string())),
            "Poha"
        );
        assert_eq!(ExcelParser::cell_to_string(&Data::Int(2)), "2");
        assert_eq!(ExcelParser::cell_to_string(&Data::Float(3.5)), "3.5");
        assert_eq!(ExcelParser::cell_to_string(&Data::Float(10.0)), "10");
        assert_eq!(ExcelParser::cell_to_string(&Data::Bool(true)), "TRUE");
    }

    #[test]
    fn test_range_to_table() {
        let mut range = calamine::Range::new((0, 0), (2, 1));
        range.set_value((0, 0), Data::String("Food Item".to_string()));
        range.set_value((0, 1), Data::String("Trimester".to_string()));
        range.set_value((1, 0), Data::String("Khichdi".to_string()));
        range.set_value((1, 1), Data::Int(1));

        let table = ExcelParser::range_to_table(&range);
        assert_eq!(table.headers, vec!["food_item", "trimester"]);
        // Row 2 is entirely empty and dropped
        assert_eq!(table.num_rows(), 1);
        assert_eq!(table.rows[0], vec!["Khichdi", "1"]);
    }

    #[test]
    fn test_missing_workbook() {
        let err = ExcelParser::new()
            .parse(Path::new("/nonexistent/book.xlsx"))
            .unwrap_err();
        assert!(matches!(err, ParserError::ExcelError(_)));
    }

    #[test]
    fn test_supported_types() {
        let parser = ExcelParser::new();
        assert!(parser.can_parse(FileType::Xlsx));
        assert!(parser.can_parse(FileType::Xls));
        assert!(!parser.can_parse(FileType::Csv));
    }
}
