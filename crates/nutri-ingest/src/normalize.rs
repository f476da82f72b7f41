//! Row normalization
//!
//! Maps heterogeneous source columns onto the fixed `Record` shape through
//! an alias table, and canonicalizes guidance polarity.

use nutri_core::{Attribute, Polarity, Record, RecordKind};
use nutri_parser::Table;

use crate::manifest::FileSpec;

// ============================================================================
// Column aliases
// ============================================================================

/// Columns that may hold the item name, in preference order
pub const NAME_COLUMNS: &[&str] = &[
    "food",
    "food_item",
    "item",
    "meal",
    "dish",
    "dish_name",
    "meal_name",
    "recipe",
    "name",
    "do",
    "dont",
];

/// Columns that may hold the guidance type
pub const POLARITY_COLUMNS: &[&str] = &["type", "do_dont", "do_or_dont", "guidance_type"];

/// Columns that may hold trimester information
pub const TRIMESTER_COLUMNS: &[&str] = &["trimester", "trimester_wise", "month", "week"];

/// Columns that may hold meal type information
pub const MEAL_TYPE_COLUMNS: &[&str] = &["meal_type", "type", "breakfast_lunch_dinner", "meal_time"];

fn attribute_for(column: &str) -> Option<Attribute> {
    match column {
        "benefit" | "benefits" | "health_benefit" | "health_benefits" => Some(Attribute::Benefit),
        "risk" | "health_risk" | "risks" => Some(Attribute::Risk),
        "nutrients" | "key_nutrients" | "nutrient" => Some(Attribute::Nutrients),
        "notes" | "remarks" | "note" => Some(Attribute::Notes),
        "description" | "details" | "reason" => Some(Attribute::Description),
        "recommendation" | "medical_recommendation" => Some(Attribute::Recommendation),
        "category" | "food_category" => Some(Attribute::Category),
        "food_group" => Some(Attribute::FoodGroup),
        "examples" | "example_foods" => Some(Attribute::Examples),
        _ => None,
    }
}

// ============================================================================
// Polarity
// ============================================================================

/// Words that turn a guidance type into a don't
const NEGATIONS: &[&str] = &["NOT", "NEVER", "NO", "AVOID", "DONT", "DONTS", "DONOT"];

fn alphanumeric_upper(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_uppercase()
}

/// Canonicalize a free-text guidance type
///
/// Any negating word wins over a leading "do", so "Do not eat" is a don't.
/// Returns `None` when the text carries no recognizable polarity.
pub fn normalize_polarity(raw: &str) -> Option<Polarity> {
    let cleaned = alphanumeric_upper(raw);

    match cleaned.as_str() {
        "" => return None,
        "DO" | "DOS" | "EAT" | "YES" | "SAFE" | "RECOMMENDED" => return Some(Polarity::Do),
        _ => {}
    }

    let negated = raw
        .split_whitespace()
        .map(alphanumeric_upper)
        .any(|word| NEGATIONS.contains(&word.as_str()));

    if negated || cleaned.contains("DONT") || cleaned.contains("AVOID") {
        Some(Polarity::Dont)
    } else if cleaned.starts_with("DO") {
        Some(Polarity::Do)
    } else {
        None
    }
}

// ============================================================================
// Row normalizer
// ============================================================================

/// Converts parsed tables into records for one manifest entry
pub struct RowNormalizer<'a> {
    spec: &'a FileSpec,
    folder: &'a str,
    source_file: &'a str,
    unrecognized_polarity: Polarity,
}

/// Records produced from one table
#[derive(Debug, Default)]
pub struct NormalizedRows {
    pub records: Vec<Record>,
    /// Rows with no usable name column
    pub unnamed: usize,
}

impl<'a> RowNormalizer<'a> {
    pub fn new(spec: &'a FileSpec, folder: &'a str, source_file: &'a str) -> Self {
        Self {
            spec,
            folder,
            source_file,
            unrecognized_polarity: Polarity::Dont,
        }
    }

    /// Polarity used when neither the file nor the row declares one
    pub fn with_unrecognized_polarity(mut self, polarity: Polarity) -> Self {
        self.unrecognized_polarity = polarity;
        self
    }

    /// Normalize every row of a table
    pub fn normalize(&self, table: &Table) -> NormalizedRows {
        let mut out = NormalizedRows::default();
        for row in table.iter_rows() {
            match self.normalize_row(&row) {
                Some(record) => out.records.push(record),
                None => out.unnamed += 1,
            }
        }
        out
    }

    fn normalize_row(&self, row: &[(&str, &str)]) -> Option<Record> {
        let (name_column, name) = first_of(row, NAME_COLUMNS)?;

        let mut consumed: Vec<&str> = vec![name_column];

        let mut record = match self.spec.kind {
            RecordKind::Meal => Record::meal(name),
            RecordKind::Guidance => {
                let row_polarity = first_of(row, POLARITY_COLUMNS).and_then(|(column, value)| {
                    consumed.push(column);
                    normalize_polarity(value)
                });
                let polarity = self
                    .spec
                    .polarity
                    .or(row_polarity)
                    .unwrap_or(self.unrecognized_polarity);
                Record::guidance(name, polarity)
            }
        }
        .with_provenance(self.spec.provenance(self.folder, self.source_file));

        if let Some((column, value)) = first_of(row, TRIMESTER_COLUMNS) {
            consumed.push(column);
            record = record.with_trimester(value);
        }

        if self.spec.kind == RecordKind::Meal {
            if let Some((column, value)) = first_of(row, MEAL_TYPE_COLUMNS) {
                consumed.push(column);
                record = record.with_meal_type(value);
            }
        }

        for (column, value) in row {
            let value = value.trim();
            if value.is_empty() || consumed.contains(column) {
                continue;
            }
            match attribute_for(column) {
                Some(attribute) if !record.attributes.contains_key(&attribute) => {
                    record = record.with_attribute(attribute, value);
                }
                _ => {
                    record = record.with_extra(*column, value);
                }
            }
        }

        Some(record)
    }
}

/// First non-empty value among the candidate columns
fn first_of<'r>(
    row: &[(&'r str, &'r str)],
    columns: &[&'static str],
) -> Option<(&'static str, &'r str)> {
    columns.iter().find_map(|column| {
        row.iter()
            .find(|(c, v)| c == column && !v.trim().is_empty())
            .map(|(_, v)| (*column, v.trim()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
        let mut table = Table::new().with_headers(headers.iter().copied());
        for row in rows {
            table.add_row(row.iter().map(|s| s.to_string()).collect());
        }
        table
    }

    #[test]
    fn test_polarity_variants() {
        assert_eq!(normalize_polarity("DO"), Some(Polarity::Do));
        assert_eq!(normalize_polarity("Do's"), Some(Polarity::Do));
        assert_eq!(normalize_polarity(" eat "), Some(Polarity::Do));
        assert_eq!(normalize_polarity("DON'T"), Some(Polarity::Dont));
        assert_eq!(normalize_polarity("Don'ts"), Some(Polarity::Dont));
        assert_eq!(normalize_polarity("do not"), Some(Polarity::Dont));
        assert_eq!(normalize_polarity("AVOID"), Some(Polarity::Dont));
        assert_eq!(normalize_polarity("Strictly avoid"), Some(Polarity::Dont));
        assert_eq!(normalize_polarity("Dos and tips"), Some(Polarity::Do));
        assert_eq!(normalize_polarity("Do not eat"), Some(Polarity::Dont));
        assert_eq!(normalize_polarity("Do not consume"), Some(Polarity::Dont));
        assert_eq!(normalize_polarity("Does not"), Some(Polarity::Dont));
        assert_eq!(normalize_polarity("Do NOT"), Some(Polarity::Dont));
        assert_eq!(normalize_polarity("Never"), Some(Polarity::Dont));
        assert_eq!(normalize_polarity("Do eat"), Some(Polarity::Do));
        assert_eq!(normalize_polarity("maybe"), None);
        assert_eq!(normalize_polarity("  "), None);
    }

    #[test]
    fn test_meal_row_mapping() {
        let spec = FileSpec::new("northveg.csv", RecordKind::Meal, "regional")
            .with_region("north")
            .with_diet("veg");
        let t = table(
            &["Dish Name", "Meal Type", "Health Benefit", "Calories", "Trimester"],
            &[&["Palak Paneer", "Lunch", "Iron rich", "320", "2"]],
        );

        let rows = RowNormalizer::new(&spec, "data_1", "northveg.csv").normalize(&t);
        assert_eq!(rows.records.len(), 1);

        let record = &rows.records[0];
        assert_eq!(record.name, "palak paneer");
        assert_eq!(record.meal_type.as_deref(), Some("Lunch"));
        assert_eq!(record.trimester.as_deref(), Some("2"));
        assert_eq!(record.attribute(Attribute::Benefit), Some("Iron rich"));
        assert_eq!(record.extra.get("calories").map(String::as_str), Some("320"));
        assert_eq!(record.provenance.region.as_deref(), Some("north"));
        assert_eq!(record.provenance.source_file, "northveg.csv");
    }

    #[test]
    fn test_guidance_type_column() {
        let spec = FileSpec::new("dos.csv", RecordKind::Guidance, "guidance");
        let t = table(
            &["Type", "Item", "Description"],
            &[
                &["DO", "Papaya (ripe)", "Good source of vitamin C"],
                &["DON'T", "Papaya (unripe)", "Latex may trigger contractions"],
            ],
        );

        let rows = RowNormalizer::new(&spec, "remainingdatasets", "dos.csv").normalize(&t);
        assert_eq!(rows.records[0].polarity, Some(Polarity::Do));
        assert_eq!(rows.records[1].polarity, Some(Polarity::Dont));
        // Type column is consumed, not copied into extra
        assert!(rows.records[0].extra.is_empty());
        assert!(rows.records[0].meal_type.is_none());
    }

    #[test]
    fn test_file_polarity_wins() {
        let spec = FileSpec::new("avoid.csv", RecordKind::Guidance, "guidance")
            .with_polarity(Polarity::Dont);
        let t = table(&["Food", "Type", "Risk"], &[&["Raw sprouts", "DO", "Bacteria"]]);

        let rows = RowNormalizer::new(&spec, "remainingdatasets", "avoid.csv").normalize(&t);
        assert_eq!(rows.records[0].polarity, Some(Polarity::Dont));
        assert_eq!(rows.records[0].attribute(Attribute::Risk), Some("Bacteria"));
    }

    #[test]
    fn test_unrecognized_polarity_default() {
        let spec = FileSpec::new("mixed.csv", RecordKind::Guidance, "guidance");
        let t = table(&["Type", "Item"], &[&["Sometimes", "Coffee"], &["", "Tea"]]);

        let default_rows = RowNormalizer::new(&spec, "f", "mixed.csv").normalize(&t);
        assert!(default_rows
            .records
            .iter()
            .all(|r| r.polarity == Some(Polarity::Dont)));

        let lenient = RowNormalizer::new(&spec, "f", "mixed.csv")
            .with_unrecognized_polarity(Polarity::Do)
            .normalize(&t);
        assert!(lenient.records.iter().all(|r| r.polarity == Some(Polarity::Do)));
    }

    #[test]
    fn test_unnamed_rows_counted() {
        let spec = FileSpec::new("x.csv", RecordKind::Meal, "regional");
        let t = table(&["Calories", "Food"], &[&["100", ""], &["200", "Idli"]]);

        let rows = RowNormalizer::new(&spec, "f", "x.csv").normalize(&t);
        assert_eq!(rows.records.len(), 1);
        assert_eq!(rows.unnamed, 1);
    }
}
