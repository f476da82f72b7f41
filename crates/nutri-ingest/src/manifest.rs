//! Dataset manifest
//!
//! Declares which files make up the corpus, where they live, and which
//! provenance tags each one carries. The built-in manifest describes the
//! five-folder layout; a different layout is loaded from TOML.

use std::path::{Path, PathBuf};

use nutri_core::{Polarity, Provenance, RecordKind};
use serde::{Deserialize, Serialize};

use crate::IngestionError;

/// Full dataset layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetManifest {
    #[serde(rename = "folder", default)]
    pub folders: Vec<FolderSpec>,
}

/// One dataset folder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderSpec {
    /// Directory name under the dataset root
    pub name: String,

    /// Human readable label
    #[serde(default)]
    pub label: String,

    #[serde(rename = "file", default)]
    pub files: Vec<FileSpec>,
}

/// One file entry with its provenance tags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSpec {
    /// Preferred file name
    pub name: String,

    /// Alternative names; the first existing candidate is loaded
    #[serde(default)]
    pub aliases: Vec<String>,

    /// Corpus the rows are routed into
    pub kind: RecordKind,

    pub category: String,

    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub diet: Option<String>,

    #[serde(default)]
    pub season: Option<String>,

    #[serde(default)]
    pub condition: Option<String>,

    #[serde(default)]
    pub phase: Option<String>,

    /// Polarity applied to every row of a guidance file
    #[serde(default)]
    pub polarity: Option<Polarity>,
}

impl FileSpec {
    /// Create a file entry
    pub fn new(name: impl Into<String>, kind: RecordKind, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            kind,
            category: category.into(),
            region: None,
            diet: None,
            season: None,
            condition: None,
            phase: None,
            polarity: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_diet(mut self, diet: impl Into<String>) -> Self {
        self.diet = Some(diet.into());
        self
    }

    pub fn with_season(mut self, season: impl Into<String>) -> Self {
        self.season = Some(season.into());
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }

    pub fn with_polarity(mut self, polarity: Polarity) -> Self {
        self.polarity = Some(polarity);
        self
    }

    /// Candidate file names in preference order
    pub fn candidates(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// First candidate that exists inside `folder`
    pub fn resolve(&self, folder: &Path) -> Option<PathBuf> {
        self.candidates()
            .map(|candidate| folder.join(candidate))
            .find(|path| path.is_file())
    }

    /// Provenance for rows read from this file
    pub fn provenance(&self, folder: &str, source_file: &str) -> Provenance {
        Provenance {
            source_file: source_file.to_string(),
            folder: folder.to_string(),
            region: self.region.clone(),
            diet: self.diet.clone(),
            season: self.season.clone(),
            condition: self.condition.clone(),
            category: self.category.clone(),
            phase: self.phase.clone(),
        }
    }
}

impl DatasetManifest {
    /// Load a manifest from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, IngestionError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| IngestionError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            IngestionError::Manifest { message, .. } => IngestionError::Manifest {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// Parse a manifest from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, IngestionError> {
        toml::from_str(content).map_err(|e| IngestionError::Manifest {
            path: PathBuf::new(),
            message: e.to_string(),
        })
    }

    /// Total number of declared files
    pub fn file_count(&self) -> usize {
        self.folders.iter().map(|f| f.files.len()).sum()
    }

    /// Built-in five-folder layout
    pub fn builtin() -> Self {
        use RecordKind::{Guidance, Meal};

        let all = |spec: FileSpec| spec.with_region("all").with_diet("all");

        Self {
            folders: vec![
                FolderSpec {
                    name: "data_1".to_string(),
                    label: "Regional Diets".to_string(),
                    files: vec![
                        FileSpec::new("northveg_cleaned.csv", Meal, "regional")
                            .with_region("north")
                            .with_diet("veg"),
                        FileSpec::new("northnonveg_cleaned.csv", Meal, "regional")
                            .with_alias("northnonveg_cleaned (1).csv")
                            .with_region("north")
                            .with_diet("nonveg"),
                        FileSpec::new("southveg_cleaned.csv", Meal, "regional")
                            .with_region("south")
                            .with_diet("veg"),
                        FileSpec::new("southnonveg_cleaned.csv", Meal, "regional")
                            .with_region("south")
                            .with_diet("nonveg"),
                    ],
                },
                FolderSpec {
                    name: "data_2".to_string(),
                    label: "Trimester-Wise Diets".to_string(),
                    files: vec![
                        all(FileSpec::new("Trimester_Wise_Diet_Plan.csv", Meal, "trimester")),
                        all(FileSpec::new(
                            "pregnancy_diet_1st_2nd_3rd_trimester.xlsx.csv",
                            Meal,
                            "trimester",
                        )
                        .with_alias("pregnancy_diet_1st_2nd_3rd_trimester.xlsx")),
                    ],
                },
                FolderSpec {
                    name: "data_3".to_string(),
                    label: "Seasonal Diets".to_string(),
                    files: vec![
                        all(FileSpec::new("monsoon_diet_pregnant_women.csv", Meal, "seasonal")
                            .with_season("monsoon")),
                        all(FileSpec::new("summer_pregnancy_diet.csv", Meal, "seasonal")
                            .with_season("summer")),
                        all(FileSpec::new("Winter_Pregnancy_Diet.csv", Meal, "seasonal")
                            .with_season("winter")),
                    ],
                },
                FolderSpec {
                    name: "diabetiesdatasets".to_string(),
                    label: "Diabetes-Pregnancy Specific Diets".to_string(),
                    files: vec![
                        all(FileSpec::new(
                            "diabetes_pregnancy_indian_foods.csv",
                            Meal,
                            "special_condition",
                        )
                        .with_condition("diabetes")),
                        all(FileSpec::new(
                            "gestational_diabetes_indian_diet_dataset.csv",
                            Meal,
                            "special_condition",
                        )
                        .with_condition("gestational_diabetes")),
                        all(FileSpec::new("Indian_Diabetes_Diet (1).csv", Meal, "special_condition")
                            .with_alias("Indian_Diabetes_Diet.csv")
                            .with_condition("diabetes")),
                    ],
                },
                FolderSpec {
                    name: "remainingdatasets".to_string(),
                    label: "Specialized Dietary Guidance".to_string(),
                    files: vec![
                        all(FileSpec::new(
                            "foods_to_avoid_during_pregnancy_dataset.csv",
                            Guidance,
                            "guidance",
                        )
                        .with_polarity(Polarity::Dont)),
                        all(FileSpec::new(
                            "indian_diet_diabetes_pregnancy_dataset.csv",
                            Meal,
                            "special_condition",
                        )
                        .with_condition("diabetes")),
                        all(FileSpec::new("postnatal_diet_india_dataset.csv", Meal, "postpartum")
                            .with_phase("postnatal")),
                        all(FileSpec::new(
                            "postpartum_diet7_structured_dataset.csv",
                            Meal,
                            "postpartum",
                        )
                        .with_phase("postpartum")),
                        // Type column carries EAT / AVOID
                        all(FileSpec::new(
                            "pregnancy_diet_clean_dataset.csv",
                            Guidance,
                            "general_pregnancy",
                        )),
                        all(FileSpec::new("pregnancy_dos_donts_dataset.csv", Guidance, "guidance")),
                    ],
                },
            ],
        }
    }
}

impl Default for DatasetManifest {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_layout() {
        let manifest = DatasetManifest::builtin();
        let names: Vec<_> = manifest.folders.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "data_1",
                "data_2",
                "data_3",
                "diabetiesdatasets",
                "remainingdatasets"
            ]
        );
        assert_eq!(manifest.file_count(), 18);

        let avoid = &manifest.folders[4].files[0];
        assert_eq!(avoid.kind, RecordKind::Guidance);
        assert_eq!(avoid.polarity, Some(Polarity::Dont));
    }

    #[test]
    fn test_candidates_order() {
        let spec = FileSpec::new("a.csv", RecordKind::Meal, "regional").with_alias("a (1).csv");
        let candidates: Vec<_> = spec.candidates().collect();
        assert_eq!(candidates, vec!["a.csv", "a (1).csv"]);
    }

    #[test]
    fn test_resolve_uses_alias() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a (1).csv"), "food\nDal\n").unwrap();

        let spec = FileSpec::new("a.csv", RecordKind::Meal, "regional").with_alias("a (1).csv");
        assert_eq!(spec.resolve(dir.path()), Some(dir.path().join("a (1).csv")));

        let missing = FileSpec::new("b.csv", RecordKind::Meal, "regional");
        assert!(missing.resolve(dir.path()).is_none());
    }

    #[test]
    fn test_from_toml() {
        let manifest = DatasetManifest::from_toml_str(
            r#"
[[folder]]
name = "regional"
label = "Regional"

[[folder.file]]
name = "east_veg.csv"
aliases = ["east_veg (1).csv"]
kind = "meal"
category = "regional"
region = "east"
diet = "veg"

[[folder.file]]
name = "avoid.csv"
kind = "guidance"
category = "guidance"
polarity = "DONT"
"#,
        )
        .unwrap();

        assert_eq!(manifest.folders.len(), 1);
        let files = &manifest.folders[0].files;
        assert_eq!(files[0].region.as_deref(), Some("east"));
        assert_eq!(files[0].aliases, vec!["east_veg (1).csv"]);
        assert_eq!(files[1].polarity, Some(Polarity::Dont));
    }

    #[test]
    fn test_invalid_toml() {
        let err = DatasetManifest::from_toml_str("[[folder]]\nname = 3").unwrap_err();
        assert!(matches!(err, IngestionError::Manifest { .. }));
    }

    #[test]
    fn test_provenance_copies_tags() {
        let spec = FileSpec::new("monsoon.csv", RecordKind::Meal, "seasonal")
            .with_region("all")
            .with_season("monsoon");
        let provenance = spec.provenance("data_3", "monsoon.csv");
        assert_eq!(provenance.folder, "data_3");
        assert_eq!(provenance.season.as_deref(), Some("monsoon"));
        assert_eq!(provenance.category, "seasonal");
        assert!(provenance.condition.is_none());
    }
}
