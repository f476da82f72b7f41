//! Nutri Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout the assistant:
//! - Meal and guidance records with provenance tags
//! - Request/response shapes for question answering
//! - Common error types
//! - The LLM client trait used by the fallback adapter
//! - Configuration management

pub mod config;

pub use config::{
    AnswerConfig, AppConfig, CacheConfig, ConfigError, DatasetConfig, LlmConfig, LlmProvider,
    LoggingConfig, RateLimitConfig,
};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for assistant operations
#[derive(Error, Debug)]
pub enum NutriError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("LLM error: {0}")]
    LlmError(String),
}

pub type Result<T> = std::result::Result<T, NutriError>;

/// Normalize a lookup key: trimmed and lowercased.
pub fn normalize_key(value: &str) -> String {
    value.trim().to_lowercase()
}

// ============================================================================
// Records
// ============================================================================

/// Which corpus a record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Meal,
    Guidance,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Meal => write!(f, "meal"),
            Self::Guidance => write!(f, "guidance"),
        }
    }
}

/// Canonical polarity of a guidance entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Polarity {
    Do,
    Dont,
}

impl std::fmt::Display for Polarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Do => write!(f, "DO"),
            Self::Dont => write!(f, "DONT"),
        }
    }
}

impl std::str::FromStr for Polarity {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "do" => Ok(Self::Do),
            "dont" | "don't" => Ok(Self::Dont),
            _ => Err(ConfigError::InvalidValue {
                key: "polarity".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Well-known source columns, resolved through the ingestion alias table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Benefit,
    Risk,
    Nutrients,
    Notes,
    Description,
    Recommendation,
    Category,
    FoodGroup,
    Examples,
}

impl Attribute {
    pub const ALL: [Attribute; 9] = [
        Attribute::Benefit,
        Attribute::Risk,
        Attribute::Nutrients,
        Attribute::Notes,
        Attribute::Description,
        Attribute::Recommendation,
        Attribute::Category,
        Attribute::FoodGroup,
        Attribute::Examples,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Benefit => "benefit",
            Self::Risk => "risk",
            Self::Nutrients => "nutrients",
            Self::Notes => "notes",
            Self::Description => "description",
            Self::Recommendation => "recommendation",
            Self::Category => "category",
            Self::FoodGroup => "food_group",
            Self::Examples => "examples",
        }
    }
}

/// Ingestion-time metadata recording where a record came from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// File name the row was read from
    pub source_file: String,

    /// Dataset folder containing the file
    pub folder: String,

    /// Cuisine region tag (e.g. "north", "south", "all")
    pub region: Option<String>,

    /// Dietary category tag (e.g. "veg", "nonveg", "all")
    pub diet: Option<String>,

    /// Season tag (e.g. "monsoon")
    pub season: Option<String>,

    /// Health condition tag (e.g. "gestational_diabetes")
    pub condition: Option<String>,

    /// Dataset category (e.g. "regional", "guidance")
    pub category: String,

    /// Life phase tag (e.g. "postpartum")
    pub phase: Option<String>,
}

/// A meal or guidance item
///
/// Created only during ingestion and shared immutably afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Normalized lookup key (lowercase, trimmed)
    pub name: String,

    /// Name as it appeared in the source
    pub display_name: String,

    /// Corpus this record belongs to
    pub kind: RecordKind,

    /// Provenance tags
    pub provenance: Provenance,

    /// Do/don't polarity (guidance only)
    pub polarity: Option<Polarity>,

    /// Raw trimester column value, if the source exposes one
    pub trimester: Option<String>,

    /// Raw meal type column value, if the source exposes one
    pub meal_type: Option<String>,

    /// Well-known attributes
    pub attributes: BTreeMap<Attribute, String>,

    /// Every other non-empty column, verbatim
    pub extra: BTreeMap<String, String>,
}

impl Record {
    /// Create a new record
    pub fn new(kind: RecordKind, name: impl Into<String>) -> Self {
        let display_name = name.into().trim().to_string();
        Self {
            name: normalize_key(&display_name),
            display_name,
            kind,
            provenance: Provenance::default(),
            polarity: None,
            trimester: None,
            meal_type: None,
            attributes: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }

    /// Create a meal record
    pub fn meal(name: impl Into<String>) -> Self {
        Self::new(RecordKind::Meal, name)
    }

    /// Create a guidance record
    pub fn guidance(name: impl Into<String>, polarity: Polarity) -> Self {
        let mut record = Self::new(RecordKind::Guidance, name);
        record.polarity = Some(polarity);
        record
    }

    /// Set provenance
    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    /// Set an attribute value
    pub fn with_attribute(mut self, attribute: Attribute, value: impl Into<String>) -> Self {
        self.attributes.insert(attribute, value.into());
        self
    }

    /// Set the trimester column value
    pub fn with_trimester(mut self, trimester: impl Into<String>) -> Self {
        self.trimester = Some(trimester.into());
        self
    }

    /// Set the meal type column value
    pub fn with_meal_type(mut self, meal_type: impl Into<String>) -> Self {
        self.meal_type = Some(meal_type.into());
        self
    }

    /// Add an unrecognized column
    pub fn with_extra(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(column.into(), value.into());
        self
    }

    /// Get an attribute value
    pub fn attribute(&self, attribute: Attribute) -> Option<&str> {
        self.attributes.get(&attribute).map(String::as_str)
    }

    /// First present attribute among the candidates
    pub fn first_attribute(&self, candidates: &[Attribute]) -> Option<&str> {
        candidates.iter().find_map(|a| self.attribute(*a))
    }

    /// All attributes and extra columns as display details
    pub fn details(&self) -> BTreeMap<String, String> {
        let mut details: BTreeMap<String, String> = self
            .attributes
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), v.clone()))
            .collect();
        if let Some(t) = &self.trimester {
            details.insert("trimester".to_string(), t.clone());
        }
        if let Some(m) = &self.meal_type {
            details.insert("meal_type".to_string(), m.clone());
        }
        for (k, v) in &self.extra {
            details.entry(k.clone()).or_insert_with(|| v.clone());
        }
        details
    }
}

// ============================================================================
// Query Types
// ============================================================================

/// Closed set of question intents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    SafetyCheck,
    FoodsToAvoid,
    Benefits,
    MealPlan,
    TrimesterSpecific,
    Seasonal,
    Regional,
    General,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SafetyCheck => "safety_check",
            Self::FoodsToAvoid => "foods_to_avoid",
            Self::Benefits => "benefits",
            Self::MealPlan => "meal_plan",
            Self::TrimesterSpecific => "trimester_specific",
            Self::Seasonal => "seasonal",
            Self::Regional => "regional",
            Self::General => "general",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a composed answer came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    /// Served from the response cache
    DatabaseCache,
    /// Composed from local records
    Dataset,
    /// Generated by the external model
    AiModel,
    /// Static canned answer
    Generic,
}

impl std::fmt::Display for AnswerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DatabaseCache => write!(f, "database_cache"),
            Self::Dataset => write!(f, "dataset"),
            Self::AiModel => write!(f, "ai_model"),
            Self::Generic => write!(f, "generic"),
        }
    }
}

/// Preference dimensions understood by the filter engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Region,
    Diet,
    Trimester,
    Season,
    Condition,
    MealType,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Region => "region",
            Self::Diet => "diet",
            Self::Trimester => "trimester",
            Self::Season => "season",
            Self::Condition => "condition",
            Self::MealType => "meal_type",
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw, uncanonicalized preference query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceQuery {
    pub region: Option<String>,
    pub diet: Option<String>,
    pub trimester: Option<u8>,
    pub season: Option<String>,
    pub condition: Option<String>,
    pub meal_type: Option<String>,
}

impl PreferenceQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn diet(mut self, diet: impl Into<String>) -> Self {
        self.diet = Some(diet.into());
        self
    }

    pub fn trimester(mut self, trimester: u8) -> Self {
        self.trimester = Some(trimester);
        self
    }

    pub fn season(mut self, season: impl Into<String>) -> Self {
        self.season = Some(season.into());
        self
    }

    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn meal_type(mut self, meal_type: impl Into<String>) -> Self {
        self.meal_type = Some(meal_type.into());
        self
    }
}

/// Minimum accepted question length in characters
pub const MIN_QUESTION_CHARS: usize = 3;

/// Maximum accepted question length in characters
pub const MAX_QUESTION_CHARS: usize = 500;

/// Question answering request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnswerRequest {
    /// User's question
    pub question: String,

    /// Current trimester (1, 2 or 3)
    pub trimester: Option<u8>,

    /// Regional preference
    pub region: Option<String>,

    /// Current season
    pub season: Option<String>,

    /// Dietary preference
    pub diet_type: Option<String>,

    /// Health conditions
    #[serde(default)]
    pub conditions: Vec<String>,
}

impl AnswerRequest {
    /// Create a new request
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }

    pub fn with_trimester(mut self, trimester: u8) -> Self {
        self.trimester = Some(trimester);
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_season(mut self, season: impl Into<String>) -> Self {
        self.season = Some(season.into());
        self
    }

    pub fn with_diet(mut self, diet: impl Into<String>) -> Self {
        self.diet_type = Some(diet.into());
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    /// Reject malformed requests before any lookup happens
    pub fn validate(&self) -> Result<()> {
        self.validate_bounds(MIN_QUESTION_CHARS, MAX_QUESTION_CHARS)
    }

    /// Validate with explicit question length bounds (in characters)
    pub fn validate_bounds(&self, min_chars: usize, max_chars: usize) -> Result<()> {
        let chars = self.question.trim().chars().count();
        if chars < min_chars {
            return Err(NutriError::Validation(format!(
                "question must be at least {min_chars} characters"
            )));
        }
        if chars > max_chars {
            return Err(NutriError::Validation(format!(
                "question must be at most {max_chars} characters"
            )));
        }
        if let Some(t) = self.trimester {
            if !(1..=3).contains(&t) {
                return Err(NutriError::Validation(format!(
                    "trimester must be 1, 2 or 3 (got {t})"
                )));
            }
        }
        Ok(())
    }

    /// Preference query derived from the request context
    pub fn preferences(&self) -> PreferenceQuery {
        PreferenceQuery {
            region: self.region.clone(),
            diet: self.diet_type.clone(),
            trimester: self.trimester,
            season: self.season.clone(),
            condition: self.conditions.first().cloned(),
            meal_type: None,
        }
    }
}

/// One entry of a do's or don'ts list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdviceItem {
    pub item: String,
    pub reason: String,
    pub details: BTreeMap<String, String>,
}

impl AdviceItem {
    pub fn new(item: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            reason: reason.into(),
            details: BTreeMap::new(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// Structured answer returned to callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredAnswer {
    /// Paraphrase showing how the question was understood
    pub query_reflection: String,

    /// Free-text answer
    pub answer: String,

    /// Recommended items
    pub dos: Vec<AdviceItem>,

    /// Items to avoid
    pub donts: Vec<AdviceItem>,

    /// Keywords extracted from the question
    pub keywords: Vec<String>,

    /// Classified intent
    pub intent: Intent,

    /// Answer tier
    pub source: AnswerSource,

    /// Wall-clock handling time in seconds
    pub response_time: f64,

    /// Whether this answer came from the response cache
    pub from_cache: bool,

    /// Preference constraints dropped to find meal records
    #[serde(default)]
    pub relaxed_filters: Vec<Dimension>,
}

// ============================================================================
// Traits
// ============================================================================

/// Trait for LLM clients
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a response
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

// ============================================================================
// Tests
// ============================================================================
