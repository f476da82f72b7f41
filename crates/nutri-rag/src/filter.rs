//! Preference filter engine
//!
//! Matches meal records against region, diet, trimester, season, condition
//! and meal type. When the full query matches nothing, constraints are
//! dropped one at a time (season, condition, trimester, meal type) until
//! something matches. Region and diet are never dropped.
//!
//! Author: hephaex@gmail.com

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use nutri_core::{Dimension, PreferenceQuery, Record};
use serde::Serialize;
use tracing::debug;

/// Values that mean "no preference"
pub const GENERIC_MARKERS: &[&str] = &["all", "any", "general", "mixed", "none"];

/// Order in which constraints are dropped
pub const RELAXATION_ORDER: [Dimension; 4] = [
    Dimension::Season,
    Dimension::Condition,
    Dimension::Trimester,
    Dimension::MealType,
];

/// Default capacity of the outcome cache
pub const DEFAULT_FILTER_CAPACITY: usize = 100;

// ============================================================================
// Canonicalization
// ============================================================================

fn prepare(value: &str) -> Option<String> {
    let value = value.trim().to_lowercase();
    if value.is_empty() || GENERIC_MARKERS.contains(&value.as_str()) {
        None
    } else {
        Some(value)
    }
}

/// Canonical region ("north", "south", or the value itself)
pub fn canonical_region(value: &str) -> Option<String> {
    let value = prepare(value)?;
    Some(if value.contains("north") {
        "north".to_string()
    } else if value.contains("south") {
        "south".to_string()
    } else {
        value
    })
}

/// Canonical diet ("vegan", "veg", "nonveg", or the value itself)
pub fn canonical_diet(value: &str) -> Option<String> {
    let value = prepare(value)?;
    Some(if value.contains("vegan") {
        "vegan".to_string()
    } else if value.contains("non") {
        "nonveg".to_string()
    } else if value.contains("veg") {
        "veg".to_string()
    } else {
        value
    })
}

/// Canonical season ("summer", "winter", "monsoon", or the value itself)
pub fn canonical_season(value: &str) -> Option<String> {
    let value = prepare(value)?;
    Some(if value.contains("summer") {
        "summer".to_string()
    } else if value.contains("winter") {
        "winter".to_string()
    } else if value.contains("monsoon") || value.contains("rain") {
        "monsoon".to_string()
    } else {
        value
    })
}

/// Canonical condition ("gestational_diabetes", "diabetes", or the value itself)
pub fn canonical_condition(value: &str) -> Option<String> {
    let value = prepare(value)?;
    Some(if value.contains("gestational") {
        "gestational_diabetes".to_string()
    } else if value.contains("diabetes") {
        "diabetes".to_string()
    } else {
        value
    })
}

/// Canonical meal type ("snack" for snacks, otherwise the value itself)
pub fn canonical_meal_type(value: &str) -> Option<String> {
    let value = prepare(value)?;
    Some(if value.starts_with("snack") {
        "snack".to_string()
    } else {
        value
    })
}

/// A preference query after canonicalization
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct CanonicalQuery {
    pub region: Option<String>,
    pub diet: Option<String>,
    pub trimester: Option<u8>,
    pub season: Option<String>,
    pub condition: Option<String>,
    pub meal_type: Option<String>,
}

impl CanonicalQuery {
    pub fn from_query(query: &PreferenceQuery) -> Self {
        Self {
            region: query.region.as_deref().and_then(canonical_region),
            diet: query.diet.as_deref().and_then(canonical_diet),
            trimester: query.trimester,
            season: query.season.as_deref().and_then(canonical_season),
            condition: query.condition.as_deref().and_then(canonical_condition),
            meal_type: query.meal_type.as_deref().and_then(canonical_meal_type),
        }
    }

    /// Whether a dimension is constrained
    pub fn is_set(&self, dimension: Dimension) -> bool {
        match dimension {
            Dimension::Region => self.region.is_some(),
            Dimension::Diet => self.diet.is_some(),
            Dimension::Trimester => self.trimester.is_some(),
            Dimension::Season => self.season.is_some(),
            Dimension::Condition => self.condition.is_some(),
            Dimension::MealType => self.meal_type.is_some(),
        }
    }

    /// Copy with one dimension unset
    pub fn without(&self, dimension: Dimension) -> Self {
        let mut next = self.clone();
        match dimension {
            Dimension::Region => next.region = None,
            Dimension::Diet => next.diet = None,
            Dimension::Trimester => next.trimester = None,
            Dimension::Season => next.season = None,
            Dimension::Condition => next.condition = None,
            Dimension::MealType => next.meal_type = None,
        }
        next
    }

    /// Whether a record satisfies every set dimension
    pub fn matches(&self, record: &Record) -> bool {
        let provenance = &record.provenance;
        tag_matches(&self.region, provenance.region.as_deref(), canonical_region)
            && tag_matches(&self.diet, provenance.diet.as_deref(), canonical_diet)
            && tag_matches(&self.season, provenance.season.as_deref(), canonical_season)
            && tag_matches(
                &self.condition,
                provenance.condition.as_deref(),
                canonical_condition,
            )
            && tag_matches(
                &self.meal_type,
                record.meal_type.as_deref(),
                canonical_meal_type,
            )
            && trimester_matches(self.trimester, record.trimester.as_deref())
    }
}

/// Unset filter, absent tag, or generic tag all match
fn tag_matches(
    filter: &Option<String>,
    tag: Option<&str>,
    canonical: fn(&str) -> Option<String>,
) -> bool {
    let Some(wanted) = filter else {
        return true;
    };
    match tag.and_then(canonical) {
        Some(value) => &value == wanted,
        None => true,
    }
}

/// Substring match against a free-text trimester column
fn trimester_matches(filter: Option<u8>, column: Option<&str>) -> bool {
    let (Some(trimester), Some(column)) = (filter, column) else {
        return true;
    };
    let column = column.to_lowercase();
    if column.trim().is_empty() || column.contains("all") {
        return true;
    }
    let ordinal = match trimester {
        1 => "first",
        2 => "second",
        3 => "third",
        _ => return false,
    };
    column.contains(&trimester.to_string()) || column.contains(ordinal)
}

// ============================================================================
// Filter engine
// ============================================================================

/// Result of a filter run
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    pub records: Vec<Arc<Record>>,
    /// Constraints dropped to reach a non-empty result
    pub relaxed: Vec<Dimension>,
}

impl FilterOutcome {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Filter over the meal corpus with a bounded outcome cache
pub struct PreferenceFilter {
    records: Vec<Arc<Record>>,
    cache: Mutex<HashMap<CanonicalQuery, FilterOutcome>>,
    capacity: usize,
}

impl PreferenceFilter {
    pub fn new(records: Vec<Arc<Record>>) -> Self {
        Self::with_capacity(records, DEFAULT_FILTER_CAPACITY)
    }

    pub fn with_capacity(records: Vec<Arc<Record>>, capacity: usize) -> Self {
        Self {
            records,
            cache: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    /// Number of cached outcomes
    pub fn cached_entries(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Filter with progressive relaxation
    pub fn filter(&self, query: &PreferenceQuery) -> FilterOutcome {
        let canonical = CanonicalQuery::from_query(query);

        if let Some(hit) = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&canonical)
        {
            return hit.clone();
        }

        let outcome = self.relax(&canonical);

        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if cache.len() < self.capacity {
            cache.insert(canonical, outcome.clone());
        }

        outcome
    }

    /// Records matching a canonical query exactly, without relaxation
    pub fn strict(&self, query: &CanonicalQuery) -> Vec<Arc<Record>> {
        self.records
            .iter()
            .filter(|record| query.matches(record))
            .cloned()
            .collect()
    }

    fn relax(&self, query: &CanonicalQuery) -> FilterOutcome {
        let records = self.strict(query);
        if !records.is_empty() {
            return FilterOutcome {
                records,
                relaxed: Vec::new(),
            };
        }

        let mut current = query.clone();
        let mut relaxed = Vec::new();
        for dimension in RELAXATION_ORDER {
            if !current.is_set(dimension) {
                continue;
            }
            current = current.without(dimension);
            relaxed.push(dimension);

            let records = self.strict(&current);
            if !records.is_empty() {
                debug!(
                    "Filter relaxed {:?} to find {} records",
                    relaxed,
                    records.len()
                );
                return FilterOutcome { records, relaxed };
            }
        }

        FilterOutcome {
            records: Vec::new(),
            relaxed,
        }
    }
}
