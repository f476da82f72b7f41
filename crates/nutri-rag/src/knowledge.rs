//! Knowledge base
//!
//! Owns the ingested meal and guidance corpora together with their lookup
//! indexes and the preference filter. Everything here is immutable after
//! construction; a reload builds a new knowledge base.
//!
//! Author: hephaex@gmail.com

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use nutri_core::{Polarity, PreferenceQuery, Record};
use nutri_ingest::{DatasetLoader, IngestionReport, LoadedCorpus};
use serde::Serialize;
use tracing::info;

use crate::filter::{FilterOutcome, PreferenceFilter, DEFAULT_FILTER_CAPACITY, GENERIC_MARKERS};
use crate::index::FastIndex;

/// Record counts broken down by provenance tag
#[derive(Debug, Clone, Default, Serialize)]
pub struct DatasetStatistics {
    pub total_meals: usize,
    pub total_guidance: usize,
    pub categories: BTreeMap<String, usize>,
    pub by_region: BTreeMap<String, usize>,
    pub by_diet: BTreeMap<String, usize>,
    pub by_condition: BTreeMap<String, usize>,
    pub by_season: BTreeMap<String, usize>,
}

/// Distinct specific values available for preference pickers
#[derive(Debug, Clone, Default, Serialize)]
pub struct AvailableOptions {
    pub regions: BTreeSet<String>,
    pub diets: BTreeSet<String>,
    pub conditions: BTreeSet<String>,
    pub seasons: BTreeSet<String>,
    pub categories: BTreeSet<String>,
}

/// Ingested corpora with indexes and filter
pub struct KnowledgeBase {
    meals: Vec<Arc<Record>>,
    guidance: Vec<Arc<Record>>,
    meal_index: FastIndex,
    guidance_index: FastIndex,
    filter: PreferenceFilter,
    report: Option<IngestionReport>,
}

impl KnowledgeBase {
    /// Build from in-memory records
    pub fn from_records(meals: Vec<Record>, guidance: Vec<Record>) -> Self {
        Self::build(meals, guidance, None, DEFAULT_FILTER_CAPACITY)
    }

    /// Build from a completed ingestion pass
    pub fn from_corpus(corpus: LoadedCorpus) -> Self {
        Self::build(
            corpus.meals,
            corpus.guidance,
            Some(corpus.report),
            DEFAULT_FILTER_CAPACITY,
        )
    }

    /// Run the loader and build from its output
    pub fn load(loader: &DatasetLoader) -> Self {
        Self::from_corpus(loader.load())
    }

    /// Rebuild the filter with a different outcome cache capacity
    pub fn with_filter_capacity(mut self, capacity: usize) -> Self {
        self.filter = PreferenceFilter::with_capacity(self.meals.clone(), capacity);
        self
    }

    fn build(
        meals: Vec<Record>,
        guidance: Vec<Record>,
        report: Option<IngestionReport>,
        filter_capacity: usize,
    ) -> Self {
        let meals: Vec<Arc<Record>> = meals.into_iter().map(Arc::new).collect();
        let guidance: Vec<Arc<Record>> = guidance.into_iter().map(Arc::new).collect();

        let meal_index = FastIndex::build(&meals);
        let guidance_index = FastIndex::build(&guidance);
        let filter = PreferenceFilter::with_capacity(meals.clone(), filter_capacity);

        info!(
            "Knowledge base ready: {} meals ({} keys), {} guidance ({} keys)",
            meals.len(),
            meal_index.len(),
            guidance.len(),
            guidance_index.len()
        );

        Self {
            meals,
            guidance,
            meal_index,
            guidance_index,
            filter,
            report,
        }
    }

    pub fn meals(&self) -> &[Arc<Record>] {
        &self.meals
    }

    pub fn guidance(&self) -> &[Arc<Record>] {
        &self.guidance
    }

    pub fn meal_index(&self) -> &FastIndex {
        &self.meal_index
    }

    pub fn guidance_index(&self) -> &FastIndex {
        &self.guidance_index
    }

    /// Report from the ingestion pass, if built from one
    pub fn report(&self) -> Option<&IngestionReport> {
        self.report.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.meals.is_empty() && self.guidance.is_empty()
    }

    /// Filter meals by preference with progressive relaxation
    pub fn preference_filter(&self, query: &PreferenceQuery) -> FilterOutcome {
        self.filter.filter(query)
    }

    /// Guidance entries with the given polarity, in load order
    pub fn guidance_by_polarity(&self, polarity: Polarity) -> Vec<Arc<Record>> {
        self.guidance
            .iter()
            .filter(|r| r.polarity == Some(polarity))
            .cloned()
            .collect()
    }

    /// Counts by category, region, diet, condition and season
    pub fn statistics(&self) -> DatasetStatistics {
        let mut stats = DatasetStatistics {
            total_meals: self.meals.len(),
            total_guidance: self.guidance.len(),
            ..Default::default()
        };

        for record in self.meals.iter().chain(self.guidance.iter()) {
            let p = &record.provenance;
            *stats.categories.entry(p.category.clone()).or_default() += 1;
            bump(&mut stats.by_region, p.region.as_deref());
            bump(&mut stats.by_diet, p.diet.as_deref());
            bump(&mut stats.by_condition, p.condition.as_deref());
            bump(&mut stats.by_season, p.season.as_deref());
        }

        stats
    }

    /// Distinct specific tag values, generic markers excluded
    pub fn available_options(&self) -> AvailableOptions {
        let mut options = AvailableOptions::default();

        for record in self.meals.iter().chain(self.guidance.iter()) {
            let p = &record.provenance;
            collect(&mut options.regions, p.region.as_deref());
            collect(&mut options.diets, p.diet.as_deref());
            collect(&mut options.conditions, p.condition.as_deref());
            collect(&mut options.seasons, p.season.as_deref());
            collect(&mut options.categories, Some(p.category.as_str()));
        }

        options
    }
}

fn bump(counts: &mut BTreeMap<String, usize>, tag: Option<&str>) {
    if let Some(tag) = tag {
        *counts.entry(tag.to_string()).or_default() += 1;
    }
}

fn collect(values: &mut BTreeSet<String>, tag: Option<&str>) {
    if let Some(tag) = tag.map(str::trim) {
        let lower = tag.to_lowercase();
        if !tag.is_empty() && !GENERIC_MARKERS.contains(&lower.as_str()) {
            values.insert(tag.to_string());
        }
    }
}
