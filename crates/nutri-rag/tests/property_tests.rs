//! Property tests for fuzzy lookup and preference filtering

use std::sync::Arc;

use nutri_core::{PreferenceQuery, Provenance, Record};
use nutri_rag::{similarity, FastIndex, PreferenceFilter};
use proptest::prelude::*;

const REGIONS: &[&str] = &["north", "south", "all"];
const DIETS: &[&str] = &["veg", "nonveg", "vegan"];
const SEASONS: &[&str] = &["summer", "winter", "monsoon"];
const TRIMESTERS: &[&str] = &["1", "2nd", "third", "all"];

fn record_strategy() -> impl Strategy<Value = Record> {
    (
        "[a-z]{3,10}",
        prop::sample::select(REGIONS),
        prop::sample::select(DIETS),
        prop::option::of(prop::sample::select(SEASONS)),
        prop::option::of(prop::sample::select(TRIMESTERS)),
    )
        .prop_map(|(name, region, diet, season, trimester)| {
            let record = Record::meal(name).with_provenance(Provenance {
                region: Some(region.to_string()),
                diet: Some(diet.to_string()),
                season: season.map(str::to_string),
                ..Default::default()
            });
            match trimester {
                Some(t) => record.with_trimester(t),
                None => record,
            }
        })
}

fn names(records: &[Arc<Record>]) -> Vec<String> {
    records.iter().map(|r| r.name.clone()).collect()
}

proptest! {
    #[test]
    fn proptest_fuzzy_scores_respect_threshold(
        keys in prop::collection::vec("[a-z]{2,8}", 1..20),
        query in "[a-z]{2,8}",
        threshold in 0.0f64..=1.0,
    ) {
        let records: Vec<Arc<Record>> =
            keys.iter().map(|k| Arc::new(Record::meal(k.as_str()))).collect();
        let index = FastIndex::build(&records);

        let matches = index.fuzzy_lookup(&query, threshold, 10);
        prop_assert!(matches.len() <= 10);
        for m in &matches {
            prop_assert!(m.score >= threshold || m.score == 1.0);
            prop_assert!((similarity(&query, &m.record.name) - m.score).abs() < 1e-9);
        }
        for pair in matches.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn proptest_similarity_bounds(a in "[a-z ]{0,12}", b in "[a-z ]{0,12}") {
        let score = similarity(&a, &b);
        prop_assert!((0.0..=1.0).contains(&score));
        prop_assert!((score - similarity(&b, &a)).abs() < 1e-9);
        prop_assert_eq!(similarity(&a, &a), 1.0);
    }

    #[test]
    fn proptest_filter_stays_within_region_and_diet(
        records in prop::collection::vec(record_strategy(), 0..30),
        region in prop::sample::select(REGIONS),
        diet in prop::sample::select(DIETS),
        season in prop::sample::select(SEASONS),
        trimester in 1u8..=3,
    ) {
        let records: Vec<Arc<Record>> = records.into_iter().map(Arc::new).collect();
        let filter = PreferenceFilter::new(records);

        let base = filter.filter(&PreferenceQuery::new().region(region).diet(diet));
        let full = filter.filter(
            &PreferenceQuery::new()
                .region(region)
                .diet(diet)
                .season(season)
                .trimester(trimester),
        );

        let base_names = names(&base.records);
        for name in names(&full.records) {
            prop_assert!(base_names.contains(&name));
        }
    }

    #[test]
    fn proptest_filter_is_repeatable(
        records in prop::collection::vec(record_strategy(), 0..30),
        season in prop::sample::select(SEASONS),
    ) {
        let records: Vec<Arc<Record>> = records.into_iter().map(Arc::new).collect();
        let query = PreferenceQuery::new().region("north").season(season);

        let cached = PreferenceFilter::new(records.clone());
        let first = cached.filter(&query);
        let second = cached.filter(&query);
        let uncached = PreferenceFilter::with_capacity(records, 0).filter(&query);

        prop_assert_eq!(names(&first.records), names(&second.records));
        prop_assert_eq!(names(&first.records), names(&uncached.records));
        prop_assert_eq!(first.relaxed, uncached.relaxed);
    }
}
