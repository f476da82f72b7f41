//! Integration tests for dataset ingestion over the built-in layout

use std::path::Path;

use nutri_core::{Attribute, Polarity, RecordKind};
use nutri_ingest::DatasetLoader;

fn write(root: &Path, folder: &str, file: &str, bytes: &[u8]) {
    let dir = root.join(folder);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(file), bytes).unwrap();
}

fn fixture() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    write(
        root,
        "data_1",
        "northveg_cleaned.csv",
        b"Dish Name,Meal Type,Benefit\nRajma Chawal,Lunch,Protein\nAloo Paratha,Breakfast,Energy\n",
    );
    // Only the alternative name exists
    write(
        root,
        "data_1",
        "northnonveg_cleaned (1).csv",
        b"Dish Name,Meal Type\nChicken Curry,Dinner\n",
    );
    // Windows-1252 apostrophe
    write(
        root,
        "data_3",
        "monsoon_diet_pregnant_women.csv",
        b"Food,Notes\nMoong Soup,Chef\x92s pick\n",
    );
    write(
        root,
        "remainingdatasets",
        "pregnancy_dos_donts_dataset.csv",
        b"Type,Item,Description\nDO,Papaya (ripe),Vitamin C\nDON'T,Papaya (unripe),Latex\n",
    );
    write(
        root,
        "remainingdatasets",
        "foods_to_avoid_during_pregnancy_dataset.csv",
        b"Food,Risk\nRaw Sprouts,Bacteria\n",
    );
    write(
        root,
        "remainingdatasets",
        "pregnancy_diet_clean_dataset.csv",
        b"Food Item,Type,Food Group,Health Benefit,Trimester\nSpinach,EAT,Vegetable,Folate,All\nAlcohol,AVOID,Beverage,None,All\n",
    );
    dir
}

#[test]
fn test_builtin_layout_ingestion() {
    let dir = fixture();
    let corpus = DatasetLoader::new(dir.path()).load();

    assert_eq!(corpus.report.total_meals, 4);
    assert_eq!(corpus.report.total_guidance, 5);

    let regional = corpus.report.folder("data_1").unwrap();
    assert_eq!(regional.loaded_files, 2);
    assert_eq!(regional.failed_files, 2);

    assert!(corpus.report.folder("data_2").unwrap().missing);

    let chicken = corpus
        .meals
        .iter()
        .find(|r| r.name == "chicken curry")
        .unwrap();
    assert_eq!(chicken.provenance.diet.as_deref(), Some("nonveg"));
    assert_eq!(chicken.provenance.source_file, "northnonveg_cleaned (1).csv");

    let soup = corpus.meals.iter().find(|r| r.name == "moong soup").unwrap();
    assert_eq!(soup.attribute(Attribute::Notes), Some("Chef\u{2019}s pick"));
    assert_eq!(soup.provenance.season.as_deref(), Some("monsoon"));
}

#[test]
fn test_guidance_polarity_sources() {
    let dir = fixture();
    let corpus = DatasetLoader::new(dir.path()).load();

    let polarity_of = |name: &str| {
        corpus
            .guidance
            .iter()
            .find(|r| r.name == name)
            .and_then(|r| r.polarity)
    };

    assert_eq!(polarity_of("papaya (ripe)"), Some(Polarity::Do));
    assert_eq!(polarity_of("papaya (unripe)"), Some(Polarity::Dont));
    assert_eq!(polarity_of("raw sprouts"), Some(Polarity::Dont));
    assert_eq!(polarity_of("spinach"), Some(Polarity::Do));
    assert_eq!(polarity_of("alcohol"), Some(Polarity::Dont));
    assert!(corpus.guidance.iter().all(|r| r.kind == RecordKind::Guidance));
}

#[test]
fn test_ingestion_is_idempotent() {
    let dir = fixture();
    let loader = DatasetLoader::new(dir.path());

    let first = loader.load();
    let second = loader.load();

    assert_eq!(first.meals, second.meals);
    assert_eq!(first.guidance, second.guidance);
    assert_eq!(
        first.report.loaded_rows(),
        second.report.loaded_rows()
    );
}

#[test]
fn test_report_serializes() {
    let dir = fixture();
    let corpus = DatasetLoader::new(dir.path()).load();

    let json = serde_json::to_value(&corpus.report).unwrap();
    assert_eq!(json["total_meals"], 4);
    assert_eq!(json["folders"][0]["name"], "data_1");
}
