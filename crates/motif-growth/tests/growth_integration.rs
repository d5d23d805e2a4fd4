//! Growth scenarios against a real on-disk registry.

use motif_core::{Domain, Extraction};
use motif_growth::*;
use motif_registry::{RegistryConfig, RegistryStore};
use tempfile::TempDir;

fn open(dir: &TempDir) -> RegistryStore {
    let mut cfg = RegistryConfig::new(dir.path());
    cfg.reserve.target_size = 30;
    cfg.reserve.min_threshold = 5;
    RegistryStore::open(cfg).unwrap()
}

fn job(json: serde_json::Value) -> ExtractionJob {
    parse_job(&json.to_string()).unwrap()
}

#[test]
fn single_color_on_empty_registry() {
    let dir = TempDir::new().unwrap();
    let mut store = open(&dir);
    let job = job(serde_json::json!({
        "source_prompt": "a green field at noon",
        "extraction": { "color": { "dominant_rgb": [12, 200, 40] } }
    }));

    let report = GrowthEngine::new(GrowthConfig::default()).grow(&mut store, &job.extraction, &job.source_prompt);

    assert_eq!(report.added_domains(), vec![Domain::Color]);
    assert_eq!(store.count(Domain::Color), 1);

    let allocations: Vec<_> = store.blends().iter().filter(|b| b.domain == "color").collect();
    assert_eq!(allocations.len(), 1);
    let depths = &allocations[0].primitive_depths;
    let (top, _) = depths
        .iter()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .unwrap();
    assert_eq!(top, "green");
    assert_eq!(allocations[0].output, "0_200_25");
    assert_eq!(allocations[0].source_prompt, "a green field at noon");
}

#[test]
fn same_extraction_twice_adds_nothing_the_second_time() {
    let dir = TempDir::new().unwrap();
    let mut store = open(&dir);
    let engine = GrowthEngine::new(GrowthConfig::default());
    let ex: Extraction = serde_json::from_value(serde_json::json!({
        "color": { "dominant_rgb": [12, 200, 40] }
    }))
    .unwrap();

    let first = engine.grow(&mut store, &ex, "p");
    let second = engine.grow(&mut store, &ex, "p");

    assert_eq!(first.total_added(), 1);
    assert_eq!(second.total_added(), 0);
    assert_eq!(second.repeated_domains(), vec![Domain::Color]);
    assert_eq!(store.entries(Domain::Color)[0].count, 2);
}

#[test]
fn a_failing_domain_does_not_block_the_others() {
    let dir = TempDir::new().unwrap();
    let mut store = open(&dir);
    // `sound` without a pitch and a blank genre are invalid; the rest is fine.
    let ex: Extraction = serde_json::from_value(serde_json::json!({
        "color":     { "dominant_rgb": [250, 10, 10] },
        "sound":     { "timbre": "warm" },
        "motion":    { "speed": 0.8 },
        "narrative": { "genre": "   ", "mood": "melancholy" }
    }))
    .unwrap();

    let report = GrowthEngine::new(GrowthConfig::default()).grow(&mut store, &ex, "p");

    assert_eq!(report.added_domains(), vec![Domain::Color, Domain::Motion, Domain::Mood]);
    assert_eq!(report.failed_domains(), vec![Domain::Sound, Domain::Genre]);
    assert!(!report.is_clean());
    assert!(report.full_blend.is_some());
    assert_eq!(store.count(Domain::Sound), 0);
    assert_eq!(store.count(Domain::Motion), 1);
}

#[test]
fn sync_batch_carries_exact_new_entries() {
    let dir = TempDir::new().unwrap();
    let mut store = open(&dir);
    let engine = GrowthEngine::new(GrowthConfig { sync_enabled: true, ..GrowthConfig::default() });
    let ex: Extraction = serde_json::from_value(serde_json::json!({
        "color":  { "dominant_rgb": [12, 200, 40] },
        "camera": { "shot": "close_up" }
    }))
    .unwrap();

    let long_prompt = "x".repeat(400);
    let first = engine.grow(&mut store, &ex, &long_prompt);
    let body = first.batch.to_body().unwrap();
    assert_eq!(body["static"][0]["key"], "0_200_25");
    assert_eq!(body["static"][0]["name"], first.new_names()[&Domain::Color].as_str());
    assert_eq!(body["dynamic"][0]["domain"], "camera");
    assert_eq!(body["static"][0]["source_prompt"].as_str().map(str::len), Some(120));

    let second = engine.grow(&mut store, &ex, "p");
    assert_eq!(second.batch.entry_count(), 0);
    // only the joint record travels on a repeat
    assert_eq!(second.batch.blends.len(), 1);
}

#[test]
fn entry_lost_to_a_write_failure_is_synced_on_retry() {
    let dir = TempDir::new().unwrap();
    let mut store = open(&dir);
    let engine = GrowthEngine::new(GrowthConfig { sync_enabled: true, ..GrowthConfig::default() });
    let ex: Extraction = serde_json::from_value(serde_json::json!({
        "color": { "dominant_rgb": [12, 200, 40] }
    }))
    .unwrap();

    let blocker = dir.path().join("color.json.tmp");
    std::fs::create_dir_all(blocker.join("locked")).unwrap();
    let failed = engine.grow(&mut store, &ex, "p");
    assert_eq!(failed.failed_domains(), vec![Domain::Color]);
    assert_eq!(failed.batch.entry_count(), 0);

    std::fs::remove_dir_all(&blocker).unwrap();
    let retried = engine.grow(&mut store, &ex, "p");
    assert_eq!(retried.added_domains(), vec![Domain::Color]);
    assert_eq!(retried.batch.entry_count(), 1);
    assert_eq!(store.entry(Domain::Color, "0_200_25").unwrap().count, 1);
}
