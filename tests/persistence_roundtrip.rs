//! Persistence tests: snapshot export/reimport and corrupted-state
//! recovery across engine instances.

use std::sync::Arc;
use theia_core::{
    engine::{KEY_CORPUS, KEY_INTERACTIONS, KEY_TAXONOMY},
    learner::seeded_source,
    CategorySeed, EngineBuilder, EngineConfig, JsonFileStore, KeyValueStore, ManualClock,
    MemoryStore,
};

use chrono::{TimeZone, Utc};

fn seeds() -> Vec<CategorySeed> {
    vec![
        CategorySeed::new("lighting", "Lighting", &["light", "shadow", "glow"]),
        CategorySeed::new("composition", "Composition", &["depth", "field", "frame"]),
    ]
}

fn pinned_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
    ))
}

fn builder(store: Arc<dyn KeyValueStore>, clock: Arc<ManualClock>) -> EngineBuilder {
    EngineBuilder::new()
        .with_taxonomy(seeds())
        .with_store(store)
        .with_clock(clock)
        .with_random_source(seeded_source(42))
        .with_config(EngineConfig {
            exploration_rate: 0.0,
            ..Default::default()
        })
}

#[test]
fn test_export_reimport_reproduces_statistics() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let clock = pinned_clock();

    let first = builder(Arc::clone(&store), Arc::clone(&clock)).build();
    let highlights = first.process("golden hour lighting creates soft shadow play");
    first.process("shallow depth of field with a wide frame");
    for h in &highlights {
        first.record_clicked(&h.text, &h.category_id);
    }
    first.apply_correction("golden hour", "uncategorized", "lighting");
    first.flush().unwrap();

    // A fresh engine over the same store and the same pinned clock sees
    // identical diagnostics
    let second = builder(Arc::clone(&store), Arc::clone(&clock)).build();
    assert_eq!(second.get_statistics(), first.get_statistics());
}

#[test]
fn test_file_store_survives_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    let clock = pinned_clock();

    let stats_before = {
        let store: Arc<dyn KeyValueStore> =
            Arc::new(JsonFileStore::new(dir.path()).unwrap());
        let engine = builder(store, Arc::clone(&clock)).build();
        engine.process("golden hour lighting creates soft shadow play");
        engine.flush().unwrap();
        engine.get_statistics()
    };

    let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(dir.path()).unwrap());
    let engine = builder(store, clock).build();
    assert_eq!(engine.get_statistics(), stats_before);
}

#[test]
fn test_corrupted_snapshots_fall_back_to_fresh_state() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    store.set(KEY_CORPUS, "{definitely not json").unwrap();
    store.set(KEY_TAXONOMY, "[1, 2, 3]").unwrap();
    store.set(KEY_INTERACTIONS, "").unwrap();

    let engine = builder(store, pinned_clock()).build();

    // Load degraded to defaults instead of erroring
    let stats = engine.get_statistics();
    assert_eq!(stats.extractor.total_documents, 0);
    assert_eq!(stats.categorizer.category_count, 2);
    assert_eq!(stats.learner.record_count, 0);

    // And the engine still works
    let highlights = engine.process("golden hour lighting creates soft shadow play");
    assert!(!highlights.is_empty());
}

#[test]
fn test_version_mismatch_discarded_on_load() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let clock = pinned_clock();

    let engine = builder(Arc::clone(&store), Arc::clone(&clock)).build();
    engine.process("golden hour lighting creates soft shadow play");
    engine.flush().unwrap();

    // Tamper with the version field of the corpus snapshot
    let raw = store.get(KEY_CORPUS).unwrap().unwrap();
    store
        .set(KEY_CORPUS, &raw.replace("\"version\":1", "\"version\":999"))
        .unwrap();

    let reopened = builder(store, clock).build();
    assert_eq!(reopened.get_statistics().extractor.total_documents, 0);
}

#[test]
fn test_reset_removes_persisted_snapshots() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let clock = pinned_clock();

    let engine = builder(Arc::clone(&store), clock).build();
    engine.process("golden hour lighting creates soft shadow play");
    engine.flush().unwrap();
    assert!(store.get(KEY_CORPUS).unwrap().is_some());

    engine.reset();
    assert!(store.get(KEY_CORPUS).unwrap().is_none());
    assert!(store.get(KEY_TAXONOMY).unwrap().is_none());
    assert!(store.get(KEY_INTERACTIONS).unwrap().is_none());
}

#[test]
fn test_decay_pinned_by_injected_clock() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let clock = pinned_clock();

    let engine = builder(Arc::clone(&store), Arc::clone(&clock))
        .with_config(EngineConfig {
            exploration_rate: 0.0,
            min_confidence: 60.0,
            ..Default::default()
        })
        .build();

    let text = "soft shadow play";
    let first = engine.process(text);
    let target = first
        .iter()
        .find(|h| h.text == text)
        .expect("full-span highlight")
        .clone();

    // Build up strong positive quality, then let a long time pass
    for _ in 0..20 {
        engine.record_clicked(&target.text, &target.category_id);
    }
    let before_decay = engine.get_statistics().learner.mean_quality;

    clock.advance(chrono::Duration::days(300));
    engine.process(text);

    // Ten half-lives later the learned preference has faded toward 0.5
    let after_decay = engine.get_statistics().learner.mean_quality;
    assert!(after_decay < before_decay);
    assert!((after_decay - 0.5).abs() < 0.1);
}
