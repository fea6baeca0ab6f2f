//! Ratings Export Integration Tests
//!
//! End-to-end runs of the export against an in-memory keyspace, a seeded
//! catalog and recording or directory sinks.

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use common::{FlakyStore, RecordingSink};
use curriculink::core::{ExportError, ExportSettings, Orchestrator};
use curriculink::domain::{ResourceId, StandardId};
use curriculink::keyspace::{KeyspaceCursor, MemoryKeyspace};
use curriculink::report::{DirectorySink, ReportSink};
use curriculink::store::{SqliteTaxonomyStore, TaxonomyStore};
use tempfile::TempDir;

fn catalog() -> SqliteTaxonomyStore {
    let store = SqliteTaxonomyStore::open_in_memory().unwrap();
    store.insert_resource(ResourceId(42), "http://x/42", "Counting Song").unwrap();
    store.insert_standard(StandardId(7), "Counting", Some(1)).unwrap();
    store.insert_standard(StandardId(8), "Shapes", Some(2)).unwrap();
    for id in 100..130 {
        store
            .insert_resource(ResourceId(id), &format!("http://x/{}", id), "")
            .unwrap();
    }
    store
}

fn orchestrator(
    store: impl TaxonomyStore + 'static,
    keyspace: Arc<MemoryKeyspace>,
    sink: Arc<dyn ReportSink>,
    page_size: usize,
) -> Orchestrator {
    Orchestrator::new(
        Arc::new(store),
        keyspace,
        sink,
        ExportSettings {
            page_size,
            ..Default::default()
        },
    )
}

#[tokio::test]
async fn test_single_resource_export_shape() {
    let keyspace = Arc::new(MemoryKeyspace::new());
    keyspace.insert_hash("resource:42", [("7", "3")]);
    let sink = Arc::new(RecordingSink::new());

    let summary = orchestrator(catalog(), keyspace, sink.clone(), 10)
        .export_ratings("K")
        .await
        .unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.unresolved, 0);
    assert_eq!(summary.artifact, "K-ratings.csv");

    let puts = sink.puts();
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].0, "K-ratings.csv");
    assert_eq!(puts[0].1, "Resource,Rating\nhttp://x/42,Counting,3\n");
}

#[tokio::test]
async fn test_failed_standard_label_leaves_empty_field() {
    let keyspace = Arc::new(MemoryKeyspace::new());
    keyspace.insert_hash("resource:42", [("7", "3")]);
    let sink = Arc::new(RecordingSink::new());
    let store = FlakyStore::new(catalog()).failing_standard_label(7);

    let summary = orchestrator(store, keyspace, sink.clone(), 10)
        .export_ratings("K")
        .await
        .unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.unresolved, 1);
    assert_eq!(sink.puts()[0].1, "Resource,Rating\nhttp://x/42,,3\n");
}

#[tokio::test]
async fn test_failed_resource_label_leaves_empty_field() {
    let keyspace = Arc::new(MemoryKeyspace::new());
    keyspace.insert_hash("resource:42", [("7", "3"), ("8", "1")]);
    let sink = Arc::new(RecordingSink::new());
    let store = FlakyStore::new(catalog()).failing_resource_label(42);

    let summary = orchestrator(store, keyspace, sink.clone(), 10)
        .export_ratings("K")
        .await
        .unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(sink.puts()[0].1, "Resource,Rating\n,Counting,3,Shapes,1\n");
}

#[tokio::test]
async fn test_row_with_nothing_resolved_is_still_a_record() {
    let keyspace = Arc::new(MemoryKeyspace::new());
    keyspace.insert_hash("resource:5", [("7", "3")]);
    keyspace.fail_hash("resource:5");
    let sink = Arc::new(RecordingSink::new());
    let store = FlakyStore::new(catalog()).failing_resource_label(5);

    let summary = orchestrator(store, keyspace, sink.clone(), 10)
        .export_ratings("K")
        .await
        .unwrap();

    assert_eq!(summary.processed, 1);
    let report = sink.puts()[0].1.clone();
    assert_eq!(report, "Resource,Rating\n\"\"\n");

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(report.as_bytes());
    assert_eq!(reader.records().count(), summary.processed);
}

#[tokio::test]
async fn test_processed_count_matches_delivered_keys() {
    let keyspace = Arc::new(MemoryKeyspace::new());
    for id in 100..125 {
        keyspace.insert_hash(&format!("resource:{}", id), [("7", "2")]);
    }
    // Noise outside the pattern and a resource whose labels all fail
    keyspace.insert_hash("session:abc", [("x", "y")]);
    keyspace.set_overlap(true);
    let sink = Arc::new(RecordingSink::new());
    let store = FlakyStore::new(catalog())
        .failing_resource_label(103)
        .failing_standard_label(7);

    let summary = orchestrator(store, keyspace.clone(), sink.clone(), 4)
        .export_ratings("all")
        .await
        .unwrap();

    // Count what an independent scan delivers, duplicates included
    let delivered = KeyspaceCursor::new(keyspace.as_ref(), "resource:*", 4)
        .collect()
        .await
        .unwrap();
    assert!(delivered.len() > 25, "overlap should produce duplicates");
    assert_eq!(summary.processed, delivered.len());

    let report = &sink.puts()[0].1;
    assert_eq!(report.lines().count(), 1 + summary.processed);
}

#[tokio::test]
async fn test_every_key_is_covered() {
    let keyspace = Arc::new(MemoryKeyspace::new());
    for id in 100..123 {
        keyspace.insert_hash(&format!("resource:{}", id), [("8", "5")]);
    }
    let sink = Arc::new(RecordingSink::new());

    let summary = orchestrator(catalog(), keyspace.clone(), sink.clone(), 5)
        .export_ratings("all")
        .await
        .unwrap();

    // ceil(23 / 5) = 5 round trips at minimum
    assert!(summary.scan_calls >= 5);
    assert_eq!(summary.processed, 23);

    let report = &sink.puts()[0].1;
    let urls: HashSet<&str> = report
        .lines()
        .skip(1)
        .map(|line| line.split(',').next().unwrap())
        .collect();
    let expected: HashSet<String> = (100..123).map(|id| format!("http://x/{}", id)).collect();
    assert_eq!(urls, expected.iter().map(String::as_str).collect::<HashSet<&str>>());
}

#[tokio::test]
async fn test_same_standard_labels_identically() {
    let keyspace = Arc::new(MemoryKeyspace::new());
    keyspace.insert_hash("resource:100", [("7", "1"), ("8", "2")]);
    keyspace.insert_hash("resource:101", [("7", "4")]);
    let sink = Arc::new(RecordingSink::new());

    orchestrator(catalog(), keyspace, sink.clone(), 1)
        .export_ratings("K")
        .await
        .unwrap();

    assert_eq!(
        sink.puts()[0].1,
        "Resource,Rating\nhttp://x/100,Counting,1,Shapes,2\nhttp://x/101,Counting,4\n"
    );
}

#[tokio::test]
async fn test_empty_keyspace_writes_header_only() {
    let keyspace = Arc::new(MemoryKeyspace::new());
    let sink = Arc::new(RecordingSink::new());

    let summary = orchestrator(catalog(), keyspace, sink.clone(), 10)
        .export_ratings("3")
        .await
        .unwrap();

    assert_eq!(summary.processed, 0);
    assert_eq!(sink.puts(), vec![("3-ratings.csv".to_string(), "Resource,Rating\n".to_string())]);
}

#[tokio::test]
async fn test_scan_failure_writes_nothing() {
    let keyspace = Arc::new(MemoryKeyspace::new());
    for id in 100..110 {
        keyspace.insert_hash(&format!("resource:{}", id), [("7", "2")]);
    }
    keyspace.fail_scan_call(3);
    let sink = Arc::new(RecordingSink::new());

    let err = orchestrator(catalog(), keyspace, sink.clone(), 2)
        .export_ratings("K")
        .await
        .unwrap_err();

    assert!(matches!(err, ExportError::Scan { .. }));
    // Two full pages made it through before the failure
    assert_eq!(err.processed(), 4);
    assert!(sink.puts().is_empty());
}

#[tokio::test]
async fn test_scan_failure_keeps_previous_artifact() {
    let temp = TempDir::new().unwrap();
    let sink = Arc::new(DirectorySink::new(temp.path()));

    let keyspace = Arc::new(MemoryKeyspace::new());
    keyspace.insert_hash("resource:42", [("7", "3")]);
    orchestrator(catalog(), keyspace.clone(), sink.clone(), 10)
        .export_ratings("K")
        .await
        .unwrap();

    keyspace.insert_hash("resource:100", [("8", "1")]);
    keyspace.fail_scan_call(2);
    assert!(orchestrator(catalog(), keyspace, sink.clone(), 10)
        .export_ratings("K")
        .await
        .is_err());

    let on_disk = std::fs::read_to_string(sink.artifact_path("K-ratings.csv")).unwrap();
    assert_eq!(on_disk, "Resource,Rating\nhttp://x/42,Counting,3\n");
}

#[tokio::test]
async fn test_sink_failure_is_reported_with_count() {
    let keyspace = Arc::new(MemoryKeyspace::new());
    keyspace.insert_hash("resource:42", [("7", "3")]);
    let sink = Arc::new(RecordingSink::failing());

    let err = orchestrator(catalog(), keyspace, sink, 10)
        .export_ratings("K")
        .await
        .unwrap_err();

    match err {
        ExportError::Sink {
            processed,
            ref artifact,
            ..
        } => {
            assert_eq!(processed, 1);
            assert_eq!(artifact, "K-ratings.csv");
        }
        other => panic!("expected sink failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_rerun_overwrites_artifact() {
    let temp = TempDir::new().unwrap();
    let sink = Arc::new(DirectorySink::new(temp.path()));
    let keyspace = Arc::new(MemoryKeyspace::new());
    keyspace.insert_hash("resource:42", [("7", "3")]);

    orchestrator(catalog(), keyspace.clone(), sink.clone(), 10)
        .export_ratings("K")
        .await
        .unwrap();
    keyspace.insert_hash("resource:42", [("7", "5")]);
    orchestrator(catalog(), keyspace, sink.clone(), 10)
        .export_ratings("K")
        .await
        .unwrap();

    let on_disk = std::fs::read_to_string(sink.artifact_path("K-ratings.csv")).unwrap();
    assert_eq!(on_disk, "Resource,Rating\nhttp://x/42,Counting,5\n");
}
