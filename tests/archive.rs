mod common;

use std::sync::Arc;

use chrono::NaiveDate;
use common::CountingArchive;
use crawler::models::Record;
use crawler::pipeline::{ArchiveOutcome, ArchiveStore, Snapshot};
use crawler::storage::{ArchiveKeys, LocalArchive};
use tempfile::TempDir;

fn records(names: &[&str]) -> Vec<Record> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| Record {
            id: i as u64 + 1,
            fields: [("name".to_string(), name.to_string())].into(),
        })
        .collect()
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
}

/// The pipeline's Diffing then Archiving steps.
async fn archive_if_changed(
    store: &ArchiveStore,
    snapshot: &Snapshot,
    date: NaiveDate,
) -> ArchiveOutcome {
    let previous = store.previous_fingerprint().await.unwrap();
    if snapshot.differs_from(previous.as_deref()) {
        store.store(snapshot, date).await.unwrap()
    } else {
        ArchiveOutcome::Unchanged {
            fingerprint: snapshot.fingerprint.clone(),
        }
    }
}

#[tokio::test]
async fn archiving_same_snapshot_twice_writes_once() {
    let tmp = TempDir::new().unwrap();
    let backend = Arc::new(CountingArchive::new(LocalArchive::new(tmp.path())));
    let store = ArchiveStore::new(backend.clone(), ArchiveKeys::new("data/", "doctors"));

    let snapshot = Snapshot::from_records(&records(&["Jane", "John"])).unwrap();

    let first = archive_if_changed(&store, &snapshot, day(14)).await;
    let second = archive_if_changed(&store, &snapshot, day(15)).await;

    assert_eq!(
        first,
        ArchiveOutcome::Written {
            fingerprint: snapshot.fingerprint.clone(),
            latest_key: "data/doctors/data.json".into(),
            history_key: "data/doctors/archive/data-20261014.json".into(),
        }
    );
    assert!(!second.is_written());
    assert_eq!(backend.writes(), 1);
    assert_eq!(backend.copies(), 1);
    assert!(!tmp.path().join("data/doctors/archive/data-20261015.json").exists());
}

#[tokio::test]
async fn changed_snapshot_adds_a_history_copy() {
    let tmp = TempDir::new().unwrap();
    let backend = Arc::new(CountingArchive::new(LocalArchive::new(tmp.path())));
    let store = ArchiveStore::new(backend.clone(), ArchiveKeys::new("data/", "doctors"));

    let before = Snapshot::from_records(&records(&["Jane"])).unwrap();
    let after = Snapshot::from_records(&records(&["Jane", "Amina"])).unwrap();

    archive_if_changed(&store, &before, day(14)).await;
    let outcome = archive_if_changed(&store, &after, day(15)).await;

    assert!(outcome.is_written());
    assert_eq!(backend.writes(), 2);

    let latest = std::fs::read(tmp.path().join("data/doctors/data.json")).unwrap();
    assert_eq!(latest, after.payload);
    let older = std::fs::read(tmp.path().join("data/doctors/archive/data-20261014.json")).unwrap();
    assert_eq!(older, before.payload);
    let newer = std::fs::read(tmp.path().join("data/doctors/archive/data-20261015.json")).unwrap();
    assert_eq!(newer, after.payload);
}
