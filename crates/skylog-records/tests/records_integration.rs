//! End-to-end tests for the record store and the workflows built on it.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use chrono::NaiveDate;
use skylog_records::{
    delete_many, export, normalize, read_export, NewRecord, RecordKey, RecordSelection,
    RecordStore, Resolution, SaveOutcome, SaveWorkflow,
};
use skylog_weather::ForecastPeriod;
use tempfile::TempDir;

fn open_store() -> (TempDir, Arc<RecordStore>) {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(RecordStore::open(dir.path().join("data").join("weather.db")));
    assert!(store.is_ready());
    (dir, store)
}

fn march(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
}

fn austin(temperature: i32) -> NewRecord {
    NewRecord::new("Austin, TX", march(1), temperature, "10 mph", "NW", "Sunny")
}

#[test]
fn test_repeated_save_keeps_one_record_with_latest_values() {
    let (_dir, store) = open_store();

    assert!(store.save(&austin(72)));
    assert!(store.save(&austin(75)));

    assert_eq!(store.count(), 1);
    assert_eq!(store.list_all()[0].temperature, 75);
}

#[test]
fn test_list_all_is_date_desc_then_location_asc() {
    let (_dir, store) = open_store();
    for (location, day) in [
        ("Chicago, IL", 1),
        ("Austin, TX", 3),
        ("Boston, MA", 1),
        ("Austin, TX", 1),
    ] {
        store.save(&NewRecord::new(location, march(day), 50, "5 mph", "E", ""));
    }

    let all = store.list_all();
    for pair in all.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(a.date > b.date || (a.date == b.date && a.location <= b.location));
    }
    assert_eq!(all[0].key(), RecordKey::new("Austin, TX", march(3)));
}

#[test]
fn test_filter_returns_exactly_matching_locations() {
    let (_dir, store) = open_store();
    for location in ["Springfield, IL", "Springfield, MO", "Austin, TX", "East Springfield, PA"] {
        store.save(&NewRecord::new(location, march(2), 40, "5 mph", "E", ""));
    }

    let filtered = store.list_by_location("Springfield");
    let expected: Vec<_> = store
        .list_all()
        .into_iter()
        .filter(|r| r.location.contains("Springfield"))
        .collect();

    assert_eq!(filtered, expected);
    assert_eq!(filtered.len(), 3);
}

#[test]
fn test_deleted_key_is_absent() {
    let (_dir, store) = open_store();
    store.save(&austin(72));
    store.save(&NewRecord::new("Austin, TX", march(2), 70, "5 mph", "E", ""));

    assert!(store.delete(&RecordKey::new("Austin, TX", march(1))));

    assert!(store
        .list_all()
        .iter()
        .all(|r| r.key() != RecordKey::new("Austin, TX", march(1))));
    assert_eq!(store.count(), 1);
}

#[test]
fn test_confirmed_overwrite_replaces_record() {
    let (_dir, store) = open_store();
    let workflow = SaveWorkflow::new(store.clone());
    assert_eq!(workflow.request_save(austin(72)), SaveOutcome::Saved);

    let SaveOutcome::NeedsConfirmation { token, .. } = workflow.request_save(austin(75)) else {
        panic!("expected a confirmation request");
    };
    // Nothing changes until the user answers
    assert_eq!(store.list_all()[0].temperature, 72);

    assert_eq!(workflow.resolve(token, true), Resolution::Committed(true));
    assert_eq!(store.count(), 1);
    assert_eq!(store.list_all()[0].temperature, 75);
    assert_eq!(workflow.pending_count(), 0);
}

#[test]
fn test_declined_overwrite_leaves_store_unchanged() {
    let (_dir, store) = open_store();
    let workflow = SaveWorkflow::new(store.clone());
    workflow.request_save(austin(72));
    let before = store.list_all();

    let SaveOutcome::NeedsConfirmation { token, .. } = workflow.request_save(austin(75)) else {
        panic!("expected a confirmation request");
    };

    assert_eq!(workflow.resolve(token, false), Resolution::Cancelled);
    assert_eq!(store.list_all(), before);
    assert_eq!(workflow.pending_count(), 0);
}

#[test]
fn test_concurrent_confirmations_are_independent() {
    let (_dir, store) = open_store();
    let workflow = SaveWorkflow::new(store.clone());
    workflow.request_save(austin(72));
    workflow.request_save(NewRecord::new("Boston, MA", march(1), 30, "15 mph", "N", "Snow"));

    let SaveOutcome::NeedsConfirmation { token: first, .. } = workflow.request_save(austin(75))
    else {
        panic!("expected a confirmation request");
    };
    let SaveOutcome::NeedsConfirmation { token: second, .. } = workflow.request_save(
        NewRecord::new("Boston, MA", march(1), 28, "20 mph", "N", "Heavy Snow"),
    ) else {
        panic!("expected a confirmation request");
    };
    assert_ne!(first, second);
    assert_eq!(workflow.pending_count(), 2);

    assert_eq!(workflow.resolve(second, true), Resolution::Committed(true));
    assert_eq!(workflow.resolve(first, false), Resolution::Cancelled);

    let austin_now = store.get(&RecordKey::new("Austin, TX", march(1))).unwrap();
    let boston_now = store.get(&RecordKey::new("Boston, MA", march(1))).unwrap();
    assert_eq!(austin_now.temperature, 72);
    assert_eq!(boston_now.temperature, 28);
}

#[test]
fn test_bulk_delete_counts_only_records_still_present() {
    let (_dir, store) = open_store();
    for day in 1..=3 {
        store.save(&NewRecord::new("Austin, TX", march(day), 70, "5 mph", "E", ""));
    }
    let snapshot = store.list_all();
    assert!(store.delete(&snapshot[2].key()));

    let report = delete_many(&store, &snapshot).unwrap();

    assert_eq!(report.requested, 3);
    assert_eq!(report.deleted, 2);
    assert_eq!(report.missing, vec![snapshot[2].key()]);
    assert_eq!(store.count(), 0);
}

#[test]
fn test_selection_delete_refreshes_from_store() {
    let (_dir, store) = open_store();
    for day in 1..=4 {
        store.save(&NewRecord::new("Austin, TX", march(day), 70, "5 mph", "E", ""));
    }

    let mut selection = RecordSelection::new();
    selection.load(&store, Some("Austin"));
    selection.toggle(0);
    selection.toggle(3);
    let report = selection.delete_selected(&store).unwrap();

    assert_eq!(report.deleted, 2);
    let dates: Vec<_> = selection.records().iter().map(|r| r.date).collect();
    assert_eq!(dates, vec![march(3), march(2)]);
}

#[test]
fn test_export_round_trip() {
    let (dir, store) = open_store();
    store.save(&austin(72));
    store.save(&NewRecord::new(
        "Springfield, IL",
        march(2),
        -3,
        "20 to 25 mph",
        "NNW",
        "Blowing Snow & Wind",
    ));
    store.save(&NewRecord::new("Boston, MA", march(2), 30, "5 mph", "N", ""));
    let records = store.list_all();

    let path = dir.path().join("export.xml");
    assert!(export(&records, &path));

    let doc = read_export(&path).unwrap();
    assert_eq!(doc.total_records, records.len());
    assert_eq!(doc.records, records);
    assert!(!doc.export_date.is_empty());

    let xml = std::fs::read_to_string(&path).unwrap();
    assert_eq!(xml.matches("<?xml").count(), 1);
}

#[test]
fn test_normalized_period_saves_like_manual_record() {
    let (_dir, store) = open_store();
    let period = ForecastPeriod {
        name: "Friday".to_string(),
        temperature: 72,
        daytime: true,
        wind_speed: "10 mph".to_string(),
        wind_direction: "NW".to_string(),
        precipitation_probability: Some(20),
        forecast: "Sunny".to_string(),
        start_date: Some(march(1)),
    };

    let record = NewRecord::from_candidate("Austin, TX", march(1), normalize(&period));
    assert_eq!(record, austin(72));
    assert!(store.save(&record));
}

#[test]
fn test_unusable_store_returns_conservative_values() {
    let dir = tempfile::tempdir().unwrap();
    let occupied = dir.path().join("not-a-db");
    std::fs::create_dir(&occupied).unwrap();

    let store = Arc::new(RecordStore::open(&occupied));
    let workflow = SaveWorkflow::new(store.clone());

    assert!(!store.is_ready());
    assert_eq!(workflow.request_save(austin(72)), SaveOutcome::Failed);
    assert!(store.list_all().is_empty());
    assert!(store.list_by_location("Austin").is_empty());
    assert!(!store.delete(&RecordKey::new("Austin, TX", march(1))));
    assert_eq!(store.count(), 0);
}
