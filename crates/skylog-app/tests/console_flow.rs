//! Drives the console front end against in-process weather fakes.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use skylog_app::console::{Console, Flow};
use skylog_app::models::LookupState;
use skylog_records::{read_export, RecordStore};
use skylog_weather::{
    Coordinates, ForecastPeriod, ForecastReport, ForecastSource, Geocoder, LocationLabel,
    LocationQuery, LookupError,
};
use tempfile::TempDir;

struct FakeGeocoder;

impl Geocoder for FakeGeocoder {
    async fn resolve(&self, query: &LocationQuery) -> Result<Coordinates, LookupError> {
        match query {
            LocationQuery::Zip(zip) if zip == "00000" => Err(LookupError::NotFound(zip.clone())),
            LocationQuery::Zip(zip) if zip == "99999" => Ok(Coordinates::new(10.0, 10.0)),
            _ => Ok(Coordinates::new(30.2672, -97.7431)),
        }
    }
}

/// Temperature follows the number of lookups served so far, so repeated
/// lookups produce different readings.
struct FakeSource {
    served: std::sync::atomic::AtomicI32,
}

impl ForecastSource for FakeSource {
    async fn fetch_forecast(&self, coordinates: Coordinates) -> Result<ForecastReport, LookupError> {
        if coordinates.latitude < 20.0 {
            tokio::time::sleep(Duration::from_millis(400)).await;
            return Err(LookupError::unavailable("slow service"));
        }

        let n = self
            .served
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let period = |name: &str, temperature: i32, day: u32| ForecastPeriod {
            name: name.to_string(),
            temperature,
            daytime: true,
            wind_speed: "10 mph".to_string(),
            wind_direction: "NW".to_string(),
            precipitation_probability: Some(10),
            forecast: "Sunny".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 3, day),
        };

        Ok(ForecastReport {
            current: period("Now", 72 + 3 * n, 1),
            future: vec![period("Tonight", 55, 1), period("Saturday", 75, 2)],
            location_label: Some(LocationLabel {
                city: "Austin".to_string(),
                state: "TX".to_string(),
            }),
            description: "Today: Sunny, with a high near 72.".to_string(),
            coordinates,
        })
    }
}

struct Harness {
    _dir: TempDir,
    _runtime: tokio::runtime::Runtime,
    store: Arc<RecordStore>,
    console: Console<FakeGeocoder, FakeSource>,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let store = Arc::new(RecordStore::open(dir.path().join("weather_records.db")));
        let console = Console::new(
            runtime.handle().clone(),
            Arc::new(FakeGeocoder),
            Arc::new(FakeSource {
                served: std::sync::atomic::AtomicI32::new(0),
            }),
            store.clone(),
            dir.path(),
        );

        Self {
            _dir: dir,
            _runtime: runtime,
            store,
            console,
        }
    }

    fn run(&mut self, line: &str) -> Vec<String> {
        let mut out = Vec::new();
        assert_eq!(self.console.handle_line(line, &mut out), Flow::Continue);
        out
    }

    /// Look up and wait for the answer
    fn lookup(&mut self, query: &str) -> Vec<String> {
        let first = self.run(&format!("lookup {}", query));
        assert_eq!(first, vec!["Fetching...".to_string()]);
        self.wait_for_result()
    }

    fn wait_for_result(&mut self) -> Vec<String> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut out = Vec::new();
        while Instant::now() < deadline {
            self.console.poll(&mut out);
            if !out.is_empty() {
                return out;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("lookup did not finish");
    }

    fn dir(&self) -> &std::path::Path {
        self._dir.path()
    }
}

#[test]
fn test_lookup_renders_current_and_future() {
    let mut h = Harness::new();
    let out = h.lookup("Austin, TX");

    assert_eq!(out[0], "Austin, TX");
    assert_eq!(out[1], "72°F/22°C");
    assert_eq!(out[2], "Wind: 10 mph NW");
    assert!(out.iter().any(|l| l.contains("Saturday")));
}

#[test]
fn test_failed_lookup_shows_not_found() {
    let mut h = Harness::new();
    let out = h.lookup("00000");

    assert_eq!(out, vec!["Not found".to_string()]);
}

#[test]
fn test_invalid_query_never_starts_a_lookup() {
    let mut h = Harness::new();
    let out = h.run("lookup Austin");

    assert_eq!(out, vec!["Enter a 5-digit ZIP code or City, State.".to_string()]);
    assert!(matches!(h.console.forecast().state(), LookupState::Idle));
}

#[test]
fn test_newer_lookup_wins() {
    let mut h = Harness::new();
    h.run("lookup 99999");
    h.run("lookup 78701");

    let out = h.wait_for_result();
    assert_eq!(out[1], "72°F/22°C");

    // The slow one was cancelled; nothing else ever arrives
    std::thread::sleep(Duration::from_millis(600));
    let mut late = Vec::new();
    h.console.poll(&mut late);
    assert!(late.is_empty());
    assert!(h.console.forecast().report().is_some());
}

#[test]
fn test_save_twice_then_confirm_overwrite() {
    let mut h = Harness::new();
    h.lookup("78701");
    assert_eq!(h.run("save current"), vec!["Saved Austin, TX on 2024-03-01".to_string()]);

    h.lookup("78701");
    let prompt = h.run("save current");
    assert!(prompt[0].starts_with("A record for Austin, TX on 2024-03-01 already exists (72°F"));
    let token = prompt[1]
        .strip_prefix("Overwrite? confirm ")
        .and_then(|rest| rest.strip_suffix(" yes|no"))
        .unwrap()
        .to_string();
    assert_eq!(h.store.list_all()[0].temperature, 72);

    assert_eq!(h.run(&format!("confirm {} yes", token)), vec!["Record overwritten".to_string()]);
    assert_eq!(h.store.count(), 1);
    assert_eq!(h.store.list_all()[0].temperature, 75);

    assert_eq!(
        h.run(&format!("confirm {} yes", token)),
        vec!["No pending save for that token".to_string()]
    );
}

#[test]
fn test_declined_overwrite_keeps_existing() {
    let mut h = Harness::new();
    h.lookup("78701");
    h.run("save current");
    h.lookup("78701");

    let prompt = h.run("save current");
    let token = prompt[1].split_whitespace().nth(2).unwrap().to_string();

    assert_eq!(h.run(&format!("confirm {} no", token)), vec!["Kept existing record".to_string()]);
    assert_eq!(h.store.list_all()[0].temperature, 72);
    assert_eq!(h.console.records().pending_count(), 0);
}

#[test]
fn test_save_before_lookup() {
    let mut h = Harness::new();
    assert_eq!(
        h.run("save current"),
        vec!["Nothing to save; look up a location first".to_string()]
    );
}

#[test]
fn test_save_future_period_with_explicit_date() {
    let mut h = Harness::new();
    h.lookup("78701");

    assert_eq!(
        h.run("save 2 2024-03-09"),
        vec!["Saved Austin, TX on 2024-03-09".to_string()]
    );
    assert_eq!(h.store.list_all()[0].temperature, 75);
}

#[test]
fn test_list_select_delete_export_count() {
    let mut h = Harness::new();
    h.lookup("78701");
    h.run("save current");
    h.run("save 2");
    h.run("save 1 2024-02-28");

    let listing = h.run("list");
    assert_eq!(listing.len(), 3);
    assert!(listing[0].contains("2024-03-02"));

    assert_eq!(h.run("list Dallas"), vec!["No saved records matching 'Dallas'".to_string()]);
    h.run("list austin");

    assert_eq!(h.run("delete"), vec!["No records selected".to_string()]);
    assert_eq!(h.run("select 1 3"), vec!["2 selected".to_string()]);
    let deleted = h.run("delete");
    assert_eq!(deleted[0], "Deleted 2 of 2 records");
    assert_eq!(deleted.len(), 2);

    assert_eq!(h.run("count"), vec!["1 saved records".to_string()]);

    let path = h.dir().join("out.xml");
    let exported = h.run(&format!("export {}", path.display()));
    assert!(exported[0].starts_with("Exported 1 records"));
    let doc = read_export(&path).unwrap();
    assert_eq!(doc.total_records, 1);
    assert_eq!(doc.records, h.store.list_all());
}

#[test]
fn test_quit() {
    let mut h = Harness::new();
    let mut out = Vec::new();
    assert_eq!(h.console.handle_line("quit", &mut out), Flow::Quit);
}

#[test]
fn test_export_with_no_saved_records() {
    let mut h = Harness::new();
    let path = h.dir().join("empty.xml");

    let out = h.run(&format!("export {}", path.display()));
    assert_eq!(out[0], format!("Exported 0 records to {}", path.display()));
    assert_eq!(out[1], "No saved records to export");

    let doc = read_export(&path).unwrap();
    assert_eq!(doc.total_records, 0);
    assert!(doc.records.is_empty());
}
