use std::collections::HashMap;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use chrono::NaiveDate;

use fred_dash::app::pipeline::refresh;
use fred_dash::chart::{assemble, AssembleOptions, ChartPayload, CHART_TITLE};
use fred_dash::data::{SeriesSource, SeriesTable};
use fred_dash::domain::{DateInterval, FailurePolicy, RefreshQuery, RefreshRequest, Selection, SeriesId};
use fred_dash::error::{FetchFailure, RefreshError};
use fred_dash::io::export::figure_json;
use fred_dash::normalize::normalize;

/// Deterministic in-memory source. Records every call it receives.
#[derive(Default)]
struct FakeSource {
    tables: HashMap<String, SeriesTable>,
    failures: HashMap<String, FetchFailure>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<(String, DateInterval)>>,
}

impl FakeSource {
    fn with_table(mut self, id: &str, table: SeriesTable) -> Self {
        self.tables.insert(id.to_string(), table);
        self
    }

    fn with_failure(mut self, id: &str, failure: FetchFailure) -> Self {
        self.failures.insert(id.to_string(), failure);
        self
    }

    fn with_delay(mut self, id: &str, delay: Duration) -> Self {
        self.delays.insert(id.to_string(), delay);
        self
    }

    fn called_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.calls.lock().unwrap().iter().map(|(id, _)| id.clone()).collect();
        ids.sort();
        ids
    }
}

impl SeriesSource for FakeSource {
    fn name(&self) -> &str {
        "fake"
    }

    fn fetch(&self, series: &SeriesId, interval: &DateInterval) -> Result<SeriesTable, FetchFailure> {
        self.calls.lock().unwrap().push((series.to_string(), *interval));
        if let Some(delay) = self.delays.get(series.as_str()) {
            thread::sleep(*delay);
        }
        if let Some(failure) = self.failures.get(series.as_str()) {
            return Err(failure.clone());
        }
        self.tables
            .get(series.as_str())
            .cloned()
            .ok_or(FetchFailure::Rejected {
                status: 400,
                message: format!("unknown series {series}"),
            })
    }
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, d).unwrap()
}

fn interval() -> DateInterval {
    DateInterval::new(day(1), day(2))
}

fn query(ids: &[&str]) -> RefreshQuery {
    RefreshQuery {
        series: ids.iter().map(|id| SeriesId::new(*id)).collect(),
        interval: interval(),
    }
}

fn table_a() -> SeriesTable {
    SeriesTable::from_pairs("DATE", "A", [(day(1), Some(3.5)), (day(2), Some(3.6))])
}

fn table_b() -> SeriesTable {
    SeriesTable::from_pairs("observed", "B rate", [(day(1), Some(2.9)), (day(2), None)])
}

fn sequential() -> AssembleOptions {
    AssembleOptions {
        max_workers: 1,
        on_error: FailurePolicy::Abort,
    }
}

#[test]
fn single_series_becomes_single_line() {
    let source = FakeSource::default().with_table("A", table_a());
    let payload = assemble(&source, &query(&["A"]), &sequential()).unwrap();

    assert_eq!(payload.title, CHART_TITLE);
    assert_eq!(payload.lines.len(), 1);
    let line = &payload.lines[0];
    assert_eq!(line.name.as_str(), "A");
    assert_eq!(line.x, vec![day(1), day(2)]);
    assert_eq!(line.y, vec![Some(3.5), Some(3.6)]);
    assert_eq!((payload.x_axis_title.as_str(), payload.y_axis_title.as_str()), ("DATE", "A"));
    assert!(payload.skipped.is_empty());
}

#[test]
fn lines_follow_selection_order_and_last_series_names_axes() {
    let source = FakeSource::default()
        .with_table("A", table_a())
        .with_table("B", table_b());

    let payload = assemble(&source, &query(&["A", "B"]), &sequential()).unwrap();
    let names: Vec<&str> = payload.lines.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["A", "B"]);
    assert_eq!(payload.x_axis_title, "observed");
    assert_eq!(payload.y_axis_title, "B rate");

    let payload = assemble(&source, &query(&["B", "A"]), &sequential()).unwrap();
    let names: Vec<&str> = payload.lines.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["B", "A"]);
    assert_eq!(payload.x_axis_title, "DATE");
    assert_eq!(payload.y_axis_title, "A");
}

#[test]
fn fetch_receives_normalized_interval() {
    let source = FakeSource::default().with_table("A", table_a());
    let q = normalize(&Selection::One("A".to_string()), "2020/01/01", "2020.01.02").unwrap();
    assemble(&source, &q, &sequential()).unwrap();

    let calls = source.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, interval());
}

#[test]
fn failure_on_second_series_aborts_refresh() {
    let source = FakeSource::default()
        .with_table("A", table_a())
        .with_failure("B", FetchFailure::Unreachable("connection refused".to_string()));

    let err = assemble(&source, &query(&["A", "B"]), &sequential()).unwrap_err();
    assert_eq!(
        err,
        RefreshError::Fetch {
            series: SeriesId::new("B"),
            cause: FetchFailure::Unreachable("connection refused".to_string()),
        }
    );
}

#[test]
fn sequential_abort_stops_fetching_after_first_failure() {
    let source = FakeSource::default()
        .with_failure("A", FetchFailure::NoData)
        .with_table("B", table_b());

    let err = assemble(&source, &query(&["A", "B"]), &sequential()).unwrap_err();
    assert!(matches!(err, RefreshError::Fetch { ref series, cause: FetchFailure::NoData } if series.as_str() == "A"));
    assert_eq!(source.called_ids(), vec!["A"]);
}

#[test]
fn parallel_abort_reports_first_failure_in_selection_order() {
    // C fails quickly, A fails slowly: A still wins because it comes first.
    let source = FakeSource::default()
        .with_failure("A", FetchFailure::Timeout(Duration::from_secs(1)))
        .with_delay("A", Duration::from_millis(50))
        .with_table("B", table_b())
        .with_failure("C", FetchFailure::NoData);

    let options = AssembleOptions {
        max_workers: 3,
        on_error: FailurePolicy::Abort,
    };
    let err = assemble(&source, &query(&["A", "B", "C"]), &options).unwrap_err();
    assert!(matches!(err, RefreshError::Fetch { ref series, .. } if series.as_str() == "A"));
}

#[test]
fn skip_policy_keeps_successful_series() {
    let source = FakeSource::default()
        .with_table("A", table_a())
        .with_failure(
            "B",
            FetchFailure::Rejected {
                status: 400,
                message: "Bad Request.  The series does not exist.".to_string(),
            },
        );

    let options = AssembleOptions {
        max_workers: 2,
        on_error: FailurePolicy::Skip,
    };
    let payload = assemble(&source, &query(&["A", "B"]), &options).unwrap();
    assert_eq!(payload.lines.len(), 1);
    assert_eq!(payload.lines[0].name.as_str(), "A");
    assert_eq!(payload.y_axis_title, "A");
    assert_eq!(payload.skipped.len(), 1);
    assert_eq!(payload.skipped[0].series.as_str(), "B");
    assert!(payload.skipped[0].reason.contains("series does not exist"));
}

#[test]
fn skip_policy_fails_when_nothing_was_fetched() {
    let source = FakeSource::default()
        .with_failure("A", FetchFailure::NoData)
        .with_failure("B", FetchFailure::Unreachable("dns".to_string()));

    let options = AssembleOptions {
        max_workers: 2,
        on_error: FailurePolicy::Skip,
    };
    let err = assemble(&source, &query(&["A", "B"]), &options).unwrap_err();
    assert!(matches!(err, RefreshError::Fetch { ref series, cause: FetchFailure::NoData } if series.as_str() == "A"));
}

#[test]
fn parallel_matches_sequential_regardless_of_completion_order() {
    let source = FakeSource::default()
        .with_table("A", table_a())
        .with_delay("A", Duration::from_millis(60))
        .with_table("B", table_b())
        .with_delay("B", Duration::from_millis(20))
        .with_table("C", SeriesTable::from_pairs("DATE", "C", [(day(1), Some(1.0))]));

    let q = query(&["A", "B", "C"]);
    let parallel = assemble(
        &source,
        &q,
        &AssembleOptions {
            max_workers: 3,
            on_error: FailurePolicy::Abort,
        },
    )
    .unwrap();
    let serial = assemble(&source, &q, &sequential()).unwrap();

    assert_eq!(parallel, serial);
    assert_eq!(parallel.y_axis_title, "C");
}

#[test]
fn repeated_assembly_is_identical() {
    let source = FakeSource::default()
        .with_table("A", table_a())
        .with_table("B", table_b());
    let q = query(&["A", "B"]);

    let first: ChartPayload = assemble(&source, &q, &AssembleOptions::default()).unwrap();
    let second: ChartPayload = assemble(&source, &q, &AssembleOptions::default()).unwrap();
    assert_eq!(first, second);
    assert_eq!(figure_json(&first).unwrap(), figure_json(&second).unwrap());
}

#[test]
fn missing_values_survive_to_export() {
    let source = FakeSource::default().with_table("B", table_b());
    let payload = assemble(&source, &query(&["B"]), &sequential()).unwrap();
    assert_eq!(payload.lines[0].y, vec![Some(2.9), None]);

    let json: serde_json::Value = serde_json::from_str(&figure_json(&payload).unwrap()).unwrap();
    assert_eq!(json["data"][0]["y"], serde_json::json!([2.9, null]));
}

#[test]
fn malformed_table_is_a_fetch_error() {
    let wide = SeriesTable {
        columns: vec!["DATE".to_string(), "A".to_string(), "extra".to_string()],
        rows: Vec::new(),
    };
    let source = FakeSource::default().with_table("A", wide);
    let err = assemble(&source, &query(&["A"]), &sequential()).unwrap_err();
    assert!(matches!(err, RefreshError::Fetch { cause: FetchFailure::Malformed(_), .. }));
}

#[test]
fn refresh_runs_normalizer_then_assembler() {
    let source = FakeSource::default()
        .with_table("A", table_a())
        .with_table("B", table_b());
    let request = RefreshRequest {
        submit_count: 3,
        selection: Selection::Many(vec!["A".to_string(), "B".to_string(), "A".to_string()]),
        start: "2020/01/01".to_string(),
        end: "2020-01-02".to_string(),
    };

    let payload = refresh(&source, &request, &sequential()).unwrap();
    let names: Vec<&str> = payload.lines.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["A", "B"]);
    assert_eq!(source.called_ids(), vec!["A", "B"]);
}

#[test]
fn normalizer_errors_prevent_any_fetch() {
    let source = FakeSource::default().with_table("A", table_a());

    let bad_date = RefreshRequest {
        submit_count: 1,
        selection: Selection::One("A".to_string()),
        start: "2020".to_string(),
        end: "06".to_string(),
    };
    assert!(matches!(
        refresh(&source, &bad_date, &sequential()),
        Err(RefreshError::MalformedDate { .. })
    ));

    let empty = RefreshRequest {
        submit_count: 2,
        selection: Selection::Many(Vec::new()),
        start: "2020-01-01".to_string(),
        end: "2020-01-02".to_string(),
    };
    assert_eq!(refresh(&source, &empty, &sequential()), Err(RefreshError::EmptySelection));

    assert!(source.calls.lock().unwrap().is_empty());
}
