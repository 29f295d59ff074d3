//! Fetch every selected series and assemble the chart payload.
//!
//! Fetches are independent tasks. With `max_workers > 1` they run on a bounded
//! Rayon pool; results are gathered back in selection order, so line order and
//! the reported failure never depend on which request finished first.

use std::time::Instant;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::chart::{ChartLine, ChartPayload, SkippedSeries, CHART_TITLE};
use crate::data::source::{Cell, SeriesSource, SeriesTable};
use crate::domain::{DateInterval, FailurePolicy, Observation, RefreshQuery, SeriesData, SeriesId};
use crate::error::{FetchFailure, RefreshError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssembleOptions {
    /// Upper bound on concurrent fetches. `1` means strictly sequential.
    pub max_workers: usize,
    pub on_error: FailurePolicy,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            max_workers: 4,
            on_error: FailurePolicy::Abort,
        }
    }
}

/// Build a chart payload for `query`.
///
/// Axis titles come from the column names of the last series processed (in
/// selection order). Under `FailurePolicy::Skip` a refresh still fails when no
/// series at all could be fetched.
pub fn assemble(
    source: &dyn SeriesSource,
    query: &RefreshQuery,
    options: &AssembleOptions,
) -> Result<ChartPayload, RefreshError> {
    let results = fetch_all(source, query, options);

    let mut lines = Vec::with_capacity(query.series.len());
    let mut skipped = Vec::new();
    let mut axis_titles = None;
    let mut first_failure = None;

    for (series, result) in query.series.iter().zip(results) {
        match result {
            Ok(data) => {
                axis_titles = Some((data.date_column.clone(), data.value_column.clone()));
                lines.push(ChartLine::from_series(data));
            }
            Err(cause) => {
                warn!(%series, %cause, policy = ?options.on_error, "series fetch failed");
                match options.on_error {
                    FailurePolicy::Abort => return Err(RefreshError::fetch(series, cause)),
                    FailurePolicy::Skip => {
                        skipped.push(SkippedSeries {
                            series: series.clone(),
                            reason: cause.to_string(),
                        });
                        first_failure.get_or_insert(RefreshError::fetch(series, cause));
                    }
                }
            }
        }
    }

    let Some((x_axis_title, y_axis_title)) = axis_titles else {
        return Err(first_failure.unwrap_or(RefreshError::EmptySelection));
    };

    Ok(ChartPayload {
        title: CHART_TITLE.to_string(),
        x_axis_title,
        y_axis_title,
        lines,
        skipped,
    })
}

/// Run one fetch task per series and return results in selection order.
///
/// The sequential path stops at the first failure under `Abort`, so the result
/// list may be shorter than the selection.
fn fetch_all(
    source: &dyn SeriesSource,
    query: &RefreshQuery,
    options: &AssembleOptions,
) -> Vec<Result<SeriesData, FetchFailure>> {
    let interval = &query.interval;
    let workers = options.max_workers.clamp(1, query.series.len().max(1));

    if workers > 1 {
        match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
            Ok(pool) => {
                return pool.install(|| {
                    query
                        .series
                        .par_iter()
                        .map(|series| fetch_one(source, series, interval))
                        .collect()
                });
            }
            Err(e) => warn!("fetch pool unavailable, fetching sequentially: {e}"),
        }
    }

    let mut out = Vec::with_capacity(query.series.len());
    for series in &query.series {
        let result = fetch_one(source, series, interval);
        let stop = result.is_err() && options.on_error == FailurePolicy::Abort;
        out.push(result);
        if stop {
            break;
        }
    }
    out
}

fn fetch_one(source: &dyn SeriesSource, series: &SeriesId, interval: &DateInterval) -> Result<SeriesData, FetchFailure> {
    let started = Instant::now();
    let table = source.fetch(series, interval)?;
    let data = to_series_data(series, table)?;
    info!(
        %series,
        source = source.name(),
        rows = data.observations.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "fetched series"
    );
    Ok(data)
}

/// Read a raw table as `(date, value)` pairs: first column dates, second values.
///
/// Column names are not inspected; only the shape is.
fn to_series_data(series: &SeriesId, table: SeriesTable) -> Result<SeriesData, FetchFailure> {
    let [date_column, value_column]: [String; 2] = table.columns.try_into().map_err(|cols: Vec<String>| {
        FetchFailure::Malformed(format!("expected 2 columns (date, value), got {}", cols.len()))
    })?;

    if table.rows.is_empty() {
        return Err(FetchFailure::NoData);
    }

    let mut observations = Vec::with_capacity(table.rows.len());
    for (idx, row) in table.rows.iter().enumerate() {
        let observation = match row.as_slice() {
            [Cell::Date(date), Cell::Value(v)] => Observation {
                date: *date,
                value: Some(*v),
            },
            [Cell::Date(date), Cell::Missing] => Observation {
                date: *date,
                value: None,
            },
            _ => {
                return Err(FetchFailure::Malformed(format!(
                    "row {} of {series} is not a (date, value) pair: {row:?}",
                    idx + 1
                )));
            }
        };
        observations.push(observation);
    }

    Ok(SeriesData {
        series: series.clone(),
        date_column,
        value_column,
        observations,
    })
}
