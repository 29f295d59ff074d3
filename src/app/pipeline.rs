//! Shared refresh pipeline used by the CLI and the TUI.
//!
//! `RefreshRequest` (UI snapshot) -> `normalize` -> `assemble` -> `ChartPayload`
//!
//! Front-ends build the request from their own state and only deal with
//! presentation afterwards.

use chrono::{Local, NaiveDate};
use tracing::{info, warn};

use crate::chart::{assemble, AssembleOptions, ChartPayload};
use crate::config::Config;
use crate::data::SeriesSource;
use crate::domain::{RefreshRequest, Selection};
use crate::error::RefreshError;
use crate::normalize::normalize;

/// Run one refresh for an immutable UI snapshot.
///
/// Nothing is fetched when the request does not normalize.
pub fn refresh(
    source: &dyn SeriesSource,
    request: &RefreshRequest,
    options: &AssembleOptions,
) -> Result<ChartPayload, RefreshError> {
    info!(
        submit = request.submit_count,
        selection = ?request.selection,
        start = %request.start,
        end = %request.end,
        "refresh requested"
    );

    let query = normalize(&request.selection, &request.start, &request.end).inspect_err(|e| {
        warn!("refresh rejected: {e}");
    })?;

    let payload = assemble(source, &query, options)?;
    info!(
        interval = %query.interval,
        lines = payload.lines.len(),
        points = payload.total_points(),
        skipped = payload.skipped.len(),
        "refresh complete"
    );
    Ok(payload)
}

/// The request a fresh dashboard shows before the user changes anything.
pub fn initial_request(config: &Config, today: NaiveDate) -> RefreshRequest {
    RefreshRequest {
        submit_count: 0,
        selection: Selection::from_values(config.catalog.default_selection.clone()),
        start: config.dates.default_start.clone(),
        end: today.to_string(),
    }
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
