//! Parameter normalization: raw UI input -> validated `RefreshQuery`.
//!
//! Dates are accepted in any numeric-delimited `year, month, day` form
//! (`2020/06/01`, `2020-06-01`, `2020.06.01T00:00:00`, ...). Only the first three
//! digit runs are used.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::domain::{DateInterval, RefreshQuery, Selection, SeriesId};
use crate::error::RefreshError;

static NON_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\D+").expect("static regex is valid"));

/// Turn a raw selection and two raw date strings into a query.
///
/// Dates are checked before the selection, so a bad date is reported even when
/// nothing is selected.
pub fn normalize(selection: &Selection, raw_start: &str, raw_end: &str) -> Result<RefreshQuery, RefreshError> {
    let start = parse_date(raw_start)?;
    let end = parse_date(raw_end)?;
    let series = resolve_selection(selection)?;

    Ok(RefreshQuery {
        series,
        interval: DateInterval::new(start, end),
    })
}

/// Parse a numeric-delimited `year, month, day` date.
///
/// `\D` is Unicode-aware, so non-ASCII digits (`٢٠٢٠-٠٦-٠١`) stay in the tokens
/// and are reported as a malformed date rather than converted.
pub fn parse_date(raw: &str) -> Result<NaiveDate, RefreshError> {
    let tokens: Vec<&str> = NON_DIGITS.split(raw).filter(|t| !t.is_empty()).collect();
    if tokens.len() < 3 {
        return Err(RefreshError::malformed_date(
            raw,
            format!("expected year, month and day, found {} number(s)", tokens.len()),
        ));
    }

    let year: i32 = parse_token(raw, tokens[0], "year")?;
    let month: u32 = parse_token(raw, tokens[1], "month")?;
    let day: u32 = parse_token(raw, tokens[2], "day")?;

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| RefreshError::malformed_date(raw, format!("{year}-{month}-{day} is not a calendar date")))
}

fn parse_token<T: std::str::FromStr>(raw: &str, token: &str, field: &str) -> Result<T, RefreshError> {
    token
        .parse()
        .map_err(|_| RefreshError::malformed_date(raw, format!("{field} '{token}' is not a valid number")))
}

/// Canonicalize either selection shape into an ordered set of ids.
fn resolve_selection(selection: &Selection) -> Result<Vec<SeriesId>, RefreshError> {
    let raw: &[String] = match selection {
        Selection::One(id) => std::slice::from_ref(id),
        Selection::Many(ids) => ids,
    };

    let mut seen = HashSet::new();
    let series: Vec<SeriesId> = raw
        .iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .filter(|id| seen.insert(*id))
        .map(SeriesId::from)
        .collect();

    if series.is_empty() {
        return Err(RefreshError::EmptySelection);
    }
    Ok(series)
}
