//! Shared domain types.
//!
//! These types are intentionally kept small and serializable so they can be:
//!
//! - built fresh on every refresh and dropped afterwards
//! - exported to JSON
//! - compared for equality in tests (idempotent refreshes)

use std::fmt;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Opaque key naming one external time series (e.g. `MORTGAGE30US`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesId(String);

impl SeriesId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SeriesId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Raw series selection as produced by a UI widget.
///
/// Single-select widgets hand over one value, multi-select widgets a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    One(String),
    Many(Vec<String>),
}

impl Selection {
    /// Build a selection from collected values (CLI flags, TUI checkboxes).
    ///
    /// Exactly one value becomes `One`; anything else (including none) is `Many`.
    pub fn from_values(mut values: Vec<String>) -> Self {
        if values.len() == 1 {
            Self::One(values.remove(0))
        } else {
            Self::Many(values)
        }
    }
}

/// Inclusive calendar-date range. `start <= end` is not enforced here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateInterval {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateInterval {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }
}

impl fmt::Display for DateInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Validated query: ordered, de-duplicated, non-empty series plus an interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshQuery {
    pub series: Vec<SeriesId>,
    pub interval: DateInterval,
}

/// Immutable snapshot of the UI state at the moment "submit" was triggered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshRequest {
    /// How many times submit has been pressed (0 for the initial render).
    pub submit_count: u64,
    pub selection: Selection,
    pub start: String,
    pub end: String,
}

/// One `(date, value)` pair. `None` is the provider's missing-value marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

/// Observations for one series over one interval, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesData {
    pub series: SeriesId,
    /// Name of the source table's first column.
    pub date_column: String,
    /// Name of the source table's second column.
    pub value_column: String,
    pub observations: Vec<Observation>,
}

/// What to do when one series in a multi-series refresh fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// First failure (in selection order) fails the whole refresh.
    #[default]
    Abort,
    /// Leave failed series out of the chart and report them alongside it.
    Skip,
}

/// Which remote endpoint serves observations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// FRED API when `FRED_API_KEY` is set, otherwise the keyless graph CSV.
    #[default]
    Auto,
    /// `api.stlouisfed.org` JSON observations endpoint (needs an API key).
    Api,
    /// `fred.stlouisfed.org/graph/fredgraph.csv` download (no key).
    Graph,
}
