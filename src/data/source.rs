//! Series source abstraction.

use chrono::NaiveDate;

use crate::domain::{DateInterval, SeriesId};
use crate::error::FetchFailure;

/// One cell of a fetched table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell {
    Date(NaiveDate),
    Value(f64),
    /// Provider-specific "no value for this date" marker.
    Missing,
}

/// Raw tabular result of a fetch.
///
/// The assembler expects exactly two columns: date first, value second.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SeriesTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl SeriesTable {
    /// Build a `[date, value]` table from already-typed observations.
    pub fn from_pairs(
        date_column: impl Into<String>,
        value_column: impl Into<String>,
        pairs: impl IntoIterator<Item = (NaiveDate, Option<f64>)>,
    ) -> Self {
        let rows = pairs
            .into_iter()
            .map(|(date, value)| vec![Cell::Date(date), value.map_or(Cell::Missing, Cell::Value)])
            .collect();
        Self {
            columns: vec![date_column.into(), value_column.into()],
            rows,
        }
    }
}

/// Anything that can return observations for `(series, interval)`.
///
/// Implementations are shared across fetch workers, hence `Sync`.
pub trait SeriesSource: Sync {
    /// Short name for logs and status lines.
    fn name(&self) -> &str;

    fn fetch(&self, series: &SeriesId, interval: &DateInterval) -> Result<SeriesTable, FetchFailure>;
}
