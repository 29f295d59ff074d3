//! Chart payload: the renderer-facing output of a refresh.
//!
//! A payload is a plain description (named lines + title + axis titles). It knows
//! nothing about terminals or Plotters; see `tui` and `plot` for the renderers and
//! `io::export` for the JSON form.

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::{SeriesData, SeriesId};

pub mod assemble;

pub use assemble::{assemble, AssembleOptions};

/// Title shown above every chart.
pub const CHART_TITLE: &str = "FRED";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineMode {
    Lines,
}

/// One renderable series. `x` and `y` always have the same length.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartLine {
    pub name: SeriesId,
    pub mode: LineMode,
    pub x: Vec<NaiveDate>,
    /// `None` marks a missing observation; renderers break the line there.
    pub y: Vec<Option<f64>>,
}

impl ChartLine {
    pub fn from_series(data: SeriesData) -> Self {
        let (x, y) = data.observations.into_iter().map(|o| (o.date, o.value)).unzip();
        Self {
            name: data.series,
            mode: LineMode::Lines,
            x,
            y,
        }
    }

    /// Iterate `(date, value)` pairs that carry a value.
    pub fn points(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.x
            .iter()
            .zip(&self.y)
            .filter_map(|(&d, &v)| v.map(|v| (d, v)))
    }

    /// Consecutive runs of present values; a missing value ends a run.
    pub fn segments(&self) -> Vec<Vec<(NaiveDate, f64)>> {
        let mut out = Vec::new();
        let mut current = Vec::new();
        for (&d, &v) in self.x.iter().zip(&self.y) {
            match v {
                Some(v) => current.push((d, v)),
                None if !current.is_empty() => out.push(std::mem::take(&mut current)),
                None => {}
            }
        }
        if !current.is_empty() {
            out.push(current);
        }
        out
    }
}

/// A series left out of the chart under `FailurePolicy::Skip`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedSeries {
    pub series: SeriesId,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPayload {
    pub title: String,
    pub x_axis_title: String,
    pub y_axis_title: String,
    /// One line per fetched series, in selection order.
    pub lines: Vec<ChartLine>,
    pub skipped: Vec<SkippedSeries>,
}

impl ChartPayload {
    /// Earliest and latest date with a value, across all lines.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self.lines.iter().flat_map(|l| l.points().map(|(d, _)| d));
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }

    /// Smallest and largest present value, across all lines.
    pub fn value_bounds(&self) -> Option<(f64, f64)> {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for (_, v) in self.lines.iter().flat_map(|l| l.points()) {
            min = min.min(v);
            max = max.max(v);
        }
        if min.is_finite() && max.is_finite() {
            Some((min, max))
        } else {
            None
        }
    }

    pub fn total_points(&self) -> usize {
        self.lines.iter().map(|l| l.x.len()).sum()
    }
}
