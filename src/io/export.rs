//! Export a chart payload as a Plotly-style figure (`{data, layout}`) JSON.
//!
//! The JSON can be dropped into `Plotly.newPlot(el, fig.data, fig.layout)` or
//! loaded by any script that understands the figure schema.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use crate::chart::{ChartPayload, LineMode, SkippedSeries};
use crate::domain::SeriesId;
use crate::error::AppError;

#[derive(Debug, Serialize)]
pub struct Figure<'a> {
    pub data: Vec<Trace<'a>>,
    pub layout: Layout<'a>,
}

#[derive(Debug, Serialize)]
pub struct Trace<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub mode: LineMode,
    pub name: &'a SeriesId,
    pub x: &'a [NaiveDate],
    pub y: &'a [Option<f64>],
}

#[derive(Debug, Serialize)]
pub struct Layout<'a> {
    pub title: Title<'a>,
    pub xaxis: Axis<'a>,
    pub yaxis: Axis<'a>,
    #[serde(skip_serializing_if = "<[SkippedSeries]>::is_empty")]
    pub skipped: &'a [SkippedSeries],
}

#[derive(Debug, Serialize)]
pub struct Axis<'a> {
    pub title: Title<'a>,
}

#[derive(Debug, Serialize)]
pub struct Title<'a> {
    pub text: &'a str,
}

impl<'a> Figure<'a> {
    pub fn from_payload(payload: &'a ChartPayload) -> Self {
        let data = payload
            .lines
            .iter()
            .map(|line| Trace {
                kind: "scatter",
                mode: line.mode,
                name: &line.name,
                x: &line.x,
                y: &line.y,
            })
            .collect();

        Self {
            data,
            layout: Layout {
                title: Title { text: &payload.title },
                xaxis: Axis {
                    title: Title { text: &payload.x_axis_title },
                },
                yaxis: Axis {
                    title: Title { text: &payload.y_axis_title },
                },
                skipped: &payload.skipped,
            },
        }
    }
}

pub fn figure_json(payload: &ChartPayload) -> Result<String, AppError> {
    serde_json::to_string_pretty(&Figure::from_payload(payload))
        .map_err(|e| AppError::new(4, format!("Failed to serialize chart JSON: {e}")))
}

/// Write the figure JSON to `path`, or to stdout when `path` is `-`.
pub fn write_figure_json(path: &Path, payload: &ChartPayload) -> Result<(), AppError> {
    let json = figure_json(payload)?;

    if path == Path::new("-") {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{json}").map_err(|e| AppError::new(4, format!("Failed to write chart JSON: {e}")))?;
        return Ok(());
    }

    let mut file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create chart JSON '{}': {e}", path.display())))?;
    writeln!(file, "{json}")
        .map_err(|e| AppError::new(2, format!("Failed to write chart JSON '{}': {e}", path.display())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{ChartLine, CHART_TITLE};
    use serde_json::{json, Value};

    fn sample() -> ChartPayload {
        ChartPayload {
            title: CHART_TITLE.to_string(),
            x_axis_title: "DATE".to_string(),
            y_axis_title: "MORTGAGE30US".to_string(),
            lines: vec![ChartLine {
                name: SeriesId::new("MORTGAGE30US"),
                mode: LineMode::Lines,
                x: vec![
                    NaiveDate::from_ymd_opt(2020, 1, 2).unwrap(),
                    NaiveDate::from_ymd_opt(2020, 1, 9).unwrap(),
                ],
                y: vec![Some(3.72), None],
            }],
            skipped: Vec::new(),
        }
    }

    #[test]
    fn figure_matches_plotly_shape() {
        let value: Value = serde_json::from_str(&figure_json(&sample()).unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "data": [{
                    "type": "scatter",
                    "mode": "lines",
                    "name": "MORTGAGE30US",
                    "x": ["2020-01-02", "2020-01-09"],
                    "y": [3.72, null]
                }],
                "layout": {
                    "title": {"text": "FRED"},
                    "xaxis": {"title": {"text": "DATE"}},
                    "yaxis": {"title": {"text": "MORTGAGE30US"}}
                }
            })
        );
    }

    #[test]
    fn skipped_series_are_reported_in_layout() {
        let mut payload = sample();
        payload.skipped.push(SkippedSeries {
            series: SeriesId::new("MORTGAGE5US"),
            reason: "no observations returned".to_string(),
        });
        let value: Value = serde_json::from_str(&figure_json(&payload).unwrap()).unwrap();
        assert_eq!(value["layout"]["skipped"][0]["series"], "MORTGAGE5US");
    }

    #[test]
    fn writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.json");
        write_figure_json(&path, &sample()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"MORTGAGE30US\""));
        assert!(text.ends_with("}\n"));
    }
}
