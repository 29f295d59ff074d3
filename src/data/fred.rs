//! FRED integrations: the JSON observations API and the keyless graph CSV.
//!
//! Both return a `[DATE, <series id>]` table, so the chart axis titles match no
//! matter which endpoint served the data.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::data::source::{Cell, SeriesSource, SeriesTable};
use crate::domain::{DateInterval, SeriesId, SourceKind};
use crate::error::{AppError, FetchFailure};

const API_URL: &str = "https://api.stlouisfed.org/fred/series/observations";
const GRAPH_URL: &str = "https://fred.stlouisfed.org/graph/fredgraph.csv";
const API_KEY_VAR: &str = "FRED_API_KEY";
const USER_AGENT: &str = concat!("fred-dash/", env!("CARGO_PKG_VERSION"));

/// Name of the date column in every table we produce.
pub const DATE_COLUMN: &str = "DATE";

/// Longest response snippet kept in a rejection message.
const MAX_MESSAGE_LEN: usize = 200;

/// Pick and construct the configured source.
///
/// `Auto` uses the API when a key is available and falls back to the graph CSV.
pub fn build_source(kind: SourceKind, timeout: Duration) -> Result<Box<dyn SeriesSource>, AppError> {
    dotenvy::dotenv().ok();
    let source: Box<dyn SeriesSource> = match kind {
        SourceKind::Api => Box::new(FredApiClient::from_env(timeout)?),
        SourceKind::Graph => Box::new(FredGraphClient::new(timeout)?),
        SourceKind::Auto => match api_key_from_env() {
            Some(key) => Box::new(FredApiClient::new(key, timeout)?),
            None => Box::new(FredGraphClient::new(timeout)?),
        },
    };
    info!(source = source.name(), timeout_secs = timeout.as_secs(), "series source ready");
    Ok(source)
}

fn api_key_from_env() -> Option<String> {
    std::env::var(API_KEY_VAR)
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}

fn http_client(timeout: Duration) -> Result<Client, AppError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| AppError::new(4, format!("Failed to build HTTP client: {e}")))
}

pub struct FredApiClient {
    client: Client,
    api_key: String,
    timeout: Duration,
}

impl FredApiClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, AppError> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key,
            timeout,
        })
    }

    pub fn from_env(timeout: Duration) -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let api_key = api_key_from_env()
            .ok_or_else(|| AppError::new(2, format!("Missing {API_KEY_VAR} in environment (.env).")))?;
        Self::new(api_key, timeout)
    }
}

impl SeriesSource for FredApiClient {
    fn name(&self) -> &str {
        "fred-api"
    }

    fn fetch(&self, series: &SeriesId, interval: &DateInterval) -> Result<SeriesTable, FetchFailure> {
        let start = interval.start.to_string();
        let end = interval.end.to_string();
        let resp = self
            .client
            .get(API_URL)
            .query(&[
                ("series_id", series.as_str()),
                ("api_key", self.api_key.as_str()),
                ("file_type", "json"),
                ("observation_start", start.as_str()),
                ("observation_end", end.as_str()),
                ("sort_order", "asc"),
            ])
            .send()
            .map_err(|e| transport_failure(e, self.timeout))?;

        let status = resp.status();
        let body = resp.text().map_err(|e| transport_failure(e, self.timeout))?;
        debug!(%series, status = status.as_u16(), bytes = body.len(), "fred api response");

        if !status.is_success() {
            return Err(FetchFailure::Rejected {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        parse_api_observations(series, &body)
    }
}

pub struct FredGraphClient {
    client: Client,
    timeout: Duration,
}

impl FredGraphClient {
    pub fn new(timeout: Duration) -> Result<Self, AppError> {
        Ok(Self {
            client: http_client(timeout)?,
            timeout,
        })
    }
}

impl SeriesSource for FredGraphClient {
    fn name(&self) -> &str {
        "fred-graph"
    }

    fn fetch(&self, series: &SeriesId, interval: &DateInterval) -> Result<SeriesTable, FetchFailure> {
        let start = interval.start.to_string();
        let end = interval.end.to_string();
        let resp = self
            .client
            .get(GRAPH_URL)
            .query(&[("id", series.as_str()), ("cosd", start.as_str()), ("coed", end.as_str())])
            .send()
            .map_err(|e| transport_failure(e, self.timeout))?;

        let status = resp.status();
        let body = resp.text().map_err(|e| transport_failure(e, self.timeout))?;
        debug!(%series, status = status.as_u16(), bytes = body.len(), "fred graph response");

        if !status.is_success() {
            return Err(FetchFailure::Rejected {
                status: status.as_u16(),
                message: snippet(&body),
            });
        }

        parse_graph_csv(&body)
    }
}

/// The request URL carries the API key, so it never reaches the message.
fn transport_failure(err: reqwest::Error, timeout: Duration) -> FetchFailure {
    if err.is_timeout() {
        FetchFailure::Timeout(timeout)
    } else {
        FetchFailure::Unreachable(err.without_url().to_string())
    }
}

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    observations: Vec<ApiObservation>,
}

#[derive(Debug, Deserialize)]
struct ApiObservation {
    date: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error_message: String,
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|e| e.error_message.trim().to_string())
        .unwrap_or_else(|_| snippet(body))
}

fn parse_api_observations(series: &SeriesId, body: &str) -> Result<SeriesTable, FetchFailure> {
    let parsed: ObservationsResponse = serde_json::from_str(body)
        .map_err(|e| FetchFailure::Malformed(format!("invalid FRED JSON: {e}")))?;

    let mut pairs = Vec::with_capacity(parsed.observations.len());
    for obs in parsed.observations {
        let date = parse_iso_date(&obs.date)?;
        let value = match parse_value(&obs.value)? {
            Cell::Value(v) => Some(v),
            _ => None,
        };
        pairs.push((date, value));
    }

    if pairs.is_empty() {
        return Err(FetchFailure::NoData);
    }
    Ok(SeriesTable::from_pairs(DATE_COLUMN, series.as_str(), pairs))
}

/// Parse a `fredgraph.csv` body.
///
/// Every column after the first is kept as a value column; the assembler decides
/// whether the shape is acceptable.
fn parse_graph_csv(body: &str) -> Result<SeriesTable, FetchFailure> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| FetchFailure::Malformed(format!("invalid FRED CSV header: {e}")))?;
    let mut columns: Vec<String> = headers.iter().map(str::to_string).collect();
    if let Some(first) = columns.first_mut() {
        if first.eq_ignore_ascii_case("observation_date") || first.eq_ignore_ascii_case("date") {
            *first = DATE_COLUMN.to_string();
        }
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| FetchFailure::Malformed(format!("invalid FRED CSV row: {e}")))?;
        let mut fields = record.iter();
        let Some(raw_date) = fields.next() else {
            continue;
        };
        let mut row = vec![Cell::Date(parse_iso_date(raw_date)?)];
        for raw in fields {
            row.push(parse_value(raw)?);
        }
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(FetchFailure::NoData);
    }
    Ok(SeriesTable { columns, rows })
}

fn parse_iso_date(raw: &str) -> Result<NaiveDate, FetchFailure> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| FetchFailure::Malformed(format!("invalid FRED date '{raw}': {e}")))
}

/// FRED writes `.` (or leaves the cell empty) for dates without a value.
fn parse_value(raw: &str) -> Result<Cell, FetchFailure> {
    let trimmed = raw.trim();
    if trimmed == "." || trimmed.is_empty() {
        return Ok(Cell::Missing);
    }
    let value = trimmed
        .parse::<f64>()
        .map_err(|_| FetchFailure::Malformed(format!("invalid FRED value '{trimmed}'")))?;
    // `NaN` / `inf` literals carry no value either.
    Ok(if value.is_finite() { Cell::Value(value) } else { Cell::Missing })
}

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_MESSAGE_LEN) {
        Some((idx, _)) => format!("{}…", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
