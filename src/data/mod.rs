//! Remote series data.
//!
//! - `source`: the `SeriesSource` seam and its raw table shape
//! - `fred`: FRED API and graph-CSV implementations

pub mod fred;
pub mod source;

pub use fred::{build_source, FredApiClient, FredGraphClient};
pub use source::{Cell, SeriesSource, SeriesTable};
