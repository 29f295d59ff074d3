//! Domain types used throughout the refresh pipeline.
//!
//! This module defines:
//!
//! - series identity and selection (`SeriesId`, `Selection`)
//! - the validated query (`DateInterval`, `RefreshQuery`, `RefreshRequest`)
//! - fetched data (`Observation`, `SeriesData`)
//! - pipeline knobs (`FailurePolicy`, `SourceKind`)

pub mod types;

pub use types::*;
