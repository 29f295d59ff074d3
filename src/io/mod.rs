//! Output helpers.
//!
//! - chart JSON export in Plotly figure shape (`export`)

pub mod export;

pub use export::*;
