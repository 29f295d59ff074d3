//! `fred-dash` library crate.
//!
//! The binary (`fred-dash`) is a thin wrapper around this library so that:
//!
//! - the refresh pipeline is testable without a terminal or network
//! - front-ends (TUI, ASCII plot, JSON export) share one code path

pub mod app;
pub mod chart;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod normalize;
pub mod plot;
pub mod tui;
