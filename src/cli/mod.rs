//! Command-line parsing for the FRED dashboard.
//!
//! Argument parsing and command dispatch stay separate from the refresh
//! pipeline; `app` turns these structs into a `RefreshRequest`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::SourceKind;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "fred-dash", version, about = "FRED mortgage-rate dashboard")]
pub struct Cli {
    /// Config file (TOML). Defaults to $FRED_DASH_CONFIG, then ./fred-dash.toml.
    #[arg(long, global = true, value_name = "TOML")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Launch the interactive terminal dashboard.
    Tui(RefreshArgs),
    /// Fetch once and print an ASCII chart.
    Plot(PlotArgs),
    /// Fetch once and write the chart as Plotly-style JSON.
    Export(ExportArgs),
    /// List the configured series catalog.
    Series,
}

/// Refresh parameters shared by every subcommand that fetches.
#[derive(Debug, Args, Clone, Default)]
pub struct RefreshArgs {
    /// Series to chart (repeat or comma-separate). Defaults to the config selection.
    #[arg(short = 's', long = "series", value_delimiter = ',')]
    pub series: Vec<String>,

    /// Start date, year/month/day with any delimiter (e.g. 2005-05-01).
    #[arg(long)]
    pub start: Option<String>,

    /// End date, year/month/day with any delimiter. Defaults to today.
    #[arg(long)]
    pub end: Option<String>,

    /// Where observations come from.
    #[arg(long, value_enum)]
    pub source: Option<SourceKind>,

    /// Maximum concurrent fetches (1 = sequential).
    #[arg(long)]
    pub workers: Option<usize>,

    /// Leave failing series out of the chart instead of failing the refresh.
    #[arg(long)]
    pub skip_failed: bool,

    /// Per-request timeout in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(Debug, Args)]
pub struct PlotArgs {
    #[command(flatten)]
    pub refresh: RefreshArgs,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub refresh: RefreshArgs,

    /// Output path; `-` writes to stdout.
    #[arg(short = 'o', long, default_value = "-", value_name = "JSON")]
    pub output: PathBuf,
}
