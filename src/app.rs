//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads configuration and applies flag overrides
//! - sets up logging
//! - builds the series source
//! - dispatches to the TUI or a one-shot command

use clap::Parser;
use tracing::info;

use crate::cli::{Command, ExportArgs, PlotArgs, RefreshArgs};
use crate::config::Config;
use crate::domain::{FailurePolicy, RefreshRequest, Selection};
use crate::error::AppError;
use crate::logging::{self, LogTarget};

pub mod pipeline;

/// Entry point for the `fred-dash` binary.
pub fn run() -> Result<(), AppError> {
    // `fred-dash` and `fred-dash -s X` behave like `fred-dash tui ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);
    let config = Config::resolve(cli.config.as_deref())?;

    match cli.command {
        Command::Tui(args) => handle_tui(config, args),
        Command::Plot(args) => handle_plot(config, args),
        Command::Export(args) => handle_export(config, args),
        Command::Series => handle_series(&config),
    }
}

fn handle_tui(mut config: Config, args: RefreshArgs) -> Result<(), AppError> {
    logging::init(LogTarget::File(logging::TUI_LOG_FILE.into()))?;
    apply_overrides(&mut config, &args);
    let request = request_from_args(&config, &args);

    let source = crate::data::build_source(config.fetch.source, config.timeout())?;
    let options = config.assemble_options();
    info!(?options, "starting tui");
    crate::tui::run(config, source, options, request)
}

fn handle_plot(mut config: Config, args: PlotArgs) -> Result<(), AppError> {
    logging::init(LogTarget::Stderr)?;
    apply_overrides(&mut config, &args.refresh);
    let request = request_from_args(&config, &args.refresh);

    let source = crate::data::build_source(config.fetch.source, config.timeout())?;
    let payload = pipeline::refresh(source.as_ref(), &request, &config.assemble_options())?;

    print!("{}", crate::plot::render_ascii_chart(&payload, args.width, args.height));
    Ok(())
}

fn handle_export(mut config: Config, args: ExportArgs) -> Result<(), AppError> {
    logging::init(LogTarget::Stderr)?;
    apply_overrides(&mut config, &args.refresh);
    let request = request_from_args(&config, &args.refresh);

    let source = crate::data::build_source(config.fetch.source, config.timeout())?;
    let payload = pipeline::refresh(source.as_ref(), &request, &config.assemble_options())?;

    crate::io::write_figure_json(&args.output, &payload)?;
    info!(output = %args.output.display(), lines = payload.lines.len(), "chart exported");
    Ok(())
}

fn handle_series(config: &Config) -> Result<(), AppError> {
    let default: Vec<&str> = config.catalog.default_selection.iter().map(String::as_str).collect();
    for entry in &config.catalog.series {
        let mark = if default.contains(&entry.id.as_str()) { "*" } else { " " };
        println!("{mark} {:<16} {}", entry.id, entry.label);
    }
    Ok(())
}

/// Flags win over the config file.
pub fn apply_overrides(config: &mut Config, args: &RefreshArgs) {
    if let Some(source) = args.source {
        config.fetch.source = source;
    }
    if let Some(workers) = args.workers {
        config.fetch.max_workers = workers.max(1);
    }
    if let Some(timeout) = args.timeout {
        config.fetch.timeout_secs = timeout.max(1);
    }
    if args.skip_failed {
        config.fetch.on_error = FailurePolicy::Skip;
    }
}

/// Snapshot the refresh inputs: flags first, then config defaults, end = today.
pub fn request_from_args(config: &Config, args: &RefreshArgs) -> RefreshRequest {
    let mut request = pipeline::initial_request(config, pipeline::today());
    if !args.series.is_empty() {
        request.selection = Selection::from_values(args.series.clone());
    }
    if let Some(start) = &args.start {
        request.start = start.clone();
    }
    if let Some(end) = &args.end {
        request.end = end.clone();
    }
    request
}

/// Rewrite argv so `fred-dash` defaults to `fred-dash tui`.
///
/// Rules:
/// - `fred-dash`                      -> `fred-dash tui`
/// - `fred-dash -s MORTGAGE15US ...`  -> `fred-dash tui -s MORTGAGE15US ...`
/// - `fred-dash --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "tui" | "plot" | "export" | "series");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    argv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SourceKind;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_launches_tui() {
        assert_eq!(rewrite_args(argv(&["fred-dash"])), argv(&["fred-dash", "tui"]));
        assert_eq!(
            rewrite_args(argv(&["fred-dash", "-s", "MORTGAGE15US"])),
            argv(&["fred-dash", "tui", "-s", "MORTGAGE15US"])
        );
        assert_eq!(rewrite_args(argv(&["fred-dash", "--help"])), argv(&["fred-dash", "--help"]));
        assert_eq!(rewrite_args(argv(&["fred-dash", "plot"])), argv(&["fred-dash", "plot"]));
    }

    #[test]
    fn flags_override_config() {
        let mut config = Config::default();
        let args = RefreshArgs {
            source: Some(SourceKind::Graph),
            workers: Some(0),
            skip_failed: true,
            timeout: Some(5),
            ..RefreshArgs::default()
        };
        apply_overrides(&mut config, &args);
        assert_eq!(config.fetch.source, SourceKind::Graph);
        assert_eq!(config.fetch.max_workers, 1);
        assert_eq!(config.fetch.on_error, FailurePolicy::Skip);
        assert_eq!(config.fetch.timeout_secs, 5);
    }

    #[test]
    fn request_prefers_flags_over_defaults() {
        let config = Config::default();
        let args = RefreshArgs {
            series: vec!["MORTGAGE15US".to_string(), "MORTGAGE5US".to_string()],
            start: Some("2005/05/01".to_string()),
            end: Some("2020/06/01".to_string()),
            ..RefreshArgs::default()
        };
        let request = request_from_args(&config, &args);
        assert_eq!(
            request.selection,
            Selection::Many(vec!["MORTGAGE15US".to_string(), "MORTGAGE5US".to_string()])
        );
        assert_eq!(request.start, "2005/05/01");
        assert_eq!(request.end, "2020/06/01");

        let request = request_from_args(&config, &RefreshArgs::default());
        assert_eq!(request.selection, Selection::One("MORTGAGE30US".to_string()));
        assert_eq!(request.start, "2000-01-01");
    }
}
