//! Ratatui-based terminal dashboard.
//!
//! Left: the chart of the last successful refresh. Right: a settings panel with
//! the series catalog (multi-select), start/end dates and a submit button.
//! A refresh only happens on submit; if it fails, the previous chart stays on
//! screen and the error is shown in the status bar.

use std::io;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Terminal,
};
use tracing::info;

use crate::app::pipeline;
use crate::chart::{AssembleOptions, ChartPayload};
use crate::config::{CatalogEntry, Config};
use crate::data::SeriesSource;
use crate::domain::{RefreshRequest, Selection, SeriesId};
use crate::error::AppError;
use crate::normalize::parse_date;

mod plotters_chart;

use plotters_chart::{DashPlottersChart, PlotLine};

const PALETTE: [(u8, u8, u8); 6] = [
    (0, 255, 255), // cyan
    (255, 255, 0), // yellow
    (255, 0, 255), // magenta
    (0, 255, 0),   // green
    (255, 128, 0), // orange
    (128, 160, 255),
];

/// Start the TUI and show `initial` right away.
pub fn run(
    config: Config,
    source: Box<dyn SeriesSource>,
    options: AssembleOptions,
    initial: RefreshRequest,
) -> Result<(), AppError> {
    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(&config, source, options, initial);
    app.submit(&mut terminal)?;
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Series(usize),
    Start,
    End,
    Submit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Continue,
    Submit,
    Quit,
}

#[derive(Debug, Clone)]
struct Status {
    text: String,
    is_error: bool,
}

impl Status {
    fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

struct App {
    entries: Vec<CatalogEntry>,
    checked: Vec<bool>,
    start_input: String,
    end_input: String,
    selected: usize,
    /// Date field being edited and its scratch buffer.
    editing: Option<(Field, String)>,
    submit_count: u64,
    status: Status,
    source: Box<dyn SeriesSource>,
    options: AssembleOptions,
    payload: Option<ChartPayload>,
}

impl App {
    fn new(config: &Config, source: Box<dyn SeriesSource>, options: AssembleOptions, initial: RefreshRequest) -> Self {
        let selected_ids = selection_values(&initial.selection);

        // Ids passed on the command line but missing from the catalog still get a row.
        let mut entries = config.catalog.series.clone();
        for id in &selected_ids {
            let id = SeriesId::new(id.trim());
            if !id.as_str().is_empty() && !entries.iter().any(|e| e.id == id) {
                entries.push(CatalogEntry {
                    id,
                    label: String::new(),
                });
            }
        }
        let checked = entries
            .iter()
            .map(|e| selected_ids.iter().any(|s| s.trim() == e.id.as_str()))
            .collect();

        Self {
            entries,
            checked,
            start_input: initial.start,
            end_input: initial.end,
            selected: 0,
            editing: None,
            submit_count: initial.submit_count,
            status: Status::info(format!("Fetching from {}...", source.name())),
            source,
            options,
            payload: None,
        }
    }

    fn field(&self) -> Field {
        let n = self.entries.len();
        match self.selected {
            i if i < n => Field::Series(i),
            i if i == n => Field::Start,
            i if i == n + 1 => Field::End,
            _ => Field::Submit,
        }
    }

    fn field_count(&self) -> usize {
        self.entries.len() + 3
    }

    /// Immutable snapshot of the widgets for the refresh pipeline.
    fn snapshot(&self) -> RefreshRequest {
        let values = self
            .entries
            .iter()
            .zip(&self.checked)
            .filter(|(_, on)| **on)
            .map(|(e, _)| e.id.to_string())
            .collect();
        RefreshRequest {
            submit_count: self.submit_count,
            selection: Selection::from_values(values),
            start: self.start_input.clone(),
            end: self.end_input.clone(),
        }
    }

    fn event_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                self.redraw(terminal)?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    match self.handle_key(key.code) {
                        Action::Quit => break,
                        Action::Submit => self.submit(terminal)?,
                        Action::Continue => {}
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn redraw<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        terminal
            .draw(|f| self.draw(f))
            .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
        Ok(())
    }

    /// Run one refresh. The fetch blocks; the status line says so first.
    fn submit<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        self.status = Status::info("Fetching...");
        self.redraw(terminal)?;

        let request = self.snapshot();
        self.submit_count += 1;

        match pipeline::refresh(self.source.as_ref(), &request, &self.options) {
            Ok(payload) => {
                self.status = Status::info(refresh_summary(&payload));
                self.payload = Some(payload);
            }
            Err(err) => {
                self.status = Status::error(err.to_string());
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode) -> Action {
        if self.editing.is_some() {
            self.handle_date_edit(code);
            return Action::Continue;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => return Action::Quit,
            KeyCode::Char('s') => return Action::Submit,
            KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down => {
                if self.selected + 1 < self.field_count() {
                    self.selected += 1;
                }
            }
            KeyCode::Char(' ') => {
                if let Field::Series(i) = self.field() {
                    self.toggle(i);
                }
            }
            KeyCode::Enter => match self.field() {
                Field::Series(i) => self.toggle(i),
                field @ (Field::Start | Field::End) => {
                    let current = if field == Field::Start {
                        self.start_input.clone()
                    } else {
                        self.end_input.clone()
                    };
                    self.editing = Some((field, current));
                    self.status = Status::info("Editing date (year/month/day). Enter to apply, Esc to cancel.");
                }
                Field::Submit => return Action::Submit,
            },
            _ => {}
        }

        Action::Continue
    }

    fn toggle(&mut self, index: usize) {
        if let Some(on) = self.checked.get_mut(index) {
            *on = !*on;
        }
    }

    fn handle_date_edit(&mut self, code: KeyCode) {
        let Some((field, buffer)) = self.editing.as_mut() else {
            return;
        };
        match code {
            KeyCode::Esc => {
                self.editing = None;
                self.status = Status::info("Date edit canceled.");
            }
            KeyCode::Enter => {
                let (field, value) = (*field, buffer.trim().to_string());
                self.editing = None;
                self.status = match parse_date(&value) {
                    Ok(date) => Status::info(format!("Date set to {date}. Press s to submit.")),
                    Err(err) => Status::error(err.to_string()),
                };
                match field {
                    Field::Start => self.start_input = value,
                    Field::End => self.end_input = value,
                    _ => {}
                }
            }
            KeyCode::Backspace => {
                buffer.pop();
            }
            KeyCode::Char(c) => {
                if c.is_ascii_digit() || matches!(c, '-' | '/' | '.' | ' ') {
                    buffer.push(c);
                }
            }
            _ => {}
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(frame.area());

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("Mortgage Rate Dash", Style::default().fg(Color::Cyan)),
            Span::raw(format!(" | source: {}", self.source.name())),
        ]));

        let summary = match &self.payload {
            Some(p) => format!(
                "showing: {} | {} points | refreshes: {}",
                p.lines
                    .iter()
                    .map(|l| l.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                p.total_points(),
                self.submit_count,
            ),
            None => "showing: -".to_string(),
        };
        lines.push(Line::from(Span::styled(summary, Style::default().fg(Color::Gray))));

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(44)])
            .split(area);

        self.draw_chart(frame, chunks[0]);
        self.draw_settings(frame, chunks[1]);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let title = self.payload.as_ref().map(|p| p.title.as_str()).unwrap_or("Chart");
        let block = Block::default().title(title).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let Some(payload) = &self.payload else {
            let msg = Paragraph::new("Waiting for data...").style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, inner);
            return;
        };

        let Some((lines, x_bounds, y_bounds)) = chart_lines(payload) else {
            let msg = Paragraph::new("No observations in range.").style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, inner);
            return;
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(inner);

        let widget = DashPlottersChart {
            lines: &lines,
            x_bounds,
            y_bounds,
            x_label: &payload.x_axis_title,
            y_label: &payload.y_axis_title,
            fmt_x: fmt_axis_x,
            fmt_y: fmt_axis_y,
        };
        frame.render_widget(widget, chunks[0]);
        frame.render_widget(Paragraph::new(legend(payload)), chunks[1]);
    }

    fn draw_settings(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut items = Vec::with_capacity(self.field_count());
        for (entry, on) in self.entries.iter().zip(&self.checked) {
            let mark = if *on { "[x]" } else { "[ ]" };
            items.push(ListItem::new(Line::from(vec![
                Span::raw(format!("{mark} ")),
                Span::styled(entry.display_label().to_string(), Style::default().add_modifier(Modifier::BOLD)),
                Span::styled(format!("  {}", entry.id), Style::default().fg(Color::Gray)),
            ])));
        }
        items.push(ListItem::new(format!("Start: {}", self.date_display(Field::Start))));
        items.push(ListItem::new(format!("End:   {}", self.date_display(Field::End))));
        items.push(ListItem::new(Span::styled(
            "[ Submit ]",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )));

        let list = List::new(items)
            .block(Block::default().title("Settings").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ListState::default();
        state.select(Some(self.selected));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn date_display(&self, field: Field) -> String {
        match &self.editing {
            Some((editing, buffer)) if *editing == field => format!("{buffer}▏"),
            _ if field == Field::Start => self.start_input.clone(),
            _ => self.end_input.clone(),
        }
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  space toggle  Enter edit/submit  s submit  q quit";
        let status_style = if self.status.is_error {
            Style::default().fg(Color::Red)
        } else {
            Style::default().fg(Color::Yellow)
        };
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(self.status.text.as_str(), status_style),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn selection_values(selection: &Selection) -> Vec<String> {
    match selection {
        Selection::One(id) => vec![id.clone()],
        Selection::Many(ids) => ids.clone(),
    }
}

fn refresh_summary(payload: &ChartPayload) -> String {
    let mut text = format!(
        "Loaded {} series ({} points).",
        payload.lines.len(),
        payload.total_points()
    );
    if !payload.skipped.is_empty() {
        let names: Vec<&str> = payload.skipped.iter().map(|s| s.series.as_str()).collect();
        text.push_str(&format!(" Skipped: {}.", names.join(", ")));
    }
    info!("{text}");
    text
}

fn palette_color(index: usize) -> (u8, u8, u8) {
    PALETTE[index % PALETTE.len()]
}

fn legend(payload: &ChartPayload) -> Line<'static> {
    let mut spans = Vec::new();
    for (idx, line) in payload.lines.iter().enumerate() {
        let (r, g, b) = palette_color(idx);
        spans.push(Span::styled("━━ ", Style::default().fg(Color::Rgb(r, g, b))));
        spans.push(Span::raw(format!("{}   ", line.name)));
    }
    Line::from(spans)
}

fn day_number(date: NaiveDate) -> f64 {
    date.num_days_from_ce() as f64
}

/// Build Plotters lines and padded bounds; `None` when nothing has a value.
fn chart_lines(payload: &ChartPayload) -> Option<(Vec<PlotLine>, [f64; 2], [f64; 2])> {
    let (d_min, d_max) = payload.date_bounds()?;
    let (y_min, y_max) = payload.value_bounds()?;

    let lines = payload
        .lines
        .iter()
        .enumerate()
        .map(|(idx, line)| PlotLine {
            segments: line
                .segments()
                .into_iter()
                .map(|seg| seg.into_iter().map(|(d, v)| (day_number(d), v)).collect())
                .collect(),
            color: palette_color(idx),
        })
        .collect();

    let mut x0 = day_number(d_min);
    let mut x1 = day_number(d_max);
    if x1 <= x0 {
        x0 -= 1.0;
        x1 += 1.0;
    }

    let pad = ((y_max - y_min).abs() * 0.05).max(0.01);
    Some((lines, [x0, x1], [y_min - pad, y_max + pad]))
}

fn fmt_axis_x(v: f64) -> String {
    NaiveDate::from_num_days_from_ce_opt(v.round() as i32)
        .map(|d| d.format("%Y-%m").to_string())
        .unwrap_or_default()
}

fn fmt_axis_y(v: f64) -> String {
    format!("{v:.2}")
}
