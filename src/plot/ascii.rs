//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual checks in a terminal or a CI log
//! - deterministic output (helpful for golden tests)
//!
//! Each line gets its own glyph; when lines overlap, the earlier series wins.
//! Missing observations break a line instead of being bridged.

use chrono::{Datelike, NaiveDate};

use crate::chart::ChartPayload;

const GLYPHS: [char; 6] = ['*', '+', 'o', 'x', '#', '@'];

pub fn glyph_for(index: usize) -> char {
    GLYPHS[index % GLYPHS.len()]
}

/// Render a chart payload as text.
pub fn render_ascii_chart(payload: &ChartPayload, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (Some((d_min, d_max)), Some((y_min, y_max))) = (payload.date_bounds(), payload.value_bounds()) else {
        return format!("{}: no data to plot.\n", payload.title);
    };

    let t_min = day_number(d_min);
    let mut t_max = day_number(d_max);
    if t_max <= t_min {
        t_max = t_min + 1.0;
    }
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];
    for (idx, line) in payload.lines.iter().enumerate() {
        let glyph = glyph_for(idx);
        for segment in line.segments() {
            let cells: Vec<(usize, usize)> = segment
                .iter()
                .map(|&(d, v)| {
                    (
                        map_x(day_number(d), t_min, t_max, width),
                        map_y(v, y_min, y_max, height),
                    )
                })
                .collect();
            draw_polyline(&mut grid, &cells, glyph);
        }
    }

    let mut out = String::new();
    out.push_str(&format!("{}\n", payload.title));
    out.push_str(&format!(
        "x: {} [{d_min} .. {d_max}] | y: {} [{y_min:.2}, {y_max:.2}]\n",
        payload.x_axis_title, payload.y_axis_title
    ));

    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }

    let legend: Vec<String> = payload
        .lines
        .iter()
        .enumerate()
        .map(|(idx, line)| format!("{} {}", glyph_for(idx), line.name))
        .collect();
    out.push_str(&format!("legend: {}\n", legend.join("  ")));

    for skipped in &payload.skipped {
        out.push_str(&format!("skipped: {} ({})\n", skipped.series, skipped.reason));
    }

    out
}

fn day_number(date: NaiveDate) -> f64 {
    date.num_days_from_ce() as f64
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = if span > 0.0 { span * frac } else { 1.0 };
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_polyline(grid: &mut [Vec<char>], cells: &[(usize, usize)], ch: char) {
    match cells {
        [] => {}
        [(x, y)] => {
            if grid[*y][*x] == ' ' {
                grid[*y][*x] = ch;
            }
        }
        _ => {
            for pair in cells.windows(2) {
                let (x0, y0) = pair[0];
                let (x1, y1) = pair[1];
                draw_line(grid, x0, y0, x1, y1, ch);
            }
        }
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
