//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - confidence ellipse boundary: `*`, fitted values: `+`
//! - error trends: one letter per series at each sample, `.` in between

use crate::fisher::ConfidenceEllipse;

/// One line of a log-log trend plot (values must be > 0 to be drawn).
#[derive(Debug, Clone)]
pub struct TrendSeries {
    pub label: String,
    pub symbol: char,
    pub points: Vec<(f64, f64)>,
}

/// Render a confidence ellipse around its centre.
pub fn render_ellipse(ellipse: &ConfidenceEllipse, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (x_min, x_max) = range(ellipse.points.iter().map(|p| p.0)).unwrap_or((ellipse.centre.0 - 1.0, ellipse.centre.0 + 1.0));
    let (y_min, y_max) = range(ellipse.points.iter().map(|p| p.1)).unwrap_or((ellipse.centre.1 - 1.0, ellipse.centre.1 + 1.0));
    let (x_min, x_max) = pad_range(x_min, x_max, 0.05);
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];
    draw_polyline(&mut grid, &ellipse.points, (x_min, x_max), (y_min, y_max), '*', true);
    let cx = map_x(ellipse.centre.0, x_min, x_max, width);
    let cy = map_y(ellipse.centre.1, y_min, y_max, height);
    grid[cy][cx] = '+';

    let mut out = String::new();
    out.push_str(&format!(
        "Ellipse (k={}): x={} [{x_min:.4}, {x_max:.4}] | y={} [{y_min:.4}, {y_max:.4}]\n",
        ellipse.k, ellipse.x_name, ellipse.y_name
    ));
    push_grid(&mut out, grid);
    out
}

/// Render several series on shared log10 axes.
pub fn render_trends(series: &[TrendSeries], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let logged: Vec<Vec<(f64, f64)>> = series
        .iter()
        .map(|s| {
            s.points
                .iter()
                .filter(|(x, y)| *x > 0.0 && *y > 0.0 && x.is_finite() && y.is_finite())
                .map(|(x, y)| (x.log10(), y.log10()))
                .collect()
        })
        .collect();

    let (x_min, x_max) = range(logged.iter().flatten().map(|p| p.0)).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = range(logged.iter().flatten().map(|p| p.1)).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];
    // Lines first so the sample markers overlay them.
    for pts in &logged {
        draw_polyline(&mut grid, pts, (x_min, x_max), (y_min, y_max), '.', false);
    }
    for (s, pts) in series.iter().zip(&logged) {
        for &(x, y) in pts {
            let col = map_x(x, x_min, x_max, width);
            let row = map_y(y, y_min, y_max, height);
            grid[row][col] = s.symbol;
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: log10(x)=[{x_min:.3}, {x_max:.3}] | log10(y)=[{y_min:.2}, {y_max:.2}]\n"
    ));
    push_grid(&mut out, grid);
    for s in series {
        out.push_str(&format!("  {}: {}\n", s.symbol, s.label));
    }
    out
}

fn push_grid(out: &mut String, grid: Vec<Vec<char>>) {
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
}

fn range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        min = min.min(v);
        max = max.max(v);
    }
    if min.is_finite() && max.is_finite() && max > min {
        Some((min, max))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_polyline(
    grid: &mut [Vec<char>],
    points: &[(f64, f64)],
    (x_min, x_max): (f64, f64),
    (y_min, y_max): (f64, f64),
    ch: char,
    closed: bool,
) {
    if points.is_empty() {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();
    let cells: Vec<(usize, usize)> = points
        .iter()
        .map(|&(x, y)| (map_x(x, x_min, x_max, width), map_y(y, y_min, y_max, height)))
        .collect();

    for w in cells.windows(2) {
        draw_line(grid, w[0].0, w[0].1, w[1].0, w[1].1, ch);
    }
    if let (true, Some(&first), Some(&last)) = (closed, cells.first(), cells.last()) {
        draw_line(grid, last.0, last.1, first.0, first.1, ch);
    }
    if cells.len() == 1 {
        let (x, y) = cells[0];
        grid[y][x] = ch;
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
