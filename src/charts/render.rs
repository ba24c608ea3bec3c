//! Chart rendering
//!
//! Draws each `Chart` kind into a panel of an `SvgCanvas`. Figures lay
//! their panels out side by side.

use super::svg::{color, extent, format_tick, short_label, ticks, Anchor, LinearScale, Rect, SvgCanvas};
use super::{BarChart, BoxPlot, Chart, Figure, GroupedBarChart, Heatmap, Histogram, LineChart, ScatterPlot};

pub const PANEL_WIDTH: f64 = 640.0;
pub const PANEL_HEIGHT: f64 = 420.0;
const SUPTITLE_HEIGHT: f64 = 30.0;
const AXIS_COLOR: &str = "#333333";
const GRID_COLOR: &str = "#e5e5e5";
const LABEL_CHARS: usize = 18;

pub fn render_figure(figure: &Figure) -> String {
    let n = figure.panels.len().max(1) as f64;
    let top = if figure.title.is_some() { SUPTITLE_HEIGHT } else { 0.0 };
    let mut canvas = SvgCanvas::new(PANEL_WIDTH * n, PANEL_HEIGHT + top);

    if let Some(title) = &figure.title {
        canvas.text(canvas.width() / 2.0, 20.0, title, 16.0, Anchor::Middle);
    }
    for (i, chart) in figure.panels.iter().enumerate() {
        let area = Rect::new(PANEL_WIDTH * i as f64, top, PANEL_WIDTH, PANEL_HEIGHT);
        render_chart(&mut canvas, chart, area);
    }
    canvas.finish()
}

fn render_chart(canvas: &mut SvgCanvas, chart: &Chart, area: Rect) {
    match chart {
        Chart::Bar(c) => bar(canvas, c, area),
        Chart::GroupedBar(c) => grouped_bar(canvas, c, area),
        Chart::Box(c) => box_plot(canvas, c, area),
        Chart::Histogram(c) => histogram(canvas, c, area),
        Chart::Scatter(c) => scatter(canvas, c, area),
        Chart::Line(c) => line(canvas, c, area),
        Chart::Heatmap(c) => heatmap(canvas, c, area),
    }
}

/// Title, axis labels, y gridlines. Returns the plotting rectangle and y scale.
fn frame(
    canvas: &mut SvgCanvas,
    area: Rect,
    title: &str,
    x_label: &str,
    y_label: &str,
    y_domain: (f64, f64),
) -> (Rect, LinearScale) {
    let plot = area.inset(36.0, 20.0, 90.0, 70.0);
    canvas.text(area.x + area.width / 2.0, area.y + 22.0, title, 14.0, Anchor::Middle);

    let y = LinearScale::new(y_domain, (plot.bottom(), plot.y));
    let (lo, hi) = y.domain();
    for t in ticks(lo, hi, 5) {
        let py = y.map(t);
        canvas.line(plot.x, py, plot.right(), py, GRID_COLOR, 1.0);
        canvas.text(plot.x - 6.0, py + 4.0, &format_tick(t), 10.0, Anchor::End);
    }

    canvas.line(plot.x, plot.bottom(), plot.right(), plot.bottom(), AXIS_COLOR, 1.0);
    canvas.line(plot.x, plot.y, plot.x, plot.bottom(), AXIS_COLOR, 1.0);
    canvas.text(plot.x + plot.width / 2.0, area.bottom() - 8.0, x_label, 12.0, Anchor::Middle);
    canvas.rotated_text(area.x + 16.0, plot.y + plot.height / 2.0, y_label, 12.0, -90.0, Anchor::Middle);
    (plot, y)
}

/// Rotated category labels under evenly spaced slots.
fn category_labels(canvas: &mut SvgCanvas, plot: Rect, labels: &[String]) {
    let slot = plot.width / labels.len().max(1) as f64;
    for (i, label) in labels.iter().enumerate() {
        let x = plot.x + slot * (i as f64 + 0.5);
        canvas.rotated_text(
            x,
            plot.bottom() + 14.0,
            &short_label(label, LABEL_CHARS),
            10.0,
            -45.0,
            Anchor::End,
        );
    }
}

/// Bars start from zero, so zero is always inside the y domain.
fn zero_based(values: impl IntoIterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = extent(values).unwrap_or((0.0, 1.0));
    (lo.min(0.0), hi.max(0.0))
}

fn bar(canvas: &mut SvgCanvas, c: &BarChart, area: Rect) {
    let (plot, y) = frame(
        canvas,
        area,
        &c.title,
        &c.x_label,
        &c.y_label,
        zero_based(c.values.iter().copied()),
    );
    let slot = plot.width / c.values.len().max(1) as f64;
    let zero = y.map(0.0);
    for (i, &v) in c.values.iter().enumerate() {
        if !v.is_finite() {
            continue;
        }
        let top = y.map(v);
        canvas.rect(
            Rect::new(plot.x + slot * i as f64 + slot * 0.1, top.min(zero), slot * 0.8, (zero - top).abs()),
            color(0),
            None,
        );
    }
    category_labels(canvas, plot, &c.categories);
}

fn grouped_bar(canvas: &mut SvgCanvas, c: &GroupedBarChart, area: Rect) {
    let values = c.series.iter().flat_map(|(_, v)| v.iter().copied());
    let (plot, y) = frame(canvas, area, &c.title, &c.x_label, &c.y_label, zero_based(values));
    let slot = plot.width / c.categories.len().max(1) as f64;
    let bar_width = slot * 0.8 / c.series.len().max(1) as f64;
    let zero = y.map(0.0);

    for (s, (name, values)) in c.series.iter().enumerate() {
        for (i, &v) in values.iter().enumerate() {
            if !v.is_finite() {
                continue;
            }
            let top = y.map(v);
            let x = plot.x + slot * i as f64 + slot * 0.1 + bar_width * s as f64;
            canvas.rect(Rect::new(x, top.min(zero), bar_width, (zero - top).abs()), color(s), None);
        }
        legend_entry(canvas, plot, s, name);
    }
    category_labels(canvas, plot, &c.categories);
}

fn legend_entry(canvas: &mut SvgCanvas, plot: Rect, index: usize, name: &str) {
    let y = plot.y + 4.0 + 14.0 * index as f64;
    canvas.rect(Rect::new(plot.right() - 110.0, y, 10.0, 10.0), color(index), None);
    canvas.text(plot.right() - 96.0, y + 9.0, &short_label(name, 14), 10.0, Anchor::Start);
}

fn box_plot(canvas: &mut SvgCanvas, c: &BoxPlot, area: Rect) {
    let values = c.boxes.iter().flat_map(|b| {
        b.outliers
            .iter()
            .copied()
            .chain([b.whisker_low, b.whisker_high])
    });
    let domain = extent(values).unwrap_or((0.0, 1.0));
    let (plot, y) = frame(canvas, area, &c.title, &c.x_label, &c.y_label, domain);
    let slot = plot.width / c.boxes.len().max(1) as f64;

    for (i, b) in c.boxes.iter().enumerate() {
        let cx = plot.x + slot * (i as f64 + 0.5);
        let half = slot * 0.3;
        let fill = color(i);
        canvas.line(cx, y.map(b.whisker_low), cx, y.map(b.q1), "#555555", 1.0);
        canvas.line(cx, y.map(b.q3), cx, y.map(b.whisker_high), "#555555", 1.0);
        canvas.line(cx - half / 2.0, y.map(b.whisker_low), cx + half / 2.0, y.map(b.whisker_low), "#555555", 1.0);
        canvas.line(cx - half / 2.0, y.map(b.whisker_high), cx + half / 2.0, y.map(b.whisker_high), "#555555", 1.0);
        let top = y.map(b.q3);
        canvas.rect(
            Rect::new(cx - half, top, half * 2.0, y.map(b.q1) - top),
            fill,
            Some("#555555"),
        );
        canvas.line(cx - half, y.map(b.median), cx + half, y.map(b.median), "#222222", 2.0);
        for &o in &b.outliers {
            canvas.circle(cx, y.map(o), 2.5, "#555555", 0.6);
        }
    }
    let labels: Vec<String> = c.boxes.iter().map(|b| b.label.clone()).collect();
    category_labels(canvas, plot, &labels);
}

fn histogram(canvas: &mut SvgCanvas, c: &Histogram, area: Rect) {
    let max_count = c.counts.iter().copied().max().unwrap_or(0) as f64;
    let (plot, y) = frame(canvas, area, &c.title, &c.x_label, "Count", (0.0, max_count.max(1.0)));
    let (lo, hi) = match (c.edges.first(), c.edges.last()) {
        (Some(&lo), Some(&hi)) => (lo, hi),
        _ => return,
    };
    let x = LinearScale::new((lo, hi), (plot.x, plot.right()));
    for (i, &count) in c.counts.iter().enumerate() {
        let x0 = x.map(c.edges[i]);
        let x1 = x.map(c.edges[i + 1]);
        let top = y.map(count as f64);
        canvas.rect(Rect::new(x0, top, (x1 - x0).max(0.5), plot.bottom() - top), color(0), Some("#ffffff"));
    }
    for t in ticks(x.domain().0, x.domain().1, 5) {
        canvas.text(x.map(t), plot.bottom() + 16.0, &format_tick(t), 10.0, Anchor::Middle);
    }
}

fn scatter(canvas: &mut SvgCanvas, c: &ScatterPlot, area: Rect) {
    let y_domain = extent(c.points.iter().map(|p| p.1)).unwrap_or((0.0, 1.0));
    let (plot, y) = frame(canvas, area, &c.title, &c.x_label, &c.y_label, y_domain);
    let x_domain = extent(c.points.iter().map(|p| p.0)).unwrap_or((0.0, 1.0));
    let x = LinearScale::new(x_domain, (plot.x, plot.right()));
    for &(px, py) in &c.points {
        if px.is_finite() && py.is_finite() {
            canvas.circle(x.map(px), y.map(py), 2.5, color(0), 0.5);
        }
    }
    for t in ticks(x.domain().0, x.domain().1, 5) {
        canvas.text(x.map(t), plot.bottom() + 16.0, &format_tick(t), 10.0, Anchor::Middle);
    }
}

fn line(canvas: &mut SvgCanvas, c: &LineChart, area: Rect) {
    let values = c.series.iter().flat_map(|(_, v)| v.iter().flatten().copied());
    let domain = extent(values).unwrap_or((0.0, 1.0));
    let (plot, y) = frame(canvas, area, &c.title, &c.x_label, &c.y_label, domain);
    let n = c.x_labels.len();
    let step = if n > 1 { plot.width / (n - 1) as f64 } else { 0.0 };

    for (s, (name, values)) in c.series.iter().enumerate() {
        // Missing points break the line into segments
        let mut segment: Vec<(f64, f64)> = Vec::new();
        for (i, v) in values.iter().enumerate() {
            match v {
                Some(v) if v.is_finite() => segment.push((plot.x + step * i as f64, y.map(*v))),
                _ => {
                    canvas.polyline(&segment, color(s), 1.5);
                    segment.clear();
                }
            }
        }
        canvas.polyline(&segment, color(s), 1.5);
        legend_entry(canvas, plot, s, name);
    }

    let every = (n / 12).max(1);
    for (i, label) in c.x_labels.iter().enumerate().step_by(every) {
        canvas.rotated_text(plot.x + step * i as f64, plot.bottom() + 14.0, label, 10.0, -45.0, Anchor::End);
    }
}

fn heatmap(canvas: &mut SvgCanvas, c: &Heatmap, area: Rect) {
    let plot = area.inset(36.0, 20.0, 90.0, 110.0);
    canvas.text(area.x + area.width / 2.0, area.y + 22.0, &c.title, 14.0, Anchor::Middle);

    let n_rows = c.row_labels.len().max(1) as f64;
    let n_cols = c.col_labels.len().max(1) as f64;
    let cell_w = plot.width / n_cols;
    let cell_h = plot.height / n_rows;
    let (lo, hi) = extent(c.values.iter().flatten().copied()).unwrap_or((0.0, 1.0));
    let span = if hi > lo { hi - lo } else { 1.0 };

    for (r, row) in c.values.iter().enumerate() {
        for (col, &v) in row.iter().enumerate() {
            let cell = Rect::new(plot.x + cell_w * col as f64, plot.y + cell_h * r as f64, cell_w, cell_h);
            canvas.rect(cell, &viridis((v - lo) / span), Some("#ffffff"));
            if c.annotate {
                canvas.text(
                    cell.x + cell_w / 2.0,
                    cell.y + cell_h / 2.0 + 4.0,
                    &format_tick(v),
                    9.0,
                    Anchor::Middle,
                );
            }
        }
    }
    for (r, label) in c.row_labels.iter().enumerate() {
        canvas.text(
            plot.x - 6.0,
            plot.y + cell_h * (r as f64 + 0.5) + 4.0,
            &short_label(label, LABEL_CHARS),
            10.0,
            Anchor::End,
        );
    }
    category_labels(canvas, plot, &c.col_labels);
    canvas.text(plot.x + plot.width / 2.0, area.bottom() - 8.0, &c.x_label, 12.0, Anchor::Middle);
    canvas.rotated_text(area.x + 14.0, plot.y + plot.height / 2.0, &c.y_label, 12.0, -90.0, Anchor::Middle);
}

/// Approximate viridis colour for `t` in [0, 1].
fn viridis(t: f64) -> String {
    const STOPS: [(f64, f64, f64); 5] = [
        (68.0, 1.0, 84.0),
        (59.0, 82.0, 139.0),
        (33.0, 145.0, 140.0),
        (94.0, 201.0, 98.0),
        (253.0, 231.0, 37.0),
    ];
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let pos = t * (STOPS.len() - 1) as f64;
    let i = (pos.floor() as usize).min(STOPS.len() - 2);
    let f = pos - i as f64;
    let (a, b) = (STOPS[i], STOPS[i + 1]);
    let mix = |x: f64, y: f64| (x + (y - x) * f).round() as u8;
    format!("#{:02x}{:02x}{:02x}", mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}
