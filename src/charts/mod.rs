//! Chart Utilities
//!
//! Chart descriptions (`Chart`), multi-panel figures, and a `ChartSink` that
//! renders figures to SVG files in an output directory. The `create_*`
//! helpers build the common dataset charts in one call.

pub mod render;
pub mod svg;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::data::{DataError, Dataset};
use crate::stats::descriptive::{quantile_sorted, value_counts};

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error("Nothing to plot: {0}")]
    Empty(String),
}

/// Title and axis labels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Labels {
    pub title: String,
    pub x: String,
    pub y: String,
}

impl Labels {
    pub fn new(title: impl Into<String>, x: impl Into<String>, y: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            x: x.into(),
            y: y.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub categories: Vec<String>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupedBarChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub categories: Vec<String>,
    /// One series per group, aligned with `categories`
    pub series: Vec<(String, Vec<f64>)>,
}

/// Five-number summary with Tukey whiskers (1.5 IQR).
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub label: String,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub whisker_low: f64,
    pub whisker_high: f64,
    pub outliers: Vec<f64>,
}

impl BoxStats {
    /// `None` when there are no finite values.
    pub fn from_values(label: impl Into<String>, values: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let q1 = quantile_sorted(&sorted, 0.25);
        let median = quantile_sorted(&sorted, 0.5);
        let q3 = quantile_sorted(&sorted, 0.75);
        let iqr = q3 - q1;
        let (fence_lo, fence_hi) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

        let inside = sorted.iter().copied().filter(|v| *v >= fence_lo && *v <= fence_hi);
        let whisker_low = inside.clone().fold(q1, f64::min);
        let whisker_high = inside.fold(q3, f64::max);
        let outliers = sorted
            .iter()
            .copied()
            .filter(|v| *v < fence_lo || *v > fence_hi)
            .collect();

        Some(Self {
            label: label.into(),
            q1,
            median,
            q3,
            whisker_low,
            whisker_high,
            outliers,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxPlot {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub boxes: Vec<BoxStats>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub title: String,
    pub x_label: String,
    /// `counts.len() + 1` bin edges
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Equal-width bins; Sturges' rule when `bins` is `None`.
    pub fn from_values(
        title: impl Into<String>,
        x_label: impl Into<String>,
        values: &[f64],
        bins: Option<usize>,
    ) -> Result<Self, ChartError> {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let (lo, hi) = svg::extent(finite.iter().copied())
            .ok_or_else(|| ChartError::Empty("histogram has no finite values".to_string()))?;

        let n_bins = bins
            .unwrap_or_else(|| ((finite.len() as f64).log2().ceil() as usize + 1).min(50))
            .max(1);
        let (lo, hi) = if hi > lo { (lo, hi) } else { (lo - 0.5, hi + 0.5) };
        let width = (hi - lo) / n_bins as f64;

        let edges: Vec<f64> = (0..=n_bins).map(|i| lo + width * i as f64).collect();
        let mut counts = vec![0usize; n_bins];
        for v in finite {
            let bin = (((v - lo) / width) as usize).min(n_bins - 1);
            counts[bin] += 1;
        }

        Ok(Self {
            title: title.into(),
            x_label: x_label.into(),
            edges,
            counts,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterPlot {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub x_labels: Vec<String>,
    /// One series per hue, aligned with `x_labels`; `None` leaves a gap
    pub series: Vec<(String, Vec<Option<f64>>)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Heatmap {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
    pub values: Vec<Vec<f64>>,
    pub annotate: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Chart {
    Bar(BarChart),
    GroupedBar(GroupedBarChart),
    Box(BoxPlot),
    Histogram(Histogram),
    Scatter(ScatterPlot),
    Line(LineChart),
    Heatmap(Heatmap),
}

/// One or more charts side by side under an optional title.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub title: Option<String>,
    pub panels: Vec<Chart>,
}

impl Figure {
    pub fn single(chart: Chart) -> Self {
        Self {
            title: None,
            panels: vec![chart],
        }
    }

    pub fn side_by_side(title: impl Into<String>, panels: Vec<Chart>) -> Self {
        Self {
            title: Some(title.into()),
            panels,
        }
    }

    pub fn to_svg(&self) -> String {
        render::render_figure(self)
    }
}

/// Writes figures as SVG files into one directory.
#[derive(Debug)]
pub struct ChartSink {
    dir: PathBuf,
    written: Vec<PathBuf>,
    used: HashMap<String, usize>,
}

impl ChartSink {
    /// Create the output directory if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, ChartError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            written: Vec::new(),
            used: HashMap::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Files written so far, in order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    /// Render and write a figure. Repeated names get a numeric suffix.
    pub fn save(&mut self, name: &str, figure: &Figure) -> Result<PathBuf, ChartError> {
        let stem = sanitize_file_name(name);
        let count = self.used.entry(stem.clone()).or_insert(0);
        *count += 1;
        let file = if *count == 1 {
            format!("{stem}.svg")
        } else {
            format!("{stem}_{count}.svg")
        };

        let path = self.dir.join(file);
        fs::write(&path, figure.to_svg())?;
        debug!(path = %path.display(), panels = figure.panels.len(), "Wrote chart");
        self.written.push(path.clone());
        Ok(path)
    }

    pub fn save_chart(&mut self, name: &str, chart: Chart) -> Result<PathBuf, ChartError> {
        self.save(name, &Figure::single(chart))
    }
}

/// Lowercase ASCII alphanumerics with runs of anything else collapsed to `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "chart".to_string()
    } else {
        trimmed.to_string()
    }
}

// ============================================================================
// Dataset helpers
// ============================================================================

/// Mean of `y_col` per value of `x_col`, in first-appearance order.
pub fn group_means(data: &Dataset, x_col: &str, y_col: &str) -> Result<Vec<(String, f64)>, ChartError> {
    let values = data.numeric(y_col)?;
    Ok(data
        .group_indices(x_col)?
        .into_iter()
        .filter_map(|(key, rows)| {
            let sample: Vec<f64> = rows.iter().filter_map(|&r| values[r]).collect();
            (!sample.is_empty()).then(|| (key, sample.iter().sum::<f64>() / sample.len() as f64))
        })
        .collect())
}

/// Bar chart of the mean of `y_col` per value of `x_col`.
pub fn create_bar_chart(
    sink: &mut ChartSink,
    data: &Dataset,
    x_col: &str,
    y_col: &str,
    labels: &Labels,
) -> Result<PathBuf, ChartError> {
    let (categories, values) = group_means(data, x_col, y_col)?.into_iter().unzip();
    sink.save_chart(
        &labels.title,
        Chart::Bar(BarChart {
            title: labels.title.clone(),
            x_label: labels.x.clone(),
            y_label: labels.y.clone(),
            categories,
            values,
        }),
    )
}

/// Grouped bars: pivot of mean `y_col` with `x_col` as index and
/// `group_col` as columns (both sorted), missing cells filled with 0.
pub fn create_grouped_bar_chart(
    sink: &mut ChartSink,
    data: &Dataset,
    x_col: &str,
    y_col: &str,
    group_col: &str,
    labels: &Labels,
) -> Result<PathBuf, ChartError> {
    let chart = pivot_means(data, x_col, y_col, group_col, labels)?;
    sink.save_chart(&labels.title, Chart::GroupedBar(chart))
}

pub fn pivot_means(
    data: &Dataset,
    x_col: &str,
    y_col: &str,
    group_col: &str,
    labels: &Labels,
) -> Result<GroupedBarChart, ChartError> {
    let values = data.numeric(y_col)?;
    let xs = data.column(x_col)?;
    let groups = data.column(group_col)?;

    let mut cells: BTreeMap<(String, String), (f64, usize)> = BTreeMap::new();
    for row in 0..data.n_rows() {
        let (Some(x), Some(g), Some(v)) = (xs.key_at(row), groups.key_at(row), values[row]) else {
            continue;
        };
        let cell = cells.entry((x, g)).or_insert((0.0, 0));
        cell.0 += v;
        cell.1 += 1;
    }

    let categories: Vec<String> = cells
        .keys()
        .map(|(x, _)| x.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let group_names: BTreeSet<String> = cells.keys().map(|(_, g)| g.clone()).collect();

    let series = group_names
        .into_iter()
        .map(|g| {
            let row = categories
                .iter()
                .map(|x| {
                    cells
                        .get(&(x.clone(), g.clone()))
                        .map_or(0.0, |(sum, n)| sum / *n as f64)
                })
                .collect();
            (g, row)
        })
        .collect();

    Ok(GroupedBarChart {
        title: labels.title.clone(),
        x_label: labels.x.clone(),
        y_label: labels.y.clone(),
        categories,
        series,
    })
}

/// Box plot of `y_col` for each value of `x_col`.
pub fn create_boxplot(
    sink: &mut ChartSink,
    data: &Dataset,
    x_col: &str,
    y_col: &str,
    labels: &Labels,
) -> Result<PathBuf, ChartError> {
    let chart = grouped_boxes(data, x_col, y_col, labels)?;
    sink.save_chart(&labels.title, Chart::Box(chart))
}

pub fn grouped_boxes(
    data: &Dataset,
    x_col: &str,
    y_col: &str,
    labels: &Labels,
) -> Result<BoxPlot, ChartError> {
    let values = data.numeric(y_col)?;
    let boxes = data
        .group_indices(x_col)?
        .into_iter()
        .filter_map(|(key, rows)| {
            let sample: Vec<f64> = rows.iter().filter_map(|&r| values[r]).collect();
            BoxStats::from_values(key, &sample)
        })
        .collect();
    Ok(BoxPlot {
        title: labels.title.clone(),
        x_label: labels.x.clone(),
        y_label: labels.y.clone(),
        boxes,
    })
}

/// Share of rows per value of `col` (percent of all rows, nulls included in
/// the total), most frequent first. Prints one line per group.
pub fn count_group_contribution(data: &Dataset, col: &str) -> Result<Vec<(String, f64)>, ChartError> {
    let counts = value_counts(data.column(col)?);
    let total = data.n_rows() as f64;
    let shares: Vec<(String, f64)> = counts
        .into_iter()
        .map(|(group, count)| (group, count as f64 / total * 100.0))
        .collect();
    for (group, pct) in &shares {
        println!("{group}: {pct:.2}% of the data");
    }
    info!(column = col, groups = shares.len(), "Computed group contribution");
    Ok(shares)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Column, ColumnData};

    fn policies() -> Dataset {
        let text = |v: &[&str]| ColumnData::Text(v.iter().map(|s| Some((*s).to_string())).collect());
        Dataset::from_columns(vec![
            Column::new("Province", text(&["GP", "WC", "GP", "KZN", "GP", "WC"])),
            Column::new("Gender", text(&["M", "F", "F", "M", "M", "F"])),
            Column::new(
                "TotalClaims",
                ColumnData::Numeric(vec![Some(10.0), Some(20.0), Some(30.0), Some(40.0), None, Some(60.0)]),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_box_stats_tukey() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 100.0];
        let b = BoxStats::from_values("x", &values).unwrap();
        assert_eq!(b.median, 3.5);
        assert_eq!(b.outliers, vec![100.0]);
        assert_eq!(b.whisker_high, 5.0);
        assert_eq!(b.whisker_low, 1.0);
        assert!(BoxStats::from_values("x", &[f64::NAN]).is_none());
    }

    #[test]
    fn test_histogram_counts_all_values() {
        let values: Vec<f64> = (0..100).map(f64::from).collect();
        let h = Histogram::from_values("h", "x", &values, Some(10)).unwrap();
        assert_eq!(h.counts.len(), 10);
        assert_eq!(h.edges.len(), 11);
        assert_eq!(h.counts.iter().sum::<usize>(), 100);
    }

    #[test]
    fn test_histogram_empty_is_error() {
        assert!(matches!(
            Histogram::from_values("h", "x", &[], None),
            Err(ChartError::Empty(_))
        ));
    }

    #[test]
    fn test_group_means_skip_nulls() {
        let means = group_means(&policies(), "Province", "TotalClaims").unwrap();
        assert_eq!(means[0], ("GP".to_string(), 20.0));
        assert_eq!(means[1], ("WC".to_string(), 40.0));
    }

    #[test]
    fn test_pivot_fills_missing_with_zero() {
        let chart = pivot_means(&policies(), "Province", "TotalClaims", "Gender", &Labels::default()).unwrap();
        assert_eq!(chart.categories, vec!["GP", "KZN", "WC"]);
        let female = &chart.series[0];
        assert_eq!(female.0, "F");
        assert_eq!(female.1, vec![30.0, 0.0, 40.0]);
    }

    #[test]
    fn test_count_group_contribution() {
        let shares = count_group_contribution(&policies(), "Province").unwrap();
        assert_eq!(shares[0].0, "GP");
        assert!((shares[0].1 - 50.0).abs() < 1e-9);
        assert_eq!(shares.len(), 3);
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("Claims by Vehicle Type"), "claims_by_vehicle_type");
        assert_eq!(sanitize_file_name("TotalClaims / Province (Top 20)"), "totalclaims_province_top_20");
        assert_eq!(sanitize_file_name("***"), "chart");
    }

    #[test]
    fn test_sink_writes_unique_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = ChartSink::new(dir.path().join("charts")).unwrap();
        let labels = Labels::new("Claims by Province", "Province", "Claims");
        let a = create_bar_chart(&mut sink, &policies(), "Province", "TotalClaims", &labels).unwrap();
        let b = create_boxplot(&mut sink, &policies(), "Province", "TotalClaims", &labels).unwrap();
        assert_ne!(a, b);
        assert!(b.ends_with("claims_by_province_2.svg"));
        assert_eq!(sink.written().len(), 2);
        let svg = std::fs::read_to_string(a).unwrap();
        assert!(svg.contains("Claims by Province"));
    }

    #[test]
    fn test_sink_saves_every_chart_variant() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = ChartSink::new(dir.path()).unwrap();
        let charts = vec![
            Chart::Histogram(
                Histogram::from_values("Premium Spread", "TotalPremium", &[1.0, 2.0, 2.5, 4.0], Some(3))
                    .unwrap(),
            ),
            Chart::Scatter(ScatterPlot {
                title: "Premium Against Claims".to_string(),
                x_label: "TotalPremium".to_string(),
                y_label: "TotalClaims".to_string(),
                points: vec![(1.0, 0.0), (2.0, 5.0), (3.0, 1.0)],
            }),
            Chart::Line(LineChart {
                title: "Monthly Claims".to_string(),
                x_label: "Month".to_string(),
                y_label: "TotalClaims".to_string(),
                x_labels: vec!["2015-01".to_string(), "2015-02".to_string(), "2015-03".to_string()],
                series: vec![("GP".to_string(), vec![Some(1.0), None, Some(3.0)])],
            }),
            Chart::Heatmap(Heatmap {
                title: "Province by Gender".to_string(),
                x_label: "Gender".to_string(),
                y_label: "Province".to_string(),
                row_labels: vec!["GP".to_string(), "WC".to_string()],
                col_labels: vec!["F".to_string(), "M".to_string()],
                values: vec![vec![1.0, 2.0], vec![0.0, 3.0]],
                annotate: true,
            }),
        ];

        for chart in charts {
            let title = match &chart {
                Chart::Histogram(c) => c.title.clone(),
                Chart::Scatter(c) => c.title.clone(),
                Chart::Line(c) => c.title.clone(),
                Chart::Heatmap(c) => c.title.clone(),
                _ => unreachable!(),
            };
            let path = sink.save_chart(&title, chart).unwrap();
            let svg = std::fs::read_to_string(&path).unwrap();
            assert!(svg.contains("<svg "), "{} is not an SVG document", path.display());
            assert!(svg.contains(&title));
        }
        assert_eq!(sink.written().len(), 4);
    }
}
