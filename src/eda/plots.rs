//! EDA visualizations
//!
//! Every function takes the cleaned dataset, writes its figures through the
//! `ChartSink` and returns the paths written. Outliers are drawn, never
//! removed.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::{debug, error};

use super::{EdaError, EdaSettings};
use crate::charts::{
    group_means, grouped_boxes, BarChart, BoxPlot, BoxStats, Chart, ChartError, ChartSink, Figure,
    Heatmap, Histogram, Labels, LineChart, ScatterPlot,
};
use crate::data::columns::{POLICY_ID, PROVINCE, TOTAL_CLAIMS, TOTAL_PREMIUM, TRANSACTION_MONTH, VEHICLE_TYPE};
use crate::data::{ColumnData, ColumnKind, Dataset};
use crate::stats::descriptive::value_counts;

/// Histograms of numeric columns and top-N bar charts of categorical
/// columns, `batch_size` panels per figure.
pub fn univariate_analysis(
    data: &Dataset,
    sink: &mut ChartSink,
    settings: &EdaSettings,
) -> Result<Vec<PathBuf>, EdaError> {
    let mut numeric_panels = Vec::new();
    for name in data.names_of_kind(ColumnKind::Numeric) {
        let values: Vec<f64> = data.numeric(&name)?.iter().flatten().copied().collect();
        match Histogram::from_values(format!("Distribution of {name}"), name.as_str(), &values, None) {
            Ok(h) => numeric_panels.push(Chart::Histogram(h)),
            Err(ChartError::Empty(_)) => debug!(column = %name, "No values to plot"),
            Err(e) => return Err(e.into()),
        }
    }

    let mut categorical_panels = Vec::new();
    for name in data.names_of_kind(ColumnKind::Categorical) {
        let top: Vec<(String, usize)> = value_counts(data.column(&name)?)
            .into_iter()
            .take(settings.top_categories)
            .collect();
        let (categories, values) = top.into_iter().map(|(k, c)| (k, c as f64)).unzip();
        categorical_panels.push(Chart::Bar(BarChart {
            title: format!("{name} (Top {})", settings.top_categories),
            x_label: name.clone(),
            y_label: "Count".to_string(),
            categories,
            values,
        }));
    }

    let mut written = save_batches(sink, "Numerical Columns", numeric_panels, settings.batch_size)?;
    written.extend(save_batches(
        sink,
        "Categorical Columns",
        categorical_panels,
        settings.batch_size,
    )?);
    Ok(written)
}

fn save_batches(
    sink: &mut ChartSink,
    title: &str,
    panels: Vec<Chart>,
    batch_size: usize,
) -> Result<Vec<PathBuf>, ChartError> {
    panels
        .chunks(batch_size.max(1))
        .enumerate()
        .map(|(i, batch)| {
            let figure = Figure::side_by_side(title, batch.to_vec());
            sink.save(&format!("{title} {}", i + 1), &figure)
        })
        .collect()
}

/// Box plots of numeric by categorical columns, cross-tabulation heatmaps
/// between categorical columns, and monthly trends by province.
pub fn bivariate_analysis(
    data: &Dataset,
    sink: &mut ChartSink,
    settings: &EdaSettings,
) -> Result<Vec<PathBuf>, EdaError> {
    let k = settings.max_pair_columns;
    let categorical = data.names_of_kind(ColumnKind::Categorical);
    let numeric = data.names_of_kind(ColumnKind::Numeric);
    let mut written = Vec::new();

    for cat in categorical.iter().take(k) {
        for num in numeric.iter().take(k) {
            let title = format!("{num} by {cat}");
            let chart = grouped_boxes(data, cat, num, &Labels::new(&title, cat.as_str(), num.as_str()))?;
            written.push(sink.save_chart(&title, Chart::Box(chart))?);
        }
    }

    for a in categorical.iter().take(k) {
        for b in categorical.iter().skip(k).take(k) {
            let heatmap = crosstab(data, a, b)?;
            written.push(sink.save_chart(&heatmap.title.clone(), Chart::Heatmap(heatmap))?);
        }
    }

    if data.has_column(TRANSACTION_MONTH) {
        for chart in monthly_trends(data)? {
            let title = chart.title.clone();
            written.push(sink.save_chart(&title, Chart::Line(chart))?);
        }
    } else {
        println!("Error: '{TRANSACTION_MONTH}' column is missing from the dataset.");
        error!(column = TRANSACTION_MONTH, "Trend analysis skipped");
    }

    Ok(written)
}

/// Counts of each (`row_col`, `col_col`) pair; labels sorted.
pub fn crosstab(data: &Dataset, row_col: &str, col_col: &str) -> Result<Heatmap, EdaError> {
    let rows = data.column(row_col)?;
    let cols = data.column(col_col)?;

    let mut counts: BTreeMap<(String, String), usize> = BTreeMap::new();
    for i in 0..data.n_rows() {
        if let (Some(r), Some(c)) = (rows.key_at(i), cols.key_at(i)) {
            *counts.entry((r, c)).or_insert(0) += 1;
        }
    }

    let row_labels: Vec<String> = counts.keys().map(|(r, _)| r.clone()).collect::<BTreeSet<_>>().into_iter().collect();
    let col_labels: Vec<String> = counts.keys().map(|(_, c)| c.clone()).collect::<BTreeSet<_>>().into_iter().collect();
    let values = row_labels
        .iter()
        .map(|r| {
            col_labels
                .iter()
                .map(|c| counts.get(&(r.clone(), c.clone())).copied().unwrap_or(0) as f64)
                .collect()
        })
        .collect();

    Ok(Heatmap {
        title: format!("Cross Tabulation of {row_col} and {col_col}"),
        x_label: col_col.to_string(),
        y_label: row_col.to_string(),
        row_labels,
        col_labels,
        values,
        annotate: true,
    })
}

/// Per month and province: summed premium, summed claims and policy count.
pub fn monthly_trends(data: &Dataset) -> Result<Vec<LineChart>, EdaError> {
    let ColumnData::Timestamp(months) = data.column(TRANSACTION_MONTH)? else {
        return Err(EdaError::NotConverted(TRANSACTION_MONTH.to_string()));
    };
    let provinces = data.column(PROVINCE)?;
    let premium = data.numeric(TOTAL_PREMIUM)?;
    let claims = data.numeric(TOTAL_CLAIMS)?;
    let policies = data.column(POLICY_ID)?;

    // (month, province) -> [premium, claims, policy count]
    let mut cells: BTreeMap<(String, String), [f64; 3]> = BTreeMap::new();
    for row in 0..data.n_rows() {
        let (Some(month), Some(province)) = (months[row], provinces.key_at(row)) else {
            continue;
        };
        let cell = cells
            .entry((month.format("%Y-%m").to_string(), province))
            .or_insert([0.0; 3]);
        cell[0] += premium[row].unwrap_or(0.0);
        cell[1] += claims[row].unwrap_or(0.0);
        if !policies.is_null(row) {
            cell[2] += 1.0;
        }
    }

    let x_labels: Vec<String> = cells.keys().map(|(m, _)| m.clone()).collect::<BTreeSet<_>>().into_iter().collect();
    let hues: BTreeSet<String> = cells.keys().map(|(_, p)| p.clone()).collect();

    let specs = [
        ("Total Premium Trends Over Time by Province", "Total Premium"),
        ("Total Claim Trends Over Time by Province", "Total Claims"),
        ("Number of Policies Trends Over Time by Province", "Policy Count"),
    ];
    Ok(specs
        .iter()
        .enumerate()
        .map(|(metric, (title, y_label))| LineChart {
            title: (*title).to_string(),
            x_label: "Month".to_string(),
            y_label: (*y_label).to_string(),
            x_labels: x_labels.clone(),
            series: hues
                .iter()
                .map(|p| {
                    let points = x_labels
                        .iter()
                        .map(|m| cells.get(&(m.clone(), p.clone())).map(|c| c[metric]))
                        .collect();
                    (p.clone(), points)
                })
                .collect(),
        })
        .collect())
}

/// One box plot per numeric column; columns without values are skipped.
pub fn outlier_detection(data: &Dataset, sink: &mut ChartSink) -> Result<Vec<PathBuf>, EdaError> {
    let mut written = Vec::new();
    for name in data.names_of_kind(ColumnKind::Numeric) {
        let values: Vec<f64> = data.numeric(&name)?.iter().flatten().copied().collect();
        let Some(stats) = BoxStats::from_values(name.as_str(), &values) else {
            println!("Skipping column '{name}' as it contains no valid data.");
            continue;
        };
        let title = format!("Box Plot of {name}");
        let chart = BoxPlot {
            title: title.clone(),
            x_label: name.clone(),
            y_label: String::new(),
            boxes: vec![stats],
        };
        written.push(sink.save_chart(&title, Chart::Box(chart))?);
    }
    Ok(written)
}

/// Claim ratio by province, mean claims by vehicle type, and a premium
/// versus claims scatter.
pub fn creative_visualizations(data: &Dataset, sink: &mut ChartSink) -> Result<Vec<PathBuf>, EdaError> {
    let premium = data.numeric(TOTAL_PREMIUM)?;
    let claims = data.numeric(TOTAL_CLAIMS)?;

    let mut ratio_categories = Vec::new();
    let mut ratios = Vec::new();
    for (province, rows) in data.group_indices(PROVINCE)? {
        let total_claims: f64 = rows.iter().filter_map(|&r| claims[r]).sum();
        let total_premium: f64 = rows.iter().filter_map(|&r| premium[r]).sum();
        ratio_categories.push(province);
        ratios.push(if total_premium == 0.0 { f64::NAN } else { total_claims / total_premium });
    }

    let mut written = vec![sink.save_chart(
        "Risk Rating by Province",
        Chart::Bar(BarChart {
            title: "Risk Rating by Province".to_string(),
            x_label: PROVINCE.to_string(),
            y_label: "ClaimRatio".to_string(),
            categories: ratio_categories,
            values: ratios,
        }),
    )?];

    let (categories, values) = group_means(data, VEHICLE_TYPE, TOTAL_CLAIMS)?.into_iter().unzip();
    written.push(sink.save_chart(
        "Claims by Vehicle Type",
        Chart::Bar(BarChart {
            title: "Claims by Vehicle Type".to_string(),
            x_label: VEHICLE_TYPE.to_string(),
            y_label: TOTAL_CLAIMS.to_string(),
            categories,
            values,
        }),
    )?);

    let points = premium
        .iter()
        .zip(claims.iter())
        .filter_map(|(p, c)| Some(((*p)?, (*c)?)))
        .collect();
    written.push(sink.save_chart(
        "Premium vs Claims Scatter Plot",
        Chart::Scatter(ScatterPlot {
            title: "Premium vs Claims Scatter Plot".to_string(),
            x_label: TOTAL_PREMIUM.to_string(),
            y_label: TOTAL_CLAIMS.to_string(),
            points,
        }),
    )?);

    Ok(written)
}
