//! Exploratory Data Analysis
//!
//! `EdaAnalyzer` holds its own copy of the dataset and moves through three
//! stages, each consuming the previous one:
//!
//! ```text
//! EdaAnalyzer<Raw> --convert_data_types--> EdaAnalyzer<Typed>
//!                  --assess_data_quality--> EdaAnalyzer<Clean>
//! ```
//!
//! Imputation needs correct numeric/categorical typing, and the plots select
//! columns by kind, so visualizations are only available on `Clean`.

pub mod plots;
pub mod quality;

pub use quality::{convert_types, impute_missing, DateParser, Imputation, QualityReport};

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

use crate::charts::{ChartError, ChartSink};
use crate::data::{ColumnKind, DataError, Dataset};
use crate::stats::descriptive::{column_kinds, describe, ColumnSummary};

#[derive(Debug, Error)]
pub enum EdaError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Chart(#[from] ChartError),

    #[error("Column {0} has not been converted to a timestamp")]
    NotConverted(String),
}

/// Plot layout settings.
#[derive(Debug, Clone)]
pub struct EdaSettings {
    /// Panels per univariate figure
    pub batch_size: usize,
    /// Categories shown per categorical bar chart
    pub top_categories: usize,
    /// Columns taken from each side in bivariate pairings
    pub max_pair_columns: usize,
}

impl Default for EdaSettings {
    fn default() -> Self {
        Self {
            batch_size: 2,
            top_categories: 20,
            max_pair_columns: 5,
        }
    }
}

impl EdaSettings {
    /// Settings from the global config when initialised, otherwise defaults.
    pub fn from_config() -> Self {
        if crate::config::is_initialized() {
            let eda = &crate::config::get().eda;
            Self {
                batch_size: eda.batch_size,
                top_categories: eda.top_categories,
                max_pair_columns: eda.max_pair_columns,
            }
        } else {
            Self::default()
        }
    }
}

/// Loaded as read; no type conversion yet.
#[derive(Debug)]
pub struct Raw;

/// Dates parsed and categorical columns converted.
#[derive(Debug)]
pub struct Typed;

/// Missing values imputed.
#[derive(Debug)]
pub struct Clean {
    report: QualityReport,
}

/// Descriptive statistics plus column kinds.
#[derive(Debug, Clone, Serialize)]
pub struct DataSummary {
    pub statistics: Vec<ColumnSummary>,
    pub kinds: Vec<(String, ColumnKind)>,
}

impl DataSummary {
    pub fn print(&self) {
        println!("Descriptive Statistics:");
        println!(
            "{:<28} {:>8} {:>14} {:>14} {:>14} {:>14} {:>14} {:>14} {:>14}",
            "", "count", "mean", "std", "min", "25%", "50%", "75%", "max"
        );
        for summary in &self.statistics {
            println!("{summary}");
        }
        println!("\nData Types:");
        for (name, kind) in &self.kinds {
            println!("{name:<28} {kind}");
        }
    }
}

#[derive(Debug)]
pub struct EdaAnalyzer<S> {
    df: Dataset,
    stage: S,
}

impl<S> EdaAnalyzer<S> {
    /// Print and return descriptive statistics and column kinds.
    pub fn summarize_data(&self) -> DataSummary {
        let summary = DataSummary {
            statistics: describe(&self.df),
            kinds: column_kinds(&self.df),
        };
        summary.print();
        summary
    }

    pub fn get_processed_df(&self) -> &Dataset {
        &self.df
    }

    pub fn into_dataset(self) -> Dataset {
        self.df
    }
}

impl EdaAnalyzer<Raw> {
    pub fn new(df: &Dataset) -> Self {
        Self {
            df: df.clone(),
            stage: Raw,
        }
    }

    pub fn convert_data_types(mut self) -> Result<EdaAnalyzer<Typed>, EdaError> {
        convert_types(&mut self.df)?;
        Ok(EdaAnalyzer {
            df: self.df,
            stage: Typed,
        })
    }
}

impl EdaAnalyzer<Typed> {
    /// Report nulls per column, then impute them.
    pub fn assess_data_quality(mut self) -> Result<EdaAnalyzer<Clean>, EdaError> {
        let report = impute_missing(&mut self.df)?;
        report.print();
        info!(
            imputed_columns = report.imputations.len(),
            unfilled = report.unfilled.len(),
            "Assessed data quality"
        );
        Ok(EdaAnalyzer {
            df: self.df,
            stage: Clean { report },
        })
    }
}

impl EdaAnalyzer<Clean> {
    pub fn quality_report(&self) -> &QualityReport {
        &self.stage.report
    }

    pub fn univariate_analysis(
        &self,
        sink: &mut ChartSink,
        settings: &EdaSettings,
    ) -> Result<Vec<PathBuf>, EdaError> {
        plots::univariate_analysis(&self.df, sink, settings)
    }

    pub fn bivariate_analysis(
        &self,
        sink: &mut ChartSink,
        settings: &EdaSettings,
    ) -> Result<Vec<PathBuf>, EdaError> {
        plots::bivariate_analysis(&self.df, sink, settings)
    }

    pub fn outlier_detection(&self, sink: &mut ChartSink) -> Result<Vec<PathBuf>, EdaError> {
        plots::outlier_detection(&self.df, sink)
    }

    pub fn creative_visualizations(&self, sink: &mut ChartSink) -> Result<Vec<PathBuf>, EdaError> {
        plots::creative_visualizations(&self.df, sink)
    }
}

/// Run every EDA step in order and return the processed dataset.
pub fn perform_eda(df: &Dataset, sink: &mut ChartSink) -> Result<Dataset, EdaError> {
    let settings = EdaSettings::from_config();

    let raw = EdaAnalyzer::new(df);
    raw.summarize_data();
    let clean = raw.convert_data_types()?.assess_data_quality()?;

    let mut charts = clean.univariate_analysis(sink, &settings)?.len();
    charts += clean.bivariate_analysis(sink, &settings)?.len();
    charts += clean.outlier_detection(sink)?.len();
    charts += clean.creative_visualizations(sink)?.len();

    info!(charts, dir = %sink.dir().display(), "EDA complete");
    Ok(clean.into_dataset())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::{generate, SyntheticConfig};

    #[test]
    fn test_stages_produce_clean_data() {
        let ds = generate(&SyntheticConfig {
            rows: 300,
            missing_rate: 0.1,
            ..Default::default()
        })
        .unwrap();

        let clean = EdaAnalyzer::new(&ds)
            .convert_data_types()
            .unwrap()
            .assess_data_quality()
            .unwrap();

        let df = clean.get_processed_df();
        for column in df.columns() {
            if matches!(column.data.kind(), ColumnKind::Numeric | ColumnKind::Categorical) {
                assert_eq!(column.data.null_count(), 0, "{} still has nulls", column.name);
            }
        }
        assert!(!clean.quality_report().imputations.is_empty());
    }

    #[test]
    fn test_analyzer_copies_input() {
        let ds = generate(&SyntheticConfig {
            rows: 20,
            ..Default::default()
        })
        .unwrap();
        let typed = EdaAnalyzer::new(&ds).convert_data_types().unwrap();
        assert_eq!(
            typed.get_processed_df().column("Province").unwrap().kind(),
            ColumnKind::Categorical
        );
        assert_eq!(ds.column("Province").unwrap().kind(), ColumnKind::Text);
    }
}
