//! claims-insight - insurance claims analytics CLI
//!
//! # Usage
//!
//! ```bash
//! # Write a synthetic claims extract
//! claims-insight simulate --rows 5000 --out data/synthetic.txt
//!
//! # Exploratory analysis, charts written as SVG
//! claims-insight eda --data data/synthetic.txt --out eda_output
//!
//! # Risk difference between genders
//! claims-insight test --data data/synthetic.txt --dependent TotalClaims --independent Gender --kind ab
//!
//! # Train a forest on numeric features and explain it
//! claims-insight train --data data/synthetic.txt --target TotalClaims \
//!     --features kilowatts,SumInsured,TotalPremium --model forest --shap-out shap
//! ```
//!
//! # Environment Variables
//!
//! - `CLAIMS_INSIGHT_CONFIG`: path to a TOML config file
//! - `RUST_LOG`: logging level (default: info)

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::info;

use claims_insight::charts::{count_group_contribution, ChartSink};
use claims_insight::config::{self, defaults, AnalysisConfig};
use claims_insight::data::columns::{POSTAL_CODE_GROUP, TOTAL_CLAIMS, TOTAL_PREMIUM};
use claims_insight::data::synthetic::{generate, write_delimited, SyntheticConfig};
use claims_insight::data::{calculate_profit, group_zip_codes, load_data, Dataset};
use claims_insight::eda::perform_eda;
use claims_insight::models::{
    DecisionTreeRegressor, ForestConfig, Lasso, LinearRegression, RandomForestRegressor,
    TreeConfig, TreeExplainable,
};
use claims_insight::stats::hypothesis::{
    ab_test, anova, anova_regularized, categorical_term, decide, grouped_samples, kruskal_wallis,
    t_test, z_test, LassoSettings,
};
use claims_insight::tracking;
use claims_insight::training::{
    explain_model_with_shap, initialize_tracking, prepare_split, shap_summary_plot,
    train_and_log_model, TrainTestSplit, TrainingOutcome,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "claims-insight")]
#[command(about = "Insurance claims EDA, hypothesis testing and model training")]
#[command(version)]
struct CliArgs {
    /// TOML config file (overrides CLAIMS_INSIGHT_CONFIG and ./claims_insight.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: SubCommand,
}

#[derive(Subcommand, Debug)]
enum SubCommand {
    /// Write a reproducible synthetic claims extract
    Simulate {
        #[arg(long, default_value_t = defaults::SYNTHETIC_ROWS)]
        rows: usize,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Fraction of nullable cells left empty
        #[arg(long, default_value_t = 0.02)]
        missing_rate: f64,
    },

    /// Run the full EDA pipeline and write charts
    Eda {
        #[arg(long)]
        data: Option<PathBuf>,
        /// Chart directory (default: [eda].output_dir)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Test whether a grouping column affects a numeric outcome
    Test {
        #[arg(long)]
        data: Option<PathBuf>,
        #[arg(long)]
        dependent: String,
        #[arg(long)]
        independent: String,
        #[arg(long, value_enum, default_value_t = TestKind::Ab)]
        kind: TestKind,
        /// Significance level (default: [hypothesis].threshold)
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Train, score and log a regression model
    Train {
        #[arg(long)]
        data: Option<PathBuf>,
        #[arg(long)]
        target: String,
        #[arg(long, value_delimiter = ',', required = true)]
        features: Vec<String>,
        #[arg(long, value_enum, default_value_t = ModelKind::Forest)]
        model: ModelKind,
        /// Write a SHAP summary chart here (tree models only)
        #[arg(long, value_name = "DIR")]
        shap_out: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum TestKind {
    T,
    Z,
    Anova,
    AnovaRegularized,
    Kruskal,
    Ab,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ModelKind {
    Linear,
    Lasso,
    Tree,
    Forest,
}

// ============================================================================
// Commands
// ============================================================================

fn load_dataset(path: Option<&Path>) -> Result<Dataset> {
    let cfg = config::get();
    let path = path.map_or_else(|| PathBuf::from(&cfg.data.path), Path::to_path_buf);
    match load_data(&path, cfg.data.delimiter_byte())
        .with_context(|| format!("Failed to read {}", path.display()))?
    {
        Some(data) => Ok(data),
        None => bail!("Data file not found: {}", path.display()),
    }
}

fn run_simulate(rows: usize, out: &Path, seed: u64, missing_rate: f64) -> Result<()> {
    let data = generate(&SyntheticConfig {
        rows,
        seed,
        missing_rate,
    })?;
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    write_delimited(&data, out, config::get().data.delimiter_byte())?;
    info!(rows, path = %out.display(), "Synthetic data written");
    Ok(())
}

fn run_eda(data: Option<&Path>, out: Option<&Path>) -> Result<()> {
    let dataset = load_dataset(data)?;
    let out = out.map_or_else(|| PathBuf::from(&config::get().eda.output_dir), Path::to_path_buf);
    let mut sink = ChartSink::new(&out)?;
    let processed = perform_eda(&dataset, &mut sink)?;
    println!(
        "\nProcessed {} rows x {} columns; {} charts written to {}",
        processed.n_rows(),
        processed.n_columns(),
        sink.written().len(),
        out.display()
    );
    Ok(())
}

/// Derived columns the tests may group or measure on.
fn prepare_test_data(mut data: Dataset, independent: &str) -> Result<Dataset> {
    if data.has_column(TOTAL_PREMIUM) && data.has_column(TOTAL_CLAIMS) {
        calculate_profit(&mut data)?;
    }
    if independent == POSTAL_CODE_GROUP {
        let f = &config::get().features;
        data = group_zip_codes(data, f.postal_digits, f.subset_groups)?;
    }
    Ok(data)
}

fn run_test(
    data: Option<&Path>,
    dependent: &str,
    independent: &str,
    kind: TestKind,
    threshold: Option<f64>,
) -> Result<()> {
    let threshold = threshold.unwrap_or(config::get().hypothesis.threshold);
    let dataset = prepare_test_data(load_dataset(data)?, independent)?;
    let hypothesis = format!("{independent} has no effect on {dependent}");

    count_group_contribution(&dataset, independent)?;

    let p_value = match kind {
        TestKind::Ab => {
            let Some(report) = ab_test(&dataset, dependent, independent, threshold)? else {
                bail!("A/B test could not be computed for {dependent} by {independent}");
            };
            println!(
                "{} vs {}: t = {:.4}",
                report.group_a, report.group_b, report.result.statistic
            );
            report.result.p_value
        }
        TestKind::T | TestKind::Z => {
            let groups = grouped_samples(&dataset, dependent, independent)?;
            let [(a_name, a), (b_name, b)] = groups.as_slice() else {
                bail!("{independent} must have exactly 2 groups, found {}", groups.len());
            };
            let result = if kind == TestKind::T { t_test(a, b)? } else { z_test(a, b)? };
            println!("{a_name} vs {b_name}: statistic = {:.4}", result.statistic);
            result.p_value
        }
        TestKind::Anova => anova(dependent, independent, &dataset)?.p_value,
        TestKind::Kruskal => kruskal_wallis(&dataset, dependent, independent)?.p_value,
        TestKind::AnovaRegularized => {
            info!(
                term = %categorical_term(independent),
                alpha = LassoSettings::from_config().alpha,
                "Regularized ANOVA"
            );
            anova_regularized(&dataset, dependent, independent)?.p_value
        }
    };

    decide(&hypothesis, p_value, threshold);
    Ok(())
}

fn report_outcome(model: &str, outcome: TrainingOutcome) {
    println!("{model}: MSE = {:.4}, R2 = {:.4}", outcome.mse, outcome.r2);
}

fn explain(model: &dyn TreeExplainable, split: &TrainTestSplit, out: Option<&Path>) -> Result<()> {
    let Some(out) = out else {
        return Ok(());
    };
    let shap = explain_model_with_shap(model, &split.x_test)?;
    let mut sink = ChartSink::new(out)?;
    let path = shap_summary_plot(&mut sink, &shap, &split.feature_names)?;
    println!(
        "SHAP expected value {:.4}; summary written to {}",
        shap.expected_value,
        path.display()
    );
    Ok(())
}

fn run_train(
    data: Option<&Path>,
    target: &str,
    features: &[String],
    model: ModelKind,
    shap_out: Option<&Path>,
) -> Result<()> {
    let cfg = config::get();
    let dataset = load_dataset(data)?;
    let feature_refs: Vec<&str> = features.iter().map(String::as_str).collect();
    let split = prepare_split(
        &dataset,
        target,
        &feature_refs,
        cfg.training.test_fraction,
        cfg.training.seed,
    )?;

    let tracker = tracking::from_config(&cfg.tracking)?;
    let tracker = &*tracker;
    let run_id = initialize_tracking(tracker, &cfg.tracking.experiment_name)?;

    let tree = TreeConfig {
        max_depth: cfg.training.max_depth,
        min_samples_split: cfg.training.min_samples_split,
        min_samples_leaf: cfg.training.min_samples_leaf,
    };

    match model {
        ModelKind::Linear => {
            let mut m = LinearRegression::new();
            let outcome = train_and_log_model(&mut m, "linear_regression", tracker, &run_id, &split)?;
            report_outcome("Linear Regression", outcome);
        }
        ModelKind::Lasso => {
            let h = &cfg.hypothesis;
            let mut m = Lasso::new(h.lasso_alpha)
                .with_max_iter(h.lasso_max_iter)
                .with_tol(h.lasso_tol);
            let outcome = train_and_log_model(&mut m, "lasso", tracker, &run_id, &split)?;
            report_outcome("Lasso", outcome);
        }
        ModelKind::Tree => {
            let mut m = DecisionTreeRegressor::new(tree);
            let outcome = train_and_log_model(&mut m, "decision_tree", tracker, &run_id, &split)?;
            report_outcome("Decision Tree", outcome);
            explain(&m, &split, shap_out)?;
        }
        ModelKind::Forest => {
            let mut m = RandomForestRegressor::new(ForestConfig {
                n_estimators: cfg.training.n_estimators,
                tree,
                bootstrap: true,
                seed: cfg.training.seed,
            });
            let outcome = train_and_log_model(&mut m, "random_forest", tracker, &run_id, &split)?;
            report_outcome("Random Forest", outcome);
            explain(&m, &split, shap_out)?;
        }
    }

    println!("Run {run_id} logged to the {} tracker", tracker.backend());
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let analysis_config = match &args.config {
        Some(path) => AnalysisConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AnalysisConfig::load(),
    };
    config::init(analysis_config);

    match &args.command {
        SubCommand::Simulate {
            rows,
            out,
            seed,
            missing_rate,
        } => run_simulate(*rows, out, *seed, *missing_rate),
        SubCommand::Eda { data, out } => run_eda(data.as_deref(), out.as_deref()),
        SubCommand::Test {
            data,
            dependent,
            independent,
            kind,
            threshold,
        } => run_test(data.as_deref(), dependent, independent, *kind, *threshold),
        SubCommand::Train {
            data,
            target,
            features,
            model,
            shap_out,
        } => run_train(
            data.as_deref(),
            target,
            features,
            *model,
            shap_out.as_deref(),
        ),
    }
}
