//! Statistics
//!
//! - `descriptive`: per-column summaries, median, mode, value counts
//! - `hypothesis`: t, z, ANOVA, regularized ANOVA and Kruskal-Wallis tests

pub mod descriptive;
pub mod hypothesis;

pub use descriptive::{describe, median, mode, value_counts, ColumnSummary};
pub use hypothesis::{
    ab_test, anova, anova_regularized, anova_regularized_table, decide, kruskal_wallis, t_test,
    z_test, AbTestReport, AnovaRow, AnovaTable, Decision, LassoSettings, StatsError, TestResult,
};
