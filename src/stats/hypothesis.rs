//! Hypothesis Tests for Segment Comparisons
//!
//! Decides whether a grouping column (Province, Gender, PostalCodeGroup, ...)
//! produces a significant difference in a numeric outcome (TotalClaims,
//! Profit, ...). Distributions come from the statrs crate.
//!
//! ## Tests
//! - Welch two-sample t-test (unequal variances)
//! - Two-sample z-test (pooled variance)
//! - One-way ANOVA (F test)
//! - Regularized ANOVA: Lasso fit on treatment-coded levels, F test of the
//!   categorical term against the residual
//! - Kruskal-Wallis H test (rank based, tie corrected)
//!
//! Null dependent values are dropped before every test.

use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, Normal, StudentsT};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

use crate::data::{DataError, Dataset};
use crate::models::{Lasso, ModelError, Regressor};

/// Default significance threshold for accept/reject decisions.
pub const DEFAULT_THRESHOLD: f64 = 0.05;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("Insufficient data: need at least {needed} observations, got {actual}")]
    InsufficientData { needed: usize, actual: usize },

    #[error("Column {column} must have exactly 2 distinct values, found {found}")]
    GroupCount { column: String, found: usize },

    #[error("Need at least 2 non-empty groups, found {0}")]
    TooFewGroups(usize),

    #[error("Degenerate input: {0}")]
    Degenerate(String),

    #[error("Distribution error: {0}")]
    Distribution(String),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Test statistic and two-sided p-value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TestResult {
    pub statistic: f64,
    pub p_value: f64,
}

/// Outcome of comparing a p-value against a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Decision {
    Reject,
    Accept,
}

impl Decision {
    pub fn from_p_value(p_value: f64, threshold: f64) -> Self {
        if p_value < threshold {
            Decision::Reject
        } else {
            Decision::Accept
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Reject => write!(f, "Rejected"),
            Decision::Accept => write!(f, "Accepted"),
        }
    }
}

// ============================================================================
// Two-sample tests
// ============================================================================

/// Welch's two-sample t-test.
pub fn t_test(group_a: &[f64], group_b: &[f64]) -> Result<TestResult, StatsError> {
    let (n1, m1, v1) = sample_moments(group_a)?;
    let (n2, m2, v2) = sample_moments(group_b)?;

    let se1 = v1 / n1;
    let se2 = v2 / n2;
    let se = se1 + se2;
    if se == 0.0 {
        return Err(StatsError::Degenerate(
            "both groups have zero variance".to_string(),
        ));
    }

    let t = (m1 - m2) / se.sqrt();
    // Welch-Satterthwaite
    let df = se.powi(2) / (se1.powi(2) / (n1 - 1.0) + se2.powi(2) / (n2 - 1.0));

    let dist = StudentsT::new(0.0, 1.0, df).map_err(distribution_error)?;
    let p_value = 2.0 * dist.cdf(-t.abs());

    debug!(t, df, p_value, "Welch t-test");
    Ok(TestResult {
        statistic: t,
        p_value,
    })
}

/// Two-sided two-sample z-test using the pooled variance.
pub fn z_test(group_a: &[f64], group_b: &[f64]) -> Result<TestResult, StatsError> {
    let (n1, m1, v1) = sample_moments(group_a)?;
    let (n2, m2, v2) = sample_moments(group_b)?;

    let pooled = ((n1 - 1.0) * v1 + (n2 - 1.0) * v2) / (n1 + n2 - 2.0);
    let std_diff = (pooled * (1.0 / n1 + 1.0 / n2)).sqrt();
    if std_diff == 0.0 {
        return Err(StatsError::Degenerate(
            "pooled variance is zero".to_string(),
        ));
    }

    let z = (m1 - m2) / std_diff;
    let normal = Normal::new(0.0, 1.0).map_err(distribution_error)?;
    let p_value = 2.0 * normal.cdf(-z.abs());

    debug!(z, p_value, "Two-sample z-test");
    Ok(TestResult {
        statistic: z,
        p_value,
    })
}

/// Count, mean and unbiased variance. Requires at least two observations.
fn sample_moments(values: &[f64]) -> Result<(f64, f64, f64), StatsError> {
    if values.len() < 2 {
        return Err(StatsError::InsufficientData {
            needed: 2,
            actual: values.len(),
        });
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Ok((n, mean, var))
}

// ============================================================================
// Multi-group tests
// ============================================================================

/// Dependent values per group of `independent`, in first-appearance order.
/// Nulls in either column are dropped.
pub fn grouped_samples(
    data: &Dataset,
    dependent: &str,
    independent: &str,
) -> Result<Vec<(String, Vec<f64>)>, StatsError> {
    let values = data.numeric(dependent)?;
    let groups = data.group_indices(independent)?;
    Ok(groups
        .into_iter()
        .map(|(key, rows)| {
            let sample = rows.iter().filter_map(|&r| values[r]).collect();
            (key, sample)
        })
        .collect())
}

/// One-way ANOVA of `dependent` across the groups of `independent`.
pub fn anova(dependent: &str, independent: &str, data: &Dataset) -> Result<TestResult, StatsError> {
    let groups = grouped_samples(data, dependent, independent)?;
    let samples: Vec<&[f64]> = groups.iter().map(|(_, v)| v.as_slice()).collect();
    one_way_anova(&samples)
}

/// One-way ANOVA F test over raw samples. Empty samples are ignored.
pub fn one_way_anova(samples: &[&[f64]]) -> Result<TestResult, StatsError> {
    let groups: Vec<&[f64]> = samples.iter().copied().filter(|g| !g.is_empty()).collect();
    let k = groups.len();
    if k < 2 {
        return Err(StatsError::TooFewGroups(k));
    }

    let n: usize = groups.iter().map(|g| g.len()).sum();
    if n <= k {
        return Err(StatsError::InsufficientData {
            needed: k + 1,
            actual: n,
        });
    }

    let grand_mean = groups.iter().flat_map(|g| g.iter()).sum::<f64>() / n as f64;
    let mut ss_between = 0.0;
    let mut ss_within = 0.0;
    for group in &groups {
        let mean = group.iter().sum::<f64>() / group.len() as f64;
        ss_between += group.len() as f64 * (mean - grand_mean).powi(2);
        ss_within += group.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
    }

    let df_between = (k - 1) as f64;
    let df_within = (n - k) as f64;
    f_test(ss_between, df_between, ss_within, df_within)
}

/// F statistic and upper-tail p-value for a term against the residual.
fn f_test(ss_term: f64, df_term: f64, ss_resid: f64, df_resid: f64) -> Result<TestResult, StatsError> {
    if ss_resid == 0.0 {
        if ss_term > 0.0 {
            return Ok(TestResult {
                statistic: f64::INFINITY,
                p_value: 0.0,
            });
        }
        return Err(StatsError::Degenerate(
            "all values are identical".to_string(),
        ));
    }

    let f = (ss_term / df_term) / (ss_resid / df_resid);
    let dist = FisherSnedecor::new(df_term, df_resid).map_err(distribution_error)?;
    let p_value = (1.0 - dist.cdf(f)).max(0.0);
    Ok(TestResult {
        statistic: f,
        p_value,
    })
}

/// Kruskal-Wallis H test of `dependent` across the groups of `independent`.
pub fn kruskal_wallis(
    data: &Dataset,
    dependent: &str,
    independent: &str,
) -> Result<TestResult, StatsError> {
    let groups = grouped_samples(data, dependent, independent)?;
    let samples: Vec<&[f64]> = groups
        .iter()
        .map(|(_, v)| v.as_slice())
        .filter(|v| !v.is_empty())
        .collect();
    kruskal_wallis_samples(&samples)
}

/// Kruskal-Wallis H test over raw samples, with tie correction.
pub fn kruskal_wallis_samples(samples: &[&[f64]]) -> Result<TestResult, StatsError> {
    let k = samples.iter().filter(|s| !s.is_empty()).count();
    if k < 2 {
        return Err(StatsError::TooFewGroups(k));
    }

    let mut pooled: Vec<(f64, usize)> = samples
        .iter()
        .enumerate()
        .flat_map(|(g, s)| s.iter().map(move |&v| (v, g)))
        .collect();
    pooled.sort_by(|a, b| a.0.total_cmp(&b.0));

    let n = pooled.len();
    let mut rank_sums = vec![0.0; samples.len()];
    let mut tie_term = 0.0;
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && pooled[j + 1].0 == pooled[i].0 {
            j += 1;
        }
        // Tied block i..=j shares the average of ranks i+1..=j+1
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &(_, g) in &pooled[i..=j] {
            rank_sums[g] += avg_rank;
        }
        let t = (j - i + 1) as f64;
        tie_term += t.powi(3) - t;
        i = j + 1;
    }

    let nf = n as f64;
    let correction = 1.0 - tie_term / (nf.powi(3) - nf);
    if correction <= 0.0 {
        return Err(StatsError::Degenerate(
            "all values are identical".to_string(),
        ));
    }

    let h_raw = 12.0 / (nf * (nf + 1.0))
        * samples
            .iter()
            .zip(&rank_sums)
            .filter(|(s, _)| !s.is_empty())
            .map(|(s, r)| r * r / s.len() as f64)
            .sum::<f64>()
        - 3.0 * (nf + 1.0);
    let h = h_raw / correction;

    let dist = ChiSquared::new((k - 1) as f64).map_err(distribution_error)?;
    let p_value = (1.0 - dist.cdf(h)).max(0.0);
    debug!(h, groups = k, p_value, "Kruskal-Wallis test");
    Ok(TestResult {
        statistic: h,
        p_value,
    })
}

// ============================================================================
// Regularized ANOVA
// ============================================================================

/// Lasso settings for the regularized ANOVA fit.
#[derive(Debug, Clone, Copy)]
pub struct LassoSettings {
    pub alpha: f64,
    pub max_iter: usize,
    pub tol: f64,
}

impl Default for LassoSettings {
    fn default() -> Self {
        Self {
            alpha: 0.01,
            max_iter: 1000,
            tol: 1e-4,
        }
    }
}

impl LassoSettings {
    /// Settings from the global config when initialised, otherwise defaults.
    pub fn from_config() -> Self {
        if crate::config::is_initialized() {
            let h = &crate::config::get().hypothesis;
            Self {
                alpha: h.lasso_alpha,
                max_iter: h.lasso_max_iter,
                tol: h.lasso_tol,
            }
        } else {
            Self::default()
        }
    }
}

/// One row of an ANOVA table. The residual row has no F or p.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnovaRow {
    pub term: String,
    pub sum_sq: f64,
    pub df: f64,
    pub f_statistic: Option<f64>,
    pub p_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnovaTable {
    pub rows: Vec<AnovaRow>,
}

impl AnovaTable {
    pub fn row(&self, term: &str) -> Option<&AnovaRow> {
        self.rows.iter().find(|r| r.term == term)
    }
}

impl fmt::Display for AnovaTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<24} {:>16} {:>8} {:>12} {:>12}", "", "sum_sq", "df", "F", "PR(>F)")?;
        for row in &self.rows {
            let stat = row.f_statistic.map_or("NaN".to_string(), |v| format!("{v:.6}"));
            let p = row.p_value.map_or("NaN".to_string(), |v| format!("{v:.6}"));
            writeln!(
                f,
                "{:<24} {:>16.4} {:>8} {:>12} {:>12}",
                row.term, row.sum_sq, row.df, stat, p
            )?;
        }
        Ok(())
    }
}

/// Name of the categorical term's row in the ANOVA table.
pub fn categorical_term(independent: &str) -> String {
    format!("C({independent})")
}

/// Regularized ANOVA: F statistic and p-value of the categorical term.
pub fn anova_regularized(
    data: &Dataset,
    dependent: &str,
    independent: &str,
) -> Result<TestResult, StatsError> {
    let table = anova_regularized_table(data, dependent, independent, LassoSettings::from_config())?;
    let term = categorical_term(independent);
    let row = table
        .row(&term)
        .ok_or_else(|| StatsError::Degenerate(format!("ANOVA table has no row {term}")))?;

    match (row.f_statistic, row.p_value) {
        (Some(statistic), Some(p_value)) => Ok(TestResult { statistic, p_value }),
        _ => Err(StatsError::Degenerate(format!("row {term} has no F statistic"))),
    }
}

/// Fit a Lasso of `dependent` on treatment-coded levels of `independent`
/// (sorted levels, the first is the reference) and build the ANOVA table.
pub fn anova_regularized_table(
    data: &Dataset,
    dependent: &str,
    independent: &str,
    settings: LassoSettings,
) -> Result<AnovaTable, StatsError> {
    let values = data.numeric(dependent)?;
    let keys = data.column(independent)?;

    let observations: Vec<(String, f64)> = (0..data.n_rows())
        .filter_map(|row| Some((keys.key_at(row)?, values[row]?)))
        .collect();

    let mut levels: Vec<&str> = observations.iter().map(|(k, _)| k.as_str()).collect();
    levels.sort_unstable();
    levels.dedup();

    let k = levels.len();
    if k < 2 {
        return Err(StatsError::TooFewGroups(k));
    }
    let n = observations.len();
    if n <= k {
        return Err(StatsError::InsufficientData {
            needed: k + 1,
            actual: n,
        });
    }

    let mut x = ndarray::Array2::<f64>::zeros((n, k - 1));
    let mut y = ndarray::Array1::<f64>::zeros(n);
    for (row, (key, value)) in observations.iter().enumerate() {
        if let Ok(level) = levels.binary_search(&key.as_str()) {
            if level > 0 {
                x[[row, level - 1]] = 1.0;
            }
        }
        y[row] = *value;
    }

    let mut model = Lasso::new(settings.alpha)
        .with_max_iter(settings.max_iter)
        .with_tol(settings.tol);
    model.fit(&x, &y)?;
    let fitted = model.predict(&x)?;

    let mean = y.sum() / n as f64;
    let ss_total: f64 = y.iter().map(|v| (v - mean).powi(2)).sum();
    let ss_resid: f64 = y.iter().zip(fitted.iter()).map(|(a, b)| (a - b).powi(2)).sum();
    let ss_term = (ss_total - ss_resid).max(0.0);

    let df_term = (k - 1) as f64;
    let df_resid = (n - k) as f64;
    let term = f_test(ss_term, df_term, ss_resid, df_resid)?;

    debug!(
        levels = k,
        observations = n,
        alpha = settings.alpha,
        f = term.statistic,
        "Regularized ANOVA"
    );

    Ok(AnovaTable {
        rows: vec![
            AnovaRow {
                term: categorical_term(independent),
                sum_sq: ss_term,
                df: df_term,
                f_statistic: Some(term.statistic),
                p_value: Some(term.p_value),
            },
            AnovaRow {
                term: "Residual".to_string(),
                sum_sq: ss_resid,
                df: df_resid,
                f_statistic: None,
                p_value: None,
            },
        ],
    })
}

// ============================================================================
// Decisions and A/B tests
// ============================================================================

/// Print the accept/reject decision for a hypothesis and return it.
pub fn decide(hypothesis: &str, p_value: f64, threshold: f64) -> Decision {
    let decision = Decision::from_p_value(p_value, threshold);
    println!("{decision} the null hypothesis: {hypothesis}");
    println!("p_value: {p_value}");
    decision
}

/// Result of a two-group A/B test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbTestReport {
    pub group_a: String,
    pub group_b: String,
    pub result: TestResult,
    pub decision: Decision,
}

/// A/B test of `dependent` between the two values of `independent`.
///
/// The grouping column must exist and hold exactly two distinct values.
/// Failures while extracting the groups (for example a missing dependent
/// column) are logged and reported as `Ok(None)`. Errors from the t-test
/// itself are returned.
pub fn ab_test(
    data: &Dataset,
    dependent: &str,
    independent: &str,
    threshold: f64,
) -> Result<Option<AbTestReport>, StatsError> {
    let groups = data.unique(independent)?;
    if groups.len() != 2 {
        return Err(StatsError::GroupCount {
            column: independent.to_string(),
            found: groups.len(),
        });
    }

    let samples = match grouped_samples(data, dependent, independent) {
        Ok(samples) => samples,
        Err(e) => {
            warn!(dependent, independent, error = %e, "Could not extract A/B groups");
            return Ok(None);
        }
    };

    let (a, b) = (&samples[0], &samples[1]);
    let result = t_test(&a.1, &b.1)?;
    Ok(Some(AbTestReport {
        group_a: a.0.clone(),
        group_b: b.0.clone(),
        result,
        decision: Decision::from_p_value(result.p_value, threshold),
    }))
}

fn distribution_error(e: impl fmt::Display) -> StatsError {
    StatsError::Distribution(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Column, ColumnData};

    fn segmented(groups: &[(&str, &[f64])]) -> Dataset {
        let mut keys = Vec::new();
        let mut values = Vec::new();
        for (key, samples) in groups {
            for v in *samples {
                keys.push(Some((*key).to_string()));
                values.push(Some(*v));
            }
        }
        Dataset::from_columns(vec![
            Column::new("Segment", ColumnData::Categorical(keys)),
            Column::new("Claims", ColumnData::Numeric(values)),
        ])
        .unwrap()
    }

    #[test]
    fn test_welch_t_matches_reference() {
        // scipy.stats.ttest_ind(a, b, equal_var=False)
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [2.0, 4.0, 6.0, 8.0, 10.0];
        let r = t_test(&a, &b).unwrap();
        assert!((r.statistic - (-1.8973665961010275)).abs() < 1e-9);
        assert!(r.p_value > 0.09 && r.p_value < 0.13);
    }

    #[test]
    fn test_t_test_needs_two_observations() {
        assert!(matches!(
            t_test(&[1.0], &[1.0, 2.0]),
            Err(StatsError::InsufficientData { needed: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_z_test_statistic() {
        // Pooled sd = sqrt(2.5), std_diff = sqrt(2.5 * 0.4) = 1
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [3.0, 4.0, 5.0, 6.0, 7.0];
        let r = z_test(&a, &b).unwrap();
        assert!((r.statistic + 2.0).abs() < 1e-12);
        assert!((r.p_value - 0.0455).abs() < 1e-3);
    }

    #[test]
    fn test_anova_separated_means() {
        let ds = segmented(&[
            ("a", &[0.1, -0.1, 0.0, 0.2]),
            ("b", &[10.0, 10.1, 9.9, 10.2]),
            ("c", &[20.0, 19.9, 20.1, 20.2]),
        ]);
        let r = anova("Claims", "Segment", &ds).unwrap();
        assert!(r.p_value < 0.01);
        assert!(r.statistic > 1000.0);
    }

    #[test]
    fn test_anova_matches_reference() {
        // scipy.stats.f_oneway([1,2,3], [2,3,4], [5,6,7]) -> F = 13.0
        let r = one_way_anova(&[&[1.0, 2.0, 3.0], &[2.0, 3.0, 4.0], &[5.0, 6.0, 7.0]]).unwrap();
        assert!((r.statistic - 13.0).abs() < 1e-9);
        assert!((r.p_value - 0.006_592).abs() < 1e-4);
    }

    #[test]
    fn test_anova_single_group_fails() {
        let ds = segmented(&[("a", &[1.0, 2.0, 3.0])]);
        assert!(matches!(
            anova("Claims", "Segment", &ds),
            Err(StatsError::TooFewGroups(1))
        ));
    }

    #[test]
    fn test_kruskal_matches_reference() {
        // scipy.stats.kruskal([1,2,3], [4,5,6]) -> H = 3.857142857, p = 0.049535
        let r = kruskal_wallis_samples(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]]).unwrap();
        assert!((r.statistic - 3.857_142_857).abs() < 1e-6);
        assert!((r.p_value - 0.049_535).abs() < 1e-4);
    }

    #[test]
    fn test_kruskal_identical_values_fail() {
        assert!(matches!(
            kruskal_wallis_samples(&[&[1.0, 1.0], &[1.0, 1.0]]),
            Err(StatsError::Degenerate(_))
        ));
    }

    #[test]
    fn test_regularized_anova_uses_categorical_term() {
        let ds = segmented(&[
            ("a", &[1.0, 1.5, 0.5, 1.2]),
            ("b", &[5.0, 5.5, 4.5, 5.2]),
            ("c", &[9.0, 9.5, 8.5, 9.2]),
        ]);
        let table =
            anova_regularized_table(&ds, "Claims", "Segment", LassoSettings::default()).unwrap();
        let term = table.row("C(Segment)").unwrap();
        assert_eq!(term.df, 2.0);
        assert_eq!(table.row("Residual").unwrap().df, 9.0);

        let r = anova_regularized(&ds, "Claims", "Segment").unwrap();
        assert_eq!(Some(r.statistic), term.f_statistic);
        assert!(r.p_value < 0.001);
    }

    #[test]
    fn test_regularized_anova_close_to_plain_anova() {
        let ds = segmented(&[
            ("x", &[2.0, 3.0, 4.0, 3.5]),
            ("y", &[6.0, 7.0, 5.0, 6.5]),
        ]);
        let plain = anova("Claims", "Segment", &ds).unwrap();
        let reg = anova_regularized(&ds, "Claims", "Segment").unwrap();
        assert!((plain.statistic - reg.statistic).abs() / plain.statistic < 0.05);
    }

    #[test]
    fn test_decide() {
        assert_eq!(decide("no difference", 0.01, 0.05), Decision::Reject);
        assert_eq!(decide("no difference", 0.05, 0.05), Decision::Accept);
    }

    #[test]
    fn test_ab_test_two_groups() {
        let ds = segmented(&[
            ("Male", &[10.0, 12.0, 11.0, 13.0]),
            ("Female", &[20.0, 22.0, 21.0, 23.0]),
        ]);
        let report = ab_test(&ds, "Claims", "Segment", 0.05).unwrap().unwrap();
        assert_eq!(report.group_a, "Male");
        assert_eq!(report.group_b, "Female");
        assert!(report.result.statistic < 0.0);
        assert_eq!(report.decision, Decision::Reject);
    }

    #[test]
    fn test_ab_test_group_count() {
        let one = segmented(&[("a", &[1.0, 2.0])]);
        let three = segmented(&[("a", &[1.0, 2.0]), ("b", &[1.0, 2.0]), ("c", &[1.0, 2.0])]);
        assert!(matches!(
            ab_test(&one, "Claims", "Segment", 0.05),
            Err(StatsError::GroupCount { found: 1, .. })
        ));
        assert!(matches!(
            ab_test(&three, "Claims", "Segment", 0.05),
            Err(StatsError::GroupCount { found: 3, .. })
        ));
    }

    #[test]
    fn test_ab_test_missing_dependent_is_none() {
        let ds = segmented(&[("a", &[1.0, 2.0]), ("b", &[3.0, 4.0])]);
        assert!(ab_test(&ds, "Premium", "Segment", 0.05).unwrap().is_none());
    }

    #[test]
    fn test_ab_test_propagates_t_test_errors() {
        let ds = segmented(&[("a", &[1.0, 2.0, 3.0]), ("b", &[5.0])]);
        assert!(matches!(
            ab_test(&ds, "Claims", "Segment", 0.05),
            Err(StatsError::InsufficientData { needed: 2, actual: 1 })
        ));
    }
}
