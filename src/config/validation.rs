//! Config validation: unknown-key detection with Levenshtein suggestions
//! and range warnings.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, ", did you mean '{s}'?")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for `AnalysisConfig`.
///
/// Maintained by hand to match the struct hierarchy in analysis_config.rs.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [data]
        "data",
        "data.path",
        "data.delimiter",
        // [features]
        "features",
        "features.postal_digits",
        "features.subset_groups",
        // [hypothesis]
        "hypothesis",
        "hypothesis.threshold",
        "hypothesis.lasso_alpha",
        "hypothesis.lasso_max_iter",
        "hypothesis.lasso_tol",
        // [eda]
        "eda",
        "eda.output_dir",
        "eda.batch_size",
        "eda.top_categories",
        "eda.max_pair_columns",
        // [training]
        "training",
        "training.test_fraction",
        "training.seed",
        "training.max_depth",
        "training.min_samples_split",
        "training.min_samples_leaf",
        "training.n_estimators",
        // [tracking]
        "tracking",
        "tracking.backend",
        "tracking.uri",
        "tracking.experiment_name",
        "tracking.local_path",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a_len = a.len();
    let b_len = b.len();
    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1)
                .min(curr[j] + 1)
                .min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;
    for &k in known {
        let dist = levenshtein(unknown, k);
        if dist <= 3 {
            if let Some((_, best_dist)) = best {
                if dist < best_dist {
                    best = Some((k, dist));
                }
            } else {
                best = Some((k, dist));
            }
        }
    }
    best.map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys, it only warns. Existing configs
/// always continue to work.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    let found = walk_toml_keys(&value, "");
    let mut warnings = Vec::new();

    for key in &found {
        if !known.contains(key.as_str()) {
            let suggestion = suggest_correction(key, &known);
            let message = format!("Unknown config key '{key}'");
            warnings.push(ValidationWarning {
                field: key.clone(),
                message,
                suggestion,
            });
        }
    }

    warnings
}

// ============================================================================
// Range Warnings
// ============================================================================

/// Values that are valid but likely unintended.
pub fn suspicious_values(config: &super::AnalysisConfig) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    let threshold = config.hypothesis.threshold;
    if threshold > 0.1 {
        warnings.push(ValidationWarning {
            field: "hypothesis.threshold".to_string(),
            message: format!("hypothesis.threshold = {threshold} is above the usual 0.01-0.1 range"),
            suggestion: None,
        });
    }

    let test_fraction = config.training.test_fraction;
    if !(0.05..=0.5).contains(&test_fraction) {
        warnings.push(ValidationWarning {
            field: "training.test_fraction".to_string(),
            message: format!("training.test_fraction = {test_fraction} is outside the usual 0.05-0.5 range"),
            suggestion: None,
        });
    }

    if config.hypothesis.lasso_alpha > 10.0 {
        warnings.push(ValidationWarning {
            field: "hypothesis.lasso_alpha".to_string(),
            message: format!(
                "hypothesis.lasso_alpha = {} will shrink most group effects to zero",
                config.hypothesis.lasso_alpha
            ),
            suggestion: None,
        });
    }

    warnings
}

// ============================================================================
// Tests
// ============================================================================
