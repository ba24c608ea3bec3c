//! Analysis Configuration - data source, test, EDA, training and tracking
//! settings as TOML values
//!
//! Every field has a serde default, so an empty file (or no file at all)
//! yields the built-in behaviour.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "CLAIMS_INSIGHT_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "claims_insight.toml";

// ============================================================================
// Config Provenance
// ============================================================================

/// Dotted key paths explicitly present in the loaded TOML file.
///
/// Serde defaults make every field look set after deserialization; this
/// records which ones the file actually named.
#[derive(Debug, Clone, Default)]
pub struct ConfigProvenance {
    pub explicit_keys: HashSet<String>,
}

impl ConfigProvenance {
    /// Example: `provenance.is_user_set("hypothesis.threshold")`
    pub fn is_user_set(&self, dotted_key: &str) -> bool {
        self.explicit_keys.contains(dotted_key)
    }
}

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration.
///
/// Load with `AnalysisConfig::load()` which searches:
/// 1. `$CLAIMS_INSIGHT_CONFIG`
/// 2. `./claims_insight.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub features: FeaturesConfig,

    #[serde(default)]
    pub hypothesis: HypothesisConfig,

    #[serde(default)]
    pub eda: EdaConfig,

    #[serde(default)]
    pub training: TrainingConfig,

    #[serde(default)]
    pub tracking: TrackingConfig,
}

impl AnalysisConfig {
    /// Load configuration using the standard search order.
    pub fn load() -> Self {
        Self::load_with_provenance().0
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let (config, _provenance) = Self::load_from_file_with_provenance(path)?;
        Ok(config)
    }

    /// Load a TOML file, warning about unknown keys, and validate it.
    pub fn load_from_file_with_provenance(
        path: &Path,
    ) -> Result<(Self, ConfigProvenance), ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::parse_with_provenance(&contents)
            .map_err(|e| match e {
                ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
                other => other,
            })
    }

    /// Parse TOML text; the path in parse errors is left empty.
    pub fn parse_with_provenance(contents: &str) -> Result<(Self, ConfigProvenance), ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let provenance = ConfigProvenance {
            explicit_keys: super::validation::walk_toml_keys(
                &contents
                    .parse::<toml::Value>()
                    .unwrap_or(toml::Value::Table(Default::default())),
                "",
            )
            .into_iter()
            .collect(),
        };

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        for w in super::validation::suspicious_values(&config) {
            warn!("{}", w);
        }
        Ok((config, provenance))
    }

    /// Standard search order, also returning which keys the user set.
    pub fn load_with_provenance() -> (Self, ConfigProvenance) {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file_with_provenance(&p) {
                    Ok(loaded) => {
                        info!(path = %p.display(), "Loaded config from {CONFIG_ENV_VAR}");
                        return loaded;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {CONFIG_ENV_VAR}, falling back");
                    }
                }
            } else {
                warn!(path = %path, "{CONFIG_ENV_VAR} points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file_with_provenance(&local) {
                Ok(loaded) => {
                    info!("Loaded config from ./{LOCAL_CONFIG_FILE}");
                    return loaded;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{LOCAL_CONFIG_FILE}, using defaults");
                }
            }
        }

        info!("No {LOCAL_CONFIG_FILE} found, using built-in defaults");
        (Self::default(), ConfigProvenance::default())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Consistency checks; all failures are collected.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        Self::check_open_unit(self.hypothesis.threshold, "hypothesis.threshold", &mut errors);
        Self::check_open_unit(self.training.test_fraction, "training.test_fraction", &mut errors);

        let h = &self.hypothesis;
        if !h.lasso_alpha.is_finite() || h.lasso_alpha <= 0.0 {
            errors.push(format!("hypothesis.lasso_alpha must be > 0 (got {})", h.lasso_alpha));
        }
        if h.lasso_max_iter == 0 {
            errors.push("hypothesis.lasso_max_iter must be > 0".to_string());
        }
        if !h.lasso_tol.is_finite() || h.lasso_tol <= 0.0 {
            errors.push(format!("hypothesis.lasso_tol must be > 0 (got {})", h.lasso_tol));
        }

        if self.features.postal_digits == 0 {
            errors.push("features.postal_digits must be > 0".to_string());
        }
        if self.features.subset_groups == Some(0) {
            errors.push("features.subset_groups must be > 0 when set".to_string());
        }

        if self.data.delimiter.chars().count() != 1 || !self.data.delimiter.is_ascii() {
            errors.push(format!(
                "data.delimiter must be a single ASCII character (got {:?})",
                self.data.delimiter
            ));
        }

        let e = &self.eda;
        if e.batch_size == 0 || e.top_categories == 0 || e.max_pair_columns == 0 {
            errors.push(
                "eda.batch_size, eda.top_categories and eda.max_pair_columns must be > 0".to_string(),
            );
        }

        let t = &self.training;
        if t.min_samples_split < 2 {
            errors.push(format!(
                "training.min_samples_split must be >= 2 (got {})",
                t.min_samples_split
            ));
        }
        if t.min_samples_leaf == 0 {
            errors.push("training.min_samples_leaf must be >= 1".to_string());
        }
        if t.n_estimators == 0 {
            errors.push("training.n_estimators must be >= 1".to_string());
        }
        if t.max_depth == Some(0) {
            errors.push("training.max_depth must be >= 1 when set".to_string());
        }

        if self.tracking.experiment_name.trim().is_empty() {
            errors.push("tracking.experiment_name must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_open_unit(value: f64, name: &str, errors: &mut Vec<String>) {
        // NaN fails every comparison, so test the accepted range directly
        if !(value > 0.0 && value < 1.0) {
            errors.push(format!("{name} must be in (0, 1) (got {value})"));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// [data]
// ============================================================================

/// Input file location and format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_path")]
    pub path: String,

    /// Single-character field separator
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

fn default_data_path() -> String {
    defaults::DATA_PATH.to_string()
}
fn default_delimiter() -> String {
    defaults::DELIMITER.to_string()
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: default_data_path(),
            delimiter: default_delimiter(),
        }
    }
}

impl DataConfig {
    /// Delimiter as the byte the csv reader expects.
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter.bytes().next().unwrap_or(b'|')
    }
}

// ============================================================================
// [features]
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturesConfig {
    /// Leading postal-code characters kept by `group_zip_codes`
    #[serde(default = "default_postal_digits")]
    pub postal_digits: usize,

    /// Keep only the n lowest and n highest postal codes by mean claims
    #[serde(default)]
    pub subset_groups: Option<usize>,
}

fn default_postal_digits() -> usize {
    3
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            postal_digits: default_postal_digits(),
            subset_groups: None,
        }
    }
}

// ============================================================================
// [hypothesis]
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypothesisConfig {
    /// Significance level for reject/accept decisions
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// L1 penalty of the regularized ANOVA fit
    #[serde(default = "default_lasso_alpha")]
    pub lasso_alpha: f64,

    #[serde(default = "default_lasso_max_iter")]
    pub lasso_max_iter: usize,

    #[serde(default = "default_lasso_tol")]
    pub lasso_tol: f64,
}

fn default_threshold() -> f64 {
    0.05
}
fn default_lasso_alpha() -> f64 {
    0.01
}
fn default_lasso_max_iter() -> usize {
    1000
}
fn default_lasso_tol() -> f64 {
    1e-4
}

impl Default for HypothesisConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            lasso_alpha: default_lasso_alpha(),
            lasso_max_iter: default_lasso_max_iter(),
            lasso_tol: default_lasso_tol(),
        }
    }
}

// ============================================================================
// [eda]
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdaConfig {
    /// Directory the SVG charts are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_top_categories")]
    pub top_categories: usize,

    #[serde(default = "default_max_pair_columns")]
    pub max_pair_columns: usize,
}

fn default_output_dir() -> String {
    defaults::CHART_OUTPUT_DIR.to_string()
}
fn default_batch_size() -> usize {
    2
}
fn default_top_categories() -> usize {
    20
}
fn default_max_pair_columns() -> usize {
    5
}

impl Default for EdaConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            batch_size: default_batch_size(),
            top_categories: default_top_categories(),
            max_pair_columns: default_max_pair_columns(),
        }
    }
}

// ============================================================================
// [training]
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,

    /// Seed for the split shuffle and forest bootstraps
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Unlimited when absent
    #[serde(default)]
    pub max_depth: Option<usize>,

    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,

    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,

    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,
}

fn default_test_fraction() -> f64 {
    0.2
}
fn default_seed() -> u64 {
    42
}
fn default_min_samples_split() -> usize {
    2
}
fn default_min_samples_leaf() -> usize {
    1
}
fn default_n_estimators() -> usize {
    100
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_fraction: default_test_fraction(),
            seed: default_seed(),
            max_depth: None,
            min_samples_split: default_min_samples_split(),
            min_samples_leaf: default_min_samples_leaf(),
            n_estimators: default_n_estimators(),
        }
    }
}

// ============================================================================
// [tracking]
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingBackend {
    #[default]
    Local,
    Mlflow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingConfig {
    #[serde(default)]
    pub backend: TrackingBackend,

    /// MLflow tracking server URI
    #[serde(default = "default_tracking_uri")]
    pub uri: String,

    #[serde(default = "default_experiment_name")]
    pub experiment_name: String,

    /// sled database directory for the local backend
    #[serde(default = "default_local_path")]
    pub local_path: String,
}

fn default_tracking_uri() -> String {
    defaults::MLFLOW_TRACKING_URI.to_string()
}
fn default_experiment_name() -> String {
    "claims-insight".to_string()
}
fn default_local_path() -> String {
    defaults::LOCAL_TRACKING_PATH.to_string()
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            backend: TrackingBackend::default(),
            uri: default_tracking_uri(),
            experiment_name: default_experiment_name(),
            local_path: default_local_path(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        assert!(AnalysisConfig::default().validate().is_ok(), "Default config must always validate");
    }

    #[test]
    fn test_empty_toml_produces_defaults() {
        let config: AnalysisConfig = toml::from_str("").expect("empty TOML should parse");
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.hypothesis.threshold, 0.05);
        assert_eq!(config.data.delimiter, "|");
        assert_eq!(config.tracking.backend, TrackingBackend::Local);
    }

    #[test]
    fn test_partial_toml_override() {
        let toml_str = r#"
[hypothesis]
threshold = 0.01

[tracking]
backend = "mlflow"
uri = "http://mlflow:5000"
"#;
        let config: AnalysisConfig = toml::from_str(toml_str).expect("partial TOML should parse");
        assert_eq!(config.hypothesis.threshold, 0.01);
        assert_eq!(config.tracking.backend, TrackingBackend::Mlflow);
        assert_eq!(config.tracking.uri, "http://mlflow:5000");
        assert_eq!(config.hypothesis.lasso_alpha, 0.01);
        assert_eq!(config.training.n_estimators, 100);
    }

    #[test]
    fn test_validation_collects_errors() {
        let mut config = AnalysisConfig::default();
        config.hypothesis.threshold = 1.5;
        config.training.test_fraction = f64::NAN;
        config.hypothesis.lasso_alpha = 0.0;
        config.features.postal_digits = 0;
        match config.validate() {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors.len(), 4, "{errors:?}");
                assert!(errors.iter().any(|e| e.contains("test_fraction")));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_validation_rejects_long_delimiter() {
        let mut config = AnalysisConfig::default();
        config.data.delimiter = "||".to_string();
        assert!(config.validate().is_err());
        config.data.delimiter = ",".to_string();
        assert!(config.validate().is_ok());
        assert_eq!(config.data.delimiter_byte(), b',');
    }

    #[test]
    fn test_roundtrip_toml() {
        let mut original = AnalysisConfig::default();
        original.training.max_depth = Some(6);
        let toml_str = original.to_toml().expect("serialization should work");
        let roundtripped: AnalysisConfig = toml::from_str(&toml_str).expect("deserialization should work");
        assert_eq!(original, roundtripped);
        assert!(toml_str.contains("[tracking]"));
    }

    #[test]
    fn test_provenance_tracks_explicit_keys() {
        let (config, provenance) = AnalysisConfig::parse_with_provenance(
            r#"
[eda]
batch_size = 4
"#,
        )
        .unwrap();
        assert_eq!(config.eda.batch_size, 4);
        assert!(provenance.is_user_set("eda"));
        assert!(provenance.is_user_set("eda.batch_size"));
        assert!(!provenance.is_user_set("eda.top_categories"));
    }

    #[test]
    fn test_parse_rejects_invalid_values() {
        let result = AnalysisConfig::parse_with_provenance("[training]\ntest_fraction = 0.0\n");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("claims_insight.toml");
        let mut config = AnalysisConfig::default();
        config.eda.output_dir = "charts".to_string();
        config.save_to_file(&path).unwrap();
        assert_eq!(AnalysisConfig::load_from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = AnalysisConfig::load_from_file(Path::new("/nonexistent/claims.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(..)));
        assert!(err.to_string().contains("/nonexistent/claims.toml"));
    }
}
