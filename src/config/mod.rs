//! Analysis Configuration Module
//!
//! Settings for the data source, hypothesis tests, EDA charts, model
//! training and experiment tracking, loaded from TOML.
//!
//! ## Loading Order
//!
//! 1. `CLAIMS_INSIGHT_CONFIG` environment variable (path to TOML file)
//! 2. `claims_insight.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! Call `config::init()` once at startup, then `config::get()` anywhere:
//!
//! ```ignore
//! // In main():
//! config::init(AnalysisConfig::load());
//!
//! // Anywhere in the codebase:
//! let alpha = config::get().hypothesis.lasso_alpha;
//! ```

mod analysis_config;
pub mod defaults;
pub mod validation;

pub use analysis_config::*;

use std::sync::OnceLock;

/// Global configuration, initialized once at startup.
static ANALYSIS_CONFIG: OnceLock<AnalysisConfig> = OnceLock::new();

/// Initialize the global configuration. Later calls are ignored.
pub fn init(config: AnalysisConfig) {
    if ANALYSIS_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once, ignoring");
    }
}

/// Global configuration; built-in defaults if `init()` was never called.
pub fn get() -> &'static AnalysisConfig {
    ANALYSIS_CONFIG.get_or_init(AnalysisConfig::default)
}

/// Check whether the config has been initialized.
pub fn is_initialized() -> bool {
    ANALYSIS_CONFIG.get().is_some()
}
