//! Evaluation configuration.
//!
//! Loaded from JSON via [`EvalConfig::load`]; command-line options override
//! individual fields.

use std::path::Path;

use anyhow::{Context, Result};
use burn::prelude::*;
use ood_data::Resolution;
use ood_metric::{AnomalyScorer, DatasetKind, MetricResult, ScoringMethod, CITYSCAPES_NUM_CLASSES};

/// Settings of one anomaly-evaluation run.
#[derive(Config, Debug)]
pub struct EvalConfig {
    /// Anomaly scoring rule.
    #[config(default = "ScoringMethod::Msp")]
    pub method: ScoringMethod,

    /// Softmax temperature, used by `msp` only.
    #[config(default = 1.0)]
    pub temperature: f32,

    /// Number of semantic classes; one extra channel is read as void.
    #[config(default = "CITYSCAPES_NUM_CLASSES")]
    pub num_classes: usize,

    #[config(default = 512)]
    pub height: usize,

    #[config(default = 1024)]
    pub width: usize,

    /// Dataset override. Resolved from the first input path when unset.
    #[config(default = "None")]
    pub dataset: Option<DatasetKind>,

    /// Append-only results log.
    #[config(default = "\"results.txt\".to_string()")]
    pub results_log: String,

    /// Random seed for reproducibility.
    #[config(default = 42)]
    pub seed: u64,

    /// Force the CPU device where the compiled backend has one.
    #[config(default = false)]
    pub cpu: bool,
}

impl EvalConfig {
    pub const fn resolution(&self) -> Resolution {
        Resolution::new(self.height, self.width)
    }

    /// Builds the scorer for the configured method.
    ///
    /// # Errors
    ///
    /// Returns an error if the temperature or class count is invalid.
    pub fn scorer(&self) -> MetricResult<AnomalyScorer> {
        AnomalyScorer::new(self.method.clone(), self.temperature, self.num_classes)
    }
}

/// Loads an [`EvalConfig`] from a JSON file.
///
/// # Errors
///
/// Returns an error if the file does not exist or is not a valid configuration.
pub fn load_config_file(path: &Path) -> Result<EvalConfig> {
    if !path.exists() {
        anyhow::bail!("Configuration file not found: {}", path.display());
    }
    EvalConfig::load(path)
        .with_context(|| format!("Failed to load configuration {}", path.display()))
}
