//! Anomaly-detection evaluation over a benchmark.

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use burn::tensor::backend::Backend;
use ood_data::{existing_ground_truth_path, load_mask};
use ood_metric::{
    count_unnormalized, DatasetKind, LabelRemapper, SampleAggregator, ScoringMethod,
};
use serde::Serialize;

use crate::{config::EvalConfig, model::LogitSource};

/// Outcome of one evaluation run.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationSummary {
    pub dataset: String,
    pub method: String,
    /// Softmax temperature, reported for `msp` only.
    pub temperature: Option<f32>,
    pub images_seen: usize,
    pub images_accepted: usize,
    pub ood_pixels: usize,
    pub id_pixels: usize,
    /// Fraction in `[0, 1]`.
    pub auprc: f64,
    /// Fraction in `[0, 1]`.
    pub fpr_at_95_tpr: f64,
}

impl EvaluationSummary {
    /// One results-log line, metrics in percent.
    pub fn log_line(&self) -> String {
        let temperature = self
            .temperature
            .map(|t| format!(" T={t}"))
            .unwrap_or_default();

        format!(
            "{} {}{} AUPRC score: {:.3} FPR@TPR95: {:.3}",
            self.dataset,
            self.method,
            temperature,
            self.auprc * 100.0,
            self.fpr_at_95_tpr * 100.0,
        )
    }
}

/// Uses the configured dataset, or recognizes it from the first image path.
pub fn resolve_dataset(config: &EvalConfig, images: &[PathBuf]) -> DatasetKind {
    if let Some(dataset) = &config.dataset {
        return dataset.clone();
    }

    images.first().map_or(DatasetKind::Unknown, |path| {
        DatasetKind::from_hint(&path.to_string_lossy())
    })
}

/// Scores every image, pools the pixels of images with OOD content, and
/// computes AUPRC and FPR@95%TPR.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, logits or a ground-truth
/// mask cannot be read, shapes disagree, or the pooled data is insufficient.
pub fn run_evaluation<B, S>(
    config: &EvalConfig,
    images: &[PathBuf],
    source: &S,
    device: &B::Device,
) -> Result<EvaluationSummary>
where
    B: Backend,
    S: LogitSource<B>,
{
    B::seed(config.seed);

    let scorer = config.scorer()?;
    let dataset = resolve_dataset(config, images);
    let remapper = LabelRemapper::new(dataset.clone());

    tracing::info!(
        dataset = dataset.name(),
        method = scorer.method().as_str(),
        temperature = scorer.temperature(),
        images = images.len(),
        "evaluating anomaly detection",
    );

    let mut aggregator = SampleAggregator::new();
    for image in images {
        let logits = source
            .logits(image, device)
            .with_context(|| format!("Failed to obtain logits for {}", image.display()))?;
        let anomaly = scorer.score(logits)?;

        let mask_path = existing_ground_truth_path(image, &dataset)?;
        let raw = load_mask::<B>(&mask_path, config.resolution(), device)?;
        let label = remapper.remap(raw);

        let unnormalized = count_unnormalized(label.clone());
        if unnormalized > 0 {
            tracing::warn!(
                mask = %mask_path.display(),
                pixels = unnormalized,
                "label codes outside {{0, 1, 255}} after remapping",
            );
        }

        let accepted = aggregator.consider(anomaly, label)?;
        tracing::debug!(image = %image.display(), accepted, "processed image");
    }

    let metrics = aggregator.finalize()?;
    let pool = aggregator.pool();

    tracing::info!(
        accepted = aggregator.accepted(),
        skipped = aggregator.skipped(),
        ood_pixels = pool.ood.len(),
        id_pixels = pool.id.len(),
        auprc = metrics.auprc,
        fpr_at_95_tpr = metrics.fpr_at_95_tpr,
        "evaluation finished",
    );

    Ok(EvaluationSummary {
        dataset: dataset.name().to_string(),
        method: scorer.method().as_str().to_string(),
        temperature: (*scorer.method() == ScoringMethod::Msp).then(|| scorer.temperature()),
        images_seen: images.len(),
        images_accepted: aggregator.accepted(),
        ood_pixels: pool.ood.len(),
        id_pixels: pool.id.len(),
        auprc: metrics.auprc,
        fpr_at_95_tpr: metrics.fpr_at_95_tpr,
    })
}

/// Appends the summary line to the results log, creating it if needed.
///
/// # Errors
///
/// Returns an error if the log cannot be opened or written.
pub fn append_results(path: &Path, summary: &EvaluationSummary) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open results log {}", path.display()))?;

    writeln!(file, "{}", summary.log_line())
        .with_context(|| format!("Failed to write results log {}", path.display()))?;
    Ok(())
}

/// Writes the summary as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_summary_json(path: &Path, summary: &EvaluationSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write summary {}", path.display()))?;
    Ok(())
}
