//! Closed-set per-class IoU on Cityscapes train-id ground truth.

use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::tensor::backend::Backend;
use ood_data::{cityscapes_label_path, load_mask};
use ood_metric::{ClassIoUConfig, ScoringMethod, CITYSCAPES_CLASSES, IGNORE_LABEL};

use crate::{config::EvalConfig, model::LogitSource};

/// IoU of one class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassScore {
    pub name: String,
    pub iou: f64,
}

/// Per-class and mean IoU of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct IouReport {
    pub classes: Vec<ClassScore>,
    pub mean: f64,
}

fn class_name(index: usize, num_classes: usize) -> String {
    if index == num_classes {
        "void".to_string()
    } else if num_classes == CITYSCAPES_CLASSES.len() {
        CITYSCAPES_CLASSES[index].to_string()
    } else {
        format!("class {index}")
    }
}

/// Accumulates the confusion of argmax predictions against train-id labels.
///
/// The void class is scored only when the void method is configured; it is
/// otherwise the ignore column, which also receives raw `255` pixels.
///
/// # Errors
///
/// Returns an error if logits or a label image cannot be read, or shapes disagree.
pub fn run_iou<B, S>(
    config: &EvalConfig,
    images: &[PathBuf],
    source: &S,
    device: &B::Device,
) -> Result<IouReport>
where
    B: Backend,
    S: LogitSource<B>,
{
    B::seed(config.seed);

    let void_class = config.num_classes;
    let ignore_index = (config.method != ScoringMethod::Void).then_some(void_class);
    let mut iou = ClassIoUConfig::new()
        .with_num_classes(void_class + 1)
        .with_ignore_index(ignore_index)
        .init();

    tracing::info!(
        images = images.len(),
        scored_classes = iou.scored_classes(),
        "evaluating segmentation IoU",
    );

    for image in images {
        let logits = source
            .logits(image, device)
            .with_context(|| format!("Failed to obtain logits for {}", image.display()))?;

        let label_path = cityscapes_label_path(image)?;
        let raw = load_mask::<B>(&label_path, config.resolution(), device)?;
        let ignored = raw.clone().equal_elem(IGNORE_LABEL);
        let labels = raw.mask_fill(ignored, void_class as i64);

        iou.update(logits, labels)?;
        tracing::debug!(image = %image.display(), "accumulated image");
    }

    let classes = iou
        .per_class()
        .into_iter()
        .enumerate()
        .map(|(index, value)| ClassScore {
            name: class_name(index, void_class),
            iou: value,
        })
        .collect();
    let mean = iou.mean();

    tracing::info!(mean_iou = mean, "segmentation evaluation finished");
    Ok(IouReport { classes, mean })
}
