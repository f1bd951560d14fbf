//! Anomaly scoring and out-of-distribution detection metrics for road-scene
//! semantic segmentation.
//!
//! The pipeline, leaf first:
//!
//! - [`AnomalyScorer`] turns per-class logits into a per-pixel anomaly map.
//! - [`LabelRemapper`] normalizes a benchmark's raw ground truth into
//!   `{0: in-distribution, 1: OOD, 255: ignore}`.
//! - [`SampleAggregator`] pools the scores of images that contain OOD pixels.
//! - [`MetricEngine`] computes AUPRC and FPR@95%TPR over the pool.
//!
//! [`ClassIoU`] provides the closed-set per-class IoU of the same networks.

pub mod aggregator;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod iou;
pub mod remap;
pub mod scoring;

pub use aggregator::{SampleAggregator, ScorePool};
pub use dataset::DatasetKind;
pub use engine::{
    average_precision, fpr_at_tpr, DetectionMetrics, MetricEngine, TARGET_TPR,
};
pub use error::{MetricError, MetricResult};
pub use iou::{ClassIoU, ClassIoUConfig, CITYSCAPES_CLASSES};
pub use remap::{
    count_unnormalized, LabelRemapper, Rewrite, ID_LABEL, IGNORE_LABEL, OOD_LABEL,
};
pub use scoring::{AnomalyScorer, ScoringMethod, CITYSCAPES_NUM_CLASSES};
