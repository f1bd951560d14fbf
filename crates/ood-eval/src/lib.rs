//! Anomaly segmentation evaluation for road-scene networks.
//!
//! Runs a segmentation network (or its recorded logits) over an anomaly
//! benchmark, scores every pixel, and reports AUPRC and FPR@95%TPR. The
//! closed-set per-class IoU of the same network is available through
//! [`segmentation::run_iou`].

pub mod backend;
pub mod config;
pub mod evaluation;
pub mod model;
pub mod segmentation;

#[doc(inline)]
pub use ood_data as data;
#[doc(inline)]
pub use ood_metric as metric;

pub use config::{load_config_file, EvalConfig};
pub use evaluation::{
    append_results, resolve_dataset, run_evaluation, write_summary_json, EvaluationSummary,
};
pub use model::{LogitSource, ModelLogits, RecordedLogits, SegmentationModel};
pub use segmentation::{run_iou, ClassScore, IouReport};
