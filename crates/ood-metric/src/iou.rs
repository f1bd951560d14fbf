//! Per-class IoU (Intersection over Union) over a dataset pass.
//!
//! This is the closed-set companion of the anomaly metrics: predictions are the
//! per-pixel argmax of the logits, and true positives, false positives and
//! false negatives are accumulated per class.

use burn::prelude::*;

use crate::error::{MetricError, MetricResult};

/// Cityscapes train-id class names, in label order.
pub const CITYSCAPES_CLASSES: [&str; 19] = [
    "road",
    "sidewalk",
    "building",
    "wall",
    "fence",
    "pole",
    "traffic light",
    "traffic sign",
    "vegetation",
    "terrain",
    "sky",
    "person",
    "rider",
    "car",
    "truck",
    "bus",
    "train",
    "motorcycle",
    "bicycle",
];

#[derive(Config, Debug)]
pub struct ClassIoUConfig {
    /// Number of predicted classes, void included.
    #[config(default = 20)]
    pub num_classes: usize,
    /// Ground-truth class excluded from scoring; classes from this index on
    /// are not reported. `None` scores every class.
    #[config(default = "Some(19)")]
    pub ignore_index: Option<usize>,
    #[config(default = 1e-15)]
    pub epsilon: f64,
}

impl ClassIoUConfig {
    pub fn init(&self) -> ClassIoU {
        let scored = self
            .ignore_index
            .map_or(self.num_classes, |ignore| ignore.min(self.num_classes));

        ClassIoU {
            true_positives: vec![0; scored],
            false_positives: vec![0; scored],
            false_negatives: vec![0; scored],
            ignore_index: self.ignore_index.map(|i| i as i64),
            epsilon: self.epsilon,
        }
    }
}

/// Confusion accumulator reporting per-class and mean IoU.
#[derive(Debug, Clone)]
pub struct ClassIoU {
    true_positives: Vec<u64>,
    false_positives: Vec<u64>,
    false_negatives: Vec<u64>,
    ignore_index: Option<i64>,
    epsilon: f64,
}

impl Default for ClassIoU {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassIoU {
    pub fn new() -> Self {
        ClassIoUConfig::new().init()
    }

    /// Number of classes that receive an IoU.
    pub fn scored_classes(&self) -> usize {
        self.true_positives.len()
    }

    /// Accumulates one image from its logits `[C, H, W]` and train-id labels `[H, W]`.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::InvalidTensorShape`] if the spatial sizes differ.
    pub fn update<B: Backend>(
        &mut self,
        logits: Tensor<B, 3>,
        labels: Tensor<B, 2, Int>,
    ) -> MetricResult<()> {
        let [_, height, width] = logits.dims();
        let label_dims = labels.dims();
        if [height, width] != label_dims {
            return Err(MetricError::InvalidTensorShape {
                expected: format!("[{height}, {width}]"),
                actual: format!("{label_dims:?}"),
            });
        }

        let predictions = logits.argmax(0).squeeze::<2>(0);
        let predictions = host_ints(predictions)?;
        let labels = host_ints(labels)?;

        self.update_from_labels(&predictions, &labels);
        Ok(())
    }

    /// Accumulates flattened predicted and ground-truth class ids.
    pub fn update_from_labels(&mut self, predictions: &[i64], labels: &[i64]) {
        for (&prediction, &label) in predictions.iter().zip(labels) {
            let ignored = self.ignore_index == Some(label);

            if let Some(class) = self.scored_index(prediction) {
                if prediction == label {
                    self.true_positives[class] += 1;
                } else if !ignored {
                    self.false_positives[class] += 1;
                }
            }

            if prediction != label {
                if let Some(class) = self.scored_index(label) {
                    self.false_negatives[class] += 1;
                }
            }
        }
    }

    fn scored_index(&self, class: i64) -> Option<usize> {
        usize::try_from(class)
            .ok()
            .filter(|&class| class < self.scored_classes())
    }

    /// IoU of every scored class, in class order.
    pub fn per_class(&self) -> Vec<f64> {
        (0..self.scored_classes())
            .map(|c| {
                let tp = self.true_positives[c] as f64;
                let denominator =
                    tp + self.false_positives[c] as f64 + self.false_negatives[c] as f64;
                tp / (denominator + self.epsilon)
            })
            .collect()
    }

    /// Mean IoU over the scored classes.
    pub fn mean(&self) -> f64 {
        let per_class = self.per_class();
        if per_class.is_empty() {
            return 0.0;
        }
        per_class.iter().sum::<f64>() / per_class.len() as f64
    }

    /// Reset the accumulator.
    pub fn reset(&mut self) {
        self.true_positives.fill(0);
        self.false_positives.fill(0);
        self.false_negatives.fill(0);
    }
}

fn host_ints<B: Backend>(tensor: Tensor<B, 2, Int>) -> MetricResult<Vec<i64>> {
    tensor
        .into_data()
        .convert::<i64>()
        .to_vec::<i64>()
        .map_err(|e| MetricError::TensorDataConversion {
            reason: format!("{e:?}"),
        })
}
