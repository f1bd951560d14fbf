//! Pooling of per-pixel anomaly scores across a dataset pass.
//!
//! Only images whose normalized mask contains at least one OOD pixel take
//! part in the metric computation. Accepted images are flattened into two
//! growing score pools; ignore pixels never enter either pool.

use burn::prelude::*;

use crate::{
    engine::{DetectionMetrics, MetricEngine},
    error::{MetricError, MetricResult},
    remap::{ID_LABEL, OOD_LABEL},
};

/// Scores of all accepted pixels, split by ground-truth label.
#[derive(Debug, Clone, Default)]
pub struct ScorePool {
    /// Scores of pixels labeled out-of-distribution.
    pub ood: Vec<f32>,
    /// Scores of pixels labeled in-distribution.
    pub id: Vec<f32>,
}

impl ScorePool {
    pub fn len(&self) -> usize {
        self.ood.len() + self.id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ood.is_empty() && self.id.is_empty()
    }
}

/// Decides which images contribute to the metrics and pools their scores.
#[derive(Debug, Clone, Default)]
pub struct SampleAggregator {
    pool: ScorePool,
    accepted: usize,
    skipped: usize,
}

impl SampleAggregator {
    /// Create a new, empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Considers one processed image.
    ///
    /// Both tensors are consumed; their device buffers are released as soon
    /// as the host copy is taken.
    ///
    /// # Returns
    ///
    /// `true` if the image contains OOD pixels and was pooled.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::InvalidTensorShape`] if the anomaly map and the
    /// label mask disagree in shape.
    pub fn consider<B: Backend>(
        &mut self,
        anomaly: Tensor<B, 2>,
        label: Tensor<B, 2, Int>,
    ) -> MetricResult<bool> {
        let anomaly_dims = anomaly.dims();
        let label_dims = label.dims();
        if anomaly_dims != label_dims {
            return Err(MetricError::InvalidTensorShape {
                expected: format!("{anomaly_dims:?}"),
                actual: format!("{label_dims:?}"),
            });
        }

        let labels = label
            .into_data()
            .convert::<i64>()
            .to_vec::<i64>()
            .map_err(|e| MetricError::TensorDataConversion {
                reason: format!("{e:?}"),
            })?;

        if !labels.contains(&OOD_LABEL) {
            self.skipped += 1;
            return Ok(false);
        }

        let scores = anomaly
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| MetricError::TensorDataConversion {
                reason: format!("{e:?}"),
            })?;

        self.pool_pixels(&scores, &labels);
        self.accepted += 1;
        Ok(true)
    }

    fn pool_pixels(&mut self, scores: &[f32], labels: &[i64]) {
        for (&score, &label) in scores.iter().zip(labels) {
            match label {
                OOD_LABEL => self.pool.ood.push(score),
                ID_LABEL => self.pool.id.push(score),
                _ => {}
            }
        }
    }

    /// Number of images pooled so far.
    pub const fn accepted(&self) -> usize {
        self.accepted
    }

    /// Number of images skipped for lack of OOD pixels.
    pub const fn skipped(&self) -> usize {
        self.skipped
    }

    pub const fn pool(&self) -> &ScorePool {
        &self.pool
    }

    /// Computes the summary metrics over everything pooled so far.
    ///
    /// # Errors
    ///
    /// See [`MetricEngine::finalize`].
    pub fn finalize(&self) -> MetricResult<DetectionMetrics> {
        MetricEngine::finalize(&self.pool)
    }

    /// Reset the aggregator.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
