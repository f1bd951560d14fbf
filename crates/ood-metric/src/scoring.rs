//! Per-pixel anomaly scoring from segmentation logits.
//!
//! A logit map `[channels, H, W]` is reduced to an anomaly map `[H, W]` where
//! higher values mean "more likely out-of-distribution". Four competing rules
//! are supported: maximum softmax probability, max-logit, normalized entropy,
//! and the probability of an explicit void channel.

use std::str::FromStr;

use burn::{
    prelude::*,
    tensor::activation::{log_softmax, softmax},
};

use crate::error::{MetricError, MetricResult};

/// Number of semantic classes of the Cityscapes train-id label set.
pub const CITYSCAPES_NUM_CLASSES: usize = 19;

/// Defines how a logit map is turned into an anomaly map.
#[derive(Config, Debug, PartialEq, Eq)]
pub enum ScoringMethod {
    /// `1 - max softmax(logits / T)`, in `[0, 1]`.
    Msp,
    /// `-max logits`, unbounded.
    MaxLogit,
    /// Softmax entropy divided by `ln(C)`, in `[0, 1]`.
    MaxEntropy,
    /// Softmax probability of the trailing void channel, in `[0, 1]`.
    Void,
}

impl ScoringMethod {
    /// Short lowercase name used on the command line and in result logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Msp => "msp",
            Self::MaxLogit => "maxlogit",
            Self::MaxEntropy => "maxentropy",
            Self::Void => "void",
        }
    }

    /// Whether the anomaly score of this method is bounded to `[0, 1]`.
    #[must_use]
    pub const fn is_probability(&self) -> bool {
        !matches!(self, Self::MaxLogit)
    }
}

impl FromStr for ScoringMethod {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "msp" => Ok(Self::Msp),
            "maxlogit" => Ok(Self::MaxLogit),
            "maxentropy" => Ok(Self::MaxEntropy),
            "void" => Ok(Self::Void),
            other => Err(MetricError::InvalidConfiguration {
                reason: format!(
                    "unknown scoring method '{other}', expected one of msp, maxlogit, maxentropy, void"
                ),
            }),
        }
    }
}

/// Converts per-class logits into a per-pixel anomaly map.
#[derive(Debug, Clone)]
pub struct AnomalyScorer {
    method: ScoringMethod,
    temperature: f32,
    num_classes: usize,
}

impl AnomalyScorer {
    /// Creates a scorer.
    ///
    /// `num_classes` is the number of semantic classes the network was trained
    /// on; a logit map with one extra channel is treated as carrying a void
    /// channel in last position.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::InvalidConfiguration`] if the temperature is not
    /// a positive finite number or `num_classes` is zero.
    pub fn new(method: ScoringMethod, temperature: f32, num_classes: usize) -> MetricResult<Self> {
        if !temperature.is_finite() || temperature <= 0.0 {
            return Err(MetricError::InvalidConfiguration {
                reason: format!("temperature must be a positive finite number, got {temperature}"),
            });
        }
        if num_classes == 0 {
            return Err(MetricError::InvalidConfiguration {
                reason: "num_classes must be at least 1".to_string(),
            });
        }

        Ok(Self {
            method,
            temperature,
            num_classes,
        })
    }

    pub const fn method(&self) -> &ScoringMethod {
        &self.method
    }

    pub const fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Computes the anomaly map of one image.
    ///
    /// # Arguments
    ///
    /// * `logits` - Logit map of shape `[C, H, W]` or `[C + 1, H, W]`.
    ///
    /// # Returns
    ///
    /// Anomaly map of shape `[H, W]`.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::InvalidTensorShape`] if the channel count matches
    /// neither `C` nor `C + 1`, and [`MetricError::InvalidConfiguration`] if the
    /// void method is requested for logits without a void channel.
    pub fn score<B: Backend>(&self, logits: Tensor<B, 3>) -> MetricResult<Tensor<B, 2>> {
        let [channels, _, _] = logits.dims();
        let has_void = self.has_void_channel(channels)?;

        if self.method == ScoringMethod::Void && !has_void {
            return Err(MetricError::InvalidConfiguration {
                reason: format!(
                    "void scoring needs {} channels ({} classes + void), got {channels}",
                    self.num_classes + 1,
                    self.num_classes
                ),
            });
        }

        // Every rule but void ignores the void channel.
        let classes = if has_void {
            logits.clone().narrow(0, 0, channels - 1)
        } else {
            logits.clone()
        };

        let anomaly = match self.method {
            ScoringMethod::Msp => max_softmax_anomaly(classes, self.temperature),
            ScoringMethod::MaxLogit => max_logit_anomaly(classes),
            ScoringMethod::MaxEntropy => normalized_entropy(classes),
            ScoringMethod::Void => void_probability(logits),
        };

        Ok(anomaly)
    }

    fn has_void_channel(&self, channels: usize) -> MetricResult<bool> {
        if channels == self.num_classes + 1 {
            Ok(true)
        } else if channels == self.num_classes {
            Ok(false)
        } else {
            Err(MetricError::InvalidTensorShape {
                expected: format!(
                    "[{} or {}, H, W]",
                    self.num_classes,
                    self.num_classes + 1
                ),
                actual: format!("[{channels}, H, W]"),
            })
        }
    }
}

/// Softmax over all channels, keeping the last (void) one.
pub fn void_probability<B: Backend>(logits: Tensor<B, 3>) -> Tensor<B, 2> {
    let [channels, _, _] = logits.dims();
    softmax(logits, 0)
        .narrow(0, channels - 1, 1)
        .squeeze::<2>(0)
}

/// `1 - max softmax(logits / temperature)` over the channel axis.
pub fn max_softmax_anomaly<B: Backend>(logits: Tensor<B, 3>, temperature: f32) -> Tensor<B, 2> {
    let probs = softmax(logits.div_scalar(temperature), 0);
    probs.max_dim(0).neg().add_scalar(1.0).squeeze::<2>(0)
}

/// Negated maximum raw logit over the channel axis.
pub fn max_logit_anomaly<B: Backend>(logits: Tensor<B, 3>) -> Tensor<B, 2> {
    logits.max_dim(0).neg().squeeze::<2>(0)
}

/// Shannon entropy of the channel softmax, divided by `ln(C)`.
///
/// A single channel carries no uncertainty, so the map is all zeros.
pub fn normalized_entropy<B: Backend>(logits: Tensor<B, 3>) -> Tensor<B, 2> {
    let [channels, height, width] = logits.dims();
    if channels < 2 {
        return Tensor::zeros([height, width], &logits.device());
    }

    let probs = softmax(logits.clone(), 0);
    let log_probs = log_softmax(logits, 0);
    let entropy = (probs * log_probs).sum_dim(0).neg();

    entropy.div_scalar((channels as f64).ln()).squeeze::<2>(0)
}
