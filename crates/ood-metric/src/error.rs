use thiserror::Error;

/// The error type for anomaly scoring and metric computation.
///
/// Covers configuration mistakes (unknown scoring method, bad temperature),
/// tensor shape disagreements between logits, anomaly maps and label masks,
/// and degenerate score pools at finalization time.
#[derive(Error, Debug)]
pub enum MetricError {
    /// Error for when the scoring or evaluation configuration is unusable.
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration {
        /// The reason why the configuration is invalid.
        reason: String,
    },

    /// Error for when an input tensor has an invalid shape.
    #[error("Invalid input tensor shape: expected {expected}, got {actual}")]
    InvalidTensorShape {
        /// The expected tensor shape.
        expected: String,
        /// The actual tensor shape.
        actual: String,
    },

    /// Error for when one of the score pools is empty and the summary
    /// statistics are undefined.
    #[error("Insufficient data: {ood} out-of-distribution and {id} in-distribution scores pooled")]
    InsufficientData {
        /// Number of pooled out-of-distribution scores.
        ood: usize,
        /// Number of pooled in-distribution scores.
        id: usize,
    },

    /// Error for when pooled scores contain NaN values.
    #[error("Score pool contains {count} NaN values")]
    NonFiniteScore {
        /// Number of NaN scores found.
        count: usize,
    },

    /// Error for when tensor data cannot be read back into host memory.
    #[error("Tensor data conversion failed: {reason}")]
    TensorDataConversion {
        /// A description of the failed conversion.
        reason: String,
    },
}

/// A specialized `Result` type for scoring and metric operations.
pub type MetricResult<T> = Result<T, MetricError>;
