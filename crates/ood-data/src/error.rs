//! Error types for the data collaborator.
//!
//! Covers image discovery and glob expansion, ground-truth lookup, image and mask decoding and
//! recorded-logit archives.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for data loading operations.
#[derive(Error, Debug)]
pub enum DataError {
    /// Error when an input path does not exist.
    #[error("Input path not found: {path}")]
    InputNotFound {
        /// The missing input path.
        path: PathBuf,
    },

    /// Error when walking an input directory fails.
    #[error("Failed to read directory: {path}")]
    DirectoryReadFailed {
        /// The directory path that failed to read.
        path: PathBuf,
        /// The underlying walk error.
        #[source]
        source: walkdir::Error,
    },

    /// Error when an input glob pattern is malformed.
    #[error("Invalid glob pattern: {pattern}")]
    InvalidGlobPattern {
        /// The pattern as given.
        pattern: String,
        /// The underlying pattern error.
        #[source]
        source: glob::PatternError,
    },

    /// Error when a path matched by a glob pattern cannot be read.
    #[error("Failed to read glob match: {path}")]
    GlobReadFailed {
        /// The matched path.
        path: PathBuf,
        /// The underlying glob error.
        #[source]
        source: glob::GlobError,
    },

    /// Error when no image was found among the inputs.
    #[error("No images found in: {inputs}")]
    NoImagesFound {
        /// The inputs that were searched.
        inputs: String,
    },

    /// Error when the ground-truth mask of an image does not exist.
    #[error("Ground-truth mask not found: {path} (for image {image})")]
    GroundTruthNotFound {
        /// The derived mask path.
        path: PathBuf,
        /// The image the mask belongs to.
        image: PathBuf,
    },

    /// Error when opening or decoding an image file fails.
    #[error("Failed to open image: {path}")]
    ImageOpenFailed {
        /// The image file path that failed to open.
        path: PathBuf,
        /// The underlying image processing error.
        #[source]
        source: image::ImageError,
    },

    /// Error when a mask carries colour instead of single-channel label codes.
    #[error("Unsupported mask format {color} (expected 8-bit label codes): {path}")]
    UnsupportedMaskFormat {
        /// The mask file path.
        path: PathBuf,
        /// The decoded colour type.
        color: String,
    },

    /// Error when loading a recorded logit tensor fails.
    #[error("Failed to load logits from {path}: {reason}")]
    LogitsLoadFailed {
        /// The logit archive path.
        path: PathBuf,
        /// The recorder error message.
        reason: String,
    },

    /// Error when writing a logit tensor fails.
    #[error("Failed to record logits to {path}: {reason}")]
    LogitsRecordFailed {
        /// The logit archive path.
        path: PathBuf,
        /// The recorder error message.
        reason: String,
    },

    /// Error when a file has no stem (filename without extension).
    #[error("File has no stem: {path}")]
    NoFileStem {
        /// The file path without a stem.
        path: PathBuf,
    },

    /// Error when path components contain invalid UTF-8.
    #[error("Path contains invalid UTF-8: {path}")]
    InvalidUtf8Path {
        /// The path with invalid UTF-8.
        path: PathBuf,
    },
}

/// A specialized `Result` type for data loading operations.
pub type DataResult<T> = Result<T, DataError>;
