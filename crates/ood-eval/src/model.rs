//! Where the per-image logits come from.
//!
//! The evaluation only needs a `[C, H, W]` logit map per image. A
//! [`SegmentationModel`] produces it from the decoded image; [`RecordedLogits`]
//! reads it from an archive written by an earlier network run.

use std::path::{Path, PathBuf};

use anyhow::Result;
use burn::tensor::{backend::Backend, Tensor};
use ood_data::{load_image, LogitArchive, Resolution};

/// A semantic segmentation network: image `[3, H, W]` to logits `[C, H, W]`.
pub trait SegmentationModel<B: Backend> {
    fn infer(&self, image: Tensor<B, 3>) -> Tensor<B, 3>;
}

impl<B, F> SegmentationModel<B> for F
where
    B: Backend,
    F: Fn(Tensor<B, 3>) -> Tensor<B, 3>,
{
    fn infer(&self, image: Tensor<B, 3>) -> Tensor<B, 3> {
        self(image)
    }
}

/// Provides the logit map of an image.
pub trait LogitSource<B: Backend> {
    /// # Errors
    ///
    /// Returns an error if the image or its logits cannot be read.
    fn logits(&self, image: &Path, device: &B::Device) -> Result<Tensor<B, 3>>;
}

/// Runs a model on each image at the evaluation resolution.
pub struct ModelLogits<M> {
    model: M,
    resolution: Resolution,
}

impl<M> ModelLogits<M> {
    pub const fn new(model: M, resolution: Resolution) -> Self {
        Self { model, resolution }
    }
}

impl<B: Backend, M: SegmentationModel<B>> LogitSource<B> for ModelLogits<M> {
    fn logits(&self, image: &Path, device: &B::Device) -> Result<Tensor<B, 3>> {
        let input = load_image::<B>(image, self.resolution, device)?;
        Ok(self.model.infer(input))
    }
}

/// Reads logits recorded as `<dir>/<image stem>.mpk`.
pub struct RecordedLogits {
    archive: LogitArchive,
}

impl RecordedLogits {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            archive: LogitArchive::new(dir),
        }
    }
}

impl<B: Backend> LogitSource<B> for RecordedLogits {
    fn logits(&self, image: &Path, device: &B::Device) -> Result<Tensor<B, 3>> {
        Ok(self.archive.load(image, device)?)
    }
}
