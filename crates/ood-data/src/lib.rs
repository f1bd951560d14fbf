//! Data collaborators for the OOD evaluation: image discovery, ground-truth
//! path conventions, image and mask decoding, and recorded-logit archives.

pub mod error;
pub mod image;
pub mod logits;
pub mod paths;

pub use crate::image::{dynamic_image_to_tensor, load_image, load_mask, Resolution};
pub use error::{DataError, DataResult};
pub use logits::LogitArchive;
pub use paths::{
    cityscapes_label_path, discover_images, existing_ground_truth_path, ground_truth_path,
    is_supported_image_format, IMAGES_DIR, MASKS_DIR,
};
