//! Image discovery and the image-to-ground-truth path conventions.

use std::path::{Component, Path, PathBuf};

use image::ImageFormat;
use ood_metric::DatasetKind;
use walkdir::WalkDir;

use crate::error::{DataError, DataResult};

/// Directory token holding the input images of an anomaly benchmark.
pub const IMAGES_DIR: &str = "images";
/// Directory token holding the ground-truth masks of an anomaly benchmark.
pub const MASKS_DIR: &str = "labels_masks";

const CITYSCAPES_IMAGE_DIR: &str = "leftImg8bit";
const CITYSCAPES_LABEL_DIR: &str = "gtFine";
const CITYSCAPES_IMAGE_SUFFIX: &str = "_leftImg8bit.png";
const CITYSCAPES_LABEL_SUFFIX: &str = "_gtFine_labelTrainIds.png";

/// Whether the image crate can decode files with this path's extension.
pub fn is_supported_image_format(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(ImageFormat::from_extension)
        .is_some_and(|format| format.reading_enabled())
}

/// Expands the inputs into a list of image files.
///
/// Files are taken as given. Directories are walked recursively for decodable
/// images, skipping anything inside a ground-truth directory. Inputs holding
/// `*`, `?` or `[` are glob patterns whose matches are taken in sorted order.
/// A leading `~` stands for the home directory.
///
/// # Errors
///
/// Returns an error if an input does not exist, a directory cannot be read,
/// a pattern is malformed, or nothing was found.
pub fn discover_images(inputs: &[PathBuf]) -> DataResult<Vec<PathBuf>> {
    let mut images = Vec::new();

    for input in inputs {
        let input = expand_home(input);
        if input.is_file() {
            images.push(input);
        } else if input.is_dir() {
            walk_directory(&input, &mut images)?;
        } else if is_glob_pattern(&input) {
            expand_pattern(&input, &mut images)?;
        } else {
            return Err(DataError::InputNotFound { path: input });
        }
    }

    if images.is_empty() {
        return Err(DataError::NoImagesFound {
            inputs: inputs
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        });
    }

    tracing::debug!(count = images.len(), "discovered images");
    Ok(images)
}

fn walk_directory(dir: &Path, images: &mut Vec<PathBuf>) -> DataResult<()> {
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|source| DataError::DirectoryReadFailed {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if entry.file_type().is_file()
            && is_supported_image_format(path)
            && !has_component(path, MASKS_DIR)
            && !has_component(path, CITYSCAPES_LABEL_DIR)
        {
            images.push(path.to_path_buf());
        }
    }
    Ok(())
}

fn is_glob_pattern(path: &Path) -> bool {
    path.to_str()
        .is_some_and(|s| s.contains(['*', '?', '[']))
}

fn expand_pattern(pattern: &Path, images: &mut Vec<PathBuf>) -> DataResult<()> {
    let pattern = pattern.to_str().ok_or_else(|| DataError::InvalidUtf8Path {
        path: pattern.to_path_buf(),
    })?;
    let entries = glob::glob(pattern).map_err(|source| DataError::InvalidGlobPattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut matches = Vec::new();
    for entry in entries {
        let path = entry.map_err(|source| DataError::GlobReadFailed {
            path: source.path().to_path_buf(),
            source,
        })?;
        if path.is_file() && is_supported_image_format(&path) {
            matches.push(path);
        }
    }
    matches.sort();

    tracing::debug!(pattern, matches = matches.len(), "expanded input pattern");
    images.extend(matches);
    Ok(())
}

/// Replaces a leading `~` component with the home directory.
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

fn has_component(path: &Path, name: &str) -> bool {
    path.components()
        .any(|c| matches!(c, Component::Normal(part) if part == name))
}

fn replace_component(path: &Path, from: &str, to: &str) -> PathBuf {
    path.components()
        .map(|c| match c {
            Component::Normal(part) if part == from => Component::Normal(to.as_ref()),
            other => other,
        })
        .collect()
}

/// Derives the ground-truth mask path of an anomaly-benchmark image.
///
/// The `images` directory becomes `labels_masks`, and the extension is swapped
/// for benchmarks that store masks in another format than their images.
pub fn ground_truth_path(image: &Path, dataset: &DatasetKind) -> PathBuf {
    let mut mask = replace_component(image, IMAGES_DIR, MASKS_DIR);

    if let Some((from, to)) = dataset.mask_extension_swap() {
        let matches = mask
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(from));
        if matches {
            mask.set_extension(to);
        }
    }

    mask
}

/// Like [`ground_truth_path`], failing when the mask does not exist.
///
/// # Errors
///
/// Returns [`DataError::GroundTruthNotFound`] if no file is at the derived path.
pub fn existing_ground_truth_path(image: &Path, dataset: &DatasetKind) -> DataResult<PathBuf> {
    let mask = ground_truth_path(image, dataset);
    if mask.is_file() {
        Ok(mask)
    } else {
        Err(DataError::GroundTruthNotFound {
            path: mask,
            image: image.to_path_buf(),
        })
    }
}

/// Derives the Cityscapes train-id label path of a `leftImg8bit` image.
///
/// # Errors
///
/// Returns an error if the file name is not valid UTF-8.
pub fn cityscapes_label_path(image: &Path) -> DataResult<PathBuf> {
    let label = replace_component(image, CITYSCAPES_IMAGE_DIR, CITYSCAPES_LABEL_DIR);
    let file_name = label
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| DataError::InvalidUtf8Path {
            path: image.to_path_buf(),
        })?;

    let label_name = match file_name.strip_suffix(CITYSCAPES_IMAGE_SUFFIX) {
        Some(stem) => format!("{stem}{CITYSCAPES_LABEL_SUFFIX}"),
        None => file_name.to_string(),
    };

    Ok(label.with_file_name(label_name))
}
