//! Image and ground-truth mask decoding at the evaluation resolution.
//!
//! Images are resized bilinearly; masks with nearest-neighbour sampling so
//! that no label code is invented at region borders.

use std::path::Path;

use burn::tensor::{
    backend::Backend,
    module::interpolate,
    ops::{InterpolateMode, InterpolateOptions},
    Int, Tensor, TensorData,
};
use image::{
    imageops::FilterType, DynamicImage, GenericImageView, GrayImage, ImageBuffer, Luma, Pixel,
};

use crate::error::{DataError, DataResult};

/// Evaluation resolution as `(height, width)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub height: usize,
    pub width: usize,
}

impl Resolution {
    pub const fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new(512, 1024)
    }
}

fn open(path: &Path) -> DataResult<DynamicImage> {
    image::open(path).map_err(|source| DataError::ImageOpenFailed {
        path: path.to_path_buf(),
        source,
    })
}

/// Load an RGB image as a tensor of shape `[3, height, width]` in `[0, 1]`,
/// resized bilinearly to `size`.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or decoded.
pub fn load_image<B: Backend>(
    path: &Path,
    size: Resolution,
    device: &B::Device,
) -> DataResult<Tensor<B, 3>> {
    let img = open(path)?;
    Ok(resize_bilinear(dynamic_image_to_tensor(img, device), size))
}

/// Convert a decoded image into a `[3, height, width]` float tensor.
pub fn dynamic_image_to_tensor<B: Backend>(img: DynamicImage, device: &B::Device) -> Tensor<B, 3> {
    let (width, height) = img.dimensions();
    let buf = img.into_rgb32f().into_raw();

    let data = TensorData::new(buf, [height as usize, width as usize, 3])
        .convert::<B::FloatElem>();
    Tensor::<B, 3>::from_data(data, device).permute([2, 0, 1])
}

fn resize_bilinear<B: Backend>(image: Tensor<B, 3>, size: Resolution) -> Tensor<B, 3> {
    let [_, height, width] = image.dims();
    if height == size.height && width == size.width {
        return image;
    }

    interpolate(
        image.unsqueeze::<4>(),
        [size.height, size.width],
        InterpolateOptions::new(InterpolateMode::Bilinear),
    )
    .squeeze::<3>(0)
}

/// Reads the raw 8-bit label codes of a decoded mask.
///
/// Colour masks are accepted only when every pixel is grey, since their
/// channels then carry the codes unchanged.
fn label_codes(mask: DynamicImage, path: &Path) -> DataResult<GrayImage> {
    let color = mask.color();
    let grey = match mask {
        DynamicImage::ImageLuma8(codes) => return Ok(codes),
        DynamicImage::ImageRgb8(rgb) => grey_channel(&rgb),
        DynamicImage::ImageRgba8(rgba) => grey_channel(&rgba),
        _ => None,
    };

    grey.ok_or_else(|| DataError::UnsupportedMaskFormat {
        path: path.to_path_buf(),
        color: format!("{color:?}"),
    })
}

fn grey_channel<P>(buffer: &ImageBuffer<P, Vec<u8>>) -> Option<GrayImage>
where
    P: Pixel<Subpixel = u8>,
{
    let is_grey = buffer.pixels().all(|pixel| {
        let channels = pixel.channels();
        channels[0] == channels[1] && channels[1] == channels[2]
    });

    is_grey.then(|| {
        GrayImage::from_fn(buffer.width(), buffer.height(), |x, y| {
            Luma([buffer.get_pixel(x, y).channels()[0]])
        })
    })
}

/// Load a single-channel label mask as an integer tensor of shape
/// `[height, width]`, resized with nearest-neighbour sampling to `size`.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or decoded, or if it holds
/// colour rather than label codes.
pub fn load_mask<B: Backend>(
    path: &Path,
    size: Resolution,
    device: &B::Device,
) -> DataResult<Tensor<B, 2, Int>> {
    let mask = label_codes(open(path)?, path)?;

    let mask = if mask.dimensions() == (size.width as u32, size.height as u32) {
        mask
    } else {
        image::imageops::resize(
            &mask,
            size.width as u32,
            size.height as u32,
            FilterType::Nearest,
        )
    };

    let values: Vec<i64> = mask.into_raw().into_iter().map(i64::from).collect();
    let data = TensorData::new(values, [size.height, size.width]).convert::<B::IntElem>();
    Ok(Tensor::from_data(data, device))
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;
    use image::{Rgb, RgbImage};

    use super::*;

    type TestBackend = NdArray;

    #[test]
    fn load_mask_keeps_label_codes_when_downsampling() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.png");
        // Left half 0, right half 2: bilinear sampling would create 1s.
        let mask = GrayImage::from_fn(8, 4, |x, _| Luma([if x < 4 { 0 } else { 2 }]));
        mask.save(&path).unwrap();

        let tensor =
            load_mask::<TestBackend>(&path, Resolution::new(2, 4), &Default::default()).unwrap();

        assert_eq!(tensor.dims(), [2, 4]);
        let values = tensor.into_data().convert::<i64>().to_vec::<i64>().unwrap();
        assert!(values.iter().all(|v| *v == 0 || *v == 2));
        assert_eq!(&values[..4], &[0, 0, 2, 2]);
    }

    #[test]
    fn load_image_resizes_to_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.png");
        RgbImage::from_pixel(6, 3, Rgb([255, 0, 255])).save(&path).unwrap();

        let tensor =
            load_image::<TestBackend>(&path, Resolution::new(4, 8), &Default::default()).unwrap();

        assert_eq!(tensor.dims(), [3, 4, 8]);
        let values = tensor.into_data().convert::<f32>().to_vec::<f32>().unwrap();
        // Constant image stays constant under bilinear resizing.
        assert!(values[..32].iter().all(|v| (v - 1.0).abs() < 1e-5));
        assert!(values[32..64].iter().all(|v| v.abs() < 1e-5));
    }

    #[test]
    fn load_mask_reads_codes_from_grey_rgb_masks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.png");
        let mask = RgbImage::from_fn(2, 1, |x, _| {
            let code = if x == 0 { 2 } else { 255 };
            Rgb([code, code, code])
        });
        mask.save(&path).unwrap();

        let tensor =
            load_mask::<TestBackend>(&path, Resolution::new(1, 2), &Default::default()).unwrap();

        let values = tensor.into_data().convert::<i64>().to_vec::<i64>().unwrap();
        assert_eq!(values, vec![2, 255]);
    }

    #[test]
    fn load_mask_rejects_colour_masks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.png");
        // Brightness of this colour would read as a plausible label code.
        RgbImage::from_pixel(2, 2, Rgb([128, 64, 0])).save(&path).unwrap();

        let result = load_mask::<TestBackend>(&path, Resolution::new(2, 2), &Default::default());
        assert!(matches!(
            result,
            Err(DataError::UnsupportedMaskFormat { .. })
        ));
    }

    #[test]
    fn load_mask_reports_missing_file() {
        let result = load_mask::<TestBackend>(
            Path::new("/no/such/mask.png"),
            Resolution::default(),
            &Default::default(),
        );
        assert!(matches!(result, Err(DataError::ImageOpenFailed { .. })));
    }
}
