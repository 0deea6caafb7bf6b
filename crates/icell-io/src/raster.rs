//! Grayscale image files in and out of the raster types.

use std::path::Path;

use image::{DynamicImage, ImageBuffer, ImageReader, Luma};
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::{FeaturePlane, FeatureStack, LabelImage, LabelMask};

fn open_image(path: &Path) -> Result<DynamicImage, IoError> {
    ImageReader::open(path)
        .map_err(|source| IoError::FileNotFound {
            path: path.to_path_buf(),
            source,
        })?
        .with_guessed_format()
        .map_err(|source| IoError::FileNotFound {
            path: path.to_path_buf(),
            source,
        })?
        .decode()
        .map_err(|source| IoError::ImageDecode {
            path: path.to_path_buf(),
            source,
        })
}

/// Read one image as a feature plane.
///
/// 8- and 16-bit grayscale keep their integer values; any other pixel type
/// is reduced to `f32` luma.
///
/// # Errors
///
/// [`IoError::FileNotFound`] or [`IoError::ImageDecode`].
pub fn read_feature_plane(path: &Path) -> Result<FeaturePlane, IoError> {
    let image = open_image(path)?;
    let (width, height) = (image.width(), image.height());
    let values: Vec<f32> = match image {
        DynamicImage::ImageLuma8(buf) => buf.into_raw().into_iter().map(f32::from).collect(),
        DynamicImage::ImageLuma16(buf) => buf.into_raw().into_iter().map(f32::from).collect(),
        other => other.to_luma32f().into_raw(),
    };
    debug!(path = %path.display(), width, height, "feature plane read");
    FeaturePlane::new(width, height, values)
}

/// Read one image per channel, in order, into a [`FeatureStack`].
///
/// # Errors
///
/// Any error of [`read_feature_plane`], plus [`IoError::NoChannels`] and
/// [`IoError::PlaneSizeMismatch`].
#[instrument(skip_all, fields(channels = paths.len()))]
pub fn read_feature_stack<P: AsRef<Path>>(paths: &[P]) -> Result<FeatureStack, IoError> {
    let planes = paths
        .iter()
        .map(|p| read_feature_plane(p.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    let stack = FeatureStack::new(planes)?;
    info!(
        channels = stack.n_channels(),
        width = stack.width(),
        height = stack.height(),
        "feature stack loaded"
    );
    Ok(stack)
}

/// Read a label mask; each grayscale value is a class code, `0` is unlabelled.
///
/// # Errors
///
/// [`IoError::FileNotFound`] or [`IoError::ImageDecode`].
#[instrument(skip_all, fields(path = %path.display()))]
pub fn read_label_mask(path: &Path) -> Result<LabelMask, IoError> {
    let image = open_image(path)?;
    let (width, height) = (image.width(), image.height());
    let labels: Vec<u32> = match image {
        DynamicImage::ImageLuma16(buf) => buf.into_raw().into_iter().map(u32::from).collect(),
        ref eight_bit @ (DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageRgb8(_)
        | DynamicImage::ImageRgba8(_)) => {
            eight_bit.to_luma8().into_raw().into_iter().map(u32::from).collect()
        }
        other => other.to_luma16().into_raw().into_iter().map(u32::from).collect(),
    };
    let mask = LabelMask::new(width, height, labels)?;
    info!(width, height, n_labelled = mask.n_labelled(), "label mask loaded");
    Ok(mask)
}

/// Write a label image as 8-bit grayscale when every label fits, else 16-bit.
///
/// The format follows the file extension.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::LabelOutOfRange`] | a label exceeds `u16::MAX` |
/// | [`IoError::ImageEncode`] | encoding or writing failed |
#[instrument(skip_all, fields(path = %path.display()))]
pub fn write_label_image(image: &LabelImage, path: &Path) -> Result<(), IoError> {
    let max = image.labels().iter().copied().max().unwrap_or(0);
    let encode_err = |source| IoError::ImageEncode {
        path: path.to_path_buf(),
        source,
    };

    if let Ok(max) = u8::try_from(max) {
        let raw: Vec<u8> = image.labels().iter().map(|&l| l as u8).collect();
        let buf = ImageBuffer::<Luma<u8>, _>::from_raw(image.width(), image.height(), raw)
            .ok_or(IoError::BufferSize {
                width: image.width(),
                height: image.height(),
                got: image.labels().len(),
            })?;
        buf.save(path).map_err(encode_err)?;
        debug!(max_label = max, "wrote 8-bit label image");
    } else {
        let raw = image
            .labels()
            .iter()
            .map(|&l| u16::try_from(l).map_err(|_| IoError::LabelOutOfRange { label: l }))
            .collect::<Result<Vec<u16>, _>>()?;
        let buf = ImageBuffer::<Luma<u16>, _>::from_raw(image.width(), image.height(), raw)
            .ok_or(IoError::BufferSize {
                width: image.width(),
                height: image.height(),
                got: image.labels().len(),
            })?;
        buf.save(path).map_err(encode_err)?;
        debug!(max_label = max, "wrote 16-bit label image");
    }

    info!(width = image.width(), height = image.height(), "label image written");
    Ok(())
}
