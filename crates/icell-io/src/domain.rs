//! Raster types exchanged with the forest: feature stacks, label masks and
//! label images.

use crate::IoError;

/// Row-major pixel index for `(x, y)` in a `width`-wide raster.
#[inline]
pub(crate) fn pixel_index(width: u32, x: u32, y: u32) -> usize {
    y as usize * width as usize + x as usize
}

fn check_len(width: u32, height: u32, len: usize) -> Result<(), IoError> {
    if width as usize * height as usize != len {
        return Err(IoError::BufferSize {
            width,
            height,
            got: len,
        });
    }
    Ok(())
}

/// One single-channel `f32` plane.
#[derive(Debug, Clone, PartialEq)]
pub struct FeaturePlane {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl FeaturePlane {
    /// Wrap a row-major buffer of `width * height` values.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::BufferSize`] when the buffer length is wrong.
    pub fn new(width: u32, height: u32, values: Vec<f32>) -> Result<Self, IoError> {
        check_len(width, height, values.len())?;
        Ok(Self {
            width,
            height,
            values,
        })
    }

    /// Return the plane width.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Return the plane height.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Return the row-major values.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

/// An ordered list of `K` feature planes of identical size.
///
/// Channel `k` of the stack is feature `k` of every pixel's vector.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureStack {
    width: u32,
    height: u32,
    planes: Vec<FeaturePlane>,
}

impl FeatureStack {
    /// Build a stack from planes in channel order.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::NoChannels`] | `planes` is empty |
    /// | [`IoError::PlaneSizeMismatch`] | a plane differs in size from the first |
    pub fn new(planes: Vec<FeaturePlane>) -> Result<Self, IoError> {
        let first = planes.first().ok_or(IoError::NoChannels)?;
        let (width, height) = (first.width, first.height);
        if let Some((channel, plane)) = planes
            .iter()
            .enumerate()
            .find(|(_, p)| p.width != width || p.height != height)
        {
            return Err(IoError::PlaneSizeMismatch {
                channel,
                width,
                height,
                got_width: plane.width,
                got_height: plane.height,
            });
        }
        Ok(Self {
            width,
            height,
            planes,
        })
    }

    /// Return the raster width.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Return the raster height.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Return the number of pixels.
    #[must_use]
    pub fn n_pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Return the number of channels (the feature vector length).
    #[must_use]
    pub fn n_channels(&self) -> usize {
        self.planes.len()
    }

    /// Return the planes in channel order.
    #[must_use]
    pub fn planes(&self) -> &[FeaturePlane] {
        &self.planes
    }

    /// Fill `out` with the feature vector of row-major pixel `pixel`.
    ///
    /// `out` must have exactly `n_channels()` entries.
    #[inline]
    pub fn features_at(&self, pixel: usize, out: &mut [f32]) {
        debug_assert_eq!(out.len(), self.planes.len());
        for (slot, plane) in out.iter_mut().zip(&self.planes) {
            *slot = plane.values[pixel];
        }
    }
}

/// Per-pixel class codes; `0` marks an unlabelled pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMask {
    width: u32,
    height: u32,
    labels: Vec<u32>,
}

impl LabelMask {
    /// Value marking a pixel that contributes no training sample.
    pub const UNLABELLED: u32 = 0;

    /// Wrap a row-major buffer of `width * height` class codes.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::BufferSize`] when the buffer length is wrong.
    pub fn new(width: u32, height: u32, labels: Vec<u32>) -> Result<Self, IoError> {
        check_len(width, height, labels.len())?;
        Ok(Self {
            width,
            height,
            labels,
        })
    }

    /// Return the mask width.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Return the mask height.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Return the row-major class codes.
    #[must_use]
    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    /// Return the number of labelled pixels.
    #[must_use]
    pub fn n_labelled(&self) -> usize {
        self.labels.iter().filter(|&&l| l != Self::UNLABELLED).count()
    }
}

/// Predicted label for every pixel of an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelImage {
    width: u32,
    height: u32,
    labels: Vec<u32>,
}

impl LabelImage {
    pub(crate) fn from_raw(width: u32, height: u32, labels: Vec<u32>) -> Self {
        debug_assert_eq!(labels.len(), width as usize * height as usize);
        Self {
            width,
            height,
            labels,
        }
    }

    /// Return the image width.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Return the image height.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Return the label at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics when `(x, y)` is outside the image.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> u32 {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        self.labels[pixel_index(self.width, x, y)]
    }

    /// Return the row-major labels.
    #[must_use]
    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    /// Count pixels per label, ascending by label.
    #[must_use]
    pub fn label_counts(&self) -> Vec<(u32, usize)> {
        let mut sorted = self.labels.clone();
        sorted.sort_unstable();
        let mut counts: Vec<(u32, usize)> = Vec::new();
        for label in sorted {
            match counts.last_mut() {
                Some((last, n)) if *last == label => *n += 1,
                _ => counts.push((label, 1)),
            }
        }
        counts
    }
}
