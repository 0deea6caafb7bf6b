//! Pairing of per-pixel feature vectors with mask labels.

use icell_forest::TrainingDataset;
use tracing::{info, instrument};

use crate::IoError;
use crate::domain::{FeatureStack, LabelMask};

/// Build a training set from every labelled pixel of `mask`.
///
/// Pixels are visited in row-major order; unlabelled pixels (code `0`) are
/// skipped.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::MaskSizeMismatch`] | mask and stack differ in size |
/// | [`IoError::NoLabelledPixels`] | the mask has no labelled pixel |
/// | [`IoError::Forest`] | a feature value is NaN or infinite |
#[instrument(skip_all, fields(channels = stack.n_channels(), width = stack.width(), height = stack.height()))]
pub fn sample_training_set(stack: &FeatureStack, mask: &LabelMask) -> Result<TrainingDataset, IoError> {
    if mask.width() != stack.width() || mask.height() != stack.height() {
        return Err(IoError::MaskSizeMismatch {
            width: stack.width(),
            height: stack.height(),
            got_width: mask.width(),
            got_height: mask.height(),
        });
    }

    let mut dataset = TrainingDataset::with_features(stack.n_channels())?;
    let mut row = vec![0.0f32; stack.n_channels()];
    for (pixel, &label) in mask.labels().iter().enumerate() {
        if label == LabelMask::UNLABELLED {
            continue;
        }
        stack.features_at(pixel, &mut row);
        dataset.push(&row, label)?;
    }

    if dataset.is_empty() {
        return Err(IoError::NoLabelledPixels);
    }

    info!(
        n_samples = dataset.n_samples(),
        n_classes = dataset.distinct_labels().len(),
        "training set sampled"
    );
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FeaturePlane;

    fn stack() -> FeatureStack {
        let a = FeaturePlane::new(3, 2, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let b = FeaturePlane::new(3, 2, vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0]).unwrap();
        FeatureStack::new(vec![a, b]).unwrap()
    }

    #[test]
    fn only_labelled_pixels_are_sampled() {
        let mask = LabelMask::new(3, 2, vec![0, 2, 0, 0, 7, 2]).unwrap();
        let ds = sample_training_set(&stack(), &mask).unwrap();
        assert_eq!(ds.n_samples(), 3);
        assert_eq!(ds.n_features(), 2);
        assert_eq!(ds.row(0), &[1.0, 11.0]);
        assert_eq!(ds.row(1), &[4.0, 14.0]);
        assert_eq!(ds.labels(), &[2, 7, 2]);
    }

    #[test]
    fn size_mismatch_rejected() {
        let mask = LabelMask::new(2, 3, vec![1; 6]).unwrap();
        assert!(matches!(
            sample_training_set(&stack(), &mask),
            Err(IoError::MaskSizeMismatch { .. })
        ));
    }

    #[test]
    fn unlabelled_mask_rejected() {
        let mask = LabelMask::new(3, 2, vec![0; 6]).unwrap();
        assert!(matches!(
            sample_training_set(&stack(), &mask),
            Err(IoError::NoLabelledPixels)
        ));
    }

    #[test]
    fn non_finite_feature_rejected() {
        let a = FeaturePlane::new(2, 1, vec![f32::NAN, 1.0]).unwrap();
        let stack = FeatureStack::new(vec![a]).unwrap();
        let mask = LabelMask::new(2, 1, vec![3, 4]).unwrap();
        assert!(matches!(
            sample_training_set(&stack, &mask),
            Err(IoError::Forest(_))
        ));
    }
}
