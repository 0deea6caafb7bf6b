//! Whole-image classification with a trained forest.

use icell_forest::DecisionForest;
use rayon::prelude::*;
use tracing::{info, instrument};

use crate::IoError;
use crate::domain::{FeatureStack, LabelImage};

/// Classify every pixel of `stack`.
///
/// Rows are processed in parallel; each worker reuses one feature buffer.
///
/// # Errors
///
/// Returns [`IoError::ChannelCountMismatch`] when the stack's channel count
/// differs from the forest's feature count.
#[instrument(skip_all, fields(channels = stack.n_channels(), width = stack.width(), height = stack.height()))]
pub fn apply_forest(forest: &DecisionForest, stack: &FeatureStack) -> Result<LabelImage, IoError> {
    if stack.n_channels() != forest.n_features() {
        return Err(IoError::ChannelCountMismatch {
            expected: forest.n_features(),
            got: stack.n_channels(),
        });
    }

    let width = stack.width() as usize;
    let mut labels = vec![0u32; stack.n_pixels()];
    if width > 0 {
        labels
            .par_chunks_mut(width)
            .enumerate()
            .try_for_each_init(
                || vec![0.0f32; stack.n_channels()],
                |features, (y, row)| {
                    for (x, out) in row.iter_mut().enumerate() {
                        stack.features_at(y * width + x, features);
                        *out = forest.predict(features)?;
                    }
                    Ok::<(), IoError>(())
                },
            )?;
    }

    info!(n_pixels = labels.len(), "image classified");
    Ok(LabelImage::from_raw(stack.width(), stack.height(), labels))
}

#[cfg(test)]
mod tests {
    use icell_forest::{TrainingDataset, TrainingParameters};

    use super::*;
    use crate::domain::FeaturePlane;

    /// Left half of a 6x2 image is dark (label 1), right half bright (label 2).
    fn halves() -> FeatureStack {
        let values = vec![0.0, 0.1, 0.2, 0.8, 0.9, 1.0, 0.1, 0.0, 0.2, 1.0, 0.8, 0.9];
        FeatureStack::new(vec![FeaturePlane::new(6, 2, values).unwrap()]).unwrap()
    }

    fn forest() -> DecisionForest {
        let ds = TrainingDataset::new(
            &[vec![0.0], vec![0.1], vec![0.2], vec![0.8], vec![0.9], vec![1.0]],
            &[1, 1, 1, 2, 2, 2],
        )
        .unwrap();
        TrainingParameters::new()
            .with_tree_num(5)
            .fit(&ds)
            .unwrap()
            .into_forest()
    }

    #[test]
    fn every_pixel_is_classified() {
        let image = apply_forest(&forest(), &halves()).unwrap();
        assert_eq!(image.width(), 6);
        assert_eq!(image.height(), 2);
        assert_eq!(image.labels(), &[1, 1, 1, 2, 2, 2, 1, 1, 1, 2, 2, 2]);
    }

    #[test]
    fn channel_mismatch_rejected() {
        let plane = FeaturePlane::new(1, 1, vec![0.0]).unwrap();
        let stack = FeatureStack::new(vec![plane.clone(), plane]).unwrap();
        assert!(matches!(
            apply_forest(&forest(), &stack),
            Err(IoError::ChannelCountMismatch { expected: 1, got: 2 })
        ));
    }
}
