//! Inference: soft-vote prediction over every tree in the forest.

use rayon::prelude::*;

use crate::confusion::ConfusionMatrix;
use crate::dataset::{LabelIndexMap, TrainingDataset};
use crate::error::ForestError;
use crate::forest::DecisionForest;
use crate::histogram::Histogram;
use crate::tree::DecisionTree;

/// Per-class mean of the normalized leaf histograms reached by a sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDistribution {
    probs: Vec<f64>,
}

impl ClassDistribution {
    pub(crate) fn new(probs: Vec<f64>) -> Self {
        Self { probs }
    }

    /// Return the compact index of the most probable class.
    ///
    /// Ties go to the smallest class index.
    #[must_use]
    pub fn predicted_class(&self) -> usize {
        let mut best = 0usize;
        for (class, &p) in self.probs.iter().enumerate() {
            if p > self.probs[best] {
                best = class;
            }
        }
        best
    }

    /// Return the top-k `(class, probability)` pairs, most probable first.
    #[must_use]
    pub fn top_k(&self, k: usize) -> Vec<(usize, f64)> {
        let mut indexed: Vec<(usize, f64)> = self.probs.iter().copied().enumerate().collect();
        indexed.sort_by(|a, b| b.1.total_cmp(&a.1));
        indexed.truncate(k);
        indexed
    }

    /// Return the probabilities indexed by compact class.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.probs
    }
}

impl DecisionForest {
    fn check_len(&self, sample: &[f32]) -> Result<(), ForestError> {
        if sample.len() != self.n_features {
            return Err(ForestError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        Ok(())
    }

    /// Predict the original label for one feature vector.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f32]) -> Result<u32, ForestError> {
        let class = self.predict_class(sample)?;
        // Compact indices are always below label_map.len().
        Ok(self.label_map.labels()[class])
    }

    /// Predict the compact class index for one feature vector.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict_class(&self, sample: &[f32]) -> Result<usize, ForestError> {
        Ok(self.predict_distribution(sample)?.predicted_class())
    }

    /// Average the normalized leaf histograms of every tree.
    ///
    /// This is the soft vote behind [`predict`](Self::predict): every tree
    /// weighs the same regardless of how many samples its leaf holds.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict_distribution(&self, sample: &[f32]) -> Result<ClassDistribution, ForestError> {
        self.check_len(sample)?;

        let n_classes = self.n_classes();
        let mut avg = vec![0.0f64; n_classes];
        for tree in &self.trees {
            let leaf = tree.leaf_for(sample);
            let total = leaf.total() as f64;
            for (acc, &c) in avg.iter_mut().zip(leaf.counts()) {
                *acc += c as f64 / total;
            }
        }
        let n = self.trees.len() as f64;
        avg.iter_mut().for_each(|v| *v /= n);

        Ok(ClassDistribution::new(avg))
    }

    /// Sum the raw leaf counts of every tree into one histogram.
    ///
    /// Diagnostic only: leaves holding more samples weigh more here, so its
    /// arg-max can differ from the vote of [`predict`](Self::predict). Use
    /// [`predict_distribution`](Self::predict_distribution) for the voting
    /// distribution.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn aggregate_histogram(&self, sample: &[f32]) -> Result<Histogram, ForestError> {
        self.check_len(sample)?;
        let mut aggregate = Histogram::with_classes(self.n_classes());
        for tree in &self.trees {
            aggregate.merge(tree.leaf_for(sample));
        }
        Ok(aggregate)
    }

    /// Predict original labels for a batch of samples in parallel, preserving order.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] if any sample has the wrong feature count.
    pub fn predict_batch(&self, samples: &[Vec<f32>]) -> Result<Vec<u32>, ForestError> {
        samples
            .par_iter()
            .map(|sample| self.predict(sample))
            .collect()
    }

    /// Return class distributions for a batch of samples in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] if any sample has the wrong feature count.
    pub fn predict_distribution_batch(
        &self,
        samples: &[Vec<f32>],
    ) -> Result<Vec<ClassDistribution>, ForestError> {
        samples
            .par_iter()
            .map(|sample| self.predict_distribution(sample))
            .collect()
    }

    /// Classify every sample of `dataset` and tally the results.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::EmptyDataset`] | `dataset` has no samples |
    /// | [`ForestError::PredictionFeatureMismatch`] | feature count differs from the forest |
    /// | [`ForestError::UnknownLabel`] | a label was not seen during training |
    pub fn evaluate(&self, dataset: &TrainingDataset) -> Result<ConfusionMatrix, ForestError> {
        if dataset.is_empty() {
            return Err(ForestError::EmptyDataset);
        }
        if dataset.n_features() != self.n_features {
            return Err(ForestError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: dataset.n_features(),
            });
        }
        let truth: Vec<usize> = dataset
            .labels()
            .iter()
            .map(|&label| {
                self.label_map
                    .index_of(label)
                    .ok_or(ForestError::UnknownLabel { label })
            })
            .collect::<Result<_, _>>()?;

        let matrix = dataset
            .values()
            .par_chunks_exact(self.n_features)
            .zip(truth.par_iter())
            .try_fold(
                || ConfusionMatrix::new(&self.label_map),
                |mut matrix, (row, &t)| {
                    matrix.record(t, self.predict_class(row)?);
                    Ok::<_, ForestError>(matrix)
                },
            )
            .try_reduce(
                || ConfusionMatrix::new(&self.label_map),
                |a, b| Ok(a.merge(&b)),
            )?;
        Ok(matrix)
    }

    /// Return the number of features the forest was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.label_map.len()
    }

    /// Return the number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return the compact-index to label mapping.
    #[must_use]
    pub fn label_map(&self) -> &LabelIndexMap {
        &self.label_map
    }

    /// Return the trees of the ensemble.
    #[must_use]
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }
}
