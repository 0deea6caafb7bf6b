//! Configuration builder for decision-forest training.

use crate::dataset::TrainingDataset;
use crate::error::ForestError;
use crate::result::TrainingResult;

/// Forest shape and split-search granularity.
///
/// Construct via [`TrainingParameters::new`], then chain `with_*` methods.
/// Values are checked by [`TrainingParameters::validate`], which
/// [`TrainingParameters::fit`] calls before any tree is grown.
///
/// # Defaults
///
/// | Parameter                            | Default |
/// |--------------------------------------|---------|
/// | `tree_depth`                         | 10      |
/// | `tree_num`                           | 50      |
/// | `candidate_node_classifier_num`      | 10      |
/// | `candidate_classifier_threshold_num` | 10      |
/// | `sub_sample_percent`                 | 0.0     |
/// | `split_ig`                           | 0.1     |
/// | `leaf_entropy`                       | 0.05    |
/// | `verbose`                            | false   |
/// | `seed`                               | 42      |
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TrainingParameters {
    pub(crate) tree_depth: usize,
    pub(crate) tree_num: usize,
    pub(crate) candidate_node_classifier_num: usize,
    pub(crate) candidate_classifier_threshold_num: usize,
    pub(crate) sub_sample_percent: f64,
    pub(crate) split_ig: f64,
    pub(crate) leaf_entropy: f64,
    pub(crate) verbose: bool,
    pub(crate) seed: u64,
}

impl TrainingParameters {
    /// Create parameters with the default values shown above.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tree_depth: 10,
            tree_num: 50,
            candidate_node_classifier_num: 10,
            candidate_classifier_threshold_num: 10,
            sub_sample_percent: 0.0,
            split_ig: 0.1,
            leaf_entropy: 0.05,
            verbose: false,
            seed: 42,
        }
    }

    // --- Setters ---

    /// Set the maximum depth of every tree (root is depth 0).
    #[must_use]
    pub fn with_tree_depth(mut self, tree_depth: usize) -> Self {
        self.tree_depth = tree_depth;
        self
    }

    /// Set the number of trees in the ensemble.
    #[must_use]
    pub fn with_tree_num(mut self, tree_num: usize) -> Self {
        self.tree_num = tree_num;
        self
    }

    /// Set how many feature indices are drawn per node split search.
    #[must_use]
    pub fn with_candidate_node_classifier_num(mut self, count: usize) -> Self {
        self.candidate_node_classifier_num = count;
        self
    }

    /// Set how many thresholds are evaluated per candidate feature.
    #[must_use]
    pub fn with_candidate_classifier_threshold_num(mut self, count: usize) -> Self {
        self.candidate_classifier_threshold_num = count;
        self
    }

    /// Set the fraction of the dataset resampled (with replacement) per tree.
    ///
    /// `0.0` means every tree sees the full dataset.
    #[must_use]
    pub fn with_sub_sample_percent(mut self, fraction: f64) -> Self {
        self.sub_sample_percent = fraction;
        self
    }

    /// Set the minimum information gain (bits) required to accept a split.
    #[must_use]
    pub fn with_split_ig(mut self, split_ig: f64) -> Self {
        self.split_ig = split_ig;
        self
    }

    /// Set the entropy (bits) at or below which a node becomes a leaf.
    #[must_use]
    pub fn with_leaf_entropy(mut self, leaf_entropy: f64) -> Self {
        self.leaf_entropy = leaf_entropy;
        self
    }

    /// Enable per-tree progress and training-accuracy logging.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    // --- Getters ---

    /// Return the maximum tree depth.
    #[must_use]
    pub fn tree_depth(&self) -> usize {
        self.tree_depth
    }

    /// Return the number of trees.
    #[must_use]
    pub fn tree_num(&self) -> usize {
        self.tree_num
    }

    /// Return the number of candidate features per node.
    #[must_use]
    pub fn candidate_node_classifier_num(&self) -> usize {
        self.candidate_node_classifier_num
    }

    /// Return the number of candidate thresholds per feature.
    #[must_use]
    pub fn candidate_classifier_threshold_num(&self) -> usize {
        self.candidate_classifier_threshold_num
    }

    /// Return the per-tree subsample fraction.
    #[must_use]
    pub fn sub_sample_percent(&self) -> f64 {
        self.sub_sample_percent
    }

    /// Return the minimum split information gain.
    #[must_use]
    pub fn split_ig(&self) -> f64 {
        self.split_ig
    }

    /// Return the leaf entropy threshold.
    #[must_use]
    pub fn leaf_entropy(&self) -> f64 {
        self.leaf_entropy
    }

    /// Return whether progress reporting is enabled.
    #[must_use]
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Check every field against its allowed range.
    ///
    /// # Errors
    ///
    /// | Variant                                          | When                                  |
    /// |--------------------------------------------------|---------------------------------------|
    /// | [`ForestError::InvalidTreeDepth`]                | `tree_depth` is zero                  |
    /// | [`ForestError::InvalidTreeCount`]                | `tree_num` is zero                    |
    /// | [`ForestError::InvalidCandidateFeatureCount`]    | `candidate_node_classifier_num` is zero |
    /// | [`ForestError::InvalidCandidateThresholdCount`]  | `candidate_classifier_threshold_num` is zero |
    /// | [`ForestError::InvalidSubSampleFraction`]        | `sub_sample_percent` outside [0, 1]   |
    /// | [`ForestError::InvalidSplitGain`]                | `split_ig` negative or not finite     |
    /// | [`ForestError::InvalidLeafEntropy`]              | `leaf_entropy` negative or not finite |
    pub fn validate(&self) -> Result<(), ForestError> {
        if self.tree_depth == 0 {
            return Err(ForestError::InvalidTreeDepth {
                tree_depth: self.tree_depth,
            });
        }
        if self.tree_num == 0 {
            return Err(ForestError::InvalidTreeCount {
                tree_num: self.tree_num,
            });
        }
        if self.candidate_node_classifier_num == 0 {
            return Err(ForestError::InvalidCandidateFeatureCount {
                count: self.candidate_node_classifier_num,
            });
        }
        if self.candidate_classifier_threshold_num == 0 {
            return Err(ForestError::InvalidCandidateThresholdCount {
                count: self.candidate_classifier_threshold_num,
            });
        }
        if !(0.0..=1.0).contains(&self.sub_sample_percent) {
            return Err(ForestError::InvalidSubSampleFraction {
                fraction: self.sub_sample_percent,
            });
        }
        if !self.split_ig.is_finite() || self.split_ig < 0.0 {
            return Err(ForestError::InvalidSplitGain {
                split_ig: self.split_ig,
            });
        }
        if !self.leaf_entropy.is_finite() || self.leaf_entropy < 0.0 {
            return Err(ForestError::InvalidLeafEntropy {
                leaf_entropy: self.leaf_entropy,
            });
        }
        Ok(())
    }

    /// Grow a forest on `dataset`.
    ///
    /// # Errors
    ///
    /// | Variant                                       | When                                   |
    /// |-----------------------------------------------|----------------------------------------|
    /// | any [`validate`](Self::validate) error        | parameters out of range                |
    /// | [`ForestError::EmptyDataset`]                 | `dataset` has no samples               |
    /// | [`ForestError::InsufficientLabelDiversity`]   | fewer than two distinct labels         |
    pub fn fit(&self, dataset: &TrainingDataset) -> Result<TrainingResult, ForestError> {
        crate::forest::train(self, dataset)
    }
}

impl Default for TrainingParameters {
    fn default() -> Self {
        Self::new()
    }
}
