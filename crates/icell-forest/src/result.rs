//! Training result types.

use crate::confusion::ConfusionMatrix;
use crate::dataset::LabelIndexMap;
use crate::forest::DecisionForest;
use crate::importance::RankedFeature;

/// Summary statistics of a training run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TrainingMetadata {
    /// Number of trees grown.
    pub n_trees: usize,
    /// Number of features per sample.
    pub n_features: usize,
    /// Number of distinct labels.
    pub n_classes: usize,
    /// Number of training samples.
    pub n_samples: usize,
    /// Samples drawn for each tree (equals `n_samples` without subsampling).
    pub samples_per_tree: usize,
    /// Node count summed over all trees.
    pub total_nodes: usize,
    /// Deepest tree in the ensemble.
    pub max_depth: usize,
}

/// Result of [`TrainingParameters::fit`](crate::TrainingParameters::fit).
#[derive(Debug)]
pub struct TrainingResult {
    forest: DecisionForest,
    importances: Vec<RankedFeature>,
    metadata: TrainingMetadata,
    training_confusion: Option<ConfusionMatrix>,
}

impl TrainingResult {
    pub(crate) fn new(
        forest: DecisionForest,
        importances: Vec<RankedFeature>,
        metadata: TrainingMetadata,
        training_confusion: Option<ConfusionMatrix>,
    ) -> Self {
        Self {
            forest,
            importances,
            metadata,
            training_confusion,
        }
    }

    /// Borrow the trained forest.
    #[must_use]
    pub fn forest(&self) -> &DecisionForest {
        &self.forest
    }

    /// Consume the result and return the trained forest.
    #[must_use]
    pub fn into_forest(self) -> DecisionForest {
        self.forest
    }

    /// Return the forest together with its label mapping.
    #[must_use]
    pub fn into_parts(self) -> (DecisionForest, LabelIndexMap) {
        let label_map = self.forest.label_map.clone();
        (self.forest, label_map)
    }

    /// Return the compact-index to label mapping.
    #[must_use]
    pub fn label_map(&self) -> &LabelIndexMap {
        &self.forest.label_map
    }

    /// Return the ranked feature importances.
    #[must_use]
    pub fn importances(&self) -> &[RankedFeature] {
        &self.importances
    }

    /// Return training metadata.
    #[must_use]
    pub fn metadata(&self) -> &TrainingMetadata {
        &self.metadata
    }

    /// Return the training-set confusion matrix, computed only when
    /// [`verbose`](crate::TrainingParameters::verbose) was set.
    #[must_use]
    pub fn training_confusion(&self) -> Option<&ConfusionMatrix> {
        self.training_confusion.as_ref()
    }
}
