//! Information-gain feature importances aggregated across trees.

use crate::forest::DecisionForest;
use crate::node::FeatureIndex;
use crate::tree::DecisionTree;

/// A feature channel with its importance score and rank.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RankedFeature {
    /// Feature channel.
    pub feature: FeatureIndex,
    /// Normalized importance (sums to 1.0 across all features).
    pub importance: f64,
    /// 1-based rank (1 = most important).
    pub rank: usize,
}

/// Sum per-tree importances, normalize to 1.0, and rank descending.
///
/// Equal scores keep ascending feature order.
pub(crate) fn aggregate_importances(per_tree: &[Vec<f64>], n_features: usize) -> Vec<RankedFeature> {
    if per_tree.is_empty() || n_features == 0 {
        return vec![];
    }

    let mut totals = vec![0.0f64; n_features];
    for tree_imp in per_tree {
        for (total, &val) in totals.iter_mut().zip(tree_imp) {
            *total += val;
        }
    }

    let sum: f64 = totals.iter().sum();
    if sum > 0.0 {
        totals.iter_mut().for_each(|v| *v /= sum);
    }

    let mut features: Vec<RankedFeature> = totals
        .into_iter()
        .enumerate()
        .map(|(i, importance)| RankedFeature {
            feature: FeatureIndex::new(i),
            importance,
            rank: 0,
        })
        .collect();

    features.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    for (i, feat) in features.iter_mut().enumerate() {
        feat.rank = i + 1;
    }

    features
}

impl DecisionForest {
    /// Rank feature channels by the information gain their splits contributed.
    ///
    /// Available on loaded forests as well as freshly trained ones.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<RankedFeature> {
        let per_tree: Vec<Vec<f64>> = self
            .trees
            .iter()
            .map(DecisionTree::feature_importances)
            .collect();
        aggregate_importances(&per_tree, self.n_features)
    }
}
