//! Decision-forest training with parallel tree growth.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::config::TrainingParameters;
use crate::dataset::{LabelIndexMap, SampleMatrix, TrainingDataset};
use crate::error::ForestError;
use crate::importance::aggregate_importances;
use crate::result::{TrainingMetadata, TrainingResult};
use crate::tree::{DecisionTree, GrowthLimits};

/// A trained ensemble of decision trees.
///
/// Immutable once built: any number of threads may run inference against the
/// same forest concurrently.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DecisionForest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) n_features: usize,
    pub(crate) label_map: LabelIndexMap,
}

/// Number of draws per tree, or `None` when every tree sees the full dataset.
fn resolve_draw_count(n_samples: usize, sub_sample_percent: f64) -> Option<usize> {
    if sub_sample_percent == 0.0 {
        None
    } else {
        Some(((n_samples as f64 * sub_sample_percent).ceil() as usize).max(1))
    }
}

/// Draw the per-tree sample indices (with replacement when subsampling).
fn draw_samples(n_samples: usize, draw_count: Option<usize>, rng: &mut impl Rng) -> Vec<usize> {
    match draw_count {
        None => (0..n_samples).collect(),
        Some(count) => (0..count).map(|_| rng.gen_range(0..n_samples)).collect(),
    }
}

/// Grow `tree_num` trees on `dataset`.
#[instrument(skip_all, fields(tree_num = params.tree_num, n_samples = dataset.n_samples()))]
pub(crate) fn train(
    params: &TrainingParameters,
    dataset: &TrainingDataset,
) -> Result<TrainingResult, ForestError> {
    params.validate()?;
    if dataset.is_empty() {
        return Err(ForestError::EmptyDataset);
    }

    let label_map = LabelIndexMap::from_labels(dataset.labels());
    if label_map.len() < 2 {
        return Err(ForestError::InsufficientLabelDiversity {
            n_distinct: label_map.len(),
        });
    }

    let n_samples = dataset.n_samples();
    let n_features = dataset.n_features();
    let n_classes = label_map.len();
    let encoded = label_map.encode(dataset.labels());
    let matrix = SampleMatrix::new(dataset.values(), n_features, &encoded, n_classes);
    let draw_count = resolve_draw_count(n_samples, params.sub_sample_percent);

    info!(
        tree_num = params.tree_num,
        n_samples,
        n_features,
        n_classes,
        samples_per_tree = draw_count.unwrap_or(n_samples),
        "training decision forest"
    );

    // Per-tree seeds come from the master RNG so the result does not depend
    // on the number of worker threads.
    let mut master_rng = ChaCha8Rng::seed_from_u64(params.seed);
    let tree_seeds: Vec<u64> = (0..params.tree_num).map(|_| master_rng.r#gen()).collect();

    let limits = GrowthLimits::from(params);
    let verbose = params.verbose;
    let tree_num = params.tree_num;

    let trees: Vec<DecisionTree> = tree_seeds
        .into_par_iter()
        .enumerate()
        .map(|(tree_idx, seed)| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let sample_indices = draw_samples(n_samples, draw_count, &mut rng);
            let tree = DecisionTree::grow(&matrix, &sample_indices, limits, rng.r#gen());
            if verbose {
                info!(
                    tree = tree_idx + 1,
                    of = tree_num,
                    n_nodes = tree.n_nodes(),
                    depth = tree.depth(),
                    "tree grown"
                );
            }
            tree
        })
        .collect();

    let per_tree_importances: Vec<Vec<f64>> =
        trees.iter().map(DecisionTree::feature_importances).collect();
    let importances = aggregate_importances(&per_tree_importances, n_features);

    let metadata = TrainingMetadata {
        n_trees: trees.len(),
        n_features,
        n_classes,
        n_samples,
        samples_per_tree: draw_count.unwrap_or(n_samples),
        total_nodes: trees.iter().map(DecisionTree::n_nodes).sum(),
        max_depth: trees.iter().map(DecisionTree::depth).max().unwrap_or(0),
    };
    debug!(
        total_nodes = metadata.total_nodes,
        max_depth = metadata.max_depth,
        "tree growth complete"
    );

    let forest = DecisionForest {
        trees,
        n_features,
        label_map,
    };

    let training_confusion = if verbose {
        let confusion = forest.evaluate(dataset)?;
        info!(accuracy = confusion.accuracy(), "training-set accuracy");
        Some(confusion)
    } else {
        None
    };

    info!(n_trees = forest.n_trees(), "decision forest training complete");

    Ok(TrainingResult::new(forest, importances, metadata, training_confusion))
}
