use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::{
    ForestError,
    config::TrainingParameters,
    dataset::SampleMatrix,
    histogram::Histogram,
    node::{Node, NodeIndex},
    split::{SearchBudget, find_best_split},
};

/// Stopping rules and search budget for growing one tree.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GrowthLimits {
    pub(crate) tree_depth: usize,
    pub(crate) split_ig: f64,
    pub(crate) leaf_entropy: f64,
    pub(crate) budget: SearchBudget,
}

impl From<&TrainingParameters> for GrowthLimits {
    fn from(params: &TrainingParameters) -> Self {
        Self {
            tree_depth: params.tree_depth,
            split_ig: params.split_ig,
            leaf_entropy: params.leaf_entropy,
            budget: SearchBudget {
                candidate_features: params.candidate_node_classifier_num,
                candidate_thresholds: params.candidate_classifier_threshold_num,
            },
        }
    }
}

/// 32-byte ChaCha key identifying one node position in a tree.
type NodeKey = [u8; 32];

/// Which link of which parent a pending node fills.
#[derive(Debug, Clone, Copy)]
enum Slot {
    Root,
    Left(usize),
    Right(usize),
}

impl Slot {
    /// Point the parent's link at `child`.
    fn attach(self, arena: &mut [Node], child: usize) {
        let (parent, is_left) = match self {
            Slot::Root => return,
            Slot::Left(parent) => (parent, true),
            Slot::Right(parent) => (parent, false),
        };
        if let Node::Split { left, right, .. } = &mut arena[parent] {
            let link = if is_left { left } else { right };
            *link = NodeIndex::new(child);
        }
    }
}

/// A node waiting on the growth stack.
struct Pending {
    sample_indices: Vec<usize>,
    depth: usize,
    key: NodeKey,
    slot: Slot,
}

/// Shared, read-only state for growing one tree.
struct Grower<'a> {
    matrix: &'a SampleMatrix<'a>,
    limits: GrowthLimits,
}

impl Grower<'_> {
    /// Key of the root node for a tree seed.
    fn root_key(seed: u64) -> NodeKey {
        let mut key = NodeKey::default();
        ChaCha8Rng::seed_from_u64(seed).fill_bytes(&mut key);
        key
    }

    /// Key of child `side` (0 left, 1 right), drawn from a stream of the
    /// parent's key. A node's candidates thus depend only on the tree seed
    /// and the path to the node, not on how much of the tree was grown
    /// before it.
    fn child_key(parent: &NodeKey, side: u64) -> NodeKey {
        let mut rng = ChaCha8Rng::from_seed(*parent);
        rng.set_stream(side + 1);
        let mut key = NodeKey::default();
        rng.fill_bytes(&mut key);
        key
    }

    /// Grow the tree for `sample_indices` depth-first with an explicit stack.
    ///
    /// Nodes land in pre-order: a split, its left subtree, then its right
    /// subtree.
    fn grow(&self, sample_indices: Vec<usize>, seed: u64) -> Vec<Node> {
        let mut arena: Vec<Node> = Vec::new();
        let mut stack = vec![Pending {
            sample_indices,
            depth: 0,
            key: Self::root_key(seed),
            slot: Slot::Root,
        }];

        while let Some(pending) = stack.pop() {
            let idx = arena.len();
            pending.slot.attach(&mut arena, idx);

            let Pending {
                sample_indices,
                depth,
                key,
                ..
            } = pending;
            let n_samples = sample_indices.len();
            let histogram =
                Histogram::from_samples(self.matrix.labels, &sample_indices, self.matrix.n_classes);

            if depth >= self.limits.tree_depth
                || n_samples < 2
                || histogram.is_pure()
                || histogram.entropy() <= self.limits.leaf_entropy
            {
                arena.push(Node::Leaf { histogram });
                continue;
            }

            let mut rng = ChaCha8Rng::from_seed(key);
            let split = match find_best_split(
                self.matrix,
                &sample_indices,
                &histogram,
                self.limits.budget,
                &mut rng,
            ) {
                Some(s) if s.information_gain >= self.limits.split_ig => s,
                _ => {
                    arena.push(Node::Leaf { histogram });
                    continue;
                }
            };

            // Child links are filled in when the children are popped.
            arena.push(Node::Split {
                test: split.test,
                left: NodeIndex::new(idx),
                right: NodeIndex::new(idx),
                information_gain: split.information_gain,
                n_samples,
            });

            // Right is pushed first so the left subtree is grown first.
            stack.push(Pending {
                sample_indices: split.right_indices,
                depth: depth + 1,
                key: Self::child_key(&key, 1),
                slot: Slot::Right(idx),
            });
            stack.push(Pending {
                sample_indices: split.left_indices,
                depth: depth + 1,
                key: Self::child_key(&key, 0),
                slot: Slot::Left(idx),
            });
        }

        arena
    }
}

/// A single grown decision tree.
///
/// Stored as an arena-based `Vec<Node>` with index references; the root is
/// at index 0.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
}

impl DecisionTree {
    /// Grow a tree on the samples selected by `sample_indices` (repeats allowed).
    #[instrument(level = "trace", skip_all, fields(n_samples = sample_indices.len()))]
    pub(crate) fn grow(
        matrix: &SampleMatrix<'_>,
        sample_indices: &[usize],
        limits: GrowthLimits,
        seed: u64,
    ) -> Self {
        let grower = Grower { matrix, limits };
        let tree = Self {
            nodes: grower.grow(sample_indices.to_vec(), seed),
            n_features: matrix.n_features,
        };
        debug!(
            n_nodes = tree.n_nodes(),
            n_leaves = tree.n_leaves(),
            depth = tree.depth(),
            "decision tree grown"
        );
        tree
    }

    /// Return the histogram of the leaf that `sample` is routed to.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn route(&self, sample: &[f32]) -> Result<&Histogram, ForestError> {
        if sample.len() != self.n_features {
            return Err(ForestError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        Ok(self.leaf_for(sample))
    }

    /// Return the compact class index voted by the leaf that `sample` reaches.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict_class(&self, sample: &[f32]) -> Result<usize, ForestError> {
        // Leaves always hold at least one sample.
        Ok(self.route(sample)?.arg_max().unwrap_or(0))
    }

    /// Traverse from the root; `sample` length is trusted.
    pub(crate) fn leaf_for(&self, sample: &[f32]) -> &Histogram {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { histogram } => return histogram,
                Node::Split {
                    test, left, right, ..
                } => {
                    idx = if test.goes_left(sample) {
                        left.index()
                    } else {
                        right.index()
                    };
                }
            }
        }
    }

    /// Return the arena nodes; the root is at index 0.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Return the number of features the tree was grown on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the total number of nodes in the tree (both splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the maximum depth of the tree.
    ///
    /// A single-node tree (just a root leaf) has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }

        let mut max_depth = 0usize;
        let mut queue = std::collections::VecDeque::new();
        queue.push_back((0usize, 0usize));

        while let Some((node_idx, d)) = queue.pop_front() {
            match &self.nodes[node_idx] {
                Node::Leaf { .. } => max_depth = max_depth.max(d),
                Node::Split { left, right, .. } => {
                    queue.push_back((left.index(), d + 1));
                    queue.push_back((right.index(), d + 1));
                }
            }
        }

        max_depth
    }

    /// Sample-weighted information gain accumulated per feature, normalized
    /// to sum to 1.0. All zeros when the tree is a single leaf.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0f64; self.n_features];
        for node in &self.nodes {
            if let Node::Split {
                test,
                information_gain,
                n_samples,
                ..
            } = node
            {
                totals[test.feature().index()] += information_gain * *n_samples as f64;
            }
        }
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            totals.iter_mut().for_each(|v| *v /= sum);
        }
        totals
    }

    /// Return the largest sample count held by any leaf.
    pub(crate) fn max_leaf_total(&self) -> u64 {
        self.nodes
            .iter()
            .filter_map(Node::histogram)
            .map(Histogram::total)
            .max()
            .unwrap_or(0)
    }

    /// Check the structural invariants of a decoded tree.
    ///
    /// Every child index must be in range, greater than its parent's, and
    /// referenced exactly once; features must be in range; leaves must hold
    /// consistent, non-empty histograms over at most `n_classes` buckets.
    pub(crate) fn check_structure(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        if self.n_features != n_features {
            return Err(format!(
                "tree has {} features, forest has {n_features}",
                self.n_features
            ));
        }
        let n_nodes = self.nodes.len();
        let mut parents = vec![0u8; n_nodes];
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    test, left, right, ..
                } => {
                    if test.feature().index() >= n_features {
                        return Err(format!(
                            "node {idx} tests feature {} of {n_features}",
                            test.feature()
                        ));
                    }
                    for child in [left.index(), right.index()] {
                        if child <= idx || child >= n_nodes {
                            return Err(format!("node {idx} has invalid child {child}"));
                        }
                        parents[child] = parents[child].saturating_add(1);
                    }
                }
                Node::Leaf { histogram } => {
                    if histogram.is_empty()
                        || !histogram.is_consistent()
                        || histogram.n_buckets() > n_classes
                    {
                        return Err(format!("leaf {idx} has an invalid histogram"));
                    }
                }
            }
        }
        if let Some(orphan) = (1..n_nodes).find(|&i| parents[i] != 1) {
            return Err(format!("node {orphan} does not have exactly one parent"));
        }
        Ok(())
    }
}
