use std::cmp::Ordering;

use rand::Rng;
use rand::seq::index;

use crate::dataset::SampleMatrix;
use crate::histogram::Histogram;
use crate::node::FeatureIndex;

/// Which side of the threshold is routed left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Polarity {
    /// `value <= threshold` goes left.
    LessOrEqual,
    /// `value > threshold` goes left.
    Greater,
}

/// Single-feature threshold test stored at an internal node.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AxisAlignedClassifier {
    feature: FeatureIndex,
    threshold: f32,
    polarity: Polarity,
}

impl AxisAlignedClassifier {
    /// Create a test on `feature` against `threshold`.
    #[must_use]
    pub fn new(feature: FeatureIndex, threshold: f32, polarity: Polarity) -> Self {
        Self {
            feature,
            threshold,
            polarity,
        }
    }

    /// Return the tested feature.
    #[must_use]
    pub fn feature(&self) -> FeatureIndex {
        self.feature
    }

    /// Return the threshold.
    #[must_use]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Return the polarity.
    #[must_use]
    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Route a sample: `true` means left.
    ///
    /// NaN never satisfies `<=`, so it follows the `>` side.
    /// `sample` must have more than `feature().index()` entries.
    #[inline]
    #[must_use]
    pub fn goes_left(&self, sample: &[f32]) -> bool {
        let below = sample[self.feature.index()] <= self.threshold;
        match self.polarity {
            Polarity::LessOrEqual => below,
            Polarity::Greater => !below,
        }
    }
}

/// Best split found for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitCandidate {
    pub(crate) test: AxisAlignedClassifier,
    pub(crate) information_gain: f64,
    pub(crate) left_indices: Vec<usize>,
    pub(crate) right_indices: Vec<usize>,
}

/// Candidate search budget for one node.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SearchBudget {
    pub(crate) candidate_features: usize,
    pub(crate) candidate_thresholds: usize,
}

/// Midpoint between two consecutive distinct sorted values, kept strictly
/// below `hi` so that `<=` reproduces the sorted prefix exactly.
fn midpoint(lo: f32, hi: f32) -> f32 {
    let mid = lo / 2.0 + hi / 2.0;
    if mid >= lo && mid < hi { mid } else { lo }
}

/// Higher gain wins; equal gains go to the lower feature, then lower threshold.
fn is_better(gain: f64, feature: FeatureIndex, threshold: f32, best: &AxisAlignedClassifier, best_gain: f64) -> bool {
    match gain.total_cmp(&best_gain) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => match feature.cmp(&best.feature) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => threshold.total_cmp(&best.threshold) == Ordering::Less,
        },
    }
}

/// Find the best `(feature, threshold)` test for the samples at a node.
///
/// Candidate features are drawn without replacement (partial Fisher-Yates),
/// `min(candidate_features, n_features)` of them. For each, the node's values
/// are sorted and the midpoints between consecutive distinct values are the
/// admissible thresholds: all of them when there are at most
/// `candidate_thresholds`, otherwise that many drawn without replacement.
/// The drawn thresholds are scanned in ascending order with incremental
/// left/right histogram updates. Polarity is drawn once per feature; it does
/// not affect gain.
///
/// Returns `None` when fewer than two samples reach the node or every drawn
/// feature is constant over them.
pub(crate) fn find_best_split(
    matrix: &SampleMatrix<'_>,
    sample_indices: &[usize],
    parent: &Histogram,
    budget: SearchBudget,
    rng: &mut impl Rng,
) -> Option<SplitCandidate> {
    let n_features = matrix.n_features;
    let n_samples = sample_indices.len();
    if n_samples < 2 || n_features == 0 {
        return None;
    }

    let mut feature_order: Vec<usize> = (0..n_features).collect();
    let take = budget.candidate_features.min(n_features);
    for i in 0..take {
        let j = rng.gen_range(i..n_features);
        feature_order.swap(i, j);
    }

    let mut best: Option<(AxisAlignedClassifier, f64)> = None;
    let mut sorted: Vec<(f32, usize)> = Vec::with_capacity(n_samples);

    for &feat_idx in &feature_order[..take] {
        let polarity = if rng.gen_bool(0.5) {
            Polarity::LessOrEqual
        } else {
            Polarity::Greater
        };

        sorted.clear();
        sorted.extend(
            sample_indices
                .iter()
                .map(|&si| (matrix.value(si, feat_idx), matrix.labels[si])),
        );
        sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        // Positions i where a threshold between sorted[i] and sorted[i + 1] separates values.
        let boundaries: Vec<usize> = (0..n_samples - 1)
            .filter(|&i| sorted[i].0 < sorted[i + 1].0)
            .collect();
        if boundaries.is_empty() {
            continue;
        }

        let mut chosen: Vec<usize> = if boundaries.len() <= budget.candidate_thresholds {
            boundaries
        } else {
            index::sample(rng, boundaries.len(), budget.candidate_thresholds)
                .into_iter()
                .map(|k| boundaries[k])
                .collect()
        };
        chosen.sort_unstable();

        let mut left = Histogram::with_classes(matrix.n_classes);
        let mut right = parent.clone();
        let mut cursor = 0usize;
        let feature = FeatureIndex::new(feat_idx);

        for b in chosen {
            for &(_, class) in &sorted[cursor..=b] {
                left.insert(class);
                right.remove(class);
            }
            cursor = b + 1;

            let gain = parent.information_gain(&left, &right);
            let threshold = midpoint(sorted[b].0, sorted[b + 1].0);

            let replace = match &best {
                None => true,
                Some((test, best_gain)) => is_better(gain, feature, threshold, test, *best_gain),
            };
            if replace {
                best = Some((AxisAlignedClassifier::new(feature, threshold, polarity), gain));
            }
        }
    }

    let (test, information_gain) = best?;

    let mut left_indices = Vec::with_capacity(n_samples / 2);
    let mut right_indices = Vec::with_capacity(n_samples / 2);
    for &si in sample_indices {
        if test.goes_left(matrix.row(si)) {
            left_indices.push(si);
        } else {
            right_indices.push(si);
        }
    }

    Some(SplitCandidate {
        test,
        information_gain,
        left_indices,
        right_indices,
    })
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    const WIDE: SearchBudget = SearchBudget {
        candidate_features: 16,
        candidate_thresholds: 64,
    };

    fn run(
        values: &[f32],
        n_features: usize,
        labels: &[usize],
        n_classes: usize,
        budget: SearchBudget,
        seed: u64,
    ) -> Option<SplitCandidate> {
        let matrix = SampleMatrix::new(values, n_features, labels, n_classes);
        let indices: Vec<usize> = (0..labels.len()).collect();
        let parent = Histogram::from_samples(labels, &indices, n_classes);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        find_best_split(&matrix, &indices, &parent, budget, &mut rng)
    }

    #[test]
    fn goes_left_respects_polarity() {
        let le = AxisAlignedClassifier::new(FeatureIndex::new(1), 2.0, Polarity::LessOrEqual);
        let gt = AxisAlignedClassifier::new(FeatureIndex::new(1), 2.0, Polarity::Greater);
        assert!(le.goes_left(&[9.0, 2.0]));
        assert!(!le.goes_left(&[9.0, 2.5]));
        assert!(!gt.goes_left(&[9.0, 2.0]));
        assert!(gt.goes_left(&[9.0, 2.5]));
        assert!(!le.goes_left(&[0.0, f32::NAN]));
    }

    #[test]
    fn separable_data_finds_clean_split() {
        // One feature: [1, 2, 3, 10, 11, 12], labels [0, 0, 0, 1, 1, 1]
        let values = [1.0, 2.0, 3.0, 10.0, 11.0, 12.0];
        let labels = [0, 0, 0, 1, 1, 1];
        let split = run(&values, 1, &labels, 2, WIDE, 42).expect("should find a split");

        assert_eq!(split.test.feature().index(), 0);
        assert!(split.test.threshold() > 3.0 && split.test.threshold() < 10.0);
        assert!((split.information_gain - 1.0).abs() < 1e-12);
        assert_eq!(split.left_indices.len(), 3);
        assert_eq!(split.right_indices.len(), 3);
    }

    #[test]
    fn informative_feature_beats_noise() {
        // Feature 0 is constant noise, feature 1 separates the classes.
        let values = [5.0, 1.0, 5.0, 2.0, 5.0, 8.0, 5.0, 9.0];
        let labels = [0, 0, 1, 1];
        let split = run(&values, 2, &labels, 2, WIDE, 7).expect("should find a split");
        assert_eq!(split.test.feature().index(), 1);
        assert!(split.test.threshold() > 2.0 && split.test.threshold() < 8.0);
    }

    #[test]
    fn constant_feature_returns_none() {
        let values = [5.0, 5.0, 5.0, 5.0];
        let labels = [0, 0, 1, 1];
        assert!(run(&values, 1, &labels, 2, WIDE, 42).is_none());
    }

    #[test]
    fn single_sample_returns_none() {
        assert!(run(&[1.0], 1, &[0], 1, WIDE, 42).is_none());
    }

    #[test]
    fn ties_prefer_lowest_feature_index() {
        // Two identical columns produce identical gains.
        let values = [1.0, 1.0, 2.0, 2.0, 7.0, 7.0, 8.0, 8.0];
        let labels = [0, 0, 1, 1];
        for seed in 0..10 {
            let split = run(&values, 2, &labels, 2, WIDE, seed).unwrap();
            assert_eq!(split.test.feature().index(), 0, "seed {seed}");
        }
    }

    #[test]
    fn ties_within_a_feature_prefer_lowest_threshold() {
        // Peeling either end sample gives the same gain; 1.5 must win.
        let values = [1.0, 2.0, 3.0, 4.0];
        let labels = [0, 1, 1, 0];
        for seed in 0..20 {
            let split = run(&values, 1, &labels, 2, WIDE, seed).unwrap();
            assert_eq!(split.test.threshold(), 1.5, "seed {seed}");
        }
    }

    #[test]
    fn children_partition_the_node() {
        let values = [0.5, 3.0, 1.5, 4.0, 2.5, 0.1, 3.3];
        let labels = [0, 1, 0, 1, 1, 0, 2];
        let split = run(&values, 1, &labels, 3, WIDE, 3).unwrap();
        let mut all: Vec<usize> = split
            .left_indices
            .iter()
            .chain(&split.right_indices)
            .copied()
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..7).collect::<Vec<_>>());
        assert!(!split.left_indices.is_empty());
        assert!(!split.right_indices.is_empty());
    }

    #[test]
    fn restricted_threshold_budget_is_seed_deterministic() {
        let values: Vec<f32> = (0..40).map(|i| i as f32).collect();
        let labels: Vec<usize> = (0..40).map(|i| usize::from(i >= 25)).collect();
        let budget = SearchBudget {
            candidate_features: 1,
            candidate_thresholds: 3,
        };
        let a = run(&values, 1, &labels, 2, budget, 11).unwrap();
        let b = run(&values, 1, &labels, 2, budget, 11).unwrap();
        assert_eq!(a.test, b.test);
        assert_eq!(a.left_indices, b.left_indices);
    }

    #[test]
    fn midpoint_stays_below_upper_value() {
        assert_eq!(midpoint(1.0, 3.0), 2.0);
        let lo = 1.0f32;
        let hi = f32::from_bits(lo.to_bits() + 1);
        let mid = midpoint(lo, hi);
        assert!(mid >= lo && mid < hi);
    }
}
