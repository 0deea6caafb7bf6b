//! Label-count histograms.
//!
//! A [`Histogram`] is both the leaf model (its arg-max is the leaf's vote and
//! its normalized counts feed the forest's soft vote) and the split criterion
//! (Shannon entropy and information gain over candidate children).
//!
//! Buckets are keyed by compact class index (see
//! [`LabelIndexMap`](crate::LabelIndexMap)) and are created on first insert.

/// Per-class sample counts for the training samples that reached a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Histogram {
    counts: Vec<u64>,
    total: u64,
}

impl Histogram {
    /// Create an empty histogram.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty histogram with `n_classes` pre-allocated buckets.
    #[must_use]
    pub fn with_classes(n_classes: usize) -> Self {
        Self {
            counts: vec![0; n_classes],
            total: 0,
        }
    }

    /// Build a histogram from the labels of the selected samples.
    pub(crate) fn from_samples(labels: &[usize], sample_indices: &[usize], n_classes: usize) -> Self {
        let mut hist = Self::with_classes(n_classes);
        for &si in sample_indices {
            hist.insert(labels[si]);
        }
        hist
    }

    /// Count one more sample of class `class`, creating the bucket if absent.
    pub fn insert(&mut self, class: usize) {
        self.insert_n(class, 1);
    }

    /// Count `n` more samples of class `class`. Counts saturate at `u64::MAX`.
    pub fn insert_n(&mut self, class: usize, n: u64) {
        if class >= self.counts.len() {
            self.counts.resize(class + 1, 0);
        }
        self.counts[class] = self.counts[class].saturating_add(n);
        self.total = self.total.saturating_add(n);
    }

    /// Remove one sample of class `class`. The bucket must be non-empty.
    pub(crate) fn remove(&mut self, class: usize) {
        debug_assert!(self.count(class) > 0, "removing from empty bucket {class}");
        self.counts[class] -= 1;
        self.total -= 1;
    }

    /// Add every bucket of `other` into `self`.
    pub fn merge(&mut self, other: &Histogram) {
        for (class, &n) in other.counts.iter().enumerate() {
            if n > 0 {
                self.insert_n(class, n);
            }
        }
    }

    /// Return the count for `class` (zero when the bucket does not exist).
    #[must_use]
    pub fn count(&self, class: usize) -> u64 {
        self.counts.get(class).copied().unwrap_or(0)
    }

    /// Return the total number of samples.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Return `true` when no sample has been counted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Return the number of buckets (highest class index seen + 1).
    #[must_use]
    pub fn n_buckets(&self) -> usize {
        self.counts.len()
    }

    /// Return the number of classes with a non-zero count.
    #[must_use]
    pub fn n_distinct(&self) -> usize {
        self.counts.iter().filter(|&&c| c > 0).count()
    }

    /// Return `true` when at most one class is present.
    #[must_use]
    pub fn is_pure(&self) -> bool {
        self.n_distinct() <= 1
    }

    /// Shannon entropy in bits: `-Σ p_i·log2(p_i)`, with `0·log2(0) = 0`.
    ///
    /// An empty histogram has entropy 0.
    #[must_use]
    pub fn entropy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let n = self.total as f64;
        -self
            .counts
            .iter()
            .filter(|&&c| c > 0)
            .map(|&c| {
                let p = c as f64 / n;
                p * p.log2()
            })
            .sum::<f64>()
    }

    /// Entropy reduction from splitting `self` into `left` and `right`.
    ///
    /// `H(self) - |left|/|self|·H(left) - |right|/|self|·H(right)`.
    /// Returns 0 for an empty parent.
    #[must_use]
    pub fn information_gain(&self, left: &Histogram, right: &Histogram) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let n = self.total as f64;
        self.entropy()
            - (left.total as f64 / n) * left.entropy()
            - (right.total as f64 / n) * right.entropy()
    }

    /// Return the class with the highest count; ties go to the smallest class index.
    ///
    /// `None` for an empty histogram.
    #[must_use]
    pub fn arg_max(&self) -> Option<usize> {
        let mut best: Option<(usize, u64)> = None;
        for (class, &c) in self.counts.iter().enumerate() {
            if c == 0 {
                continue;
            }
            match best {
                Some((_, best_count)) if c <= best_count => {}
                _ => best = Some((class, c)),
            }
        }
        best.map(|(class, _)| class)
    }

    /// Return normalized frequencies padded to `n_classes` entries.
    ///
    /// All zeros for an empty histogram.
    #[must_use]
    pub fn distribution(&self, n_classes: usize) -> Vec<f64> {
        let mut dist = vec![0.0; n_classes.max(self.counts.len())];
        if self.total == 0 {
            return dist;
        }
        let n = self.total as f64;
        for (class, &c) in self.counts.iter().enumerate() {
            dist[class] = c as f64 / n;
        }
        dist
    }

    /// Return the raw counts, indexed by class.
    #[must_use]
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Return `true` when the cached total equals the sum of the buckets.
    pub(crate) fn is_consistent(&self) -> bool {
        self.counts
            .iter()
            .try_fold(0u64, |acc, &c| acc.checked_add(c))
            == Some(self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::Histogram;

    fn hist(counts: &[u64]) -> Histogram {
        let mut h = Histogram::new();
        for (class, &n) in counts.iter().enumerate() {
            h.insert_n(class, n);
        }
        h
    }

    #[test]
    fn insert_creates_bucket() {
        let mut h = Histogram::new();
        h.insert(3);
        assert_eq!(h.n_buckets(), 4);
        assert_eq!(h.count(3), 1);
        assert_eq!(h.count(0), 0);
        assert_eq!(h.count(99), 0);
        assert_eq!(h.total(), 1);
    }

    #[test]
    fn empty_histogram_has_zero_entropy() {
        assert_eq!(Histogram::new().entropy(), 0.0);
        assert!(Histogram::new().is_empty());
    }

    #[test]
    fn single_label_entropy_is_zero() {
        let h = hist(&[0, 17, 0]);
        assert_eq!(h.entropy(), 0.0);
        assert!(h.is_pure());
    }

    #[test]
    fn uniform_entropy_is_log2_of_class_count() {
        let h = hist(&[5, 5, 5, 5]);
        assert!((h.entropy() - 2.0).abs() < 1e-12);
        let h = hist(&[3, 3, 3]);
        assert!((h.entropy() - 3.0_f64.log2()).abs() < 1e-12);
    }

    #[test]
    fn perfect_split_gain_equals_parent_entropy() {
        let parent = hist(&[4, 4]);
        let left = hist(&[4, 0]);
        let right = hist(&[0, 4]);
        assert!((parent.information_gain(&left, &right) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn uninformative_split_has_zero_gain() {
        let parent = hist(&[4, 4]);
        let left = hist(&[2, 2]);
        let right = hist(&[2, 2]);
        assert!(parent.information_gain(&left, &right).abs() < 1e-12);
    }

    #[test]
    fn partial_split_gain_is_positive() {
        let parent = hist(&[6, 6]);
        let left = hist(&[5, 1]);
        let right = hist(&[1, 5]);
        let gain = parent.information_gain(&left, &right);
        assert!(gain > 0.0 && gain < 1.0, "gain = {gain}");
    }

    #[test]
    fn arg_max_breaks_ties_by_smallest_class() {
        assert_eq!(hist(&[0, 3, 3, 1]).arg_max(), Some(1));
        assert_eq!(hist(&[2, 5, 1]).arg_max(), Some(1));
        assert_eq!(Histogram::new().arg_max(), None);
    }

    #[test]
    fn distribution_sums_to_one_and_pads() {
        let dist = hist(&[1, 3]).distribution(4);
        assert_eq!(dist.len(), 4);
        assert!((dist.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((dist[1] - 0.75).abs() < 1e-12);
        assert_eq!(dist[3], 0.0);
    }

    #[test]
    fn merge_adds_counts() {
        let mut a = hist(&[1, 2]);
        a.merge(&hist(&[0, 1, 4]));
        assert_eq!(a.counts(), &[1, 3, 4]);
        assert_eq!(a.total(), 8);
    }

    #[test]
    fn remove_decrements() {
        let mut h = hist(&[2, 1]);
        h.remove(0);
        assert_eq!(h.count(0), 1);
        assert_eq!(h.total(), 2);
    }

    #[test]
    fn merge_saturates_instead_of_wrapping() {
        let mut big = Histogram::new();
        big.insert_n(1, u64::MAX / 2 + 1);
        let mut merged = big.clone();
        merged.merge(&big);
        assert_eq!(merged.total(), u64::MAX);
        assert_eq!(merged.count(1), u64::MAX);
        assert_eq!(merged.arg_max(), Some(1));
    }
}
