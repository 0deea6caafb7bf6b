//! Confusion matrix and per-class classification metrics.

use std::fmt;

use crate::dataset::LabelIndexMap;
use crate::error::ForestError;

/// Counts of (true class, predicted class) pairs over compact class indices.
///
/// Display and [`ClassMetrics`] report the original label values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    counts: Vec<u64>,
    labels: Vec<u32>,
}

/// Per-class precision, recall, and F1 score.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ClassMetrics {
    /// The original label value.
    pub label: u32,
    /// TP / (TP + FP); 0.0 when the class was never predicted.
    pub precision: f64,
    /// TP / (TP + FN); 0.0 when the class has no true samples.
    pub recall: f64,
    /// Harmonic mean of precision and recall; 0.0 when both are zero.
    pub f1: f64,
    /// Number of true samples of this class.
    pub support: u64,
}

impl ConfusionMatrix {
    /// Create an all-zero matrix over the classes of `label_map`.
    #[must_use]
    pub fn new(label_map: &LabelIndexMap) -> Self {
        let n = label_map.len();
        Self {
            counts: vec![0; n * n],
            labels: label_map.labels().to_vec(),
        }
    }

    /// Build a matrix from paired compact class indices.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::EmptyDataset`] | no pairs given |
    /// | [`ForestError::LabelCountMismatch`] | slices differ in length |
    ///
    /// # Panics
    ///
    /// Panics when an index is not below `label_map.len()`.
    pub fn from_indices(
        truth: &[usize],
        predicted: &[usize],
        label_map: &LabelIndexMap,
    ) -> Result<Self, ForestError> {
        if truth.is_empty() {
            return Err(ForestError::EmptyDataset);
        }
        if truth.len() != predicted.len() {
            return Err(ForestError::LabelCountMismatch {
                n_rows: predicted.len(),
                n_labels: truth.len(),
            });
        }
        let mut matrix = Self::new(label_map);
        for (&t, &p) in truth.iter().zip(predicted) {
            matrix.record(t, p);
        }
        Ok(matrix)
    }

    /// Count one sample of true class `truth` predicted as `predicted`.
    pub fn record(&mut self, truth: usize, predicted: usize) {
        let n = self.n_classes();
        self.counts[truth * n + predicted] += 1;
    }

    /// Add the counts of `other`, which must cover the same classes.
    pub(crate) fn merge(mut self, other: &Self) -> Self {
        debug_assert_eq!(self.labels, other.labels);
        for (a, b) in self.counts.iter_mut().zip(&other.counts) {
            *a += b;
        }
        self
    }

    /// Return the count for `(truth, predicted)`.
    #[must_use]
    pub fn count(&self, truth: usize, predicted: usize) -> u64 {
        self.counts[truth * self.n_classes() + predicted]
    }

    /// Return the number of recorded samples.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Proportion of samples on the diagonal; 0.0 when empty.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let correct: u64 = (0..self.n_classes()).map(|c| self.count(c, c)).sum();
        correct as f64 / total as f64
    }

    /// Per-class precision, recall, F1, and support.
    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        let n = self.n_classes();
        (0..n)
            .map(|c| {
                let tp = self.count(c, c);
                let predicted: u64 = (0..n).map(|t| self.count(t, c)).sum();
                let support: u64 = (0..n).map(|p| self.count(c, p)).sum();
                let precision = if predicted == 0 {
                    0.0
                } else {
                    tp as f64 / predicted as f64
                };
                let recall = if support == 0 {
                    0.0
                } else {
                    tp as f64 / support as f64
                };
                let f1 = if precision + recall == 0.0 {
                    0.0
                } else {
                    2.0 * precision * recall / (precision + recall)
                };
                ClassMetrics {
                    label: self.labels[c],
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect()
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.labels.len()
    }

    /// Return the original labels in compact-index order.
    #[must_use]
    pub fn labels(&self) -> &[u32] {
        &self.labels
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>10}", "true\\pred")?;
        for label in &self.labels {
            write!(f, " {label:>8}")?;
        }
        writeln!(f)?;

        let n = self.n_classes();
        for (t, label) in self.labels.iter().enumerate() {
            write!(f, "{label:>10}")?;
            for p in 0..n {
                write!(f, " {:>8}", self.count(t, p))?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}
