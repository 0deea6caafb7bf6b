//! Training samples and the label remapping shared by training and inference.

use crate::error::ForestError;

/// A feature matrix of `n_samples × n_features` paired with one label per row.
///
/// Rows are stored contiguously (row-major). The feature count is fixed when
/// the dataset is created; every pushed row must match it and must be finite.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingDataset {
    values: Vec<f32>,
    n_features: usize,
    labels: Vec<u32>,
}

impl TrainingDataset {
    /// Create an empty dataset whose rows will have `n_features` columns.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::ZeroFeatures`] when `n_features` is zero.
    pub fn with_features(n_features: usize) -> Result<Self, ForestError> {
        if n_features == 0 {
            return Err(ForestError::ZeroFeatures);
        }
        Ok(Self {
            values: Vec::new(),
            n_features,
            labels: Vec::new(),
        })
    }

    /// Build a dataset from row vectors and their labels.
    ///
    /// # Errors
    ///
    /// | Variant                               | When                                  |
    /// |---------------------------------------|---------------------------------------|
    /// | [`ForestError::EmptyDataset`]         | `rows` is empty                       |
    /// | [`ForestError::ZeroFeatures`]         | rows have zero columns                |
    /// | [`ForestError::LabelCountMismatch`]   | `rows.len() != labels.len()`          |
    /// | [`ForestError::FeatureCountMismatch`] | rows have inconsistent lengths        |
    /// | [`ForestError::NonFiniteValue`]       | any value is NaN or infinite          |
    pub fn new(rows: &[Vec<f32>], labels: &[u32]) -> Result<Self, ForestError> {
        let first = rows.first().ok_or(ForestError::EmptyDataset)?;
        if rows.len() != labels.len() {
            return Err(ForestError::LabelCountMismatch {
                n_rows: rows.len(),
                n_labels: labels.len(),
            });
        }
        let mut dataset = Self::with_features(first.len())?;
        dataset.values.reserve(rows.len() * first.len());
        dataset.labels.reserve(rows.len());
        for (row, &label) in rows.iter().zip(labels) {
            dataset.push(row, label)?;
        }
        Ok(dataset)
    }

    /// Append one sample.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::FeatureCountMismatch`] for a row of the wrong
    /// length and [`ForestError::NonFiniteValue`] for NaN or infinite values.
    /// The dataset is unchanged on error.
    pub fn push(&mut self, row: &[f32], label: u32) -> Result<(), ForestError> {
        let sample_index = self.labels.len();
        if row.len() != self.n_features {
            return Err(ForestError::FeatureCountMismatch {
                expected: self.n_features,
                got: row.len(),
                sample_index,
            });
        }
        if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
            return Err(ForestError::NonFiniteValue {
                sample_index,
                feature_index,
            });
        }
        self.values.extend_from_slice(row);
        self.labels.push(label);
        Ok(())
    }

    /// Return the number of samples.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.labels.len()
    }

    /// Return `true` when the dataset holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Return the number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the feature row of sample `index`.
    ///
    /// # Panics
    ///
    /// Panics when `index >= n_samples()`.
    #[must_use]
    pub fn row(&self, index: usize) -> &[f32] {
        let start = index * self.n_features;
        &self.values[start..start + self.n_features]
    }

    /// Iterate over feature rows in sample order.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[f32]> {
        self.values.chunks_exact(self.n_features)
    }

    /// Return the label of sample `index`.
    ///
    /// # Panics
    ///
    /// Panics when `index >= n_samples()`.
    #[must_use]
    pub fn label(&self, index: usize) -> u32 {
        self.labels[index]
    }

    /// Return all labels in sample order.
    #[must_use]
    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    /// Return the contiguous row-major feature values.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Return the distinct labels, ascending.
    #[must_use]
    pub fn distinct_labels(&self) -> Vec<u32> {
        let mut labels = self.labels.clone();
        labels.sort_unstable();
        labels.dedup();
        labels
    }
}

/// Stable mapping between original label values and compact class indices.
///
/// Index `i` is the `i`-th smallest label seen during training, so the same
/// label set always yields the same mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LabelIndexMap {
    labels: Vec<u32>,
}

impl LabelIndexMap {
    /// Build the mapping from any sequence of labels (duplicates allowed).
    #[must_use]
    pub fn from_labels(labels: &[u32]) -> Self {
        let mut sorted = labels.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        Self { labels: sorted }
    }

    /// Return the compact index of `label`, if it was seen.
    #[must_use]
    pub fn index_of(&self, label: u32) -> Option<usize> {
        self.labels.binary_search(&label).ok()
    }

    /// Return the original label for compact index `index`.
    #[must_use]
    pub fn label(&self, index: usize) -> Option<u32> {
        self.labels.get(index).copied()
    }

    /// Return the number of classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Return `true` when no label is mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Return the original labels ordered by compact index.
    #[must_use]
    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    /// Iterate over `(index, label)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.labels.iter().copied().enumerate()
    }

    /// Encode labels that are all known to the map.
    pub(crate) fn encode(&self, labels: &[u32]) -> Vec<usize> {
        labels
            .iter()
            .map(|l| match self.labels.binary_search(l) {
                Ok(i) | Err(i) => i,
            })
            .collect()
    }

    /// Return `true` when labels are strictly ascending (the constructor invariant).
    pub(crate) fn is_sorted_unique(&self) -> bool {
        self.labels.windows(2).all(|w| w[0] < w[1])
    }
}

/// Borrowed view of the training matrix with labels already encoded.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SampleMatrix<'a> {
    pub(crate) values: &'a [f32],
    pub(crate) n_features: usize,
    pub(crate) labels: &'a [usize],
    pub(crate) n_classes: usize,
}

impl<'a> SampleMatrix<'a> {
    pub(crate) fn new(
        values: &'a [f32],
        n_features: usize,
        labels: &'a [usize],
        n_classes: usize,
    ) -> Self {
        debug_assert_eq!(values.len(), n_features * labels.len());
        Self {
            values,
            n_features,
            labels,
            n_classes,
        }
    }

    #[inline]
    pub(crate) fn value(&self, sample: usize, feature: usize) -> f32 {
        self.values[sample * self.n_features + feature]
    }

    #[inline]
    pub(crate) fn row(&self, sample: usize) -> &'a [f32] {
        let start = sample * self.n_features;
        &self.values[start..start + self.n_features]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_validates_shapes() {
        let err = TrainingDataset::new(&[], &[]).unwrap_err();
        assert!(matches!(err, ForestError::EmptyDataset));

        let err = TrainingDataset::new(&[vec![]], &[1]).unwrap_err();
        assert!(matches!(err, ForestError::ZeroFeatures));

        let err = TrainingDataset::new(&[vec![1.0], vec![2.0]], &[1]).unwrap_err();
        assert!(matches!(
            err,
            ForestError::LabelCountMismatch { n_rows: 2, n_labels: 1 }
        ));

        let err = TrainingDataset::new(&[vec![1.0, 2.0], vec![3.0]], &[1, 2]).unwrap_err();
        assert!(matches!(
            err,
            ForestError::FeatureCountMismatch { expected: 2, got: 1, sample_index: 1 }
        ));
    }

    #[test]
    fn non_finite_values_rejected() {
        let err = TrainingDataset::new(&[vec![1.0, f32::NAN]], &[1]).unwrap_err();
        assert!(matches!(
            err,
            ForestError::NonFiniteValue { sample_index: 0, feature_index: 1 }
        ));
    }

    #[test]
    fn failed_push_leaves_dataset_unchanged() {
        let mut ds = TrainingDataset::with_features(2).unwrap();
        ds.push(&[1.0, 2.0], 4).unwrap();
        assert!(ds.push(&[f32::INFINITY, 0.0], 5).is_err());
        assert_eq!(ds.n_samples(), 1);
        assert_eq!(ds.values().len(), 2);
    }

    #[test]
    fn rows_and_labels_line_up() {
        let ds = TrainingDataset::new(&[vec![1.0, 2.0], vec![3.0, 4.0]], &[7, 3]).unwrap();
        assert_eq!(ds.row(1), &[3.0, 4.0]);
        assert_eq!(ds.label(1), 3);
        assert_eq!(ds.rows().count(), 2);
        assert_eq!(ds.distinct_labels(), vec![3, 7]);
    }

    #[test]
    fn label_map_is_sorted_and_stable() {
        let map = LabelIndexMap::from_labels(&[9, 2, 9, 5, 2]);
        assert_eq!(map.labels(), &[2, 5, 9]);
        assert_eq!(map.index_of(5), Some(1));
        assert_eq!(map.index_of(4), None);
        assert_eq!(map.label(2), Some(9));
        assert_eq!(map.label(3), None);
        assert_eq!(map.encode(&[9, 2, 5]), vec![2, 0, 1]);
        assert!(map.is_sorted_unique());
        assert_eq!(map, LabelIndexMap::from_labels(&[5, 9, 2]));
    }
}
