use std::fmt;

use crate::histogram::Histogram;
use crate::split::AxisAlignedClassifier;

/// Zero-based feature channel index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct FeatureIndex(usize);

impl FeatureIndex {
    /// Create a new feature index from a zero-based channel position.
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based feature channel index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FeatureIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index into a `Vec<Node>` arena, identifying a specific node in a decision tree.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// Create a new node index from a zero-based arena position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A node in a decision tree arena.
///
/// Trees are stored as `Vec<Node>` where children are referenced by
/// [`NodeIndex`] rather than pointers. Every child index is greater than its
/// parent's and is referenced by exactly one parent, so the arena is a strict
/// tree rooted at index 0.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Node {
    /// An interior split node.
    Split {
        /// Routing test: samples for which it holds go left.
        test: AxisAlignedClassifier,
        /// Index of the left child node.
        left: NodeIndex,
        /// Index of the right child node.
        right: NodeIndex,
        /// Information gain (bits) achieved by the split.
        information_gain: f64,
        /// Number of training samples that reached this node.
        n_samples: usize,
    },
    /// A terminal leaf node.
    Leaf {
        /// Label counts of the training samples that reached this leaf.
        histogram: Histogram,
    },
}

impl Node {
    /// Return the number of training samples that reached this node.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        match self {
            Node::Split { n_samples, .. } => *n_samples,
            Node::Leaf { histogram } => histogram.total() as usize,
        }
    }

    /// Return `true` if this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// Return the leaf histogram, or `None` for split nodes.
    #[must_use]
    pub fn histogram(&self) -> Option<&Histogram> {
        match self {
            Node::Leaf { histogram } => Some(histogram),
            Node::Split { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FeatureIndex, Node, NodeIndex};
    use crate::histogram::Histogram;
    use crate::split::{AxisAlignedClassifier, Polarity};

    #[test]
    fn feature_index_roundtrip() {
        let fi = FeatureIndex::new(7);
        assert_eq!(fi.index(), 7);
        assert_eq!(format!("{fi}"), "7");
    }

    #[test]
    fn feature_index_ordering() {
        assert!(FeatureIndex::new(1) < FeatureIndex::new(5));
    }

    #[test]
    fn node_index_roundtrip() {
        let ni = NodeIndex::new(42);
        assert_eq!(ni.index(), 42);
        assert_eq!(format!("{ni}"), "42");
    }

    fn make_leaf() -> Node {
        let mut histogram = Histogram::new();
        histogram.insert_n(0, 2);
        histogram.insert_n(1, 8);
        Node::Leaf { histogram }
    }

    fn make_split() -> Node {
        Node::Split {
            test: AxisAlignedClassifier::new(FeatureIndex::new(2), 3.5, Polarity::LessOrEqual),
            left: NodeIndex::new(1),
            right: NodeIndex::new(2),
            information_gain: 0.4,
            n_samples: 20,
        }
    }

    #[test]
    fn leaf_accessors() {
        let leaf = make_leaf();
        assert!(leaf.is_leaf());
        assert_eq!(leaf.n_samples(), 10);
        assert_eq!(leaf.histogram().and_then(Histogram::arg_max), Some(1));
    }

    #[test]
    fn split_accessors() {
        let split = make_split();
        assert!(!split.is_leaf());
        assert_eq!(split.n_samples(), 20);
        assert!(split.histogram().is_none());
    }
}
