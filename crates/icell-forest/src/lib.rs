//! Decision-forest pixel classification: train, predict, persist.
//!
//! Trees of single-feature threshold tests are grown on labelled feature
//! vectors, chosen by information gain over randomly sampled candidates.
//! Leaves keep label histograms; the forest predicts by averaging the
//! normalized histograms of the leaves a sample reaches (soft voting).
//! Trees are grown in parallel with rayon and reproducibly seeded.

mod config;
mod confusion;
mod dataset;
mod error;
mod forest;
mod histogram;
mod importance;
mod node;
mod predict;
mod result;
mod serialize;
mod split;
mod tree;

pub use config::TrainingParameters;
pub use confusion::{ClassMetrics, ConfusionMatrix};
pub use dataset::{LabelIndexMap, TrainingDataset};
pub use error::ForestError;
pub use forest::DecisionForest;
pub use histogram::Histogram;
pub use importance::RankedFeature;
pub use node::{FeatureIndex, Node, NodeIndex};
pub use predict::ClassDistribution;
pub use result::{TrainingMetadata, TrainingResult};
pub use serialize::{FORMAT_VERSION, MAGIC};
pub use split::{AxisAlignedClassifier, Polarity};
pub use tree::DecisionTree;
