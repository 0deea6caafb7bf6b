//! Image and table I/O for icell: feature stacks, label masks, training-set
//! sampling, and whole-image classification.

mod apply;
mod domain;
mod error;
mod raster;
mod reader;
mod sample;

pub use apply::apply_forest;
pub use domain::{FeaturePlane, FeatureStack, LabelImage, LabelMask};
pub use error::IoError;
pub use raster::{read_feature_plane, read_feature_stack, read_label_mask, write_label_image};
pub use reader::SampleTableReader;
pub use sample::sample_training_set;
