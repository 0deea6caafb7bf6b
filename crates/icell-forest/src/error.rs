use std::path::PathBuf;

/// Errors from decision-forest training, inference, and model persistence.
#[derive(Debug, thiserror::Error)]
pub enum ForestError {
    /// Returned when tree_depth is zero.
    #[error("tree_depth must be at least 1, got {tree_depth}")]
    InvalidTreeDepth {
        /// The invalid tree_depth value provided.
        tree_depth: usize,
    },

    /// Returned when tree_num is zero.
    #[error("tree_num must be at least 1, got {tree_num}")]
    InvalidTreeCount {
        /// The invalid tree_num value provided.
        tree_num: usize,
    },

    /// Returned when candidate_node_classifier_num is zero.
    #[error("candidate_node_classifier_num must be at least 1, got {count}")]
    InvalidCandidateFeatureCount {
        /// The invalid count provided.
        count: usize,
    },

    /// Returned when candidate_classifier_threshold_num is zero.
    #[error("candidate_classifier_threshold_num must be at least 1, got {count}")]
    InvalidCandidateThresholdCount {
        /// The invalid count provided.
        count: usize,
    },

    /// Returned when sub_sample_percent is not in [0.0, 1.0].
    #[error("sub_sample_percent must be in [0.0, 1.0], got {fraction}")]
    InvalidSubSampleFraction {
        /// The invalid fraction provided.
        fraction: f64,
    },

    /// Returned when split_ig is negative or not finite.
    #[error("split_ig must be a finite, non-negative number, got {split_ig}")]
    InvalidSplitGain {
        /// The invalid split_ig value provided.
        split_ig: f64,
    },

    /// Returned when leaf_entropy is negative or not finite.
    #[error("leaf_entropy must be a finite, non-negative number, got {leaf_entropy}")]
    InvalidLeafEntropy {
        /// The invalid leaf_entropy value provided.
        leaf_entropy: f64,
    },

    /// Returned when the training dataset has zero samples.
    #[error("training dataset has zero samples")]
    EmptyDataset,

    /// Returned when the training dataset has zero feature columns.
    #[error("training dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when a sample has a different number of features than expected.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the sample.
        got: usize,
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when the feature matrix and label vector disagree in length.
    #[error("feature matrix has {n_rows} rows but {n_labels} labels were given")]
    LabelCountMismatch {
        /// Number of feature rows.
        n_rows: usize,
        /// Number of labels.
        n_labels: usize,
    },

    /// Returned when a training value is NaN or infinite.
    #[error("non-finite value at sample {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The zero-based index of the offending feature column.
        feature_index: usize,
    },

    /// Returned when the training labels contain fewer than two classes.
    #[error("training data contains {n_distinct} distinct label(s); at least two are required")]
    InsufficientLabelDiversity {
        /// Number of distinct labels found.
        n_distinct: usize,
    },

    /// Returned when a sample has a different number of features at prediction time.
    #[error("prediction input has {got} features, expected {expected}")]
    PredictionFeatureMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the prediction input.
        got: usize,
    },

    /// Returned when an evaluation label was never seen during training.
    #[error("label {label} was not present in the training data")]
    UnknownLabel {
        /// The unmapped label value.
        label: u32,
    },

    /// Returned when model serialization fails.
    #[error("failed to serialize forest")]
    SerializeModel {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when the forest body cannot be decoded.
    #[error("failed to deserialize forest: {context}")]
    DeserializeModel {
        /// Where the stream came from (a file path or "stream").
        context: String,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when the stream does not start with the forest magic bytes.
    #[error("{context} is not a forest file (bad magic bytes)")]
    InvalidMagic {
        /// Where the stream came from.
        context: String,
    },

    /// Returned when loading a forest with an incompatible format version.
    #[error("incompatible forest format in {context}: expected version {expected}, found {found}")]
    IncompatibleModelVersion {
        /// The format version this build expects.
        expected: u32,
        /// The format version found in the stream.
        found: u32,
        /// Where the stream came from.
        context: String,
    },

    /// Returned when the header and body of a forest stream disagree.
    #[error("corrupt forest in {context}: {reason}")]
    CorruptModel {
        /// Where the stream came from.
        context: String,
        /// What was inconsistent.
        reason: String,
    },

    /// Returned when writing the forest file fails.
    #[error("failed to write forest to {path}")]
    WriteModel {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading the forest file fails.
    #[error("failed to read forest from {path}")]
    ReadModel {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a caller-supplied reader or writer fails mid-stream.
    #[error("I/O error on forest stream")]
    Stream {
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

impl ForestError {
    /// Return `true` for malformed-stream errors (as opposed to I/O failures).
    #[must_use]
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            ForestError::InvalidMagic { .. }
                | ForestError::IncompatibleModelVersion { .. }
                | ForestError::DeserializeModel { .. }
                | ForestError::CorruptModel { .. }
        )
    }
}
