//! I/O error types for icell-io.

use std::path::PathBuf;

use icell_forest::ForestError;

/// Errors from image and CSV I/O, raster validation, and the sampling and
/// application adapters.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when an input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when an image file cannot be decoded.
    #[error("cannot decode image {path}")]
    ImageDecode {
        /// Path to the image file.
        path: PathBuf,
        /// Underlying image error.
        source: image::ImageError,
    },

    /// Returned when an image file cannot be encoded or written.
    #[error("cannot write image {path}")]
    ImageEncode {
        /// Path to the image file.
        path: PathBuf,
        /// Underlying image error.
        source: image::ImageError,
    },

    /// Returned when a feature stack is built from zero planes.
    #[error("feature stack needs at least one channel")]
    NoChannels,

    /// Returned when a raster buffer does not hold `width * height` values.
    #[error("raster buffer holds {got} values, expected {width}x{height}")]
    BufferSize {
        /// Raster width.
        width: u32,
        /// Raster height.
        height: u32,
        /// Actual buffer length.
        got: usize,
    },

    /// Returned when a feature plane differs in size from the first plane.
    #[error("channel {channel} is {got_width}x{got_height}, expected {width}x{height}")]
    PlaneSizeMismatch {
        /// Zero-based channel index of the offending plane.
        channel: usize,
        /// Expected width.
        width: u32,
        /// Expected height.
        height: u32,
        /// Width of the offending plane.
        got_width: u32,
        /// Height of the offending plane.
        got_height: u32,
    },

    /// Returned when the label mask and the feature stack differ in size.
    #[error("label mask is {got_width}x{got_height}, feature stack is {width}x{height}")]
    MaskSizeMismatch {
        /// Feature stack width.
        width: u32,
        /// Feature stack height.
        height: u32,
        /// Mask width.
        got_width: u32,
        /// Mask height.
        got_height: u32,
    },

    /// Returned when the label mask has no labelled pixel.
    #[error("label mask has no labelled pixels")]
    NoLabelledPixels,

    /// Returned when the feature stack has a different channel count than the forest.
    #[error("feature stack has {got} channels, forest expects {expected}")]
    ChannelCountMismatch {
        /// Feature count the forest was trained on.
        expected: usize,
        /// Channels in the stack.
        got: usize,
    },

    /// Returned when a label is too large for the output image's bit depth.
    #[error("label {label} does not fit in a 16-bit label image")]
    LabelOutOfRange {
        /// The offending label value.
        label: u32,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when the sample table has a header but zero data rows.
    #[error("empty sample table (no data rows) in {path}")]
    EmptyTable {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when the sample table header has no feature column.
    #[error("sample table {path} has no feature columns")]
    NoFeatureColumns {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when a data row has a different number of columns than the header.
    #[error("inconsistent row length in {path}: row {row_index} has {got} columns, expected {expected}")]
    InconsistentRowLength {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Expected number of columns (from header).
        expected: usize,
        /// Actual number of columns in this row.
        got: usize,
    },

    /// Returned when a label cell is not a non-negative integer.
    #[error("invalid label in {path}: row {row_index}, raw value \"{raw}\"")]
    InvalidLabel {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// The raw string value that failed to parse.
        raw: String,
    },

    /// Returned when a feature cell is NaN, Inf, or otherwise not a finite float.
    #[error("non-finite value in {path}: row {row_index}, column {col_index}, raw value \"{raw}\"")]
    NonFiniteValue {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Zero-based feature column index (excluding the label column).
        col_index: usize,
        /// The raw string value that failed to parse.
        raw: String,
    },

    /// Returned when the forest library rejects the data or the model.
    #[error(transparent)]
    Forest(#[from] ForestError),
}
