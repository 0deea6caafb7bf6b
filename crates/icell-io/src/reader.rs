//! CSV sample-table reader with full input validation.

use std::path::{Path, PathBuf};

use icell_forest::TrainingDataset;
use tracing::{debug, info, instrument};

use crate::IoError;

/// Reads pre-extracted training samples from a CSV file.
///
/// Expected CSV format:
/// - Header row required (first column is the label, remaining are feature channels)
/// - `label,f0,f1,...,fK-1`
/// - One row per sample, all rows must have the same number of columns
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::NoFeatureColumns`] | Header has only the label column |
/// | [`IoError::EmptyTable`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::InvalidLabel`] | Label cell is not a non-negative integer |
/// | [`IoError::NonFiniteValue`] | Feature cell is NaN, Inf, or unparseable float |
pub struct SampleTableReader {
    path: PathBuf,
}

impl SampleTableReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }

    /// Read and validate the CSV file, returning a [`TrainingDataset`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<TrainingDataset, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) so that ragged rows surface as InconsistentRowLength
        // rather than a generic CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let expected_cols = rdr.headers().map_err(|e| self.csv_error(e))?.len();
        debug!(expected_cols, "read CSV header");
        if expected_cols < 2 {
            return Err(IoError::NoFeatureColumns {
                path: self.path.clone(),
            });
        }

        let mut dataset = TrainingDataset::with_features(expected_cols - 1)?;
        let mut row = Vec::with_capacity(expected_cols - 1);

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;

            if record.len() != expected_cols {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: expected_cols,
                    got: record.len(),
                });
            }

            let raw_label = record.get(0).unwrap_or("");
            let label: u32 = raw_label.parse().map_err(|_| IoError::InvalidLabel {
                path: self.path.clone(),
                row_index,
                raw: raw_label.to_string(),
            })?;

            row.clear();
            for (col_index, raw) in record.iter().skip(1).enumerate() {
                let value = raw
                    .parse::<f32>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| IoError::NonFiniteValue {
                        path: self.path.clone(),
                        row_index,
                        col_index,
                        raw: raw.to_string(),
                    })?;
                row.push(value);
            }

            dataset.push(&row, label)?;
        }

        if dataset.is_empty() {
            return Err(IoError::EmptyTable {
                path: self.path.clone(),
            });
        }

        info!(
            n_samples = dataset.n_samples(),
            n_features = dataset.n_features(),
            n_classes = dataset.distinct_labels().len(),
            "sample table loaded"
        );

        Ok(dataset)
    }
}
