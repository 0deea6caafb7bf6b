//! Binary forest format.
//!
//! Layout: 8 magic bytes `ICELLRF\0`, a bincode [`ForestHeader`], then the
//! bincode-encoded [`DecisionForest`]. The header repeats the tree, feature
//! and class counts so a reader can check them against the body.

use std::io::{BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};

use crate::error::ForestError;
use crate::forest::DecisionForest;

/// Leading bytes of every forest stream.
pub const MAGIC: [u8; 8] = *b"ICELLRF\0";

/// Current binary format version.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
struct ForestHeader {
    format_version: u32,
    n_trees: usize,
    n_features: usize,
    n_classes: usize,
}

fn encode_error(e: bincode::Error) -> ForestError {
    match *e {
        bincode::ErrorKind::Io(source) => ForestError::Stream { source },
        other => ForestError::SerializeModel {
            source: Box::new(other),
        },
    }
}

/// Truncation is a format problem; any other I/O failure is reported as such.
fn decode_error(e: bincode::Error, context: &str) -> ForestError {
    match *e {
        bincode::ErrorKind::Io(source) if source.kind() != ErrorKind::UnexpectedEof => {
            ForestError::Stream { source }
        }
        other => ForestError::DeserializeModel {
            context: context.to_string(),
            source: Box::new(other),
        },
    }
}

impl DecisionForest {
    /// Encode the forest into `writer`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::SerializeModel`] | bincode encoding failed |
    /// | [`ForestError::Stream`] | `writer` failed |
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<(), ForestError> {
        let header = ForestHeader {
            format_version: FORMAT_VERSION,
            n_trees: self.trees.len(),
            n_features: self.n_features,
            n_classes: self.n_classes(),
        };
        writer
            .write_all(&MAGIC)
            .map_err(|source| ForestError::Stream { source })?;
        bincode::serialize_into(&mut writer, &header).map_err(encode_error)?;
        bincode::serialize_into(&mut writer, self).map_err(encode_error)?;
        writer.flush().map_err(|source| ForestError::Stream { source })
    }

    /// Decode a forest from `reader`, consuming exactly one forest.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::InvalidMagic`] | stream does not start with [`MAGIC`] |
    /// | [`ForestError::IncompatibleModelVersion`] | header version differs from [`FORMAT_VERSION`] |
    /// | [`ForestError::DeserializeModel`] | header or body is truncated or malformed |
    /// | [`ForestError::CorruptModel`] | body decodes but is inconsistent |
    /// | [`ForestError::Stream`] | `reader` failed |
    pub fn read_from<R: Read>(reader: R) -> Result<Self, ForestError> {
        decode(reader, "stream")
    }

    /// Save the forest to `path`.
    ///
    /// The bytes are written to a temporary file in the target directory and
    /// renamed over `path` only once complete, so a failed save never leaves
    /// a partial file behind.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::SerializeModel`] | bincode encoding failed |
    /// | [`ForestError::WriteModel`] | creating, writing or renaming the file failed |
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ForestError> {
        let path = path.as_ref();
        let write_err = |source: std::io::Error| ForestError::WriteModel {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;

        self.write_to(BufWriter::new(tmp.as_file_mut()))
            .map_err(|e| match e {
                ForestError::Stream { source } => write_err(source),
                other => other,
            })?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(path).map_err(|e| write_err(e.error))?;

        info!(n_trees = self.trees.len(), "forest saved");
        Ok(())
    }

    /// Load a forest saved by [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// [`ForestError::ReadModel`] when the file cannot be read; otherwise the
    /// format errors of [`read_from`](Self::read_from), plus
    /// [`ForestError::CorruptModel`] for trailing bytes after the forest.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ForestError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ForestError::ReadModel {
            path: path.to_path_buf(),
            source,
        })?;

        let context = path.display().to_string();
        let mut remaining = bytes.as_slice();
        let forest = decode(&mut remaining, &context)?;
        if !remaining.is_empty() {
            return Err(ForestError::CorruptModel {
                context,
                reason: format!("{} trailing bytes after forest", remaining.len()),
            });
        }

        info!(
            n_trees = forest.n_trees(),
            n_features = forest.n_features(),
            n_classes = forest.n_classes(),
            "forest loaded"
        );
        Ok(forest)
    }

    /// Check that a decoded body agrees with its header and is well formed.
    fn check_integrity(&self, header: &ForestHeader) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        if self.n_features == 0 {
            return Err("forest has zero features".to_string());
        }
        if self.label_map.is_empty() || !self.label_map.is_sorted_unique() {
            return Err("label map is empty or not strictly ascending".to_string());
        }
        if header.n_trees != self.trees.len() {
            return Err(format!(
                "header declares {} trees, body has {}",
                header.n_trees,
                self.trees.len()
            ));
        }
        if header.n_features != self.n_features {
            return Err(format!(
                "header declares {} features, body has {}",
                header.n_features, self.n_features
            ));
        }
        if header.n_classes != self.n_classes() {
            return Err(format!(
                "header declares {} classes, body has {}",
                header.n_classes,
                self.n_classes()
            ));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.check_structure(self.n_features, self.n_classes())
                .map_err(|reason| format!("tree {i}: {reason}"))?;
        }
        // One leaf per tree is summed by aggregate_histogram.
        self.trees
            .iter()
            .try_fold(0u64, |sum, tree| sum.checked_add(tree.max_leaf_total()))
            .ok_or_else(|| "leaf counts overflow when aggregated across trees".to_string())?;
        Ok(())
    }
}

fn decode<R: Read>(mut reader: R, context: &str) -> Result<DecisionForest, ForestError> {
    let mut magic = [0u8; MAGIC.len()];
    reader.read_exact(&mut magic).map_err(|source| {
        if source.kind() == ErrorKind::UnexpectedEof {
            ForestError::InvalidMagic {
                context: context.to_string(),
            }
        } else {
            ForestError::Stream { source }
        }
    })?;
    if magic != MAGIC {
        return Err(ForestError::InvalidMagic {
            context: context.to_string(),
        });
    }

    let header: ForestHeader =
        bincode::deserialize_from(&mut reader).map_err(|e| decode_error(e, context))?;
    if header.format_version != FORMAT_VERSION {
        return Err(ForestError::IncompatibleModelVersion {
            expected: FORMAT_VERSION,
            found: header.format_version,
            context: context.to_string(),
        });
    }

    let forest: DecisionForest =
        bincode::deserialize_from(&mut reader).map_err(|e| decode_error(e, context))?;
    forest
        .check_integrity(&header)
        .map_err(|reason| ForestError::CorruptModel {
            context: context.to_string(),
            reason,
        })?;

    debug!(
        n_trees = header.n_trees,
        n_features = header.n_features,
        n_classes = header.n_classes,
        "forest decoded"
    );
    Ok(forest)
}
