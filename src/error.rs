use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::loader::tile_data::Compression;

/// Which part of the loading pipeline produced a [`MapError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStage {
    /// Reading files from the resource reader.
    Io,
    /// Turning JSON text into raw records or typed values.
    Parse,
    /// Decoding base64/compressed tile data.
    Decode,
    /// Choosing the concrete layer kind.
    Dispatch,
    /// Resolving object templates and external references.
    Template,
    /// Optional strict-mode checks on the assembled map.
    Validation,
}

/// Error type for everything the loader can reject.
#[derive(Debug, Error)]
pub enum MapError {
    /// A referenced file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// A file is not valid JSON or does not have the expected top-level shape.
    #[error("failed to parse {}: {source}", path.display())]
    Json {
        /// File that was being parsed.
        path: PathBuf,
        /// Underlying serde error.
        source: serde_json::Error,
    },

    /// A nested record (layer, object, tileset...) has the wrong shape.
    #[error("malformed {record}: {source}")]
    Malformed {
        /// Human readable description of the record.
        record: String,
        /// Underlying serde error.
        source: serde_json::Error,
    },

    /// A field required by the selected variant is absent.
    #[error("{record} is missing required field `{field}`")]
    MissingField {
        /// Human readable description of the record.
        record: String,
        /// Name of the missing JSON field.
        field: &'static str,
    },

    /// The file extension points at a format this crate does not read (e.g. TMX/TSX).
    #[error("unsupported file format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// A color string does not follow `#RRGGBB` or `#AARRGGBB`.
    #[error("invalid color `{0}`")]
    InvalidColor(String),

    /// A property value does not fit its declared type tag.
    #[error("property `{name}` does not hold a valid `{kind}` value")]
    InvalidPropertyValue {
        /// Property name.
        name: String,
        /// The declared type tag.
        kind: String,
    },

    /// Tile data is textual but not base64 encoded.
    #[error("unsupported tile data encoding `{0}`")]
    UnsupportedEncoding(String),

    /// Tile data names a compression algorithm other than zlib or gzip.
    #[error("unsupported tile data compression `{0}`")]
    UnsupportedCompression(String),

    /// Tile data is not valid base64.
    #[error("invalid base64 tile data: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Tile data could not be decompressed.
    #[error("failed to decompress {compression} tile data: {source}")]
    Decompress {
        /// Algorithm that failed.
        compression: Compression,
        /// Underlying I/O error from the decoder.
        source: io::Error,
    },

    /// Decoded tile data does not split into whole 32-bit values.
    #[error("decoded tile data is {0} bytes long, not a multiple of 4")]
    TileDataLength(usize),

    /// A layer's `type` discriminator is not one of the four known kinds.
    #[error("unknown layer type `{0}`")]
    UnknownLayerType(String),

    /// An object template is stored in the XML variant of the format.
    #[error("object template {} is not a JSON template", .0.display())]
    UnsupportedTemplate(PathBuf),

    /// A relative reference was found but no base directory is known.
    #[error("a base directory is required to resolve {kind} `{reference}`")]
    MissingBaseDirectory {
        /// What kind of reference it was (template, tileset...).
        kind: &'static str,
        /// The relative path as written in the file.
        reference: String,
    },

    /// Two tilesets claim overlapping gid ranges (strict mode).
    #[error("tileset starting at gid {second} overlaps tileset starting at gid {first}")]
    OverlappingTilesets {
        /// First gid of the lower tileset.
        first: u32,
        /// First gid of the tileset that starts inside it.
        second: u32,
    },

    /// A tile layer references a gid no tileset covers (strict mode).
    #[error("layer `{layer}` references gid {gid} which no tileset covers")]
    InvalidTileGid {
        /// Layer name.
        layer: String,
        /// Masked gid.
        gid: u32,
    },

    /// A tile object references a gid no tileset covers (strict mode).
    #[error("object {object_id} in layer `{layer}` references gid {gid} which no tileset covers")]
    InvalidObjectGid {
        /// Layer name.
        layer: String,
        /// Object id.
        object_id: u32,
        /// Masked gid.
        gid: u32,
    },
}

impl MapError {
    /// The pipeline stage this error originated from.
    pub fn stage(&self) -> ErrorStage {
        match self {
            MapError::Io { .. } | MapError::UnsupportedFormat(_) => ErrorStage::Io,
            MapError::Json { .. }
            | MapError::Malformed { .. }
            | MapError::MissingField { .. }
            | MapError::InvalidColor(_)
            | MapError::InvalidPropertyValue { .. } => ErrorStage::Parse,
            MapError::UnsupportedEncoding(_)
            | MapError::UnsupportedCompression(_)
            | MapError::Base64(_)
            | MapError::Decompress { .. }
            | MapError::TileDataLength(_) => ErrorStage::Decode,
            MapError::UnknownLayerType(_) => ErrorStage::Dispatch,
            MapError::UnsupportedTemplate(_) | MapError::MissingBaseDirectory { .. } => {
                ErrorStage::Template
            }
            MapError::OverlappingTilesets { .. }
            | MapError::InvalidTileGid { .. }
            | MapError::InvalidObjectGid { .. } => ErrorStage::Validation,
        }
    }

    pub(crate) fn malformed(record: impl Into<String>, source: serde_json::Error) -> Self {
        MapError::Malformed {
            record: record.into(),
            source,
        }
    }
}
