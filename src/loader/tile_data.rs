//! Decoding of base64 (optionally compressed) tile layer data.

use std::fmt;
use std::io::Read;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use flate2::read::{GzDecoder, ZlibDecoder};

use crate::error::MapError;

/// Compression applied to tile data before base64 encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Zlib,
    Gzip,
}

impl Compression {
    /// Parses the layer's `compression` field. Absent or empty means none.
    pub fn from_tag(tag: Option<&str>) -> Result<Option<Self>, MapError> {
        match tag {
            None | Some("") => Ok(None),
            Some("zlib") => Ok(Some(Compression::Zlib)),
            Some("gzip") => Ok(Some(Compression::Gzip)),
            Some(other) => Err(MapError::UnsupportedCompression(other.to_owned())),
        }
    }

    fn decompress(self, data: &[u8]) -> Result<Vec<u8>, MapError> {
        let mut out = Vec::new();
        let res = match self {
            Compression::Zlib => ZlibDecoder::new(data).read_to_end(&mut out),
            Compression::Gzip => GzDecoder::new(data).read_to_end(&mut out),
        };
        res.map_err(|source| MapError::Decompress {
            compression: self,
            source,
        })?;
        Ok(out)
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Compression::Zlib => "zlib",
            Compression::Gzip => "gzip",
        })
    }
}

/// Decodes a base64 tile data string into global tile ids.
///
/// The compression tag is checked before anything is decoded. The decoded
/// buffer must hold whole little-endian `u32`s. The final value is always
/// dropped.
pub fn decode_tile_data(data: &str, compression: Option<&str>) -> Result<Vec<u32>, MapError> {
    let compression = Compression::from_tag(compression)?;

    let raw = STANDARD.decode(data.trim())?;
    let bytes = match compression {
        Some(c) => c.decompress(&raw)?,
        None => raw,
    };

    if bytes.len() % 4 != 0 {
        return Err(MapError::TileDataLength(bytes.len()));
    }

    let mut gids: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    // the last packed value is always dropped
    gids.pop();
    Ok(gids)
}
