//! The casting pipeline from Tiled JSON records to typed entities.

pub mod json_loader;
pub mod layer;
pub mod object;
pub mod template;
pub mod tile_data;
pub mod tileset;

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::error::MapError;
use crate::map::Map;
use crate::tileset::Tileset;
use crate::world::World;

pub use template::ObjectTemplate;

/// Source of the text of maps, tilesets, templates and worlds.
pub trait ResourceReader {
    fn read_text(&self, path: &Path) -> Result<String, MapError>;
}

/// Reads resources straight from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilesystemReader;

impl ResourceReader for FilesystemReader {
    fn read_text(&self, path: &Path) -> Result<String, MapError> {
        std::fs::read_to_string(path).map_err(|source| MapError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Entry point for loading Tiled JSON files.
///
/// ```no_run
/// use tiled_json::Loader;
///
/// let map = Loader::new().strict(true).load_map("assets/level1.tmj")?;
/// println!("{} layers", map.layers.len());
/// # Ok::<(), tiled_json::MapError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Loader<R = FilesystemReader> {
    reader: R,
    strict: bool,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<R: ResourceReader> Loader<R> {
    /// A loader that reads every file through `reader`.
    pub fn with_reader(reader: R) -> Self {
        Self {
            reader,
            strict: false,
        }
    }

    /// When enabled, every loaded map is checked with [`Map::validate`].
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Loads a `.json`/`.tmj` map and every external file it references.
    pub fn load_map(&self, path: impl AsRef<Path>) -> Result<Map, MapError> {
        let map = json_loader::load_map(&self.reader, path.as_ref())?;
        self.finish(map)
    }

    /// Casts a map held in memory. Without `parent_dir`, external tilesets and
    /// templates cannot be resolved and are reported as errors.
    pub fn parse_map(&self, text: &str, parent_dir: Option<&Path>) -> Result<Map, MapError> {
        let map = json_loader::parse_map(&self.reader, text, Path::new("<memory>"), parent_dir)?;
        self.finish(map)
    }

    /// Loads an external tileset file, assigning it `first_gid`.
    pub fn load_tileset(&self, path: impl AsRef<Path>, first_gid: u32) -> Result<Tileset, MapError> {
        tileset::load_tileset(&self.reader, path.as_ref(), first_gid)
    }

    /// Loads an object template and the tileset it references, if any.
    pub fn load_template(&self, path: impl AsRef<Path>) -> Result<ObjectTemplate, MapError> {
        template::load_template(&self.reader, path.as_ref())
    }

    /// Loads a `.world` file and every map it lists.
    pub fn load_world(&self, path: impl AsRef<Path>) -> Result<World, MapError> {
        let world = crate::world::load_world(&self.reader, path.as_ref())?;
        if self.strict {
            for entry in &world.maps {
                entry.map.validate()?;
            }
        }
        Ok(world)
    }

    fn finish(&self, map: Map) -> Result<Map, MapError> {
        if self.strict {
            map.validate()?;
        }
        Ok(map)
    }
}

/// Read-only context threaded through every cast.
#[derive(Clone, Copy)]
pub(crate) struct CastContext<'a> {
    pub reader: &'a dyn ResourceReader,
    /// Directory relative references are resolved against.
    pub parent_dir: Option<&'a Path>,
    /// The map's infinite flag; selects grid or chunk tile data.
    pub infinite: bool,
}

impl<'a> CastContext<'a> {
    /// Joins a relative reference onto the parent directory.
    pub fn resolve(&self, kind: &'static str, reference: &str) -> Result<PathBuf, MapError> {
        match self.parent_dir {
            Some(dir) => Ok(dir.join(reference)),
            None => Err(MapError::MissingBaseDirectory {
                kind,
                reference: reference.to_owned(),
            }),
        }
    }
}

pub(crate) fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|e| e.to_str())
}

pub(crate) fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .map(|d| d.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./"))
}

/// Reads `path` and parses it into `T`.
pub(crate) fn read_json<T: DeserializeOwned>(
    reader: &dyn ResourceReader,
    path: &Path,
) -> Result<T, MapError> {
    let txt = reader.read_text(path)?;
    serde_json::from_str(&txt).map_err(|source| MapError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Deserializes a nested record, describing it as `record` on failure.
pub(crate) fn from_record<T: DeserializeOwned>(
    record: impl FnOnce() -> String,
    value: serde_json::Value,
) -> Result<T, MapError> {
    serde_json::from_value(value).map_err(|source| MapError::malformed(record(), source))
}
