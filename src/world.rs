//! Tiled `.world` files: several maps laid out in one coordinate space.

use std::path::{Path, PathBuf};

use macroquad::prelude::{ivec2, uvec2, IVec2, UVec2};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::error::MapError;
use crate::loader::{json_loader, parent_dir, read_json, ResourceReader};
use crate::map::Map;

/// A loaded world.
#[derive(Debug, Clone, PartialEq)]
pub struct World {
    pub maps: Vec<WorldMap>,
    pub only_show_adjacent_maps: bool,
}

/// One map placed in a world.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldMap {
    /// Path as written in the world file, relative to it.
    pub file_name: PathBuf,
    /// Pixel position of the map's top-left corner.
    pub coordinates: IVec2,
    pub size: Option<UVec2>,
    pub map: Map,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonWorld {
    #[serde(default)]
    maps: Vec<JsonWorldMap>,
    #[serde(default)]
    patterns: Vec<JsonValue>,
    #[serde(default)]
    only_show_adjacent_maps: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonWorldMap {
    file_name: String,
    #[serde(default)]
    x: i32,
    #[serde(default)]
    y: i32,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
}

pub(crate) fn load_world(reader: &dyn ResourceReader, path: &Path) -> Result<World, MapError> {
    let raw: JsonWorld = read_json(reader, path)?;
    debug!(path = %path.display(), maps = raw.maps.len(), "loaded world");

    if !raw.patterns.is_empty() {
        warn!(
            path = %path.display(),
            patterns = raw.patterns.len(),
            "world patterns are not expanded"
        );
    }

    let dir = parent_dir(path);
    let mut maps = Vec::with_capacity(raw.maps.len());
    for entry in raw.maps {
        let map = json_loader::load_map(reader, &dir.join(&entry.file_name))?;
        maps.push(WorldMap {
            file_name: entry.file_name.into(),
            coordinates: ivec2(entry.x, entry.y),
            size: entry.width.zip(entry.height).map(|(w, h)| uvec2(w, h)),
            map,
        });
    }

    Ok(World {
        maps,
        only_show_adjacent_maps: raw.only_show_adjacent_maps,
    })
}
