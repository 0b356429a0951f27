use std::collections::BTreeMap;
use std::path::PathBuf;

use indexmap::IndexMap;
use macroquad::prelude::{IVec2, UVec2};
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::object::TiledObject;
use crate::properties::Properties;

/// A tileset, either embedded in a map or loaded from its own file.
#[derive(Debug, Clone, PartialEq)]
pub struct Tileset {
    pub name: String,
    pub class: Option<String>,
    /// Lowest global tile id assigned to this tileset.
    pub first_gid: u32,
    pub columns: u32,
    pub tile_size: UVec2,
    pub tile_count: u32,
    /// Atlas image relative to the file that declared the tileset.
    /// `None` for image-collection tilesets.
    pub image: Option<PathBuf>,
    pub image_size: Option<UVec2>,
    pub margin: u32,
    pub spacing: u32,
    pub tile_offset: Option<IVec2>,
    pub transparent_color: Option<Color>,
    pub background_color: Option<Color>,
    pub version: Option<String>,
    pub tiled_version: Option<String>,
    pub properties: Option<Properties>,
    /// Per-tile metadata keyed by local tile id.
    pub tiles: BTreeMap<u32, Tile>,
    pub wang_sets: Vec<WangSet>,
}

impl Tileset {
    /// Whether `gid` (flags already stripped) falls inside this tileset's range.
    pub fn contains_gid(&self, gid: u32) -> bool {
        gid >= self.first_gid && u64::from(gid) < u64::from(self.first_gid) + u64::from(self.tile_count)
    }

    /// One past the last gid of this tileset.
    pub fn end_gid(&self) -> u64 {
        u64::from(self.first_gid) + u64::from(self.tile_count)
    }
}

/// Metadata Tiled stores for individual tiles of a tileset.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub id: u32,
    pub class: Option<String>,
    pub image: Option<PathBuf>,
    pub image_size: Option<UVec2>,
    pub probability: Option<f64>,
    pub animation: Vec<Frame>,
    /// Collision shapes attached to the tile.
    pub objects: Vec<TiledObject>,
    pub properties: Option<Properties>,
}

/// One step of a tile animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(rename = "tileid")]
    pub tile_id: u32,
    /// Milliseconds.
    pub duration: u32,
}

/// Terrain/autotiling metadata of a tileset.
#[derive(Debug, Clone, PartialEq)]
pub struct WangSet {
    pub name: String,
    pub class: Option<String>,
    /// Local id of the tile representing the set, -1 for none.
    pub tile: i32,
    pub wang_type: WangType,
    pub wang_colors: Vec<WangColor>,
    /// Wang tiles keyed by local tile id, in file order.
    pub wang_tiles: IndexMap<u32, WangTile>,
    pub properties: Option<Properties>,
}

/// Which tile features a wang set constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WangType {
    Corner,
    Edge,
    Mixed,
}

/// A terrain "color" of a wang set.
#[derive(Debug, Clone, PartialEq)]
pub struct WangColor {
    pub name: String,
    pub class: Option<String>,
    /// Display color in the editor.
    pub color: Color,
    /// Local id of the representative tile, -1 for none.
    pub tile: i32,
    pub probability: f64,
    pub properties: Option<Properties>,
}

/// Color indices of a tile's edges and corners.
///
/// `wang_id` is ordered top, top-right, right, bottom-right, bottom,
/// bottom-left, left, top-left. Zero means unassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WangTile {
    #[serde(rename = "tileid")]
    pub tile_id: u32,
    #[serde(rename = "wangid")]
    pub wang_id: [u8; 8],
}
