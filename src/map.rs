use std::collections::BTreeMap;
use std::path::Path;

use macroquad::prelude::{UVec2, Vec2};
use serde::Deserialize;

use crate::color::Color;
use crate::error::MapError;
use crate::gid::TileId;
use crate::layer::{Layer, LayerKind};
use crate::loader::Loader;
use crate::object::{ObjectShape, TiledObject};
use crate::properties::Properties;
use crate::tileset::Tileset;

/// Tile grid projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Orthogonal,
    Isometric,
    Staggered,
    Hexagonal,
}

/// Order in which tiles are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderOrder {
    #[default]
    RightDown,
    RightUp,
    LeftDown,
    LeftUp,
}

/// Staggered axis of staggered and hexagonal maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaggerAxis {
    X,
    Y,
}

/// Which indices along the staggered axis are shifted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaggerIndex {
    Odd,
    Even,
}

/// A fully cast Tiled map.
#[derive(Debug, Clone, PartialEq)]
pub struct Map {
    pub orientation: Orientation,
    pub render_order: RenderOrder,
    /// Size of the map in tiles.
    pub map_size: UVec2,
    /// Size of one tile in pixels.
    pub tile_size: UVec2,
    pub infinite: bool,
    /// JSON format version.
    pub version: String,
    pub tiled_version: String,
    pub next_layer_id: Option<u32>,
    pub next_object_id: u32,
    pub background_color: Option<Color>,
    pub hex_side_length: Option<u32>,
    pub stagger_axis: Option<StaggerAxis>,
    pub stagger_index: Option<StaggerIndex>,
    pub parallax_origin: Option<Vec2>,
    pub class: Option<String>,
    pub compression_level: i32,
    pub properties: Option<Properties>,
    /// Top-level layers in draw order.
    pub layers: Vec<Layer>,
    /// Tilesets keyed by first gid.
    pub tilesets: BTreeMap<u32, Tileset>,
}

impl Map {
    /// Loads a JSON map with the default filesystem loader.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MapError> {
        Loader::new().load_map(path)
    }

    /// The tileset holding `gid` together with the tile's local id.
    ///
    /// Local ids are 0-based: `gid - first_gid`.
    /// Flip flags are ignored. Returns `None` for the empty tile and for gids
    /// outside every tileset's range.
    #[inline]
    pub fn tileset_for_gid(&self, gid: u32) -> Option<(&Tileset, u32)> {
        let clean = TileId(gid).clean();
        if clean == 0 {
            return None;
        }
        let (_, ts) = self.tilesets.range(..=clean).next_back()?;
        if !ts.contains_gid(clean) {
            return None;
        }
        Some((ts, clean - ts.first_gid))
    }

    /// All layers, depth first, groups before their children.
    pub fn all_layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter().flat_map(Layer::walk)
    }

    pub fn layer_by_id(&self, id: u32) -> Option<&Layer> {
        self.all_layers().find(|l| l.id() == Some(id))
    }

    /// Checks what the loader otherwise leaves to the caller: tileset ranges
    /// must not overlap and every non-empty gid must resolve to a tileset.
    pub fn validate(&self) -> Result<(), MapError> {
        let mut prev: Option<&Tileset> = None;
        for ts in self.tilesets.values() {
            if let Some(p) = prev {
                if u64::from(ts.first_gid) < p.end_gid() {
                    return Err(MapError::OverlappingTilesets {
                        first: p.first_gid,
                        second: ts.first_gid,
                    });
                }
            }
            prev = Some(ts);
        }

        for layer in self.all_layers() {
            match &layer.kind {
                LayerKind::Tiles(data) => {
                    if let Some(gid) = data
                        .gids()
                        .find(|&g| !TileId(g).is_empty() && self.tileset_for_gid(g).is_none())
                    {
                        return Err(MapError::InvalidTileGid {
                            layer: layer.name().to_owned(),
                            gid: TileId(gid).clean(),
                        });
                    }
                }
                LayerKind::Objects { objects, .. } => {
                    for obj in objects {
                        let Some(gid) = obj.gid() else { continue };
                        if has_template_tileset(obj) {
                            continue;
                        }
                        if self.tileset_for_gid(gid).is_none() {
                            return Err(MapError::InvalidObjectGid {
                                layer: layer.name().to_owned(),
                                object_id: obj.id,
                                gid: TileId(gid).clean(),
                            });
                        }
                    }
                }
                LayerKind::Image { .. } | LayerKind::Group { .. } => {}
            }
        }
        Ok(())
    }
}

// Such gids index the template's own tileset, not the map's table.
fn has_template_tileset(obj: &TiledObject) -> bool {
    matches!(&obj.shape, ObjectShape::Tile(t) if t.new_tileset.is_some())
}
