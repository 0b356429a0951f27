use std::path::PathBuf;

use macroquad::prelude::{vec2, IVec2, UVec2, Vec2};
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::object::TiledObject;
use crate::properties::Properties;

/// Attributes every layer kind shares.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerAttributes {
    pub name: String,
    /// Unique id assigned by the editor; never reused within a map.
    pub id: Option<u32>,
    pub opacity: f32,
    pub visible: bool,
    /// Rendering offset in pixels.
    pub offset: Option<Vec2>,
    /// Start of the layer in tiles (infinite maps).
    pub coordinates: Option<IVec2>,
    /// Size in tiles (tile layers only).
    pub size: Option<UVec2>,
    pub parallax_factor: Vec2,
    pub tint_color: Option<Color>,
    pub class: Option<String>,
    pub properties: Option<Properties>,
}

impl LayerAttributes {
    /// Visible, fully opaque attributes with the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            opacity: 1.0,
            visible: true,
            offset: None,
            coordinates: None,
            size: None,
            parallax_factor: vec2(1.0, 1.0),
            tint_color: None,
            class: None,
            properties: None,
        }
    }
}

/// One layer of a map. Groups own their children.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub attributes: LayerAttributes,
    pub kind: LayerKind,
}

/// The concrete kind of a [`Layer`].
#[derive(Debug, Clone, PartialEq)]
pub enum LayerKind {
    Tiles(TileData),
    Objects {
        objects: Vec<TiledObject>,
        draw_order: DrawOrder,
        /// Color used by the editor to display the objects.
        color: Option<Color>,
    },
    Image {
        /// Image path relative to the map file.
        image: PathBuf,
        transparent_color: Option<Color>,
        repeat_x: bool,
        repeat_y: bool,
    },
    Group {
        layers: Vec<Layer>,
    },
}

/// The cells of a tile layer.
#[derive(Debug, Clone, PartialEq)]
pub enum TileData {
    /// Rows of global tile ids (finite maps).
    Grid(Vec<Vec<u32>>),
    /// Chunks in source order (infinite maps).
    Chunks(Vec<Chunk>),
}

/// A rectangular piece of an infinite tile layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Position in tiles.
    pub coordinates: IVec2,
    /// Size in tiles.
    pub size: UVec2,
    /// Rows of global tile ids.
    pub data: Vec<Vec<u32>>,
}

/// Object stacking order of an object layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawOrder {
    /// Sorted by y coordinate.
    #[default]
    TopDown,
    /// File order.
    Index,
}

impl Layer {
    pub fn new(attributes: LayerAttributes, kind: LayerKind) -> Self {
        Self { attributes, kind }
    }

    pub fn name(&self) -> &str {
        &self.attributes.name
    }

    pub fn id(&self) -> Option<u32> {
        self.attributes.id
    }

    /// Child layers of a group, empty for every other kind.
    pub fn children(&self) -> &[Layer] {
        match &self.kind {
            LayerKind::Group { layers } => layers,
            _ => &[],
        }
    }

    /// Objects of an object layer, empty for every other kind.
    pub fn objects(&self) -> &[TiledObject] {
        match &self.kind {
            LayerKind::Objects { objects, .. } => objects,
            _ => &[],
        }
    }

    pub fn tile_data(&self) -> Option<&TileData> {
        match &self.kind {
            LayerKind::Tiles(data) => Some(data),
            _ => None,
        }
    }

    /// This layer followed by all of its descendants, depth first.
    pub fn walk(&self) -> Vec<&Layer> {
        let mut out = vec![self];
        for child in self.children() {
            out.extend(child.walk());
        }
        out
    }
}

impl TileData {
    /// Every gid in the layer, row by row (chunk by chunk for infinite layers).
    pub fn gids(&self) -> Box<dyn Iterator<Item = u32> + '_> {
        match self {
            TileData::Grid(rows) => Box::new(rows.iter().flatten().copied()),
            TileData::Chunks(chunks) => {
                Box::new(chunks.iter().flat_map(|c| c.data.iter().flatten().copied()))
            }
        }
    }
}
