use std::path::PathBuf;

use macroquad::prelude::Vec2;
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::properties::Properties;
use crate::tileset::Tileset;

/// An object placed on an object layer (or in a tile's collision group).
#[derive(Debug, Clone, PartialEq)]
pub struct TiledObject {
    pub id: u32,
    pub name: String,
    /// The object's class, formerly called its type.
    pub class: String,
    /// Position in pixels.
    pub coordinates: Vec2,
    pub size: Vec2,
    /// Clockwise rotation in degrees.
    pub rotation: f32,
    pub visible: bool,
    pub properties: Option<Properties>,
    pub shape: ObjectShape,
}

/// The concrete kind of a [`TiledObject`].
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectShape {
    Rectangle,
    Ellipse,
    Point,
    /// Closed shape; points are relative to the object position.
    Polygon(Vec<Vec2>),
    /// Open shape; points are relative to the object position.
    Polyline(Vec<Vec2>),
    Tile(TileObject),
    Text(Text),
}

/// Payload of a tile object.
#[derive(Debug, Clone, PartialEq)]
pub struct TileObject {
    /// Global tile id, flip flags included.
    pub gid: u32,
    /// Tileset shipped with the template the object was expanded from.
    ///
    /// When set, `gid` refers to this tileset rather than to the map's table.
    pub new_tileset: Option<Box<Tileset>>,
    /// Directory of `new_tileset`'s file, for resolving its image.
    pub new_tileset_path: Option<PathBuf>,
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HorizontalAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

/// Vertical text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAlign {
    #[default]
    Top,
    Center,
    Bottom,
}

/// Payload of a text object.
#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub text: String,
    pub color: Color,
    pub font_family: String,
    /// Font size in pixels.
    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
    pub kerning: bool,
    pub strike_out: bool,
    pub underline: bool,
    pub horizontal_align: HorizontalAlign,
    pub vertical_align: VerticalAlign,
    pub wrap: bool,
}

impl Text {
    /// Text with Tiled's defaults for every styling field.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: Color::BLACK,
            font_family: "sans-serif".to_owned(),
            font_size: 16.0,
            bold: false,
            italic: false,
            kerning: true,
            strike_out: false,
            underline: false,
            horizontal_align: HorizontalAlign::Left,
            vertical_align: VerticalAlign::Top,
            wrap: false,
        }
    }
}

impl TiledObject {
    /// The gid of a tile object.
    pub fn gid(&self) -> Option<u32> {
        match &self.shape {
            ObjectShape::Tile(tile) => Some(tile.gid),
            _ => None,
        }
    }
}
