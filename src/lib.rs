#![warn(missing_docs)]

//! Tiled JSON map loader for Macroquad.
//!
//! Casts maps, tilesets, object templates and worlds into typed values.
//! Tile layers arrive decoded (base64, zlib and gzip), objects arrive with
//! their templates applied, and tilesets are keyed by first gid.
//!
//! ```no_run
//! let map = tiled_json::Map::load("assets/level1.tmj")?;
//! if let Some((tileset, local)) = map.tileset_for_gid(40) {
//!     println!("{} #{local}", tileset.name);
//! }
//! # Ok::<(), tiled_json::MapError>(())
//! ```

mod color;
mod error;
mod gid;
mod layer;
pub mod loader;
mod map;
mod object;
mod properties;
mod tileset;
mod world;

pub use color::Color;
pub use error::{ErrorStage, MapError};
pub use gid::{TileId, FLIP_D, FLIP_H, FLIP_V, GID_MASK, ROTATE_120};
pub use layer::{Chunk, DrawOrder, Layer, LayerAttributes, LayerKind, TileData};
pub use loader::object::{select_shape, serialize_object, ShapeKind};
pub use loader::tile_data::{decode_tile_data, Compression};
pub use loader::tileset::{cast_wang_set, serialize_wang_set, RawWangColor, RawWangSet};
pub use loader::{FilesystemReader, Loader, ObjectTemplate, ResourceReader};
pub use map::{Map, Orientation, RenderOrder, StaggerAxis, StaggerIndex};
pub use object::{HorizontalAlign, ObjectShape, Text, TileObject, TiledObject, VerticalAlign};
pub use properties::{
    decode as decode_properties, encode as encode_properties, Properties, PropertyType,
    PropertyValue, RawProperties, RawProperty,
};
pub use tileset::{Frame, Tile, Tileset, WangColor, WangSet, WangTile, WangType};
pub use world::{World, WorldMap};
