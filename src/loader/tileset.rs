//! Tilesets (embedded and external), per-tile metadata and wang sets.

use std::collections::BTreeMap;
use std::path::Path;

use indexmap::IndexMap;
use macroquad::prelude::{ivec2, uvec2};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonObject, Value as JsonValue};
use tracing::debug;

use super::layer::cast_layer_value;
use super::{extension, from_record, parent_dir, read_json, CastContext, ResourceReader};
use crate::color::Color;
use crate::error::MapError;
use crate::layer::LayerKind;
use crate::properties::{self, RawProperties, RawProperty};
use crate::tileset::{Frame, Tile, Tileset, WangColor, WangSet, WangTile, WangType};

#[derive(Deserialize)]
struct JsonTileset {
    #[serde(default)]
    firstgid: Option<u32>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    class: Option<String>,
    #[serde(default)]
    columns: u32,
    tilewidth: u32,
    tileheight: u32,
    #[serde(default)]
    tilecount: u32,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    imagewidth: Option<u32>,
    #[serde(default)]
    imageheight: Option<u32>,
    #[serde(default)]
    margin: u32,
    #[serde(default)]
    spacing: u32,
    #[serde(default)]
    tileoffset: Option<JsonOffset>,
    #[serde(default)]
    transparentcolor: Option<Color>,
    #[serde(default)]
    backgroundcolor: Option<Color>,
    #[serde(default)]
    version: Option<JsonValue>,
    #[serde(default)]
    tiledversion: Option<String>,
    #[serde(default)]
    properties: Option<RawProperties>,
    #[serde(default)]
    tiles: Vec<JsonTile>,
    #[serde(default)]
    wangsets: Vec<RawWangSet>,
}

#[derive(Deserialize)]
struct JsonOffset {
    x: i32,
    y: i32,
}

#[derive(Deserialize)]
struct JsonTile {
    id: u32,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    class: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    imagewidth: Option<u32>,
    #[serde(default)]
    imageheight: Option<u32>,
    #[serde(default)]
    probability: Option<f64>,
    #[serde(default)]
    animation: Vec<Frame>,
    #[serde(default)]
    objectgroup: Option<JsonValue>,
    #[serde(default)]
    properties: Option<RawProperties>,
}

/// A wang set as stored in a tileset's `wangsets` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawWangSet {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    pub tile: i32,
    #[serde(rename = "type")]
    pub kind: WangType,
    pub colors: Vec<RawWangColor>,
    pub wangtiles: Vec<WangTile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<RawProperty>>,
}

/// A wang color record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawWangColor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    pub color: String,
    pub tile: i32,
    pub probability: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<RawProperty>>,
}

fn list_properties(raw: Option<Vec<RawProperty>>) -> Result<Option<crate::Properties>, MapError> {
    properties::decode_opt(raw.map(RawProperties::List))
}

fn wang_color(raw: RawWangColor) -> Result<WangColor, MapError> {
    Ok(WangColor {
        color: raw.color.parse()?,
        name: raw.name,
        class: raw.class,
        tile: raw.tile,
        probability: raw.probability,
        properties: list_properties(raw.properties)?,
    })
}

/// Casts a raw wang set: colors first, then the tile id → wang tile map.
pub fn cast_wang_set(raw: RawWangSet) -> Result<WangSet, MapError> {
    let wang_colors = raw
        .colors
        .into_iter()
        .map(wang_color)
        .collect::<Result<Vec<_>, _>>()?;

    let wang_tiles: IndexMap<u32, WangTile> = raw
        .wangtiles
        .into_iter()
        .map(|t| (t.tile_id, t))
        .collect();

    Ok(WangSet {
        name: raw.name,
        class: raw.class,
        tile: raw.tile,
        wang_type: raw.kind,
        wang_colors,
        wang_tiles,
        properties: list_properties(raw.properties)?,
    })
}

/// Writes a wang set back in its raw form.
pub fn serialize_wang_set(set: &WangSet) -> RawWangSet {
    RawWangSet {
        name: set.name.clone(),
        class: set.class.clone(),
        tile: set.tile,
        kind: set.wang_type,
        colors: set
            .wang_colors
            .iter()
            .map(|c| RawWangColor {
                name: c.name.clone(),
                class: c.class.clone(),
                color: c.color.to_string(),
                tile: c.tile,
                probability: c.probability,
                properties: c.properties.as_ref().map(properties::encode),
            })
            .collect(),
        wangtiles: set.wang_tiles.values().copied().collect(),
        properties: set.properties.as_ref().map(properties::encode),
    }
}

fn version_string(v: JsonValue) -> Option<String> {
    match v {
        JsonValue::String(s) => Some(s),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn tile(raw: JsonTile, ctx: &CastContext<'_>) -> Result<Tile, MapError> {
    let objects = match raw.objectgroup {
        Some(group) => match cast_layer_value(group, ctx)?.kind {
            LayerKind::Objects { objects, .. } => objects,
            _ => Vec::new(),
        },
        None => Vec::new(),
    };

    Ok(Tile {
        id: raw.id,
        class: raw.class.or(raw.kind),
        image: raw.image.map(Into::into),
        image_size: raw.imagewidth.zip(raw.imageheight).map(|(w, h)| uvec2(w, h)),
        probability: raw.probability,
        animation: raw.animation,
        objects,
        properties: properties::decode_opt(raw.properties)?,
    })
}

fn cast_tileset(raw: JsonTileset, first_gid: u32, ctx: &CastContext<'_>) -> Result<Tileset, MapError> {
    let mut tiles = BTreeMap::new();
    for t in raw.tiles {
        let t = tile(t, ctx)?;
        tiles.insert(t.id, t);
    }

    let wang_sets = raw
        .wangsets
        .into_iter()
        .map(cast_wang_set)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Tileset {
        name: raw.name,
        class: raw.class,
        first_gid,
        columns: raw.columns,
        tile_size: uvec2(raw.tilewidth, raw.tileheight),
        tile_count: raw.tilecount,
        image: raw.image.map(Into::into),
        image_size: raw.imagewidth.zip(raw.imageheight).map(|(w, h)| uvec2(w, h)),
        margin: raw.margin,
        spacing: raw.spacing,
        tile_offset: raw.tileoffset.map(|o| ivec2(o.x, o.y)),
        transparent_color: raw.transparentcolor,
        background_color: raw.backgroundcolor,
        version: raw.version.and_then(version_string),
        tiled_version: raw.tiledversion,
        properties: properties::decode_opt(raw.properties)?,
        tiles,
        wang_sets,
    })
}

/// Reads and casts an external tileset file.
pub fn load_tileset(reader: &dyn ResourceReader, path: &Path, first_gid: u32) -> Result<Tileset, MapError> {
    if !matches!(extension(path), Some("json" | "tsj")) {
        return Err(MapError::UnsupportedFormat(path.to_path_buf()));
    }
    let raw: JsonTileset = read_json(reader, path)?;
    debug!(path = %path.display(), first_gid, "loaded external tileset");

    let dir = parent_dir(path);
    let ctx = CastContext {
        reader,
        parent_dir: Some(&dir),
        infinite: false,
    };
    cast_tileset(raw, first_gid, &ctx)
}

/// Builds the map's tileset table from its `tilesets` list.
///
/// Entries with a `source` are external files resolved against the map's
/// directory; the rest are embedded. Ranges are not checked for overlap here.
pub(crate) fn link_tilesets(
    entries: Vec<JsonObject<String, JsonValue>>,
    ctx: &CastContext<'_>,
) -> Result<BTreeMap<u32, Tileset>, MapError> {
    let mut table = BTreeMap::new();
    for entry in entries {
        let first_gid = entry
            .get("firstgid")
            .and_then(JsonValue::as_u64)
            .and_then(|g| u32::try_from(g).ok())
            .ok_or_else(|| MapError::MissingField {
                record: "tileset reference".to_owned(),
                field: "firstgid",
            })?;

        let tileset = match entry.get("source").and_then(JsonValue::as_str) {
            Some(source) => {
                let path = ctx.resolve("tileset", source)?;
                load_tileset(ctx.reader, &path, first_gid)?
            }
            None => {
                let raw: JsonTileset =
                    from_record(|| format!("tileset at gid {first_gid}"), JsonValue::Object(entry))?;
                cast_tileset(raw, first_gid, ctx)?
            }
        };
        table.insert(first_gid, tileset);
    }
    Ok(table)
}
