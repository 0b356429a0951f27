// src/loader/json_loader.rs
use std::path::Path;

use macroquad::prelude::{uvec2, vec2};
use serde::Deserialize;
use serde_json::{Map as JsonObject, Value as JsonValue};
use tracing::{debug, instrument};

use super::layer::cast_layer_value;
use super::tileset::link_tilesets;
use super::{extension, from_record, parent_dir, CastContext, ResourceReader};
use crate::color::Color;
use crate::error::MapError;
use crate::map::{Map, Orientation, RenderOrder, StaggerAxis, StaggerIndex};
use crate::properties::{self, RawProperties};

fn minus_one() -> i32 {
    -1
}

const REQUIRED_FIELDS: [&str; 12] = [
    "width",
    "height",
    "tilewidth",
    "tileheight",
    "orientation",
    "renderorder",
    "infinite",
    "nextobjectid",
    "version",
    "tiledversion",
    "layers",
    "tilesets",
];

#[derive(Deserialize)]
struct JsonMap {
    width: u32,
    height: u32,
    tilewidth: u32,
    tileheight: u32,
    orientation: Orientation,
    layers: Vec<JsonValue>,
    tilesets: Vec<JsonObject<String, JsonValue>>,
    infinite: bool,
    renderorder: RenderOrder,
    #[serde(default)]
    nextlayerid: Option<u32>,
    nextobjectid: u32,
    version: JsonValue,
    tiledversion: String,
    #[serde(default)]
    backgroundcolor: Option<Color>,
    #[serde(default)]
    hexsidelength: Option<u32>,
    #[serde(default)]
    staggeraxis: Option<StaggerAxis>,
    #[serde(default)]
    staggerindex: Option<StaggerIndex>,
    #[serde(default)]
    parallaxoriginx: Option<f32>,
    #[serde(default)]
    parallaxoriginy: Option<f32>,
    #[serde(default)]
    class: Option<String>,
    #[serde(default = "minus_one")]
    compressionlevel: i32,
    #[serde(default)]
    properties: Option<RawProperties>,
}

fn version_string(v: JsonValue) -> String {
    match v {
        JsonValue::String(s) => s,
        JsonValue::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// Reads a `.json`/`.tmj` map; references resolve against its directory.
pub(crate) fn load_map(reader: &dyn ResourceReader, path: &Path) -> Result<Map, MapError> {
    if !matches!(extension(path), Some("json" | "tmj")) {
        return Err(MapError::UnsupportedFormat(path.to_path_buf()));
    }
    let txt = reader.read_text(path)?;
    let dir = parent_dir(path);
    parse_map(reader, &txt, path, Some(&dir))
}

/// Casts map text. `path` only labels parse errors.
#[instrument(skip_all, fields(path = %path.display()))]
pub(crate) fn parse_map(
    reader: &dyn ResourceReader,
    text: &str,
    path: &Path,
    parent_dir: Option<&Path>,
) -> Result<Map, MapError> {
    let raw: JsonObject<String, JsonValue> =
        serde_json::from_str(text).map_err(|source| MapError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    if let Some(field) = REQUIRED_FIELDS.into_iter().find(|f| !raw.contains_key(*f)) {
        return Err(MapError::MissingField {
            record: "map".to_owned(),
            field,
        });
    }
    let j: JsonMap = from_record(|| "map".to_owned(), JsonValue::Object(raw))?;

    let ctx = CastContext {
        reader,
        parent_dir,
        infinite: j.infinite,
    };

    let tilesets = link_tilesets(j.tilesets, &ctx)?;
    let layers = j
        .layers
        .into_iter()
        .map(|l| cast_layer_value(l, &ctx))
        .collect::<Result<Vec<_>, _>>()?;

    debug!(
        layers = layers.len(),
        tilesets = tilesets.len(),
        infinite = j.infinite,
        "map cast"
    );

    Ok(Map {
        orientation: j.orientation,
        render_order: j.renderorder,
        map_size: uvec2(j.width, j.height),
        tile_size: uvec2(j.tilewidth, j.tileheight),
        infinite: j.infinite,
        version: version_string(j.version),
        tiled_version: j.tiledversion,
        next_layer_id: j.nextlayerid,
        next_object_id: j.nextobjectid,
        background_color: j.backgroundcolor,
        hex_side_length: j.hexsidelength,
        stagger_axis: j.staggeraxis,
        stagger_index: j.staggerindex,
        parallax_origin: match (j.parallaxoriginx, j.parallaxoriginy) {
            (None, None) => None,
            (x, y) => Some(vec2(x.unwrap_or(0.0), y.unwrap_or(0.0))),
        },
        class: j.class,
        compression_level: j.compressionlevel,
        properties: properties::decode_opt(j.properties)?,
        layers,
        tilesets,
    })
}
