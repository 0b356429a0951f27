//! Casting raw layer records into [`Layer`]s.

use macroquad::prelude::{ivec2, uvec2, vec2};
use serde::Deserialize;
use serde_json::{Map as JsonObject, Value as JsonValue};
use tracing::trace;

use super::object::cast_object;
use super::tile_data::decode_tile_data;
use super::CastContext;
use crate::color::Color;
use crate::error::MapError;
use crate::layer::{Chunk, DrawOrder, Layer, LayerAttributes, LayerKind, TileData};
use crate::properties::{self, RawProperties};

fn default_true() -> bool {
    true
}
fn one() -> f32 {
    1.0
}

#[derive(Deserialize)]
pub(crate) struct JsonLayer {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    id: Option<u32>,
    #[serde(default = "one")]
    opacity: f32,
    #[serde(default = "default_true")]
    visible: bool,
    #[serde(default)]
    startx: Option<i32>,
    #[serde(default)]
    starty: Option<i32>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    offsetx: Option<f32>,
    #[serde(default)]
    offsety: Option<f32>,
    #[serde(default = "one")]
    parallaxx: f32,
    #[serde(default = "one")]
    parallaxy: f32,
    #[serde(default)]
    tintcolor: Option<Color>,
    #[serde(default)]
    class: Option<String>,
    #[serde(default)]
    properties: Option<RawProperties>,

    // tilelayer
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    compression: Option<String>,
    #[serde(default)]
    data: Option<JsonTileData>,
    #[serde(default)]
    chunks: Option<Vec<JsonChunk>>,

    // objectgroup
    #[serde(default)]
    objects: Vec<JsonObject<String, JsonValue>>,
    #[serde(default)]
    draworder: DrawOrder,
    #[serde(default)]
    color: Option<Color>,

    // imagelayer
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    transparentcolor: Option<Color>,
    #[serde(default)]
    repeatx: bool,
    #[serde(default)]
    repeaty: bool,

    // group
    #[serde(default)]
    layers: Option<Vec<JsonLayer>>,
}

/// Tile data is either a plain gid array or an encoded string.
#[derive(Deserialize)]
#[serde(untagged)]
enum JsonTileData {
    Gids(Vec<u32>),
    Encoded(String),
}

#[derive(Deserialize)]
struct JsonChunk {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    data: JsonTileData,
}

impl JsonLayer {
    fn record(&self) -> String {
        format!("{} `{}`", self.kind, self.name)
    }
}

fn missing(layer: &JsonLayer, field: &'static str) -> MapError {
    MapError::MissingField {
        record: layer.record(),
        field,
    }
}

/// Splits a flat gid list into rows of `width`.
fn rows(gids: Vec<u32>, width: u32) -> Vec<Vec<u32>> {
    if width == 0 {
        return if gids.is_empty() { Vec::new() } else { vec![gids] };
    }
    gids.chunks(width as usize).map(<[u32]>::to_vec).collect()
}

fn gids(
    data: JsonTileData,
    encoding: Option<&str>,
    compression: Option<&str>,
) -> Result<Vec<u32>, MapError> {
    match data {
        JsonTileData::Gids(gids) => Ok(gids),
        JsonTileData::Encoded(text) => match encoding {
            Some("base64") => decode_tile_data(&text, compression),
            other => Err(MapError::UnsupportedEncoding(
                other.unwrap_or("csv").to_owned(),
            )),
        },
    }
}

fn attributes(layer: &mut JsonLayer) -> Result<LayerAttributes, MapError> {
    let coordinates = layer
        .startx
        .map(|x| ivec2(x, layer.starty.unwrap_or_default()));
    let size = layer
        .width
        .map(|w| uvec2(w, layer.height.unwrap_or_default()));
    let offset = match (layer.offsetx, layer.offsety) {
        (None, None) => None,
        (x, y) => Some(vec2(x.unwrap_or_default(), y.unwrap_or_default())),
    };

    Ok(LayerAttributes {
        name: std::mem::take(&mut layer.name),
        id: layer.id,
        opacity: layer.opacity,
        visible: layer.visible,
        offset,
        coordinates,
        size,
        parallax_factor: vec2(layer.parallaxx, layer.parallaxy),
        tint_color: layer.tintcolor,
        class: layer.class.take(),
        properties: properties::decode_opt(layer.properties.take())?,
    })
}

fn tile_layer(mut layer: JsonLayer, ctx: &CastContext<'_>) -> Result<Layer, MapError> {
    let encoding = layer.encoding.take();
    let compression = layer.compression.take();

    let data = if ctx.infinite {
        let raw_chunks = layer.chunks.take().ok_or_else(|| missing(&layer, "chunks"))?;
        let mut chunks = Vec::with_capacity(raw_chunks.len());
        for c in raw_chunks {
            let gids = gids(c.data, encoding.as_deref(), compression.as_deref())?;
            chunks.push(Chunk {
                coordinates: ivec2(c.x, c.y),
                size: uvec2(c.width, c.height),
                data: rows(gids, c.width),
            });
        }
        TileData::Chunks(chunks)
    } else {
        let raw = layer.data.take().ok_or_else(|| missing(&layer, "data"))?;
        let width = layer.width.unwrap_or_default();
        TileData::Grid(rows(gids(raw, encoding.as_deref(), compression.as_deref())?, width))
    };

    Ok(Layer::new(attributes(&mut layer)?, LayerKind::Tiles(data)))
}

fn object_layer(mut layer: JsonLayer, ctx: &CastContext<'_>) -> Result<Layer, MapError> {
    let objects = std::mem::take(&mut layer.objects)
        .into_iter()
        .map(|raw| cast_object(raw, ctx))
        .collect::<Result<Vec<_>, _>>()?;

    let kind = LayerKind::Objects {
        objects,
        draw_order: layer.draworder,
        color: layer.color,
    };
    Ok(Layer::new(attributes(&mut layer)?, kind))
}

fn image_layer(mut layer: JsonLayer) -> Result<Layer, MapError> {
    let image = layer.image.take().ok_or_else(|| missing(&layer, "image"))?;
    let kind = LayerKind::Image {
        image: image.into(),
        transparent_color: layer.transparentcolor,
        repeat_x: layer.repeatx,
        repeat_y: layer.repeaty,
    };
    Ok(Layer::new(attributes(&mut layer)?, kind))
}

fn group_layer(mut layer: JsonLayer, ctx: &CastContext<'_>) -> Result<Layer, MapError> {
    let children = layer.layers.take().ok_or_else(|| missing(&layer, "layers"))?;
    let layers = children
        .into_iter()
        .map(|child| cast_layer(child, ctx))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Layer::new(attributes(&mut layer)?, LayerKind::Group { layers }))
}

/// Casts one raw layer, recursing into groups.
pub(crate) fn cast_layer(layer: JsonLayer, ctx: &CastContext<'_>) -> Result<Layer, MapError> {
    trace!(kind = %layer.kind, name = %layer.name, "casting layer");
    match layer.kind.as_str() {
        "tilelayer" => tile_layer(layer, ctx),
        "objectgroup" => object_layer(layer, ctx),
        "imagelayer" => image_layer(layer),
        "group" => group_layer(layer, ctx),
        other => Err(MapError::UnknownLayerType(other.to_owned())),
    }
}

/// Casts a layer from an untyped JSON value.
pub(crate) fn cast_layer_value(value: JsonValue, ctx: &CastContext<'_>) -> Result<Layer, MapError> {
    let layer: JsonLayer = super::from_record(|| "layer".to_owned(), value)?;
    cast_layer(layer, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::FilesystemReader;
    use crate::object::ObjectShape;
    use serde_json::json;

    fn ctx(infinite: bool) -> CastContext<'static> {
        CastContext {
            reader: &FilesystemReader,
            parent_dir: None,
            infinite,
        }
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = cast_layer_value(json!({"type": "hexlayer", "name": "x"}), &ctx(false)).unwrap_err();
        assert!(matches!(err, MapError::UnknownLayerType(ref t) if t == "hexlayer"));
    }

    #[test]
    fn grid_is_split_into_rows() {
        let layer = cast_layer_value(
            json!({
                "type": "tilelayer", "name": "ground", "id": 1,
                "width": 3, "height": 2, "x": 0, "y": 0,
                "data": [1, 2, 3, 4, 5, 6],
                "opacity": 0.5, "visible": false,
                "offsetx": 4.0, "offsety": -2.0
            }),
            &ctx(false),
        )
        .unwrap();

        assert_eq!(layer.attributes.opacity, 0.5);
        assert!(!layer.attributes.visible);
        assert_eq!(layer.attributes.offset, Some(vec2(4.0, -2.0)));
        assert_eq!(layer.attributes.size, Some(uvec2(3, 2)));
        assert_eq!(layer.attributes.parallax_factor, vec2(1.0, 1.0));
        assert_eq!(
            layer.tile_data(),
            Some(&TileData::Grid(vec![vec![1, 2, 3], vec![4, 5, 6]]))
        );
    }

    #[test]
    fn chunks_keep_source_order() {
        let layer = cast_layer_value(
            json!({
                "type": "tilelayer", "name": "inf",
                "startx": -16, "starty": 0,
                "chunks": [
                    {"x": 0, "y": 0, "width": 2, "height": 1, "data": [7, 8]},
                    {"x": -16, "y": 0, "width": 2, "height": 1, "data": [5, 6]}
                ]
            }),
            &ctx(true),
        )
        .unwrap();

        assert_eq!(layer.attributes.coordinates, Some(ivec2(-16, 0)));
        let Some(TileData::Chunks(chunks)) = layer.tile_data() else {
            panic!("expected chunks")
        };
        assert_eq!(chunks[0].coordinates, ivec2(0, 0));
        assert_eq!(chunks[1].coordinates, ivec2(-16, 0));
        assert_eq!(chunks[1].data, vec![vec![5, 6]]);
    }

    fn zlib_base64(values: &[u32]) -> String {
        use base64::Engine as _;
        use std::io::Write;

        let mut enc = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        for v in values {
            enc.write_all(&v.to_le_bytes()).unwrap();
        }
        base64::engine::general_purpose::STANDARD.encode(enc.finish().unwrap())
    }

    #[test]
    fn compressed_chunks_are_decoded() {
        let layer = cast_layer_value(
            json!({
                "type": "tilelayer", "name": "inf",
                "encoding": "base64", "compression": "zlib",
                "chunks": [
                    {"x": 16, "y": 0, "width": 2, "height": 2, "data": zlib_base64(&[5, 6, 7, 8, 0])},
                    {"x": 0, "y": 0, "width": 2, "height": 1, "data": zlib_base64(&[1, 0x8000_0002, 0])}
                ]
            }),
            &ctx(true),
        )
        .unwrap();

        let Some(TileData::Chunks(chunks)) = layer.tile_data() else {
            panic!("expected chunks")
        };
        assert_eq!(chunks[0].coordinates, ivec2(16, 0));
        assert_eq!(chunks[0].data, vec![vec![5, 6], vec![7, 8]]);
        assert_eq!(chunks[1].data, vec![vec![1, 0x8000_0002]]);

        let err = cast_layer_value(
            json!({
                "type": "tilelayer", "name": "inf", "encoding": "base64", "compression": "lzma",
                "chunks": [{"x": 0, "y": 0, "width": 1, "height": 1, "data": "AAAAAA=="}]
            }),
            &ctx(true),
        )
        .unwrap_err();
        assert!(matches!(err, MapError::UnsupportedCompression(ref c) if c == "lzma"));
    }

    #[test]
    fn infinite_layer_without_chunks_is_missing_field() {
        let err = cast_layer_value(json!({"type": "tilelayer", "name": "t", "data": [1]}), &ctx(true)).unwrap_err();
        assert!(matches!(err, MapError::MissingField { field: "chunks", .. }));
    }

    #[test]
    fn textual_data_needs_base64() {
        let err = cast_layer_value(
            json!({"type": "tilelayer", "name": "t", "width": 1, "data": "1,2", "encoding": "csv"}),
            &ctx(false),
        )
        .unwrap_err();
        assert!(matches!(err, MapError::UnsupportedEncoding(_)));

        let err = cast_layer_value(
            json!({"type": "tilelayer", "name": "t", "width": 1, "data": "AQAAAA==",
                   "encoding": "base64", "compression": "lz4"}),
            &ctx(false),
        )
        .unwrap_err();
        assert!(matches!(err, MapError::UnsupportedCompression(ref c) if c == "lz4"));
    }

    #[test]
    fn base64_layer_decodes() {
        // gids 1, 2, 3 packed little-endian; the last one is dropped
        let layer = cast_layer_value(
            json!({"type": "tilelayer", "name": "t", "width": 2, "height": 1,
                   "encoding": "base64", "data": "AQAAAAIAAAADAAAA"}),
            &ctx(false),
        )
        .unwrap();
        assert_eq!(layer.tile_data(), Some(&TileData::Grid(vec![vec![1, 2]])));
    }

    #[test]
    fn object_and_image_layers() {
        let layer = cast_layer_value(
            json!({
                "type": "objectgroup", "name": "spawns", "draworder": "index", "color": "#00ff00",
                "objects": [
                    {"id": 1, "name": "spawn", "point": true, "x": 5.0, "y": 6.0,
                     "width": 0, "height": 0, "rotation": 0},
                    {"id": 2, "name": "path", "x": 0, "y": 0, "width": 0, "height": 0, "rotation": 0,
                     "polyline": [{"x": 0, "y": 0}, {"x": 3, "y": 4}]}
                ]
            }),
            &ctx(false),
        )
        .unwrap();
        let LayerKind::Objects { objects, draw_order, color } = &layer.kind else {
            panic!("expected objects")
        };
        assert_eq!(*draw_order, DrawOrder::Index);
        assert_eq!(*color, Some(Color::rgba(0, 255, 0, 255)));
        assert_eq!(objects[0].shape, ObjectShape::Point);
        assert!(matches!(objects[1].shape, ObjectShape::Polyline(ref p) if p.len() == 2));

        let image = cast_layer_value(
            json!({"type": "imagelayer", "name": "sky", "image": "../img/sky.png",
                   "transparentcolor": "#ff00ff", "repeatx": true}),
            &ctx(false),
        )
        .unwrap();
        let LayerKind::Image { image, transparent_color, repeat_x, repeat_y } = image.kind else {
            panic!("expected image")
        };
        assert_eq!(image, std::path::PathBuf::from("../img/sky.png"));
        assert_eq!(transparent_color, Some(Color::rgba(255, 0, 255, 255)));
        assert!(repeat_x && !repeat_y);

        let err = cast_layer_value(json!({"type": "imagelayer", "name": "sky"}), &ctx(false)).unwrap_err();
        assert!(matches!(err, MapError::MissingField { field: "image", .. }));
    }

    #[test]
    fn nested_groups_keep_order_and_ids() {
        let layer = cast_layer_value(
            json!({
                "type": "group", "name": "Outer Group", "id": 4,
                "layers": [
                    {"type": "objectgroup", "name": "Inner 2", "id": 15, "objects": []},
                    {"type": "group", "name": "Inner Group", "id": 6, "layers": [
                        {"type": "group", "name": "Deep", "id": 9, "layers": [
                            {"type": "objectgroup", "name": "Deepest", "id": 10, "objects": []}
                        ]}
                    ]},
                    {"type": "objectgroup", "name": "Inner 1", "id": 14, "objects": []}
                ]
            }),
            &ctx(false),
        )
        .unwrap();

        let names: Vec<_> = layer.children().iter().map(Layer::name).collect();
        assert_eq!(names, ["Inner 2", "Inner Group", "Inner 1"]);
        let ids: Vec<_> = layer.walk().iter().map(|l| l.id().unwrap()).collect();
        assert_eq!(ids, [4, 15, 6, 9, 10, 14]);
        assert_eq!(layer.children()[1].children()[0].children()[0].name(), "Deepest");
    }
}
