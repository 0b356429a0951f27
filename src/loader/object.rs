//! Casting raw object records into [`TiledObject`]s and back.

use macroquad::prelude::{vec2, Vec2};
use serde::Deserialize;
use serde_json::{json, Map as JsonObject, Value as JsonValue};
use tracing::debug;

use super::template::{load_template, merge_template};
use super::{from_record, CastContext};
use crate::color::Color;
use crate::error::MapError;
use crate::object::{HorizontalAlign, ObjectShape, Text, TileObject, TiledObject, VerticalAlign};
use crate::properties::{self, RawProperties};

fn default_true() -> bool {
    true
}

/// Fields every object must carry once its template is applied.
const REQUIRED_FIELDS: [&str; 7] = ["id", "x", "y", "width", "height", "rotation", "name"];

#[derive(Deserialize)]
struct RawObject {
    id: u32,
    name: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    class: Option<String>,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    rotation: f32,
    #[serde(default = "default_true")]
    visible: bool,
    #[serde(default)]
    gid: Option<u32>,
    #[serde(default)]
    polygon: Option<Vec<RawPoint>>,
    #[serde(default)]
    polyline: Option<Vec<RawPoint>>,
    #[serde(default)]
    text: Option<RawText>,
    #[serde(default)]
    properties: Option<RawProperties>,
}

#[derive(Deserialize)]
struct RawPoint {
    x: f32,
    y: f32,
}

#[derive(Deserialize)]
struct RawText {
    text: Option<String>,
    color: Option<Color>,
    fontfamily: Option<String>,
    pixelsize: Option<f32>,
    bold: Option<bool>,
    italic: Option<bool>,
    kerning: Option<bool>,
    strikeout: Option<bool>,
    underline: Option<bool>,
    halign: Option<HorizontalAlign>,
    valign: Option<VerticalAlign>,
    wrap: Option<bool>,
}

/// Which [`ObjectShape`] a raw record casts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Rectangle,
    Ellipse,
    Point,
    Tile,
    Polygon,
    Polyline,
    Text,
}

type ShapePredicate = fn(&JsonObject<String, JsonValue>) -> bool;

fn truthy(value: Option<&JsonValue>) -> bool {
    match value {
        None | Some(JsonValue::Null) => false,
        Some(JsonValue::Bool(b)) => *b,
        Some(JsonValue::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(JsonValue::String(s)) => !s.is_empty(),
        Some(JsonValue::Array(a)) => !a.is_empty(),
        Some(JsonValue::Object(o)) => !o.is_empty(),
    }
}

fn is_ellipse(raw: &JsonObject<String, JsonValue>) -> bool {
    truthy(raw.get("ellipse"))
}

fn is_point(raw: &JsonObject<String, JsonValue>) -> bool {
    truthy(raw.get("point"))
}

fn is_tile(raw: &JsonObject<String, JsonValue>) -> bool {
    truthy(raw.get("gid"))
}

fn is_polygon(raw: &JsonObject<String, JsonValue>) -> bool {
    truthy(raw.get("polygon"))
}

fn is_polyline(raw: &JsonObject<String, JsonValue>) -> bool {
    truthy(raw.get("polyline"))
}

fn is_text(raw: &JsonObject<String, JsonValue>) -> bool {
    truthy(raw.get("text"))
}

/// Shape markers in precedence order; the first match wins.
const SHAPE_PRECEDENCE: [(ShapeKind, ShapePredicate); 6] = [
    (ShapeKind::Ellipse, is_ellipse),
    (ShapeKind::Point, is_point),
    (ShapeKind::Tile, is_tile),
    (ShapeKind::Polygon, is_polygon),
    (ShapeKind::Polyline, is_polyline),
    (ShapeKind::Text, is_text),
];

/// Picks the shape of a raw object. Rectangles have no marker of their own.
pub fn select_shape(raw: &JsonObject<String, JsonValue>) -> ShapeKind {
    SHAPE_PRECEDENCE
        .iter()
        .find(|(_, matches)| matches(raw))
        .map(|(kind, _)| *kind)
        .unwrap_or(ShapeKind::Rectangle)
}

fn points(raw: Option<Vec<RawPoint>>) -> Vec<Vec2> {
    raw.unwrap_or_default()
        .into_iter()
        .map(|p| vec2(p.x, p.y))
        .collect()
}

fn text_from_raw(raw: RawText, object_id: u32) -> Result<Text, MapError> {
    let content = raw.text.ok_or_else(|| MapError::MissingField {
        record: format!("text object {object_id}"),
        field: "text",
    })?;

    let mut text = Text::new(content);
    if let Some(color) = raw.color {
        text.color = color;
    }
    if let Some(family) = raw.fontfamily {
        text.font_family = family;
    }
    if let Some(size) = raw.pixelsize {
        text.font_size = size;
    }
    text.bold = raw.bold.unwrap_or(text.bold);
    text.italic = raw.italic.unwrap_or(text.italic);
    text.kerning = raw.kerning.unwrap_or(text.kerning);
    text.strike_out = raw.strikeout.unwrap_or(text.strike_out);
    text.underline = raw.underline.unwrap_or(text.underline);
    text.horizontal_align = raw.halign.unwrap_or(text.horizontal_align);
    text.vertical_align = raw.valign.unwrap_or(text.vertical_align);
    text.wrap = raw.wrap.unwrap_or(text.wrap);
    Ok(text)
}

/// Casts one raw object record, expanding its template first if it has one.
pub(crate) fn cast_object(
    mut raw: JsonObject<String, JsonValue>,
    ctx: &CastContext<'_>,
) -> Result<TiledObject, MapError> {
    let mut new_tileset = None;
    let mut new_tileset_path = None;

    let reference = raw
        .get("template")
        .and_then(JsonValue::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned);
    if let Some(reference) = reference {
        let path = ctx.resolve("object template", &reference)?;
        let template = load_template(ctx.reader, &path)?;
        merge_template(&mut raw, &template.object);
        debug!(template = %path.display(), "merged object template");
        new_tileset = template.tileset.map(Box::new);
        new_tileset_path = template.tileset_path;
    }

    let record = match raw.get("id") {
        Some(id) => format!("object {id}"),
        None => "object".to_owned(),
    };
    if let Some(field) = REQUIRED_FIELDS.into_iter().find(|f| !raw.contains_key(*f)) {
        return Err(MapError::MissingField { record, field });
    }

    let kind = select_shape(&raw);
    let obj: RawObject = from_record(move || record, JsonValue::Object(raw))?;

    let shape = match kind {
        ShapeKind::Rectangle => ObjectShape::Rectangle,
        ShapeKind::Ellipse => ObjectShape::Ellipse,
        ShapeKind::Point => ObjectShape::Point,
        ShapeKind::Tile => ObjectShape::Tile(TileObject {
            gid: obj.gid.unwrap_or_default(),
            new_tileset,
            new_tileset_path,
        }),
        ShapeKind::Polygon => ObjectShape::Polygon(points(obj.polygon)),
        ShapeKind::Polyline => ObjectShape::Polyline(points(obj.polyline)),
        ShapeKind::Text => match obj.text {
            Some(text) => ObjectShape::Text(text_from_raw(text, obj.id)?),
            None => {
                return Err(MapError::MissingField {
                    record: format!("text object {}", obj.id),
                    field: "text",
                })
            }
        },
    };

    // `class` replaced `type` in Tiled 1.9; prefer it when both are present
    let class = obj.class.or(obj.kind).unwrap_or_default();

    Ok(TiledObject {
        id: obj.id,
        name: obj.name,
        class,
        coordinates: vec2(obj.x, obj.y),
        size: vec2(obj.width, obj.height),
        rotation: obj.rotation,
        visible: obj.visible,
        properties: properties::decode_opt(obj.properties)?,
        shape,
    })
}

fn point_list(points: &[Vec2]) -> JsonValue {
    points.iter().map(|p| json!({"x": p.x, "y": p.y})).collect()
}

fn serialize_text(text: &Text) -> JsonValue {
    let mut out = JsonObject::new();
    out.insert("text".into(), json!(text.text));
    if text.color != Color::BLACK {
        out.insert("color".into(), json!(text.color.to_string()));
    }
    if text.font_family != "sans-serif" {
        out.insert("fontfamily".into(), json!(text.font_family));
    }
    if text.font_size != 16.0 {
        out.insert("pixelsize".into(), json!(text.font_size));
    }
    if text.bold {
        out.insert("bold".into(), json!(true));
    }
    if text.italic {
        out.insert("italic".into(), json!(true));
    }
    if !text.kerning {
        out.insert("kerning".into(), json!(false));
    }
    if text.strike_out {
        out.insert("strikeout".into(), json!(true));
    }
    if text.underline {
        out.insert("underline".into(), json!(true));
    }
    if text.horizontal_align != HorizontalAlign::Left {
        out.insert("halign".into(), json!(text.horizontal_align));
    }
    if text.vertical_align != VerticalAlign::Top {
        out.insert("valign".into(), json!(text.vertical_align));
    }
    if text.wrap {
        out.insert("wrap".into(), json!(true));
    }
    JsonValue::Object(out)
}

/// Writes an object back in the shape Tiled stores it.
///
/// Text styling equal to Tiled's defaults is omitted. A template's tileset
/// carried by a tile object is not written.
///
/// Shapes whose marker is falsy, an empty `Polygon`/`Polyline` or a `Tile`
/// with gid 0, are written as given but cast back as `Rectangle`.
pub fn serialize_object(obj: &TiledObject) -> JsonValue {
    let mut out = JsonObject::new();
    out.insert("id".into(), json!(obj.id));
    out.insert("x".into(), json!(obj.coordinates.x));
    out.insert("y".into(), json!(obj.coordinates.y));
    out.insert("visible".into(), json!(obj.visible));
    out.insert("width".into(), json!(obj.size.x));
    out.insert("height".into(), json!(obj.size.y));
    out.insert("rotation".into(), json!(obj.rotation));
    out.insert("name".into(), json!(obj.name));
    out.insert("class".into(), json!(obj.class));

    if let Some(props) = &obj.properties {
        out.insert("properties".into(), json!(properties::encode(props)));
    }

    match &obj.shape {
        ObjectShape::Rectangle => {}
        ObjectShape::Ellipse => {
            out.insert("ellipse".into(), json!(true));
        }
        ObjectShape::Point => {
            out.insert("point".into(), json!(true));
        }
        ObjectShape::Polygon(pts) => {
            out.insert("polygon".into(), point_list(pts));
        }
        ObjectShape::Polyline(pts) => {
            out.insert("polyline".into(), point_list(pts));
        }
        ObjectShape::Tile(tile) => {
            out.insert("gid".into(), json!(tile.gid));
        }
        ObjectShape::Text(text) => {
            out.insert("text".into(), serialize_text(text));
        }
    }

    JsonValue::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::FilesystemReader;

    fn obj(v: JsonValue) -> JsonObject<String, JsonValue> {
        match v {
            JsonValue::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    fn cast_raw(v: JsonValue) -> Result<TiledObject, MapError> {
        let ctx = CastContext {
            reader: &FilesystemReader,
            parent_dir: None,
            infinite: false,
        };
        cast_object(obj(v), &ctx)
    }

    /// Casts `v` on top of the fields Tiled writes for every object.
    fn cast(v: JsonValue) -> Result<TiledObject, MapError> {
        let mut record = obj(json!({
            "id": 0, "name": "", "x": 0.0, "y": 0.0, "width": 0.0, "height": 0.0, "rotation": 0.0
        }));
        record.extend(obj(v));
        cast_raw(JsonValue::Object(record))
    }

    #[test]
    fn precedence_is_fixed() {
        assert_eq!(select_shape(&obj(json!({"ellipse": true, "polygon": [{"x":0,"y":0}]}))), ShapeKind::Ellipse);
        assert_eq!(select_shape(&obj(json!({"point": true, "gid": 3}))), ShapeKind::Point);
        assert_eq!(select_shape(&obj(json!({"gid": 3, "polyline": [{"x":0,"y":0}]}))), ShapeKind::Tile);
        assert_eq!(
            select_shape(&obj(json!({"polygon": [{"x":0,"y":0}], "polyline": [{"x":0,"y":0}]}))),
            ShapeKind::Polygon
        );
        assert_eq!(select_shape(&obj(json!({"polyline": [{"x":0,"y":0}], "text": {"text":"a"}}))), ShapeKind::Polyline);
        assert_eq!(select_shape(&obj(json!({"text": {"text":"a"}}))), ShapeKind::Text);
        // falsy markers fall through to the default
        assert_eq!(
            select_shape(&obj(json!({"ellipse": false, "gid": 0, "polygon": [], "text": {}}))),
            ShapeKind::Rectangle
        );
    }

    #[test]
    fn ellipse_with_polygon_casts_as_ellipse() {
        let o = cast(json!({"id": 1, "ellipse": true, "polygon": [{"x": 1.0, "y": 2.0}]})).unwrap();
        assert_eq!(o.shape, ObjectShape::Ellipse);
    }

    #[test]
    fn class_overrides_type() {
        let o = cast(json!({"id": 1, "type": "old", "class": "new"})).unwrap();
        assert_eq!(o.class, "new");
        let o = cast(json!({"id": 1, "type": "old"})).unwrap();
        assert_eq!(o.class, "old");
    }

    #[test]
    fn text_defaults_and_overrides() {
        let o = cast(json!({
            "id": 4,
            "text": {"text": "Hello", "color": "#ff0000", "halign": "center", "wrap": true}
        }))
        .unwrap();
        let ObjectShape::Text(text) = o.shape else { panic!("expected text") };
        assert_eq!(text.text, "Hello");
        assert_eq!(text.color, Color::rgba(255, 0, 0, 255));
        assert_eq!(text.font_family, "sans-serif");
        assert_eq!(text.font_size, 16.0);
        assert_eq!(text.horizontal_align, HorizontalAlign::Center);
        assert_eq!(text.vertical_align, VerticalAlign::Top);
        assert!(text.wrap);
        assert!(text.kerning);
    }

    #[test]
    fn text_without_content_is_missing_field() {
        let err = cast(json!({"id": 4, "text": {"bold": true}})).unwrap_err();
        assert!(matches!(err, MapError::MissingField { field: "text", .. }));
    }

    #[test]
    fn missing_common_fields_are_reported() {
        let err = cast_raw(json!({"point": true})).unwrap_err();
        assert!(matches!(err, MapError::MissingField { field: "id", .. }));

        let err = cast_raw(json!({"id": 3, "name": "p", "point": true, "x": 1.0})).unwrap_err();
        match err {
            MapError::MissingField { record, field } => {
                assert_eq!(record, "object 3");
                assert_eq!(field, "y");
            }
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn template_without_base_directory_fails() {
        let err = cast(json!({"id": 2, "template": "enemy.tj"})).unwrap_err();
        assert!(matches!(err, MapError::MissingBaseDirectory { .. }));
    }

    #[test]
    fn empty_shapes_cast_back_as_rectangles() {
        for shape in [
            ObjectShape::Polygon(Vec::new()),
            ObjectShape::Polyline(Vec::new()),
            ObjectShape::Tile(TileObject {
                gid: 0,
                new_tileset: None,
                new_tileset_path: None,
            }),
        ] {
            let o = TiledObject {
                id: 1,
                name: String::new(),
                class: String::new(),
                coordinates: vec2(0.0, 0.0),
                size: vec2(0.0, 0.0),
                rotation: 0.0,
                visible: true,
                properties: None,
                shape,
            };
            let back = cast(serialize_object(&o)).unwrap();
            assert_eq!(back.shape, ObjectShape::Rectangle);
        }
    }

    #[test]
    fn serialized_objects_cast_back_unchanged() {
        let mut text = Text::new("sign");
        text.bold = true;
        text.font_size = 24.0;
        text.vertical_align = VerticalAlign::Bottom;

        let shapes = vec![
            ObjectShape::Rectangle,
            ObjectShape::Ellipse,
            ObjectShape::Point,
            ObjectShape::Polygon(vec![vec2(0.0, 0.0), vec2(8.0, 0.5), vec2(-4.25, 16.0)]),
            ObjectShape::Polyline(vec![vec2(1.0, 1.0), vec2(2.0, 3.0)]),
            ObjectShape::Tile(TileObject {
                gid: 0x8000_0005,
                new_tileset: None,
                new_tileset_path: None,
            }),
            ObjectShape::Text(text),
        ];

        for (i, shape) in shapes.into_iter().enumerate() {
            let mut props = crate::Properties::new();
            props.insert("speed", crate::PropertyValue::Float(1.5));
            let original = TiledObject {
                id: i as u32 + 1,
                name: format!("obj{i}"),
                class: "thing".into(),
                coordinates: vec2(32.0, 64.5),
                size: vec2(16.0, 8.0),
                rotation: 90.0,
                visible: i % 2 == 0,
                properties: Some(props),
                shape,
            };
            let back = cast(serialize_object(&original)).unwrap();
            assert_eq!(back, original);
        }
    }
}
