//! Object templates: loading and merging into referencing objects.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map as JsonObject, Value as JsonValue};
use tracing::debug;

use super::{extension, parent_dir, tileset::load_tileset, ResourceReader};
use crate::error::MapError;
use crate::tileset::Tileset;

/// A loaded object template.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectTemplate {
    /// The partial object record the template provides.
    pub object: JsonObject<String, JsonValue>,
    /// Tileset referenced by a tile template.
    pub tileset: Option<Tileset>,
    /// Directory containing that tileset's file.
    pub tileset_path: Option<PathBuf>,
}

#[derive(Deserialize)]
struct JsonTemplate {
    object: JsonObject<String, JsonValue>,
    #[serde(default)]
    tileset: Option<JsonTemplateTileset>,
}

#[derive(Deserialize)]
struct JsonTemplateTileset {
    firstgid: u32,
    source: String,
}

/// Reads a JSON template. XML (`.tx`) templates are rejected.
pub fn load_template(reader: &dyn ResourceReader, path: &Path) -> Result<ObjectTemplate, MapError> {
    if extension(path) == Some("tx") {
        return Err(MapError::UnsupportedTemplate(path.to_path_buf()));
    }

    let txt = reader.read_text(path)?;
    if txt.trim_start().starts_with('<') {
        return Err(MapError::UnsupportedTemplate(path.to_path_buf()));
    }
    let template: JsonTemplate = serde_json::from_str(&txt).map_err(|source| MapError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "loaded object template");

    let (tileset, tileset_path) = match template.tileset {
        Some(ts) => {
            let ts_path = parent_dir(path).join(&ts.source);
            let tileset = load_tileset(reader, &ts_path, ts.firstgid)?;
            (Some(tileset), Some(parent_dir(&ts_path)))
        }
        None => (None, None),
    };

    Ok(ObjectTemplate {
        object: template.object,
        tileset,
        tileset_path,
    })
}

fn property_name(prop: &JsonValue) -> Option<&str> {
    prop.get("name").and_then(JsonValue::as_str)
}

/// Copies template fields onto `raw`.
///
/// Every template field except `id` replaces the record's own. `properties`
/// are merged by name instead: names already on the record stay, template-only
/// names are appended after them.
pub(crate) fn merge_template(raw: &mut JsonObject<String, JsonValue>, template: &JsonObject<String, JsonValue>) {
    for (key, value) in template {
        match key.as_str() {
            "id" => {}
            "properties" => merge_properties(raw, value),
            _ => {
                raw.insert(key.clone(), value.clone());
            }
        }
    }
}

fn merge_properties(raw: &mut JsonObject<String, JsonValue>, template_props: &JsonValue) {
    let own = raw
        .entry("properties")
        .or_insert_with(|| JsonValue::Array(Vec::new()));

    match (own, template_props) {
        (JsonValue::Array(own), JsonValue::Array(extra)) => {
            for prop in extra {
                let exists = own
                    .iter()
                    .any(|p| property_name(p).is_some() && property_name(p) == property_name(prop));
                if !exists {
                    own.push(prop.clone());
                }
            }
        }
        (JsonValue::Object(own), JsonValue::Object(extra)) => {
            for (name, value) in extra {
                own.entry(name.clone()).or_insert_with(|| value.clone());
            }
        }
        // mixed legacy/list forms: the record's own properties win outright
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: JsonValue) -> JsonObject<String, JsonValue> {
        match v {
            JsonValue::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn keeps_id_and_existing_properties() {
        let mut raw = obj(json!({
            "id": 7,
            "template": "t.json",
            "x": 10.0,
            "properties": [{"name":"hp","type":"int","value":5}]
        }));
        let template = obj(json!({
            "id": 99,
            "name": "goblin",
            "width": 16.0,
            "properties": [
                {"name":"hp","type":"int","value":50},
                {"name":"loot","type":"string","value":"gold"}
            ]
        }));

        merge_template(&mut raw, &template);

        assert_eq!(raw["id"], json!(7));
        assert_eq!(raw["name"], json!("goblin"));
        assert_eq!(raw["width"], json!(16.0));
        assert_eq!(
            raw["properties"],
            json!([
                {"name":"hp","type":"int","value":5},
                {"name":"loot","type":"string","value":"gold"}
            ])
        );
    }

    #[test]
    fn adopts_template_properties_when_record_has_none() {
        let mut raw = obj(json!({"id": 1, "template": "t.json"}));
        let template = obj(json!({"properties": [{"name":"a","type":"bool","value":true}]}));
        merge_template(&mut raw, &template);
        assert_eq!(raw["properties"], json!([{"name":"a","type":"bool","value":true}]));
    }

    #[test]
    fn template_fields_replace_record_fields_except_id() {
        let mut raw = obj(json!({"id": 5, "template": "t.json", "x": 64.0, "name": "boss"}));
        merge_template(&mut raw, &obj(json!({"id": 99, "name": "goblin", "x": 1.0, "gid": 4})));
        assert_eq!(raw["id"], json!(5));
        assert_eq!(raw["name"], json!("goblin"));
        assert_eq!(raw["x"], json!(1.0));
        assert_eq!(raw["gid"], json!(4));
    }

    #[test]
    fn template_id_is_never_copied() {
        let mut raw = obj(json!({"template": "t.json"}));
        merge_template(&mut raw, &obj(json!({"id": 3, "name": "goblin"})));
        assert!(!raw.contains_key("id"));
    }
}
