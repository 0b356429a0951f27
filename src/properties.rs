//! Custom properties and their JSON representation.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::warn;

use crate::color::Color;
use crate::error::MapError;

/// The type tag Tiled writes next to every property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    String,
    Int,
    Float,
    Bool,
    File,
    Color,
}

impl PropertyType {
    /// The tag as it appears in the `type` field.
    pub fn as_str(self) -> &'static str {
        match self {
            PropertyType::String => "string",
            PropertyType::Int => "int",
            PropertyType::Float => "float",
            PropertyType::Bool => "bool",
            PropertyType::File => "file",
            PropertyType::Color => "color",
        }
    }
}

/// A single typed property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Relative path, kept exactly as written.
    File(PathBuf),
    Color(Color),
}

impl PropertyValue {
    /// The tag this value is written back with.
    pub fn property_type(&self) -> PropertyType {
        match self {
            PropertyValue::String(_) => PropertyType::String,
            PropertyValue::Int(_) => PropertyType::Int,
            PropertyValue::Float(_) => PropertyType::Float,
            PropertyValue::Bool(_) => PropertyType::Bool,
            PropertyValue::File(_) => PropertyType::File,
            PropertyValue::Color(_) => PropertyType::Color,
        }
    }

    fn to_json(&self) -> JsonValue {
        match self {
            PropertyValue::String(s) => JsonValue::from(s.as_str()),
            PropertyValue::Int(v) => JsonValue::from(*v),
            PropertyValue::Float(v) => JsonValue::from(*v),
            PropertyValue::Bool(v) => JsonValue::from(*v),
            PropertyValue::File(p) => JsonValue::from(p.to_string_lossy().into_owned()),
            PropertyValue::Color(c) => JsonValue::from(c.to_string()),
        }
    }
}

/// Insertion-ordered property table with unique names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties(IndexMap<String, PropertyValue>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value; an existing name keeps its position and takes the new value.
    pub fn insert(&mut self, name: impl Into<String>, value: PropertyValue) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get_string(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            PropertyValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_i32(&self, name: &str) -> Option<i32> {
        self.get_i64(name).and_then(|v| i32::try_from(v).ok())
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            PropertyValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            PropertyValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_file(&self, name: &str) -> Option<&std::path::Path> {
        match self.get(name)? {
            PropertyValue::File(p) => Some(p),
            _ => None,
        }
    }

    pub fn get_color(&self, name: &str) -> Option<Color> {
        match self.get(name)? {
            PropertyValue::Color(c) => Some(*c),
            _ => None,
        }
    }
}

impl FromIterator<(String, PropertyValue)> for Properties {
    fn from_iter<I: IntoIterator<Item = (String, PropertyValue)>>(iter: I) -> Self {
        let mut props = Properties::new();
        for (name, value) in iter {
            props.insert(name, value);
        }
        props
    }
}

/// One `{name, type, value}` record of a `properties` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawProperty {
    pub name: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub value: JsonValue,
}

/// The two shapes a `properties` field can take.
///
/// Old Tiled files stored properties as a plain `name → value` object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawProperties {
    List(Vec<RawProperty>),
    Legacy(serde_json::Map<String, JsonValue>),
}

fn native_value(name: &str, value: JsonValue) -> Result<PropertyValue, MapError> {
    let parsed = match value {
        JsonValue::Bool(v) => PropertyValue::Bool(v),
        JsonValue::Number(n) => match n.as_i64() {
            Some(v) => PropertyValue::Int(v),
            None => PropertyValue::Float(n.as_f64().unwrap_or_default()),
        },
        JsonValue::String(s) => PropertyValue::String(s),
        _ => {
            return Err(MapError::InvalidPropertyValue {
                name: name.to_owned(),
                kind: "native".to_owned(),
            })
        }
    };
    Ok(parsed)
}

fn as_integer(value: &JsonValue) -> Option<i64> {
    // Tiled occasionally writes whole numbers as floats (`14.0`).
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

fn typed_value(prop: RawProperty) -> Result<Option<(String, PropertyValue)>, MapError> {
    let RawProperty { name, kind, value } = prop;

    let Some(kind) = kind else {
        let value = native_value(&name, value)?;
        return Ok(Some((name, value)));
    };

    let parsed = match kind.as_str() {
        "string" => value.as_str().map(|s| PropertyValue::String(s.to_owned())),
        "int" | "object" => as_integer(&value).map(PropertyValue::Int),
        "float" => value.as_f64().map(PropertyValue::Float),
        "bool" => value.as_bool().map(PropertyValue::Bool),
        "file" => value.as_str().map(|s| PropertyValue::File(PathBuf::from(s))),
        "color" => match value.as_str() {
            Some(s) => Some(PropertyValue::Color(s.parse()?)),
            None => None,
        },
        // `class`, enums and future tags carry their value as-is
        _ => {
            if matches!(value, JsonValue::Object(_) | JsonValue::Array(_) | JsonValue::Null) {
                warn!(property = %name, kind = %kind, "skipping non-scalar property value");
                return Ok(None);
            }
            let value = native_value(&name, value)?;
            return Ok(Some((name, value)));
        }
    };

    match parsed {
        Some(value) => Ok(Some((name, value))),
        None => Err(MapError::InvalidPropertyValue { name, kind }),
    }
}

/// Turns a raw `properties` field into a typed table. Later duplicates win.
pub fn decode(raw: RawProperties) -> Result<Properties, MapError> {
    let mut out = Properties::new();
    match raw {
        RawProperties::List(list) => {
            for prop in list {
                if let Some((name, value)) = typed_value(prop)? {
                    out.insert(name, value);
                }
            }
        }
        RawProperties::Legacy(table) => {
            for (name, value) in table {
                let value = native_value(&name, value)?;
                out.insert(name, value);
            }
        }
    }
    Ok(out)
}

/// Writes a table back as a list of records, tagging each by its variant.
pub fn encode(properties: &Properties) -> Vec<RawProperty> {
    properties
        .iter()
        .map(|(name, value)| RawProperty {
            name: name.to_owned(),
            kind: Some(value.property_type().as_str().to_owned()),
            value: value.to_json(),
        })
        .collect()
}

pub(crate) fn decode_opt(raw: Option<RawProperties>) -> Result<Option<Properties>, MapError> {
    raw.map(decode).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn list(v: JsonValue) -> RawProperties {
        serde_json::from_value(v).expect("raw properties")
    }

    #[test]
    fn coerces_by_type_tag() {
        let props = decode(list(json!([
            {"name":"bool property - true","type":"bool","value":true},
            {"name":"color property","type":"color","value":"#ff49fcff"},
            {"name":"file property","type":"file","value":"../../../../../../var/log/syslog"},
            {"name":"float property","type":"float","value":1.23456789},
            {"name":"int property","type":"int","value":13},
            {"name":"broken int property","type":"int","value":14.0},
            {"name":"string property","type":"string","value":"Hello, World!!"}
        ])))
        .unwrap();

        assert_eq!(props.get_bool("bool property - true"), Some(true));
        assert_eq!(props.get_color("color property"), Some(Color::rgba(73, 252, 255, 255)));
        assert_eq!(
            props.get_file("file property"),
            Some(std::path::Path::new("../../../../../../var/log/syslog"))
        );
        assert_eq!(props.get_f64("float property"), Some(1.23456789));
        assert_eq!(props.get_i32("int property"), Some(13));
        assert_eq!(props.get_i64("broken int property"), Some(14));
        assert_eq!(props.get_string("string property"), Some("Hello, World!!"));
        let names: Vec<_> = props.iter().map(|(k, _)| k).collect();
        assert_eq!(names[0], "bool property - true");
        assert_eq!(names[6], "string property");
    }

    #[test]
    fn last_duplicate_wins() {
        let props = decode(list(json!([
            {"name":"a","type":"int","value":1},
            {"name":"b","type":"int","value":2},
            {"name":"a","type":"string","value":"again"}
        ])))
        .unwrap();
        assert_eq!(props.len(), 2);
        assert_eq!(props.get_string("a"), Some("again"));
    }

    #[test]
    fn legacy_table_keeps_native_types() {
        let props = decode(list(json!({"name":"x","count":3,"speed":1.5,"on":false,"tint":"#ff0000"}))).unwrap();
        assert_eq!(props.get_string("name"), Some("x"));
        assert_eq!(props.get_i64("count"), Some(3));
        assert_eq!(props.get_f64("speed"), Some(1.5));
        assert_eq!(props.get_bool("on"), Some(false));
        // no color coercion without a tag
        assert_eq!(props.get_string("tint"), Some("#ff0000"));
    }

    #[test]
    fn class_and_unknown_tags_pass_scalars_through() {
        let props = decode(list(json!([
            {"name":"stats","type":"class","propertytype":"Stats","value":{"hp":3}},
            {"name":"mood","type":"enum","propertytype":"Mood","value":"happy"},
            {"name":"level","type":"enum","value":2},
            {"name":"after","type":"int","value":1}
        ])))
        .unwrap();

        assert!(!props.contains("stats"));
        assert_eq!(props.get_string("mood"), Some("happy"));
        assert_eq!(props.get_i64("level"), Some(2));
        assert_eq!(props.get_i64("after"), Some(1));
        assert_eq!(props.len(), 3);
    }

    #[test]
    fn rejects_mismatched_values() {
        let err = decode(list(json!([{"name":"m","type":"int","value":"abc"}]))).unwrap_err();
        assert!(matches!(err, MapError::InvalidPropertyValue { .. }));

        let err = decode(list(json!([{"name":"c","type":"color","value":"#12"}]))).unwrap_err();
        assert!(matches!(err, MapError::InvalidColor(_)));
    }

    #[test]
    fn encode_tags_each_variant() {
        let mut props = Properties::new();
        props.insert("p", PropertyValue::File("a/b.png".into()));
        props.insert("c", PropertyValue::Color(Color::rgba(1, 2, 3, 4)));
        props.insert("f", PropertyValue::Float(2.0));
        let raw = encode(&props);
        let tags: Vec<_> = raw.iter().map(|r| r.kind.as_deref().unwrap()).collect();
        assert_eq!(tags, ["file", "color", "float"]);
        assert_eq!(raw[1].value, json!("#04010203"));
        assert_eq!(raw[2].value, json!(2.0));
    }

    fn value_strategy() -> impl Strategy<Value = PropertyValue> {
        prop_oneof![
            ".*".prop_map(PropertyValue::String),
            any::<i64>().prop_map(PropertyValue::Int),
            (-1.0e12f64..1.0e12).prop_map(PropertyValue::Float),
            any::<bool>().prop_map(PropertyValue::Bool),
            "[a-z/._]{0,12}".prop_map(|s| PropertyValue::File(s.into())),
            any::<[u8; 4]>().prop_map(|[r, g, b, a]| PropertyValue::Color(Color::rgba(r, g, b, a))),
        ]
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(entries in prop::collection::vec(("[a-z]{1,8}", value_strategy()), 0..12)) {
            let table: Properties = entries.into_iter().collect();
            let decoded = decode(RawProperties::List(encode(&table))).unwrap();
            prop_assert_eq!(decoded, table);
        }
    }
}
