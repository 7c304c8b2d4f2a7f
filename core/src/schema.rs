//! Structural response schemas and their validator.
//!
//! # Design
//! A `Schema` describes the shape a decoded response must have: primitive
//! type tags, objects with required/optional properties and an optional
//! closure flag, and homogeneous arrays. The serialized form is
//!
//! ```json
//! {"type": "object",
//!  "properties": {"id": {"type": "string"},
//!                 "title": {"type": "string", "required": false}},
//!  "closed": true}
//! ```
//!
//! Property order is part of the schema: validation walks properties in
//! declaration order, depth-first, and stops at the first mismatch. The
//! order survives a serialize/parse round trip, so a re-parsed schema reports
//! the same failure for the same value.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationFailure;

/// Expected shape of a JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Schema {
    /// A string. Empty strings are rejected unless `blank` is set.
    String {
        #[serde(default, skip_serializing_if = "is_false")]
        blank: bool,
    },
    /// A JSON number without a fractional part.
    Integer,
    Number,
    Boolean,
    Null,
    /// Matches every value.
    Any,
    Object(ObjectSchema),
    /// Every element must match `items`.
    Array { items: Box<Schema> },
}

/// Object shape: declared properties in order, plus the closure flag.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObjectSchema {
    #[serde(default, with = "ordered_properties")]
    pub properties: Vec<(String, Property)>,
    /// When set, keys not declared in `properties` are rejected.
    #[serde(default, skip_serializing_if = "is_false")]
    pub closed: bool,
}

/// A declared object property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    #[serde(flatten)]
    pub schema: Schema,
    #[serde(default = "required_by_default", skip_serializing_if = "is_true")]
    pub required: bool,
}

fn required_by_default() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Schema {
    pub fn string() -> Self {
        Schema::String { blank: false }
    }

    /// A string that may be empty.
    pub fn blank_string() -> Self {
        Schema::String { blank: true }
    }

    pub fn array(items: impl Into<Schema>) -> Self {
        Schema::Array {
            items: Box::new(items.into()),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Schema::String { .. } => "string",
            Schema::Integer => "integer",
            Schema::Number => "number",
            Schema::Boolean => "boolean",
            Schema::Null => "null",
            Schema::Any => "any",
            Schema::Object(_) => "object",
            Schema::Array { .. } => "array",
        }
    }
}

impl ObjectSchema {
    /// An object that tolerates undeclared keys.
    pub fn open() -> Self {
        Self::default()
    }

    /// An object that rejects undeclared keys.
    pub fn closed() -> Self {
        Self {
            properties: Vec::new(),
            closed: true,
        }
    }

    pub fn field(mut self, name: &str, schema: impl Into<Schema>) -> Self {
        self.properties.push((
            name.to_string(),
            Property {
                schema: schema.into(),
                required: true,
            },
        ));
        self
    }

    pub fn optional_field(mut self, name: &str, schema: impl Into<Schema>) -> Self {
        self.properties.push((
            name.to_string(),
            Property {
                schema: schema.into(),
                required: false,
            },
        ));
        self
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|(declared, _)| declared == name)
            .map(|(_, property)| property)
    }
}

impl From<ObjectSchema> for Schema {
    fn from(object: ObjectSchema) -> Self {
        Schema::Object(object)
    }
}

/// Check `value` against `schema`, returning the value untouched on success.
pub fn validate<'v>(value: &'v Value, schema: &Schema) -> Result<&'v Value, ValidationFailure> {
    let mut path = String::from("$");
    check(value, schema, &mut path)?;
    Ok(value)
}

fn check(value: &Value, schema: &Schema, path: &mut String) -> Result<(), ValidationFailure> {
    match (schema, value) {
        (Schema::Any, _)
        | (Schema::Null, Value::Null)
        | (Schema::Boolean, Value::Bool(_))
        | (Schema::Number, Value::Number(_)) => Ok(()),
        (Schema::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(()),
        (Schema::String { blank }, Value::String(s)) => {
            if s.is_empty() && !blank {
                Err(ValidationFailure::new(
                    path.as_str(),
                    "expected non-blank string, found empty string",
                ))
            } else {
                Ok(())
            }
        }
        (Schema::Array { items }, Value::Array(elements)) => {
            for (index, element) in elements.iter().enumerate() {
                let len = path.len();
                path.push_str(&format!("[{index}]"));
                check(element, items, path)?;
                path.truncate(len);
            }
            Ok(())
        }
        (Schema::Object(object), Value::Object(map)) => check_object(map, object, path),
        _ => Err(ValidationFailure::new(
            path.as_str(),
            format!("expected {}, found {}", schema.type_name(), ValueKind(value)),
        )),
    }
}

fn check_object(
    map: &Map<String, Value>,
    object: &ObjectSchema,
    path: &mut String,
) -> Result<(), ValidationFailure> {
    for (name, property) in &object.properties {
        let len = path.len();
        path.push('.');
        path.push_str(name);
        match map.get(name) {
            Some(field) => check(field, &property.schema, path)?,
            None if property.required => {
                return Err(ValidationFailure::new(
                    path.as_str(),
                    format!("required property is missing (expected {})", property.schema.type_name()),
                ));
            }
            None => {}
        }
        path.truncate(len);
    }

    if object.closed {
        if let Some(extra) = map.keys().find(|key| object.property(key).is_none()) {
            return Err(ValidationFailure::new(
                path.as_str(),
                format!("additional property `{extra}` is not allowed"),
            ));
        }
    }
    Ok(())
}

struct ValueKind<'a>(&'a Value);

impl fmt::Display for ValueKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.0 {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(n) if n.is_f64() => "number",
            Value::Number(_) => "integer",
            Value::String(s) if s.is_empty() => "empty string",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        };
        f.write_str(kind)
    }
}

/// Serializes the property list as a JSON object, keeping declaration order.
mod ordered_properties {
    use std::fmt;

    use serde::de::{self, MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};

    use super::Property;

    pub fn serialize<S: Serializer>(
        properties: &[(String, Property)],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(properties.len()))?;
        for (name, property) in properties {
            map.serialize_entry(name, property)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<(String, Property)>, D::Error> {
        deserializer.deserialize_map(PropertiesVisitor)
    }

    struct PropertiesVisitor;

    impl<'de> Visitor<'de> for PropertiesVisitor {
        type Value = Vec<(String, Property)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of property names to schemas")
        }

        fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> Result<Self::Value, M::Error> {
            let mut properties: Vec<(String, Property)> =
                Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((name, property)) = access.next_entry::<String, Property>()? {
                if properties.iter().any(|(declared, _)| *declared == name) {
                    return Err(de::Error::custom(format!("duplicate property `{name}`")));
                }
                properties.push((name, property));
            }
            Ok(properties)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn playlist_schema() -> Schema {
        ObjectSchema::closed()
            .field("playlistId", Schema::string())
            .field(
                "playlist",
                Schema::array(
                    ObjectSchema::closed()
                        .field("id", Schema::string())
                        .field("title", Schema::blank_string())
                        .optional_field("rating", Schema::Integer),
                ),
            )
            .optional_field("continuationToken", Schema::string())
            .into()
    }

    #[test]
    fn conforming_value_is_returned_unchanged() {
        let value = json!({
            "playlistId": "all",
            "playlist": [{"id": "s1", "title": ""}, {"id": "s2", "title": "Song", "rating": 5}]
        });
        let validated = validate(&value, &playlist_schema()).unwrap();
        assert!(std::ptr::eq(validated, &value));
    }

    #[test]
    fn missing_required_property_fails() {
        let value = json!({"playlist": []});
        let err = validate(&value, &playlist_schema()).unwrap_err();
        assert_eq!(err.path, "$.playlistId");
        assert!(err.message.contains("required"));
    }

    #[test]
    fn missing_optional_property_passes() {
        let value = json!({"playlistId": "p", "playlist": [{"id": "s", "title": "t"}]});
        assert!(validate(&value, &playlist_schema()).is_ok());
    }

    #[test]
    fn undeclared_key_fails_when_closed() {
        let value = json!({"playlistId": "p", "playlist": [], "extra": 1});
        let err = validate(&value, &playlist_schema()).unwrap_err();
        assert_eq!(err.path, "$");
        assert!(err.message.contains("`extra`"));
    }

    #[test]
    fn undeclared_key_passes_when_open() {
        let schema: Schema = ObjectSchema::open().field("id", Schema::string()).into();
        assert!(validate(&json!({"id": "x", "extra": true}), &schema).is_ok());
    }

    #[test]
    fn nested_mismatch_reports_full_path() {
        let value = json!({
            "playlistId": "p",
            "playlist": [{"id": "s1", "title": "a"}, {"id": 7, "title": "b"}]
        });
        let err = validate(&value, &playlist_schema()).unwrap_err();
        assert_eq!(err.path, "$.playlist[1].id");
        assert_eq!(err.message, "expected string, found integer");
    }

    #[test]
    fn first_declared_mismatch_wins() {
        // Both fields are wrong; playlistId is declared first.
        let value = json!({"playlist": 3, "playlistId": false});
        let err = validate(&value, &playlist_schema()).unwrap_err();
        assert_eq!(err.path, "$.playlistId");
    }

    #[test]
    fn blank_strings_need_opt_in() {
        assert!(validate(&json!(""), &Schema::string()).is_err());
        assert!(validate(&json!(""), &Schema::blank_string()).is_ok());
    }

    #[test]
    fn integer_rejects_fractions_and_number_accepts_both() {
        assert!(validate(&json!(1.5), &Schema::Integer).is_err());
        assert!(validate(&json!(-3), &Schema::Integer).is_ok());
        assert!(validate(&json!(1.5), &Schema::Number).is_ok());
        assert!(validate(&json!(true), &Schema::Integer).is_err());
    }

    #[test]
    fn any_matches_everything() {
        for value in [json!(null), json!([1, "a"]), json!({"k": {}})] {
            assert!(validate(&value, &Schema::Any).is_ok());
        }
    }

    #[test]
    fn parses_documented_format() {
        let schema: Schema = serde_json::from_value(json!({
            "type": "object",
            "properties": {
                "id": {"type": "string"},
                "title": {"type": "string", "required": false, "blank": true},
                "ids": {"type": "array", "items": {"type": "integer"}}
            },
            "closed": true
        }))
        .unwrap();

        let Schema::Object(object) = &schema else {
            panic!("expected object schema");
        };
        let names: Vec<&str> = object.properties.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["id", "title", "ids"]);
        assert!(object.closed);
        assert!(!object.property("title").unwrap().required);
        assert_eq!(object.property("title").unwrap().schema, Schema::blank_string());
        assert!(object.property("id").unwrap().required);
    }

    #[test]
    fn serialized_schema_omits_defaults() {
        let schema: Schema = ObjectSchema::open()
            .field("id", Schema::string())
            .optional_field("n", Schema::Integer)
            .into();
        assert_eq!(
            serde_json::to_value(&schema).unwrap(),
            json!({
                "type": "object",
                "properties": {
                    "id": {"type": "string"},
                    "n": {"type": "integer", "required": false}
                }
            })
        );
    }

    #[test]
    fn reparsed_schema_validates_identically() {
        let original = playlist_schema();
        let text = serde_json::to_string(&original).unwrap();
        let reparsed: Schema = serde_json::from_str(&text).unwrap();
        assert_eq!(reparsed, original);

        let bad = json!({"playlist": [{"id": 1}], "playlistId": "p", "zzz": 0});
        assert_eq!(
            validate(&bad, &original).unwrap_err(),
            validate(&bad, &reparsed).unwrap_err()
        );
    }

    #[test]
    fn declaration_order_survives_value_round_trip() {
        let original: Schema = ObjectSchema::closed()
            .field("zeta", Schema::string())
            .field("alpha", Schema::Integer)
            .into();
        let reparsed: Schema =
            serde_json::from_value(serde_json::to_value(&original).unwrap()).unwrap();
        assert_eq!(reparsed, original);

        let bad = json!({"zeta": 1, "alpha": "x"});
        let err = validate(&bad, &reparsed).unwrap_err();
        assert_eq!(err.path, "$.zeta");
        assert_eq!(err, validate(&bad, &original).unwrap_err());
    }

    #[test]
    fn duplicate_property_names_are_rejected() {
        let text = r#"{"type":"object","properties":{"a":{"type":"string"},"a":{"type":"integer"}}}"#;
        assert!(serde_json::from_str::<Schema>(text).is_err());
    }
}
