//! The document-format boundary.
//!
//! Parses YAML text into plain [`Value`] primitives and renders primitives
//! back to text. The only property the core relies on is that mapping key
//! insertion order survives both directions, which `serde_yaml` guarantees.
//! No schema logic lives here.

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::value::Value;

/// Parse a YAML document into plain primitives.
pub fn from_str(text: &str) -> Result<Value> {
    let raw: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|e| Error::BadDocument(e.to_string()))?;
    convert(raw)
}

/// Render plain primitives back to YAML text.
pub fn to_string(value: &Value) -> Result<String> {
    serde_yaml::to_string(value).map_err(|e| Error::BadDocument(e.to_string()))
}

fn convert(raw: serde_yaml::Value) -> Result<Value> {
    Ok(match raw {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(v) => Value::Bool(v),
        serde_yaml::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_yaml::Value::String(s) => Value::Str(s),
        serde_yaml::Value::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(convert)
                .collect::<Result<Vec<Value>>>()?,
        ),
        serde_yaml::Value::Mapping(entries) => {
            let mut map = IndexMap::with_capacity(entries.len());
            for (key, value) in entries {
                let serde_yaml::Value::String(key) = key else {
                    return Err(Error::BadDocument(
                        "mapping key is not a string".to_string(),
                    ));
                };
                map.insert(key, convert(value)?);
            }
            Value::Map(map)
        }
        serde_yaml::Value::Tagged(tagged) => convert(tagged.value)?,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mapping_order_is_preserved() {
        let value = from_str("b: 1\na: 2\nc: 3\n").unwrap();
        let keys: Vec<&str> = value.as_map().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn scalars_map_to_primitive_kinds() {
        let value = from_str("i: 1\nf: 1.5\ns: hi\nb: true\nn: null\n").unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map["i"], Value::Int(1));
        assert_eq!(map["f"], Value::Float(1.5));
        assert_eq!(map["s"], Value::Str("hi".to_string()));
        assert_eq!(map["b"], Value::Bool(true));
        assert_eq!(map["n"], Value::Null);
    }

    #[test]
    fn round_trip_keeps_order() {
        let value = from_str("b: 1\na:\n  - x\n  - y\n").unwrap();
        let text = to_string(&value).unwrap();
        assert_eq!(from_str(&text).unwrap(), value);
        assert!(text.find("b:").unwrap() < text.find("a:").unwrap());
    }

    #[test]
    fn non_string_keys_are_rejected() {
        assert!(from_str("1: x\n").is_err());
    }
}
