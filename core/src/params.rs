//! Flattening of structured values into `(key, value)` parameter lists.
//!
//! Any `Serialize` type can feed query strings and form bodies. Field order
//! follows serialization order, `#[serde(skip)]` fields never appear, and
//! sequence-valued fields expand into one entry per element under the same
//! key.

use serde::Serialize;
use serde_json::Value;

use crate::error::ConfigError;

/// Flatten `source` into ordered `(key, value)` pairs.
///
/// Accepts a struct or map (fields become keys) or a sequence of
/// `(key, value)` pairs. `None`/unit yields no pairs. Nested objects and
/// bare scalars are rejected.
pub fn flatten<T: Serialize + ?Sized>(source: &T) -> Result<Vec<(String, String)>, ConfigError> {
    let value =
        serde_json::to_value(source).map_err(|e| ConfigError::InvalidParams(e.to_string()))?;

    match value {
        Value::Null => Ok(Vec::new()),
        Value::Object(map) => {
            let mut pairs = Vec::with_capacity(map.len());
            for (key, field) in map {
                match field {
                    Value::Array(items) => {
                        for item in items {
                            pairs.push((key.clone(), scalar_text(&key, item)?));
                        }
                    }
                    other => pairs.push((key.clone(), scalar_text(&key, other)?)),
                }
            }
            Ok(pairs)
        }
        Value::Array(items) => items.into_iter().map(pair_from_value).collect(),
        other => Err(ConfigError::InvalidParams(format!(
            "expected a record, map or list of pairs, got {}",
            kind(&other)
        ))),
    }
}

fn pair_from_value(item: Value) -> Result<(String, String), ConfigError> {
    match item {
        Value::Array(mut pair) if pair.len() == 2 => {
            let value = pair.pop().unwrap_or(Value::Null);
            let key = match pair.pop() {
                Some(Value::String(key)) => key,
                Some(other) => {
                    return Err(ConfigError::InvalidParams(format!(
                        "pair key must be a string, got {}",
                        kind(&other)
                    )))
                }
                None => String::new(),
            };
            let text = scalar_text(&key, value)?;
            Ok((key, text))
        }
        other => Err(ConfigError::InvalidParams(format!(
            "expected a (key, value) pair, got {}",
            kind(&other)
        ))),
    }
}

fn scalar_text(key: &str, value: Value) -> Result<String, ConfigError> {
    match value {
        Value::Null => Ok(String::new()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s.trim().to_string()),
        other => Err(ConfigError::InvalidParams(format!(
            "field `{key}` holds a nested {}",
            kind(&other)
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde::Serialize;

    use super::*;

    #[derive(Serialize)]
    struct Search {
        q: String,
        page: u32,
        tags: Vec<&'static str>,
        #[serde(skip)]
        #[allow(dead_code)]
        secret: String,
        cursor: Option<String>,
    }

    fn strings(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn record_fields_in_declaration_order() {
        let search = Search {
            q: "  rust ".to_string(),
            page: 2,
            tags: vec!["a", "b"],
            secret: "hidden".to_string(),
            cursor: None,
        };
        let pairs = flatten(&search).unwrap();
        assert_eq!(
            pairs,
            strings(&[("q", "rust"), ("page", "2"), ("tags", "a"), ("tags", "b"), ("cursor", "")])
        );
    }

    #[test]
    fn map_and_pair_list_sources() {
        let mut map = BTreeMap::new();
        map.insert("a", 1);
        map.insert("b", 2);
        assert_eq!(flatten(&map).unwrap(), strings(&[("a", "1"), ("b", "2")]));

        let list = vec![("k", "v1"), ("k", "v2")];
        assert_eq!(flatten(&list).unwrap(), strings(&[("k", "v1"), ("k", "v2")]));
    }

    #[test]
    fn none_yields_nothing() {
        let none: Option<Search> = None;
        assert!(flatten(&none).unwrap().is_empty());
    }

    #[test]
    fn rejects_scalars_and_nesting() {
        assert!(matches!(flatten(&42), Err(ConfigError::InvalidParams(_))));
        assert!(matches!(flatten("text"), Err(ConfigError::InvalidParams(_))));
        assert!(matches!(flatten(&vec![1, 2]), Err(ConfigError::InvalidParams(_))));

        #[derive(Serialize)]
        struct Outer {
            inner: BTreeMap<String, String>,
        }
        let nested = Outer { inner: BTreeMap::new() };
        assert!(matches!(flatten(&nested), Err(ConfigError::InvalidParams(_))));
    }
}
