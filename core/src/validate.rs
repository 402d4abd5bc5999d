//! Typed accessors over a tool call's JSON arguments.
//!
//! Every accessor either returns a value of the declared shape or the
//! `ValidationError` naming the field and what was wrong with it. `null` is
//! treated the same as an absent key.

use serde_json::{Map, Value};

use crate::error::ValidationError;

pub struct Args<'a> {
    map: Option<&'a Map<String, Value>>,
}

impl<'a> Args<'a> {
    /// Wrap a tool call's arguments. `null` means "no arguments".
    pub fn new(value: &'a Value) -> Result<Self, ValidationError> {
        match value {
            Value::Null => Ok(Self { map: None }),
            Value::Object(map) => Ok(Self { map: Some(map) }),
            _ => Err(ValidationError::NotAnObject),
        }
    }

    pub fn get(&self, field: &str) -> Option<&'a Value> {
        self.map?.get(field).filter(|v| !v.is_null())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Every non-null entry, in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&'a String, &'a Value)> {
        self.map
            .into_iter()
            .flat_map(|m| m.iter())
            .filter(|(_, v)| !v.is_null())
    }

    pub fn required_str(&self, field: &str) -> Result<&'a str, ValidationError> {
        let value = self.get(field).ok_or_else(|| ValidationError::missing(field))?;
        non_empty_str(field, value)
    }

    pub fn optional_str(&self, field: &str) -> Result<Option<&'a str>, ValidationError> {
        self.get(field).map(|v| non_empty_str(field, v)).transpose()
    }

    pub fn optional_bool(&self, field: &str) -> Result<Option<bool>, ValidationError> {
        match self.get(field) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(ValidationError::wrong_type(field, "a boolean")),
        }
    }

    pub fn optional_index(&self, field: &str) -> Result<Option<u64>, ValidationError> {
        match self.get(field) {
            None => Ok(None),
            Some(v) => v
                .as_u64()
                .map(Some)
                .ok_or_else(|| ValidationError::wrong_type(field, "a non-negative integer")),
        }
    }

    /// A JSON object with at least one entry.
    pub fn required_map(&self, field: &str) -> Result<&'a Map<String, Value>, ValidationError> {
        match self.get(field) {
            None => Err(ValidationError::missing(field)),
            Some(Value::Object(map)) if map.is_empty() => Err(ValidationError::empty(field)),
            Some(Value::Object(map)) => Ok(map),
            Some(_) => Err(ValidationError::wrong_type(field, "a non-empty mapping")),
        }
    }

    /// An array of non-empty strings. An empty array is allowed.
    pub fn optional_str_list(&self, field: &str) -> Result<Option<Vec<&'a str>>, ValidationError> {
        let Some(value) = self.get(field) else {
            return Ok(None);
        };
        let items = value
            .as_array()
            .ok_or_else(|| ValidationError::wrong_type(field, "a list of strings"))?;
        items
            .iter()
            .map(|item| match item.as_str() {
                Some(s) if !s.trim().is_empty() => Ok(s),
                _ => Err(ValidationError::wrong_type(field, "a list of non-empty strings")),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    /// A comma-separated string or an array of strings, split into entries.
    pub fn str_set(&self, field: &str) -> Result<Option<Vec<&'a str>>, ValidationError> {
        match self.get(field) {
            None => Ok(None),
            Some(Value::String(s)) => {
                let parts: Vec<&str> = s.split(',').map(str::trim).filter(|p| !p.is_empty()).collect();
                if parts.is_empty() {
                    return Err(ValidationError::empty(field));
                }
                Ok(Some(parts))
            }
            Some(Value::Array(_)) => {
                let parts = self.optional_str_list(field)?.unwrap_or_default();
                if parts.is_empty() {
                    return Err(ValidationError::empty(field));
                }
                Ok(Some(parts))
            }
            Some(_) => Err(ValidationError::wrong_type(field, "a string or a list of strings")),
        }
    }
}

fn non_empty_str<'a>(field: &str, value: &'a Value) -> Result<&'a str, ValidationError> {
    let s = value
        .as_str()
        .ok_or_else(|| ValidationError::wrong_type(field, "a string"))?;
    if s.trim().is_empty() {
        return Err(ValidationError::empty(field));
    }
    Ok(s)
}

/// Reject `value` unless it is a member of `allowed`.
pub fn one_of(field: &str, value: &str, allowed: &'static [&'static str]) -> Result<(), ValidationError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::not_allowed(field, value, allowed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_arguments_are_empty() {
        let value = Value::Null;
        let args = Args::new(&value).unwrap();
        assert!(!args.contains("anything"));
        assert_eq!(args.entries().count(), 0);
    }

    #[test]
    fn non_object_arguments_are_rejected() {
        let value = json!(["task_id"]);
        assert!(matches!(Args::new(&value), Err(ValidationError::NotAnObject)));
    }

    #[test]
    fn required_str_distinguishes_missing_type_and_empty() {
        let value = json!({"a": 1, "b": "  ", "c": "ok", "d": null});
        let args = Args::new(&value).unwrap();
        assert!(matches!(args.required_str("a"), Err(ValidationError::WrongType { .. })));
        assert!(matches!(args.required_str("b"), Err(ValidationError::Empty { .. })));
        assert_eq!(args.required_str("c").unwrap(), "ok");
        assert!(matches!(args.required_str("d"), Err(ValidationError::Missing { .. })));
        assert!(matches!(args.required_str("e"), Err(ValidationError::Missing { .. })));
    }

    #[test]
    fn optional_index_rejects_negative_and_fractional() {
        let value = json!({"neg": -1, "frac": 1.5, "ok": 3});
        let args = Args::new(&value).unwrap();
        assert!(args.optional_index("neg").is_err());
        assert!(args.optional_index("frac").is_err());
        assert_eq!(args.optional_index("ok").unwrap(), Some(3));
        assert_eq!(args.optional_index("missing").unwrap(), None);
    }

    #[test]
    fn required_map_must_be_non_empty_object() {
        let value = json!({"empty": {}, "list": [1], "ok": {"text": "x"}});
        let args = Args::new(&value).unwrap();
        assert!(matches!(args.required_map("empty"), Err(ValidationError::Empty { .. })));
        assert_eq!(
            args.required_map("list").unwrap_err().to_string(),
            "Field 'list' must be a non-empty mapping."
        );
        assert_eq!(args.required_map("ok").unwrap().len(), 1);
    }

    #[test]
    fn str_set_accepts_csv_and_arrays() {
        let value = json!({"csv": "party, guilds", "arr": ["tavern"], "blank": " , ", "num": 4});
        let args = Args::new(&value).unwrap();
        assert_eq!(args.str_set("csv").unwrap(), Some(vec!["party", "guilds"]));
        assert_eq!(args.str_set("arr").unwrap(), Some(vec!["tavern"]));
        assert!(matches!(args.str_set("blank"), Err(ValidationError::Empty { .. })));
        assert!(matches!(args.str_set("num"), Err(ValidationError::WrongType { .. })));
    }

    #[test]
    fn str_list_rejects_non_string_items() {
        let value = json!({"tags": ["a", 2]});
        let args = Args::new(&value).unwrap();
        assert!(args.optional_str_list("tags").is_err());
    }

    #[test]
    fn one_of_checks_membership() {
        const SET: &[&str] = &["json", "xml"];
        assert!(one_of("format", "xml", SET).is_ok());
        assert!(one_of("format", "csv", SET).is_err());
    }
}
