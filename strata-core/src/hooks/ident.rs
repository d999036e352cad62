//! Hook identifiers.
//!
//! Component ids, slot keys and effect ids must be non-empty strings. Rust
//! callers pass `&str`/`String` and only the emptiness check can fail;
//! dynamic callers (bridges that forward identifiers received as JSON) pass
//! a `serde_json::Value` and get `InvalidArgument` for anything that is not
//! a string. Identifiers are used verbatim as map keys, so characters such
//! as `/` or `<` carry no meaning.

use serde_json::Value;

use crate::error::{Error, Result};

/// A value usable as a hook identifier.
pub trait Identifier {
    /// Validate and convert. `what` names the argument in error messages.
    fn into_identifier(self, what: &'static str) -> Result<String>;
}

fn non_empty(value: String, what: &'static str) -> Result<String> {
    if value.is_empty() {
        return Err(Error::invalid_argument(format!("{} must not be empty", what)));
    }
    Ok(value)
}

impl Identifier for &str {
    fn into_identifier(self, what: &'static str) -> Result<String> {
        non_empty(self.to_string(), what)
    }
}

impl Identifier for String {
    fn into_identifier(self, what: &'static str) -> Result<String> {
        non_empty(self, what)
    }
}

impl Identifier for &String {
    fn into_identifier(self, what: &'static str) -> Result<String> {
        non_empty(self.clone(), what)
    }
}

impl Identifier for &Value {
    fn into_identifier(self, what: &'static str) -> Result<String> {
        match self {
            Value::String(s) => non_empty(s.clone(), what),
            other => Err(Error::invalid_argument(format!(
                "{} must be a string, got {}",
                what,
                type_name(other)
            ))),
        }
    }
}

impl Identifier for Value {
    fn into_identifier(self, what: &'static str) -> Result<String> {
        match self {
            Value::String(s) => non_empty(s, what),
            other => (&other).into_identifier(what),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
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
    use super::*;
    use serde_json::json;

    #[test]
    fn strings_pass_through_literally() {
        assert_eq!(
            "../../../etc/passwd".into_identifier("component_id").unwrap(),
            "../../../etc/passwd"
        );
        assert_eq!(
            json!("<script>").into_identifier("key").unwrap(),
            "<script>"
        );
    }

    #[test]
    fn non_strings_are_invalid() {
        let err = json!(123).into_identifier("component_id").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid argument: component_id must be a string, got number"
        );
        assert!(matches!(
            (&json!(null)).into_identifier("key"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn empty_is_invalid() {
        assert!(matches!("".into_identifier("key"), Err(Error::InvalidArgument(_))));
    }
}
