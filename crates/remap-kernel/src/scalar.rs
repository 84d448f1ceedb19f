//! Built-in leaf conversions.
//!
//! This table is the single authority for which scalar-to-scalar
//! conversions happen without a registered converter. Anything not listed
//! (and not an identity) raises `IncompatibleScalarConversion`.

use crate::descriptor::TypeName;
use crate::error::{MapperError, Result};
use crate::value::{Value, ValueType};

/// Permitted (from, to) conversions besides identity and `any`.
pub const BUILTIN_COERCIONS: &[(&str, &str)] = &[
    ("int", "float"),
    ("bool", "string"),
    ("int", "string"),
    ("float", "string"),
    ("datetime", "string"),
];

pub fn coercion_allowed(from: &str, to: &str) -> bool {
    from == to
        || to == "any"
        || BUILTIN_COERCIONS
            .iter()
            .any(|(f, t)| *f == from && *t == to)
}

/// Convert a non-null leaf value to `destination` using the built-in table.
pub fn coerce(value: &Value, destination: &ValueType) -> Result<Value> {
    let from = value
        .runtime_type()
        .map(|t| t.type_name())
        .unwrap_or_else(|| TypeName::from("any"));
    let to = destination.type_name();
    let incompatible = || MapperError::IncompatibleScalarConversion {
        from: from.clone(),
        to: to.clone(),
    };

    if value.is_null() {
        return Ok(Value::Null);
    }
    if !coercion_allowed(from.as_str(), to.as_str()) {
        return Err(incompatible());
    }

    match (value, destination) {
        (_, ValueType::Any) => Ok(value.clone()),
        (Value::Int(i), ValueType::Float) => Ok(Value::Float(*i as f64)),
        (
            Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::DateTime(_),
            ValueType::String,
        ) => Ok(Value::Str(value.to_string())),
        _ if from == to => Ok(value.clone()),
        _ => Err(incompatible()),
    }
}
