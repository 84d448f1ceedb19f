//! Dynamic instance model.
//!
//! Source and destination instances are plain data: an [`Object`] is a
//! runtime type name plus named slots, and a [`Value`] is any leaf,
//! list, or object. Declared types are described by [`ValueType`].
//!
//! JSON is the bridge to and from typed Rust code. Objects read from JSON
//! take their runtime type from the declared type unless the document
//! carries a `"$type"` key, and the key is written back out only when the
//! runtime type differs from the declared one.

use crate::descriptor::{TypeCatalog, TypeName};
use crate::error::{MapperError, Result};
use chrono::NaiveDateTime;
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::fmt;

/// Text form used for `datetime` values.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// JSON key carrying the runtime type of a polymorphic object.
pub const TYPE_KEY: &str = "$type";

/// Type name given to JSON objects that carry no type information.
pub const ANONYMOUS_TYPE: &str = "object";

/// Declared type of a member or a mapping endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    Bool,
    Int,
    Float,
    String,
    DateTime,
    Object(TypeName),
    List(Box<ValueType>),
    Any,
}

impl ValueType {
    pub fn object(name: impl Into<TypeName>) -> Self {
        ValueType::Object(name.into())
    }

    pub fn list(element: ValueType) -> Self {
        ValueType::List(Box::new(element))
    }

    /// Parse the text form: scalar names, `[T]` for lists, anything else is
    /// an object type name.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if let Some(inner) = text.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
            return ValueType::list(ValueType::parse(inner));
        }
        match text {
            "bool" => ValueType::Bool,
            "int" => ValueType::Int,
            "float" => ValueType::Float,
            "string" => ValueType::String,
            "datetime" => ValueType::DateTime,
            "any" => ValueType::Any,
            other => ValueType::Object(TypeName::from(other)),
        }
    }

    /// The registry key for this type.
    pub fn type_name(&self) -> TypeName {
        match self {
            ValueType::Bool => "bool".into(),
            ValueType::Int => "int".into(),
            ValueType::Float => "float".into(),
            ValueType::String => "string".into(),
            ValueType::DateTime => "datetime".into(),
            ValueType::Object(name) => name.clone(),
            ValueType::List(element) => format!("[{}]", element.type_name()).into(),
            ValueType::Any => "any".into(),
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            ValueType::Bool
                | ValueType::Int
                | ValueType::Float
                | ValueType::String
                | ValueType::DateTime
        )
    }

    pub fn element_type(&self) -> Option<&ValueType> {
        match self {
            ValueType::List(element) => Some(element),
            _ => None,
        }
    }

    /// Value a freshly constructed member of this type holds.
    pub fn default_value(&self) -> Value {
        match self {
            ValueType::Bool => Value::Bool(false),
            ValueType::Int => Value::Int(0),
            ValueType::Float => Value::Float(0.0),
            ValueType::DateTime => Value::DateTime(NaiveDateTime::default()),
            ValueType::String | ValueType::Object(_) | ValueType::List(_) | ValueType::Any => {
                Value::Null
            }
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

impl From<&str> for ValueType {
    fn from(text: &str) -> Self {
        ValueType::parse(text)
    }
}

impl From<&ValueType> for ValueType {
    fn from(value_type: &ValueType) -> Self {
        value_type.clone()
    }
}

/// A runtime value. `Null` is the absent value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    DateTime(NaiveDateTime),
    List(Vec<Value>),
    Object(Object),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// The type this value actually carries. Lists report untyped elements;
    /// `Null` has no runtime type.
    pub fn runtime_type(&self) -> Option<ValueType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(ValueType::Bool),
            Value::Int(_) => Some(ValueType::Int),
            Value::Float(_) => Some(ValueType::Float),
            Value::Str(_) => Some(ValueType::String),
            Value::DateTime(_) => Some(ValueType::DateTime),
            Value::List(_) => Some(ValueType::list(ValueType::Any)),
            Value::Object(object) => Some(ValueType::Object(object.type_name().clone())),
        }
    }

    /// Read a JSON document as a value of the declared type.
    pub fn from_json(json: &Json, declared: &ValueType, catalog: &TypeCatalog) -> Result<Value> {
        let mismatch = || MapperError::InvalidJson(format!("expected {declared}, found {json}"));
        match (declared, json) {
            (_, Json::Null) => Ok(Value::Null),
            (ValueType::Any, _) => Value::from_untyped_json(json, catalog),
            (ValueType::Bool, Json::Bool(b)) => Ok(Value::Bool(*b)),
            (ValueType::Int, Json::Number(n)) => n.as_i64().map(Value::Int).ok_or_else(mismatch),
            (ValueType::Float, Json::Number(n)) => {
                n.as_f64().map(Value::Float).ok_or_else(mismatch)
            }
            (ValueType::String, Json::String(s)) => Ok(Value::Str(s.clone())),
            (ValueType::DateTime, Json::String(s)) => s
                .parse::<NaiveDateTime>()
                .map(Value::DateTime)
                .map_err(|e| MapperError::InvalidJson(format!("bad datetime {s:?}: {e}"))),
            (ValueType::List(element), Json::Array(items)) => items
                .iter()
                .map(|item| Value::from_json(item, element, catalog))
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
            (ValueType::Object(name), Json::Object(map)) => {
                let runtime = map
                    .get(TYPE_KEY)
                    .and_then(Json::as_str)
                    .map(TypeName::from)
                    .unwrap_or_else(|| name.clone());
                Value::object_from_json(map, &runtime, catalog)
            }
            _ => Err(mismatch()),
        }
    }

    fn object_from_json(
        map: &serde_json::Map<String, Json>,
        runtime: &TypeName,
        catalog: &TypeCatalog,
    ) -> Result<Value> {
        let members = catalog.members(runtime)?;
        let mut object = Object::new(runtime.clone());
        for (key, raw) in map {
            if key == TYPE_KEY {
                continue;
            }
            let member = members
                .iter()
                .find(|m| m.name() == key && m.is_slot_backed());
            let value = match member {
                Some(member) => Value::from_json(raw, member.value_type(), catalog)?,
                None => Value::from_untyped_json(raw, catalog)?,
            };
            object.set(key, value);
        }
        Ok(Value::Object(object))
    }

    fn from_untyped_json(json: &Json, catalog: &TypeCatalog) -> Result<Value> {
        Ok(match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or_default()),
            },
            Json::String(s) => Value::Str(s.clone()),
            Json::Array(items) => Value::List(
                items
                    .iter()
                    .map(|item| Value::from_untyped_json(item, catalog))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Json::Object(map) => match map.get(TYPE_KEY).and_then(Json::as_str) {
                Some(runtime) => Value::object_from_json(map, &runtime.into(), catalog)?,
                None => {
                    let mut object = Object::new(ANONYMOUS_TYPE);
                    for (key, raw) in map {
                        object.set(key, Value::from_untyped_json(raw, catalog)?);
                    }
                    Value::Object(object)
                }
            },
        })
    }

    /// Write the value as JSON, as seen through the declared type.
    pub fn to_json(&self, declared: &ValueType, catalog: &TypeCatalog) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Str(s) => Json::String(s.clone()),
            Value::DateTime(dt) => Json::String(dt.format(DATETIME_FORMAT).to_string()),
            Value::List(items) => {
                let element = declared.element_type().unwrap_or(&ValueType::Any);
                Json::Array(items.iter().map(|i| i.to_json(element, catalog)).collect())
            }
            Value::Object(object) => {
                let members = catalog.members(object.type_name()).ok();
                let mut map = serde_json::Map::new();
                if declared != &ValueType::Object(object.type_name().clone()) {
                    map.insert(
                        TYPE_KEY.to_string(),
                        Json::String(object.type_name().to_string()),
                    );
                }
                for (slot, value) in object.slots() {
                    let slot_type = members
                        .as_ref()
                        .and_then(|ms| ms.iter().find(|m| m.name() == slot))
                        .map(|m| m.value_type().clone())
                        .unwrap_or(ValueType::Any);
                    map.insert(slot.to_string(), value.to_json(&slot_type, catalog));
                }
                Json::Object(map)
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
            Value::List(items) => write!(f, "[{} items]", items.len()),
            Value::Object(object) => write!(f, "{}", object.type_name()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Value::Object(object)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// An instance: its runtime type plus named slots.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    type_name: TypeName,
    slots: BTreeMap<String, Value>,
}

impl Object {
    pub fn new(type_name: impl Into<TypeName>) -> Self {
        Self {
            type_name: type_name.into(),
            slots: BTreeMap::new(),
        }
    }

    /// Builder-style slot assignment.
    pub fn with(mut self, slot: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(slot, value);
        self
    }

    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    pub fn get(&self, slot: &str) -> Option<&Value> {
        self.slots.get(slot)
    }

    pub fn set(&mut self, slot: impl Into<String>, value: impl Into<Value>) {
        self.slots.insert(slot.into(), value.into());
    }

    pub fn slots(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.slots.iter().map(|(k, v)| (k.as_str(), v))
    }
}
