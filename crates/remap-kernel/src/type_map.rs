//! Type maps and property maps.
//!
//! A [`TypeMap`] is the registered rule set for one ordered
//! (source, destination) pair. It owns one [`PropertyMap`] per destination
//! member, the Include edges used for polymorphic dispatch, an optional
//! whole-object converter, and an optional profile label.
//!
//! A property map is *satisfied* when its [`Resolution`] is anything but
//! `Unresolved`: an explicit ignore, a non-empty member chain, a source
//! expression, or a custom resolver. The enum makes "exactly one of" hold
//! by construction.

use crate::descriptor::{MemberDescriptor, TypeName};
use crate::resolver::MemberChain;
use crate::value::{Object, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// An ordered (source, destination) pair. `(S, D)` and `(D, S)` are
/// different pairs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypePair {
    pub source: TypeName,
    pub destination: TypeName,
}

impl TypePair {
    pub fn new(source: impl Into<TypeName>, destination: impl Into<TypeName>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }
}

impl fmt::Display for TypePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.destination)
    }
}

/// Computes a destination member value.
///
/// Receives the source object, or the value picked by `from_member` when
/// one is configured. An `Err` aborts the whole mapping call.
pub trait ValueResolver: Send + Sync {
    fn resolve(&self, source: &Value) -> Result<Value, String>;
}

impl<F> ValueResolver for F
where
    F: Fn(&Value) -> Result<Value, String> + Send + Sync,
{
    fn resolve(&self, source: &Value) -> Result<Value, String> {
        self(source)
    }
}

/// Converts a whole source value into a destination value, bypassing
/// property maps.
pub trait TypeConverter: Send + Sync {
    fn convert(&self, source: &Value) -> Result<Value, String>;
}

impl<F> TypeConverter for F
where
    F: Fn(&Value) -> Result<Value, String> + Send + Sync,
{
    fn convert(&self, source: &Value) -> Result<Value, String> {
        self(source)
    }
}

/// Post-processes a member value just before assignment.
pub trait ValueFormatter: Send + Sync {
    fn format(&self, value: Value) -> Value;
}

impl<F> ValueFormatter for F
where
    F: Fn(Value) -> Value + Send + Sync,
{
    fn format(&self, value: Value) -> Value {
        self(value)
    }
}

/// Source expression: reads a value straight off the source object.
pub type SourceExpression = Arc<dyn Fn(&Object) -> Value + Send + Sync>;

pub type ResolverFactory = Arc<dyn Fn() -> Result<Arc<dyn ValueResolver>, String> + Send + Sync>;

pub type ConverterFactory = Arc<dyn Fn() -> Result<Arc<dyn TypeConverter>, String> + Send + Sync>;

/// A configured resolver: a ready instance or a constructor run per use.
#[derive(Clone)]
pub enum ResolverSource {
    Instance(Arc<dyn ValueResolver>),
    Factory(ResolverFactory),
}

impl ResolverSource {
    pub fn instantiate(&self) -> Result<Arc<dyn ValueResolver>, String> {
        match self {
            ResolverSource::Instance(resolver) => Ok(Arc::clone(resolver)),
            ResolverSource::Factory(factory) => factory(),
        }
    }
}

/// A configured whole-object converter.
#[derive(Clone)]
pub enum ConverterSource {
    Instance(Arc<dyn TypeConverter>),
    Factory(ConverterFactory),
}

impl ConverterSource {
    pub fn instantiate(&self) -> Result<Arc<dyn TypeConverter>, String> {
        match self {
            ConverterSource::Instance(converter) => Ok(Arc::clone(converter)),
            ConverterSource::Factory(factory) => factory(),
        }
    }
}

/// How a destination member gets its value.
#[derive(Clone)]
pub enum Resolution {
    /// Nothing found and nothing configured.
    Unresolved,
    /// Found by name matching or flattening.
    Chain(MemberChain),
    /// Explicitly left alone.
    Ignored,
    /// `map_from`: a closure over the source object.
    Expression(SourceExpression),
    /// `resolve_using`: a resolver, optionally fed by a member expression.
    Resolver {
        source: ResolverSource,
        from_member: Option<SourceExpression>,
    },
}

impl Resolution {
    pub fn is_satisfied(&self) -> bool {
        match self {
            Resolution::Unresolved => false,
            Resolution::Chain(chain) => !chain.is_empty(),
            Resolution::Ignored | Resolution::Expression(_) | Resolution::Resolver { .. } => true,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Resolution::Unresolved => "unresolved",
            Resolution::Chain(_) => "chain",
            Resolution::Ignored => "ignored",
            Resolution::Expression(_) => "expression",
            Resolution::Resolver { .. } => "resolver",
        }
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Chain(chain) => write!(f, "Chain({})", chain.path()),
            other => write!(f, "{}", other.kind()),
        }
    }
}

/// A formatter together with the identity `skip_formatter` refers to it by.
#[derive(Clone)]
pub struct FormatterEntry {
    key: &'static str,
    formatter: Arc<dyn ValueFormatter>,
}

impl FormatterEntry {
    pub fn new<F: ValueFormatter + 'static>(formatter: F) -> Self {
        Self {
            key: std::any::type_name::<F>(),
            formatter: Arc::new(formatter),
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn apply(&self, value: Value) -> Value {
        self.formatter.format(value)
    }
}

impl fmt::Debug for FormatterEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FormatterEntry").field(&self.key).finish()
    }
}

/// The rule for one destination member.
#[derive(Clone, Debug)]
pub struct PropertyMap {
    destination: MemberDescriptor,
    resolution: Resolution,
    null_substitute: Option<Value>,
    formatters: Vec<FormatterEntry>,
    skipped_formatters: Vec<&'static str>,
}

impl PropertyMap {
    pub fn new(destination: MemberDescriptor, resolution: Resolution) -> Self {
        Self {
            destination,
            resolution,
            null_substitute: None,
            formatters: Vec::new(),
            skipped_formatters: Vec::new(),
        }
    }

    pub fn destination_member(&self) -> &MemberDescriptor {
        &self.destination
    }

    pub fn destination_name(&self) -> &str {
        self.destination.name()
    }

    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    pub fn null_substitute(&self) -> Option<&Value> {
        self.null_substitute.as_ref()
    }

    pub fn formatters(&self) -> &[FormatterEntry] {
        &self.formatters
    }

    pub fn is_formatter_skipped(&self, key: &str) -> bool {
        self.skipped_formatters.contains(&key)
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self.resolution, Resolution::Ignored)
    }

    pub fn is_satisfied(&self) -> bool {
        self.resolution.is_satisfied()
    }

    pub(crate) fn set_resolution(&mut self, resolution: Resolution) {
        self.resolution = resolution;
    }

    pub(crate) fn set_null_substitute(&mut self, substitute: Value) {
        self.null_substitute = Some(substitute);
    }

    pub(crate) fn push_formatter(&mut self, formatter: FormatterEntry) {
        self.formatters.push(formatter);
    }

    pub(crate) fn skip_formatter(&mut self, key: &'static str) {
        if !self.skipped_formatters.contains(&key) {
            self.skipped_formatters.push(key);
        }
    }
}

/// The registered rule set for one type pair.
#[derive(Clone)]
pub struct TypeMap {
    pair: TypePair,
    property_maps: Vec<PropertyMap>,
    includes: Vec<TypePair>,
    converter: Option<ConverterSource>,
    profile: Option<String>,
}

impl TypeMap {
    pub fn new(pair: TypePair, property_maps: Vec<PropertyMap>) -> Self {
        Self {
            pair,
            property_maps,
            includes: Vec::new(),
            converter: None,
            profile: None,
        }
    }

    pub fn pair(&self) -> &TypePair {
        &self.pair
    }

    pub fn source_type(&self) -> &TypeName {
        &self.pair.source
    }

    pub fn destination_type(&self) -> &TypeName {
        &self.pair.destination
    }

    /// Property maps in registration order.
    pub fn property_maps(&self) -> &[PropertyMap] {
        &self.property_maps
    }

    pub fn property_map(&self, destination: &str) -> Option<&PropertyMap> {
        self.property_maps
            .iter()
            .find(|pm| pm.destination_name() == destination)
    }

    pub(crate) fn property_map_mut(&mut self, destination: &str) -> Option<&mut PropertyMap> {
        self.property_maps
            .iter_mut()
            .find(|pm| pm.destination_name() == destination)
    }

    pub(crate) fn property_maps_mut(&mut self) -> impl Iterator<Item = &mut PropertyMap> {
        self.property_maps.iter_mut()
    }

    /// Include edges in registration order.
    pub fn includes(&self) -> &[TypePair] {
        &self.includes
    }

    pub fn converter(&self) -> Option<&ConverterSource> {
        self.converter.as_ref()
    }

    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    /// Names of destination members this map does not account for. A map
    /// with a whole-object converter accounts for everything.
    pub fn unmapped_member_names(&self) -> Vec<String> {
        if self.converter.is_some() {
            return Vec::new();
        }
        self.property_maps
            .iter()
            .filter(|pm| !pm.is_satisfied())
            .map(|pm| pm.destination_name().to_string())
            .collect()
    }

    pub(crate) fn add_include(&mut self, include: TypePair) {
        if !self.includes.contains(&include) {
            self.includes.push(include);
        }
    }

    pub(crate) fn set_converter(&mut self, converter: ConverterSource) {
        self.converter = Some(converter);
    }

    pub(crate) fn set_profile(&mut self, profile: impl Into<String>) {
        self.profile = Some(profile.into());
    }
}

impl fmt::Debug for TypeMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeMap")
            .field("pair", &self.pair)
            .field("property_maps", &self.property_maps)
            .field("includes", &self.includes)
            .field("converter", &self.converter.is_some())
            .field("profile", &self.profile)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueType;

    fn pm(name: &str, resolution: Resolution) -> PropertyMap {
        PropertyMap::new(MemberDescriptor::property(name, ValueType::String), resolution)
    }

    #[test]
    fn pair_order_matters() {
        assert_ne!(TypePair::new("A", "B"), TypePair::new("B", "A"));
        assert_eq!(TypePair::new("A", "B").to_string(), "A -> B");
    }

    #[test]
    fn unresolved_and_empty_chains_are_unsatisfied() {
        assert!(!Resolution::Unresolved.is_satisfied());
        assert!(!Resolution::Chain(MemberChain::new(Vec::new())).is_satisfied());
        assert!(Resolution::Ignored.is_satisfied());
        assert!(Resolution::Expression(Arc::new(|_: &Object| Value::Null)).is_satisfied());
    }

    #[test]
    fn unmapped_names_come_from_unsatisfied_property_maps() {
        let mut map = TypeMap::new(
            TypePair::new("Source", "Destination"),
            vec![
                pm("Value", Resolution::Ignored),
                pm("Missing", Resolution::Unresolved),
            ],
        );
        assert_eq!(map.unmapped_member_names(), vec!["Missing".to_string()]);

        let convert = |v: &Value| -> Result<Value, String> { Ok(v.clone()) };
        map.set_converter(ConverterSource::Instance(Arc::new(convert)));
        assert!(map.unmapped_member_names().is_empty());
    }

    #[test]
    fn include_edges_keep_registration_order_without_duplicates() {
        let mut map = TypeMap::new(TypePair::new("Base", "BaseDto"), Vec::new());
        map.add_include(TypePair::new("Left", "LeftDto"));
        map.add_include(TypePair::new("Right", "RightDto"));
        map.add_include(TypePair::new("Left", "LeftDto"));
        assert_eq!(
            map.includes(),
            &[
                TypePair::new("Left", "LeftDto"),
                TypePair::new("Right", "RightDto")
            ]
        );
    }

    #[test]
    fn formatter_keys_follow_the_formatter_type() {
        struct Upper;
        impl ValueFormatter for Upper {
            fn format(&self, value: Value) -> Value {
                match value {
                    Value::Str(s) => Value::Str(s.to_uppercase()),
                    other => other,
                }
            }
        }
        let entry = FormatterEntry::new(Upper);
        assert_eq!(entry.key(), std::any::type_name::<Upper>());
        assert_eq!(entry.apply(Value::from("abc")), Value::from("ABC"));
    }
}
