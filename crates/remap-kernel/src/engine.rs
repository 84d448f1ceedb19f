//! The mapper: configuration entry points and the execution engine.
//!
//! A [`Mapper`] owns a type catalog, the type map registry built against
//! it, and the memo of resolved member chains. Configuration takes
//! `&mut self`; mapping takes `&self` and only ever reads, so a configured
//! mapper can be shared across threads.
//!
//! Mapping walks the source graph recursively. Every object encountered is
//! dispatched afresh against its own runtime type, so polymorphic members
//! and collection elements pick their most specific type map.

use crate::descriptor::{TypeCatalog, TypeName};
use crate::error::{MapperError, Result};
use crate::expression::{MappingExpression, ProfileExpression};
use crate::registry::TypeMapRegistry;
use crate::resolver::ChainCache;
use crate::scalar;
use crate::settings::MapperSettings;
use crate::type_map::{
    ConverterSource, FormatterEntry, PropertyMap, Resolution, TypeMap, TypePair, ValueFormatter,
};
use crate::validator::{self, ValidationReport};
use crate::value::{Object, Value, ValueType};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as Json;
use tracing::{debug, trace, warn};

#[derive(Debug)]
pub struct Mapper {
    catalog: TypeCatalog,
    registry: TypeMapRegistry,
    chains: ChainCache,
    settings: MapperSettings,
}

impl Mapper {
    pub fn new(catalog: TypeCatalog) -> Self {
        Self {
            catalog,
            registry: TypeMapRegistry::new(),
            chains: ChainCache::new(),
            settings: MapperSettings::default(),
        }
    }

    /// Build a mapper and register every map the settings declare.
    pub fn with_settings(catalog: TypeCatalog, settings: MapperSettings) -> Result<Self> {
        let mut mapper = Self::new(catalog);
        mapper.apply_settings(settings)?;
        Ok(mapper)
    }

    fn apply_settings(&mut self, settings: MapperSettings) -> Result<()> {
        for declaration in &settings.maps {
            let mut expression =
                self.create_map(declaration.source.as_str(), declaration.destination.as_str())?;
            if let Some(profile) = &declaration.profile {
                expression = expression.with_profile(profile);
            }
            for include in &declaration.include {
                expression = expression.include(&include.source, &include.destination);
            }
            for member in &declaration.ignore {
                expression = expression.for_member(member, |opt| {
                    opt.ignore();
                })?;
            }
        }
        debug!(
            maps = settings.maps.len(),
            convention_mapping = settings.convention_mapping,
            "applied mapper settings"
        );
        self.settings = settings;
        Ok(())
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    pub fn registry(&self) -> &TypeMapRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &MapperSettings {
        &self.settings
    }

    /// Register a map for `(source, destination)` and return its
    /// configuration handle. Every destination member is matched against the
    /// source type right away; members with no match stay unresolved until
    /// configured. Registering a known pair returns the existing map.
    pub fn create_map(
        &mut self,
        source: impl Into<TypeName>,
        destination: impl Into<TypeName>,
    ) -> Result<MappingExpression<'_>> {
        let pair = TypePair::new(source, destination);
        if self.registry.find(&pair).is_none() {
            let map = self.build_type_map(pair.clone())?;
            for name in map.unmapped_member_names() {
                warn!(pair = %pair, member = %name, "destination member has no matching source");
            }
            debug!(pair = %pair, members = map.property_maps().len(), "registered type map");
            self.registry.insert(map);
        }
        let map = self
            .registry
            .find_mut(&pair)
            .ok_or_else(|| MapperError::MissingTypeMap {
                source_type: pair.source.clone(),
                destination_type: pair.destination.clone(),
            })?;
        Ok(MappingExpression::new(map))
    }

    fn build_type_map(&self, pair: TypePair) -> Result<TypeMap> {
        if pair.destination.is_scalar() {
            return Ok(TypeMap::new(pair, Vec::new()));
        }
        let members = self.catalog.destination_members(&pair.destination)?;
        let mut property_maps = Vec::with_capacity(members.len());
        for member in members {
            let resolution = if pair.source.is_scalar() {
                Resolution::Unresolved
            } else {
                match self.chains.resolve(member.name(), &pair.source, &self.catalog)? {
                    Some(chain) => Resolution::Chain(chain),
                    None => Resolution::Unresolved,
                }
            };
            property_maps.push(PropertyMap::new(member, resolution));
        }
        Ok(TypeMap::new(pair, property_maps))
    }

    pub fn find_type_map(&self, source: &str, destination: &str) -> Option<&TypeMap> {
        self.registry.find(&TypePair::new(source, destination))
    }

    /// Every registered map, in registration order.
    pub fn all_type_maps(&self) -> &[TypeMap] {
        self.registry.type_maps()
    }

    /// Add a formatter to the default profile.
    pub fn add_formatter<F: ValueFormatter + 'static>(&mut self, formatter: F) -> &mut Self {
        self.registry
            .add_formatter(None, FormatterEntry::new(formatter));
        self
    }

    pub fn profile(&mut self, name: &str) -> ProfileExpression<'_> {
        ProfileExpression::new(&mut self.registry, name)
    }

    /// Drop every type map, profile and cached chain.
    pub fn reset(&mut self) {
        let dropped = self.registry.len();
        self.registry.reset();
        self.chains.clear();
        debug!(dropped, "reset mapper");
    }

    pub fn validate(&self) -> ValidationReport {
        validator::validate(&self.registry, &self.catalog)
    }

    pub fn assert_configuration_is_valid(&self) -> Result<()> {
        validator::assert_valid(&self.registry, &self.catalog)
    }

    /// Map `source`, declared as `source_type`, onto `destination_type`.
    pub fn map(
        &self,
        source: &Value,
        source_type: &ValueType,
        destination_type: &ValueType,
    ) -> Result<Value> {
        self.convert(source, source_type, destination_type)
    }

    /// Map an object declared as its own runtime type.
    pub fn map_object(&self, source: &Object, destination_type: &ValueType) -> Result<Value> {
        let declared = ValueType::Object(source.type_name().clone());
        self.convert(&Value::Object(source.clone()), &declared, destination_type)
    }

    /// Map a JSON document. Objects may carry a `"$type"` key naming their
    /// runtime type; the output carries one wherever the runtime type
    /// differs from the declared one.
    pub fn map_json(
        &self,
        source: &Json,
        source_type: &ValueType,
        destination_type: &ValueType,
    ) -> Result<Json> {
        let value = Value::from_json(source, source_type, &self.catalog)?;
        let mapped = self.convert(&value, source_type, destination_type)?;
        Ok(mapped.to_json(destination_type, &self.catalog))
    }

    /// Map between Rust types through their JSON form.
    pub fn map_serde<S, D>(
        &self,
        source: &S,
        source_type: &ValueType,
        destination_type: &ValueType,
    ) -> Result<D>
    where
        S: Serialize,
        D: DeserializeOwned,
    {
        let json =
            serde_json::to_value(source).map_err(|e| MapperError::InvalidJson(e.to_string()))?;
        let mapped = self.map_json(&json, source_type, destination_type)?;
        serde_json::from_value(mapped).map_err(|e| MapperError::InvalidJson(e.to_string()))
    }

    fn convert(
        &self,
        value: &Value,
        declared_source: &ValueType,
        destination: &ValueType,
    ) -> Result<Value> {
        match (value, destination) {
            (Value::Null, _) => Ok(Value::Null),
            (Value::List(items), ValueType::List(element)) => {
                let declared_element = declared_source.element_type().unwrap_or(&ValueType::Any);
                items
                    .iter()
                    .map(|item| self.convert(item, declared_element, element))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::List)
            }
            (Value::Object(object), _) => {
                self.map_object_as(value, object, declared_source, destination)
            }
            _ => self.convert_leaf(value, destination),
        }
    }

    fn map_object_as(
        &self,
        value: &Value,
        object: &Object,
        declared_source: &ValueType,
        destination: &ValueType,
    ) -> Result<Value> {
        if destination == &ValueType::Any {
            return Ok(value.clone());
        }
        let runtime = object.type_name();
        let declared = match declared_source {
            ValueType::Object(name) => name.clone(),
            _ => runtime.clone(),
        };
        let pair = TypePair::new(declared, destination.type_name());

        if let Some(map) = self.registry.dispatch(&pair, runtime, &self.catalog)? {
            return self.apply_type_map(map, value, object);
        }
        if self.catalog.is_assignable(&pair.destination, runtime) {
            trace!(pair = %pair, runtime = %runtime, "assigned object directly");
            return Ok(value.clone());
        }
        if destination.is_scalar() {
            return Err(MapperError::IncompatibleScalarConversion {
                from: runtime.clone(),
                to: pair.destination,
            });
        }
        if self.settings.convention_mapping {
            trace!(pair = %pair, runtime = %runtime, "mapping by convention");
            let transient = self.build_type_map(TypePair::new(runtime, pair.destination))?;
            return self.apply_type_map(&transient, value, object);
        }
        Err(MapperError::MissingTypeMap {
            source_type: pair.source,
            destination_type: pair.destination,
        })
    }

    fn convert_leaf(&self, value: &Value, destination: &ValueType) -> Result<Value> {
        if let Some(runtime) = value.runtime_type() {
            let pair = TypePair::new(runtime.type_name(), destination.type_name());
            if let Some(converter) = self.registry.find(&pair).and_then(TypeMap::converter) {
                return run_converter(&pair, converter, value);
            }
        }
        scalar::coerce(value, destination)
    }

    fn apply_type_map(&self, map: &TypeMap, value: &Value, source: &Object) -> Result<Value> {
        if let Some(converter) = map.converter() {
            return run_converter(map.pair(), converter, value);
        }
        if map.destination_type().is_scalar() {
            return Err(MapperError::IncompatibleScalarConversion {
                from: source.type_name().clone(),
                to: map.destination_type().clone(),
            });
        }
        let mut destination = self.catalog.instantiate(map.destination_type())?;
        for property_map in map.property_maps() {
            let member = property_map.destination_member();
            if property_map.is_ignored() || !member.is_writable() {
                continue;
            }
            let resolved = resolve_member(map, property_map, value, source)?;
            let resolved = match (resolved, property_map.null_substitute()) {
                (Value::Null, Some(substitute)) => substitute.clone(),
                (Value::Null, None) => continue,
                (resolved, _) => resolved,
            };
            let declared = match property_map.resolution() {
                Resolution::Chain(chain) => chain.value_type().clone(),
                _ => ValueType::Any,
            };
            let converted = self.convert(&resolved, &declared, member.value_type())?;
            destination.set(member.name(), self.format(map, property_map, converted));
        }
        Ok(Value::Object(destination))
    }

    /// Profile formatters not skipped by the member, then the member's own.
    fn format(&self, map: &TypeMap, property_map: &PropertyMap, value: Value) -> Value {
        self.registry
            .profile_formatters(map.profile())
            .iter()
            .filter(|entry| !property_map.is_formatter_skipped(entry.key()))
            .chain(property_map.formatters())
            .fold(value, |value, entry| entry.apply(value))
    }
}

fn resolve_member(
    map: &TypeMap,
    property_map: &PropertyMap,
    value: &Value,
    source: &Object,
) -> Result<Value> {
    Ok(match property_map.resolution() {
        Resolution::Unresolved | Resolution::Ignored => Value::Null,
        Resolution::Chain(chain) => chain.read(source),
        Resolution::Expression(expression) => expression(source),
        Resolution::Resolver {
            source: resolver,
            from_member,
        } => {
            let failed = |message: String| MapperError::ResolverConstruction {
                target: format!("{}.{}", map.destination_type(), property_map.destination_name()),
                message,
            };
            let resolver = resolver.instantiate().map_err(failed)?;
            let input = match from_member {
                Some(expression) => expression(source),
                None => value.clone(),
            };
            resolver.resolve(&input).map_err(failed)?
        }
    })
}

fn run_converter(pair: &TypePair, converter: &ConverterSource, value: &Value) -> Result<Value> {
    let failed = |message: String| MapperError::ResolverConstruction {
        target: pair.to_string(),
        message,
    };
    let converter = converter.instantiate().map_err(failed)?;
    converter.convert(value).map_err(failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::TypeDescriptor;

    fn catalog() -> TypeCatalog {
        TypeCatalog::new()
            .with(
                TypeDescriptor::new("Order")
                    .property("Id", ValueType::Int)
                    .property("Customer", ValueType::object("Customer"))
                    .property("Lines", ValueType::list(ValueType::object("Line"))),
            )
            .with(TypeDescriptor::new("Customer").property("Name", ValueType::String))
            .with(TypeDescriptor::new("Line").property("Qty", ValueType::Int))
            .with(
                TypeDescriptor::new("OrderDto")
                    .property("Id", ValueType::String)
                    .property("CustomerName", ValueType::String)
                    .property("Lines", ValueType::list(ValueType::object("LineDto"))),
            )
            .with(TypeDescriptor::new("LineDto").property("Qty", ValueType::Float))
    }

    fn order() -> Object {
        Object::new("Order")
            .with("Id", 7)
            .with("Customer", Object::new("Customer").with("Name", "Ada"))
            .with(
                "Lines",
                vec![
                    Value::from(Object::new("Line").with("Qty", 2)),
                    Value::from(Object::new("Line").with("Qty", 3)),
                ],
            )
    }

    #[test]
    fn mapper_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Mapper>();
    }

    #[test]
    fn flattens_converts_and_maps_collections() {
        let mut mapper = Mapper::new(catalog());
        mapper.create_map("Order", "OrderDto").unwrap();
        mapper.create_map("Line", "LineDto").unwrap();
        mapper.assert_configuration_is_valid().unwrap();

        let mapped = mapper.map_object(&order(), &"OrderDto".into()).unwrap();
        let dto = mapped.as_object().unwrap();
        assert_eq!(dto.type_name().as_str(), "OrderDto");
        assert_eq!(dto.get("Id"), Some(&Value::from("7")));
        assert_eq!(dto.get("CustomerName"), Some(&Value::from("Ada")));
        let lines = dto.get("Lines").and_then(Value::as_list).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].as_object().unwrap().get("Qty"), Some(&Value::Float(3.0)));
    }

    #[test]
    fn null_source_maps_to_null_without_lookup() {
        let mapper = Mapper::new(catalog());
        let mapped = mapper
            .map(&Value::Null, &"Order".into(), &"OrderDto".into())
            .unwrap();
        assert!(mapped.is_null());
    }

    #[test]
    fn missing_nested_map_aborts_the_whole_call() {
        let mut mapper = Mapper::new(catalog());
        mapper.create_map("Order", "OrderDto").unwrap();
        let err = mapper.map_object(&order(), &"OrderDto".into()).unwrap_err();
        assert!(matches!(
            err,
            MapperError::MissingTypeMap { ref source_type, ref destination_type }
                if source_type.as_str() == "Line" && destination_type.as_str() == "LineDto"
        ));
    }

    #[test]
    fn convention_mapping_uses_a_transient_map() {
        let settings = MapperSettings {
            convention_mapping: true,
            maps: Vec::new(),
        };
        let mut mapper = Mapper::with_settings(catalog(), settings).unwrap();
        mapper.create_map("Order", "OrderDto").unwrap();
        let mapped = mapper.map_object(&order(), &"OrderDto".into()).unwrap();
        let lines = mapped.as_object().unwrap().get("Lines").unwrap();
        assert_eq!(lines.as_list().map(<[Value]>::len), Some(2));
        assert!(mapper.find_type_map("Line", "LineDto").is_none());
    }

    #[test]
    fn scalar_pair_converter_overrides_the_table() {
        let mut mapper = Mapper::new(
            TypeCatalog::new()
                .with(TypeDescriptor::new("Source").property("Value", ValueType::String))
                .with(TypeDescriptor::new("Destination").property("Value", ValueType::Int)),
        );
        mapper.create_map("Source", "Destination").unwrap();
        let source = Object::new("Source").with("Value", "45");

        let err = mapper.map_object(&source, &"Destination".into()).unwrap_err();
        assert!(matches!(err, MapperError::IncompatibleScalarConversion { .. }));

        mapper
            .create_map("string", "int")
            .unwrap()
            .convert_using(|v| {
                v.as_str()
                    .ok_or_else(|| "expected text".to_string())?
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|e| e.to_string())
            });
        let mapped = mapper.map_object(&source, &"Destination".into()).unwrap();
        assert_eq!(mapped.as_object().unwrap().get("Value"), Some(&Value::Int(45)));
    }

    #[test]
    fn failing_converter_factory_surfaces_as_resolver_error() {
        let mut mapper = Mapper::new(catalog());
        mapper
            .create_map("Line", "LineDto")
            .unwrap()
            .convert_using_factory(|| Err("no converter today".to_string()));
        let line = Object::new("Line").with("Qty", 1);
        let err = mapper.map_object(&line, &"LineDto".into()).unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"resolver for Line -> LineDto failed: no converter today");
    }

    #[test]
    fn json_variant_round_trips_through_the_catalog() {
        let mut mapper = Mapper::new(catalog());
        mapper.create_map("Line", "LineDto").unwrap();
        let mapped = mapper
            .map_json(
                &serde_json::json!([{ "Qty": 4 }, null]),
                &"[Line]".into(),
                &"[LineDto]".into(),
            )
            .unwrap();
        assert_eq!(mapped, serde_json::json!([{ "Qty": 4.0 }, null]));
    }

    #[test]
    fn scalar_map_without_converter_is_an_incompatible_conversion() {
        let mut mapper = Mapper::new(catalog());
        mapper.create_map("Customer", "string").unwrap();
        assert!(!mapper.validate().is_accepted());

        let customer = Object::new("Customer").with("Name", "Ada");
        let err = mapper.map_object(&customer, &ValueType::String).unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"cannot convert Customer to string without a registered converter");
    }

    #[test]
    fn unmapped_subtype_is_assigned_as_is() {
        let mapper = Mapper::new(
            TypeCatalog::new()
                .with(TypeDescriptor::new("Animal").property("Name", ValueType::String))
                .with(TypeDescriptor::new("Dog").extends("Animal")),
        );
        let dog = Object::new("Dog").with("Name", "Rex");
        let mapped = mapper
            .map(&Value::from(dog.clone()), &"Dog".into(), &"Animal".into())
            .unwrap();
        assert_eq!(mapped, Value::from(dog));

        let animal = Object::new("Animal").with("Name", "Generic");
        let err = mapper
            .map(&Value::from(animal), &"Animal".into(), &"Dog".into())
            .unwrap_err();
        assert!(matches!(err, MapperError::MissingTypeMap { .. }));
    }
}
