//! Configuration surface for one type map.
//!
//! [`Mapper::create_map`](crate::Mapper::create_map) hands back a
//! [`MappingExpression`] borrowing the freshly registered map. Member
//! overrides go through [`MemberOptions`]; each override replaces whatever
//! the name matcher found for that member.

use crate::error::{MapperError, Result};
use crate::registry::TypeMapRegistry;
use crate::type_map::{
    ConverterSource, FormatterEntry, PropertyMap, Resolution, ResolverSource, SourceExpression,
    TypeConverter, TypeMap, TypePair, ValueFormatter, ValueResolver,
};
use crate::value::{Object, Value};
use std::sync::Arc;

/// Options collected by a `for_member` / `for_all_members` callback.
#[derive(Clone, Default)]
pub struct MemberOptions {
    ignore: bool,
    map_from: Option<SourceExpression>,
    resolver: Option<ResolverSource>,
    from_member: Option<SourceExpression>,
    null_substitute: Option<Value>,
    formatters: Vec<FormatterEntry>,
    skipped_formatters: Vec<&'static str>,
}

impl MemberOptions {
    /// Leave the member at its default and stop reporting it as unmapped.
    pub fn ignore(&mut self) -> &mut Self {
        self.ignore = true;
        self
    }

    /// Take the value from a closure over the source object.
    pub fn map_from<F, V>(&mut self, expression: F) -> &mut Self
    where
        F: Fn(&Object) -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        self.map_from = Some(Arc::new(move |source: &Object| -> Value {
            expression(source).into()
        }));
        self
    }

    /// Compute the value with a resolver instance.
    pub fn resolve_using<R: ValueResolver + 'static>(&mut self, resolver: R) -> &mut Self {
        self.resolver = Some(ResolverSource::Instance(Arc::new(resolver)));
        self
    }

    /// Compute the value with a fresh `R` per mapping call.
    pub fn resolve_using_type<R: ValueResolver + Default + 'static>(&mut self) -> &mut Self {
        self.resolver = Some(ResolverSource::Factory(Arc::new(
            || -> std::result::Result<Arc<dyn ValueResolver>, String> {
                Ok(Arc::new(R::default()))
            },
        )));
        self
    }

    /// Compute the value with a resolver built by `constructor` per mapping
    /// call. A constructor error aborts the mapping.
    pub fn resolve_using_factory<F>(&mut self, constructor: F) -> &mut Self
    where
        F: Fn() -> std::result::Result<Arc<dyn ValueResolver>, String> + Send + Sync + 'static,
    {
        self.resolver = Some(ResolverSource::Factory(Arc::new(constructor)));
        self
    }

    /// Feed the resolver this value instead of the whole source object.
    pub fn from_member<F, V>(&mut self, expression: F) -> &mut Self
    where
        F: Fn(&Object) -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        self.from_member = Some(Arc::new(move |source: &Object| -> Value {
            expression(source).into()
        }));
        self
    }

    /// Value assigned when the resolved value is `Null`.
    pub fn format_null_value_as(&mut self, substitute: impl Into<Value>) -> &mut Self {
        self.null_substitute = Some(substitute.into());
        self
    }

    pub fn add_formatter<F: ValueFormatter + 'static>(&mut self, formatter: F) -> &mut Self {
        self.formatters.push(FormatterEntry::new(formatter));
        self
    }

    /// Do not run profile formatter `F` on this member.
    pub fn skip_formatter<F: ValueFormatter + 'static>(&mut self) -> &mut Self {
        self.skipped_formatters.push(std::any::type_name::<F>());
        self
    }

    fn resolution(&self) -> Option<Resolution> {
        if self.ignore {
            return Some(Resolution::Ignored);
        }
        if let Some(resolver) = &self.resolver {
            return Some(Resolution::Resolver {
                source: resolver.clone(),
                from_member: self.from_member.clone(),
            });
        }
        self.map_from
            .as_ref()
            .or(self.from_member.as_ref())
            .map(|expression| Resolution::Expression(Arc::clone(expression)))
    }

    pub(crate) fn apply(&self, property_map: &mut PropertyMap) {
        if let Some(resolution) = self.resolution() {
            property_map.set_resolution(resolution);
        }
        if let Some(substitute) = &self.null_substitute {
            property_map.set_null_substitute(substitute.clone());
        }
        for formatter in &self.formatters {
            property_map.push_formatter(formatter.clone());
        }
        for key in &self.skipped_formatters {
            property_map.skip_formatter(key);
        }
    }
}

/// Fluent handle on one registered type map.
pub struct MappingExpression<'m> {
    map: &'m mut TypeMap,
}

impl<'m> MappingExpression<'m> {
    pub(crate) fn new(map: &'m mut TypeMap) -> Self {
        Self { map }
    }

    pub fn pair(&self) -> &TypePair {
        self.map.pair()
    }

    pub fn type_map(&self) -> &TypeMap {
        self.map
    }

    /// Override the rule for one destination member.
    pub fn for_member<F>(self, member: &str, configure: F) -> Result<Self>
    where
        F: FnOnce(&mut MemberOptions),
    {
        let mut options = MemberOptions::default();
        configure(&mut options);
        let destination = self.map.destination_type().clone();
        let property_map =
            self.map
                .property_map_mut(member)
                .ok_or_else(|| MapperError::UnknownMember {
                    type_name: destination,
                    member: member.to_string(),
                })?;
        options.apply(property_map);
        Ok(self)
    }

    /// Apply the same options to every destination member.
    pub fn for_all_members<F>(self, configure: F) -> Self
    where
        F: FnOnce(&mut MemberOptions),
    {
        let mut options = MemberOptions::default();
        configure(&mut options);
        for property_map in self.map.property_maps_mut() {
            options.apply(property_map);
        }
        self
    }

    /// Dispatch instances of `source` (a subtype of this map's source) to
    /// the `(source, destination)` map.
    pub fn include(self, source: &str, destination: &str) -> Self {
        self.map.add_include(TypePair::new(source, destination));
        self
    }

    pub fn with_profile(self, profile: &str) -> Self {
        self.map.set_profile(profile);
        self
    }

    /// Replace property-map construction with a whole-object closure.
    pub fn convert_using<F>(self, convert: F) -> Self
    where
        F: Fn(&Value) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        self.convert_using_converter(convert)
    }

    pub fn convert_using_converter<C: TypeConverter + 'static>(self, converter: C) -> Self {
        self.map
            .set_converter(ConverterSource::Instance(Arc::new(converter)));
        self
    }

    /// Build the converter per mapping call. A constructor error aborts
    /// the mapping.
    pub fn convert_using_factory<F>(self, constructor: F) -> Self
    where
        F: Fn() -> std::result::Result<Arc<dyn TypeConverter>, String> + Send + Sync + 'static,
    {
        self.map
            .set_converter(ConverterSource::Factory(Arc::new(constructor)));
        self
    }
}

/// Handle on a named profile, for adding formatters shared by every type
/// map tagged with it.
pub struct ProfileExpression<'m> {
    registry: &'m mut TypeMapRegistry,
    name: String,
}

impl<'m> ProfileExpression<'m> {
    pub(crate) fn new(registry: &'m mut TypeMapRegistry, name: impl Into<String>) -> Self {
        Self {
            registry,
            name: name.into(),
        }
    }

    pub fn add_formatter<F: ValueFormatter + 'static>(self, formatter: F) -> Self {
        self.registry
            .add_formatter(Some(&self.name), FormatterEntry::new(formatter));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::MemberDescriptor;
    use crate::value::ValueType;

    fn blank_map() -> TypeMap {
        TypeMap::new(
            TypePair::new("Source", "Destination"),
            vec![
                PropertyMap::new(
                    MemberDescriptor::property("Value", ValueType::String),
                    Resolution::Unresolved,
                ),
                PropertyMap::new(
                    MemberDescriptor::property("Other", ValueType::String),
                    Resolution::Unresolved,
                ),
            ],
        )
    }

    #[test]
    fn for_member_on_unknown_name_fails() {
        let mut map = blank_map();
        let err = MappingExpression::new(&mut map)
            .for_member("Nope", |opt| {
                opt.ignore();
            })
            .err()
            .unwrap();
        assert!(matches!(err, MapperError::UnknownMember { member, .. } if member == "Nope"));
    }

    #[test]
    fn ignore_wins_over_other_options() {
        let mut map = blank_map();
        MappingExpression::new(&mut map)
            .for_member("Value", |opt| {
                opt.map_from(|_| "x").ignore();
            })
            .unwrap();
        assert!(map.property_map("Value").unwrap().is_ignored());
    }

    #[test]
    fn resolver_takes_from_member_as_input() {
        let mut map = blank_map();
        MappingExpression::new(&mut map)
            .for_member("Value", |opt| {
                let echo = |v: &Value| -> std::result::Result<Value, String> { Ok(v.clone()) };
                opt.resolve_using(echo)
                    .from_member(|o| o.get("Raw").cloned());
            })
            .unwrap();
        let resolution = map.property_map("Value").unwrap().resolution();
        assert!(matches!(
            resolution,
            Resolution::Resolver {
                from_member: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn for_all_members_touches_every_property_map() {
        let mut map = blank_map();
        MappingExpression::new(&mut map).for_all_members(|opt| {
            opt.format_null_value_as("n/a");
        });
        assert!(
            map.property_maps()
                .iter()
                .all(|pm| pm.null_substitute() == Some(&Value::from("n/a")))
        );
        assert_eq!(map.unmapped_member_names().len(), 2);
    }

    #[test]
    fn include_and_profile_land_on_the_map() {
        let mut map = blank_map();
        MappingExpression::new(&mut map)
            .include("SubSource", "SubDestination")
            .with_profile("api");
        assert_eq!(map.includes(), &[TypePair::new("SubSource", "SubDestination")]);
        assert_eq!(map.profile(), Some("api"));
    }
}
