//! Type descriptors: the introspection view of a shape.
//!
//! A type exposes an ordered set of members. Each member has a name, a
//! declared value type, and (usually) a read accessor. Properties, fields,
//! and zero-argument methods all share the one [`MemberDescriptor`] shape,
//! so the matcher and the flattening resolver never care which kind of
//! member they are looking at.
//!
//! Descriptors are registered once in a [`TypeCatalog`]. The catalog
//! derives the inherited member list of a type on first use and caches it
//! for the life of the catalog.

use crate::error::{MapperError, Result};
use crate::value::{Object, Value, ValueType};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Names of the built-in scalar types. These never need a descriptor.
pub const SCALAR_TYPE_NAMES: &[&str] = &["bool", "int", "float", "string", "datetime", "any"];

/// Identifier for a type, source or destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(String);

impl TypeName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this names a built-in scalar (or a list of them).
    pub fn is_scalar(&self) -> bool {
        let inner = self.0.trim_start_matches('[').trim_end_matches(']');
        SCALAR_TYPE_NAMES.contains(&inner)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TypeName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for TypeName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<&TypeName> for TypeName {
    fn from(name: &TypeName) -> Self {
        name.clone()
    }
}

impl Borrow<str> for TypeName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// What sort of member a descriptor stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    Property,
    Field,
    Method,
}

/// Computed read of a member off an object.
pub type ReadFn = Arc<dyn Fn(&Object) -> Value + Send + Sync>;

#[derive(Clone)]
enum Accessor {
    /// Backed by the object slot of the same name.
    Slot,
    /// Backed by a slot, but the member cannot be read.
    WriteOnly,
    /// Computed from the object (zero-argument method, getter-only property).
    Computed(ReadFn),
    /// Cannot be read at all (a method with required arguments).
    Unavailable,
}

/// One member of a type.
#[derive(Clone)]
pub struct MemberDescriptor {
    name: String,
    kind: MemberKind,
    value_type: ValueType,
    arity: usize,
    writable: bool,
    accessor: Accessor,
}

impl MemberDescriptor {
    /// A read/write property backed by its slot.
    pub fn property(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Property,
            value_type,
            arity: 0,
            writable: true,
            accessor: Accessor::Slot,
        }
    }

    /// A public field backed by its slot.
    pub fn field(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            kind: MemberKind::Field,
            ..Self::property(name, value_type)
        }
    }

    /// A getter-only property whose value is computed from the object.
    pub fn computed_property<F, V>(name: impl Into<String>, value_type: ValueType, read: F) -> Self
    where
        F: Fn(&Object) -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        Self {
            name: name.into(),
            kind: MemberKind::Property,
            value_type,
            arity: 0,
            writable: false,
            accessor: Accessor::Computed(Arc::new(move |object: &Object| -> Value {
                read(object).into()
            })),
        }
    }

    /// A setter-only property. It stores into its slot but is never a
    /// source candidate.
    pub fn write_only_property(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            accessor: Accessor::WriteOnly,
            ..Self::property(name, value_type)
        }
    }

    /// A zero-argument method.
    pub fn method<F, V>(name: impl Into<String>, value_type: ValueType, call: F) -> Self
    where
        F: Fn(&Object) -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        Self {
            name: name.into(),
            kind: MemberKind::Method,
            value_type,
            arity: 0,
            writable: false,
            accessor: Accessor::Computed(Arc::new(move |object: &Object| -> Value {
                call(object).into()
            })),
        }
    }

    /// A method with required arguments. Listed for completeness, never
    /// matched.
    pub fn method_with_args(name: impl Into<String>, value_type: ValueType, arity: usize) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Method,
            value_type,
            arity,
            writable: false,
            accessor: Accessor::Unavailable,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn is_readable(&self) -> bool {
        matches!(self.accessor, Accessor::Slot | Accessor::Computed(_))
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Whether the member is stored in an object slot of its own name.
    pub fn is_slot_backed(&self) -> bool {
        matches!(self.accessor, Accessor::Slot | Accessor::WriteOnly)
    }

    /// Destination members are the properties and fields of a type.
    pub fn is_destination_member(&self) -> bool {
        self.kind != MemberKind::Method
    }

    /// Whether the member may appear in a source chain at all.
    pub fn is_source_candidate(&self) -> bool {
        self.arity == 0 && self.is_readable()
    }

    /// Read the member off `object`. Unreadable members yield `Null`.
    pub fn read(&self, object: &Object) -> Value {
        match &self.accessor {
            Accessor::Slot => object.get(&self.name).cloned().unwrap_or(Value::Null),
            Accessor::Computed(read) => read(object),
            Accessor::WriteOnly | Accessor::Unavailable => Value::Null,
        }
    }
}

impl fmt::Debug for MemberDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("value_type", &self.value_type)
            .field("arity", &self.arity)
            .field("readable", &self.is_readable())
            .field("writable", &self.writable)
            .finish()
    }
}

/// The declared shape of one type.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    name: TypeName,
    base: Option<TypeName>,
    interfaces: Vec<TypeName>,
    is_abstract: bool,
    members: Vec<MemberDescriptor>,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<TypeName>) -> Self {
        Self {
            name: name.into(),
            base: None,
            interfaces: Vec::new(),
            is_abstract: false,
            members: Vec::new(),
        }
    }

    /// Declare an interface. Interfaces are abstract by construction.
    pub fn interface(name: impl Into<TypeName>) -> Self {
        Self::new(name).abstract_type()
    }

    pub fn extends(mut self, base: impl Into<TypeName>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<TypeName>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn member(mut self, member: MemberDescriptor) -> Self {
        self.members.push(member);
        self
    }

    pub fn property(self, name: impl Into<String>, value_type: ValueType) -> Self {
        self.member(MemberDescriptor::property(name, value_type))
    }

    pub fn field(self, name: impl Into<String>, value_type: ValueType) -> Self {
        self.member(MemberDescriptor::field(name, value_type))
    }

    pub fn method<F, V>(self, name: impl Into<String>, value_type: ValueType, call: F) -> Self
    where
        F: Fn(&Object) -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        self.member(MemberDescriptor::method(name, value_type, call))
    }

    pub fn name(&self) -> &TypeName {
        &self.name
    }

    pub fn base(&self) -> Option<&TypeName> {
        self.base.as_ref()
    }

    pub fn interfaces(&self) -> &[TypeName] {
        &self.interfaces
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Members declared on this type only, without inherited ones.
    pub fn own_members(&self) -> &[MemberDescriptor] {
        &self.members
    }

    /// Direct supertypes: the base first, then interfaces in declaration order.
    fn supertypes(&self) -> impl Iterator<Item = &TypeName> {
        self.base.iter().chain(self.interfaces.iter())
    }
}

/// Registered descriptors plus the cached, inheritance-flattened member
/// lists derived from them.
#[derive(Debug, Default)]
pub struct TypeCatalog {
    types: HashMap<TypeName, TypeDescriptor>,
    members: RwLock<HashMap<TypeName, Arc<[MemberDescriptor]>>>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration.
    pub fn with(mut self, descriptor: TypeDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    /// Register (or replace) a descriptor. Any cached member lists are
    /// dropped since inheritance may have changed.
    pub fn register(&mut self, descriptor: TypeDescriptor) -> &mut Self {
        self.types.insert(descriptor.name.clone(), descriptor);
        self.members.get_mut().clear();
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn descriptor(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// All members of `name`, inherited ones included, in discovery order:
    /// own members, then the base chain, then interfaces. The first member
    /// seen under a given name wins.
    pub fn members(&self, name: &TypeName) -> Result<Arc<[MemberDescriptor]>> {
        if let Some(cached) = self.members.read().get(name) {
            return Ok(Arc::clone(cached));
        }
        if !self.contains(name.as_str()) {
            return Err(MapperError::UnknownType(name.clone()));
        }

        let mut visited = HashSet::new();
        let mut seen = HashSet::new();
        let mut collected = Vec::new();
        self.collect_members(name, &mut visited, &mut seen, &mut collected);
        let members: Arc<[MemberDescriptor]> = collected.into();

        // A concurrent reader may have computed the same list; either copy is fine.
        self.members
            .write()
            .insert(name.clone(), Arc::clone(&members));
        Ok(members)
    }

    fn collect_members(
        &self,
        name: &TypeName,
        visited: &mut HashSet<TypeName>,
        seen: &mut HashSet<String>,
        out: &mut Vec<MemberDescriptor>,
    ) {
        if !visited.insert(name.clone()) {
            return;
        }
        let Some(descriptor) = self.types.get(name) else {
            return;
        };
        for member in &descriptor.members {
            if seen.insert(member.name.clone()) {
                out.push(member.clone());
            }
        }
        for parent in descriptor.supertypes() {
            self.collect_members(parent, visited, seen, out);
        }
    }

    /// Look up a single member by exact name.
    pub fn member(&self, type_name: &TypeName, member: &str) -> Result<Option<MemberDescriptor>> {
        Ok(self
            .members(type_name)?
            .iter()
            .find(|m| m.name() == member)
            .cloned())
    }

    /// The members a type map has to populate: properties and fields.
    pub fn destination_members(&self, name: &TypeName) -> Result<Vec<MemberDescriptor>> {
        Ok(self
            .members(name)?
            .iter()
            .filter(|m| m.is_destination_member())
            .cloned()
            .collect())
    }

    /// Whether an instance of `runtime` can stand where `target` is declared.
    pub fn is_assignable(&self, target: &TypeName, runtime: &TypeName) -> bool {
        let mut visited = HashSet::new();
        let mut pending = vec![runtime.clone()];
        while let Some(current) = pending.pop() {
            if &current == target {
                return true;
            }
            if !visited.insert(current.clone()) {
                continue;
            }
            if let Some(descriptor) = self.types.get(&current) {
                pending.extend(descriptor.supertypes().cloned());
            }
        }
        false
    }

    /// Default-construct an instance: scalar members get their declared
    /// type's default, everything else starts out `Null`.
    pub fn instantiate(&self, name: &TypeName) -> Result<Object> {
        let descriptor = self
            .types
            .get(name)
            .ok_or_else(|| MapperError::UnknownType(name.clone()))?;
        if descriptor.is_abstract {
            return Err(MapperError::AbstractDestination(name.clone()));
        }
        let mut object = Object::new(name.clone());
        for member in self.members(name)?.iter() {
            if member.is_slot_backed() {
                object.set(member.name(), member.value_type().default_value());
            }
        }
        Ok(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shapes() -> TypeCatalog {
        TypeCatalog::new()
            .with(TypeDescriptor::interface("IShape").property("Name", ValueType::String))
            .with(
                TypeDescriptor::new("Shape")
                    .implements("IShape")
                    .property("Name", ValueType::String)
                    .property("Sides", ValueType::Int),
            )
            .with(
                TypeDescriptor::new("Square")
                    .extends("Shape")
                    .property("Length", ValueType::Float)
                    .method("GetArea", ValueType::Float, |o: &Object| {
                        match o.get("Length") {
                            Some(Value::Float(l)) => Value::Float(l * l),
                            _ => Value::Null,
                        }
                    }),
            )
    }

    #[test]
    fn inherited_members_follow_discovery_order() {
        let catalog = shapes();
        let names: Vec<String> = catalog
            .members(&"Square".into())
            .unwrap()
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        assert_eq!(names, vec!["Length", "GetArea", "Name", "Sides"]);
    }

    #[test]
    fn assignability_walks_bases_and_interfaces() {
        let catalog = shapes();
        assert!(catalog.is_assignable(&"Shape".into(), &"Square".into()));
        assert!(catalog.is_assignable(&"IShape".into(), &"Square".into()));
        assert!(catalog.is_assignable(&"Square".into(), &"Square".into()));
        assert!(!catalog.is_assignable(&"Square".into(), &"Shape".into()));
    }

    #[test]
    fn instantiate_uses_declared_defaults_and_skips_methods() {
        let catalog = shapes();
        let square = catalog.instantiate(&"Square".into()).unwrap();
        assert_eq!(square.get("Sides"), Some(&Value::Int(0)));
        assert_eq!(square.get("Length"), Some(&Value::Float(0.0)));
        assert_eq!(square.get("Name"), Some(&Value::Null));
        assert_eq!(square.get("GetArea"), None);
    }

    #[test]
    fn interfaces_cannot_be_instantiated() {
        let catalog = shapes();
        let err = catalog.instantiate(&"IShape".into()).unwrap_err();
        assert!(matches!(err, MapperError::AbstractDestination(name) if name.as_str() == "IShape"));
    }

    #[test]
    fn unreadable_members_are_not_candidates() {
        let write_only = MemberDescriptor::write_only_property("Secret", ValueType::Int);
        let with_args = MemberDescriptor::method_with_args("Compute", ValueType::Int, 2);
        assert!(!write_only.is_source_candidate());
        assert!(write_only.is_slot_backed());
        assert!(!with_args.is_source_candidate());
        assert!(!with_args.is_destination_member());
    }
}
