//! Flattening: finding a source for a destination member name.
//!
//! A destination member either matches a source member directly, or its
//! name decomposes into a chain of nested source members whose names
//! concatenate to it: `SubSubSubIAmACoolProperty` resolves through
//! `Sub` → `SubSub` → `IAmACoolProperty`.
//!
//! The search is greedy and depth-first. Prefix candidates are tried in the
//! source type's member order and the first one whose remainder resolves
//! wins; later siblings are never compared against it.

use crate::descriptor::{MemberDescriptor, TypeCatalog, TypeName};
use crate::error::Result;
use crate::matcher;
use crate::value::{Object, Value, ValueType};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use tracing::trace;

/// A non-empty path of source members, read one after the other.
#[derive(Clone)]
pub struct MemberChain(Vec<MemberDescriptor>);

impl MemberChain {
    pub fn new(members: Vec<MemberDescriptor>) -> Self {
        Self(members)
    }

    pub fn members(&self) -> &[MemberDescriptor] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Declared type of the value at the end of the chain.
    pub fn value_type(&self) -> &ValueType {
        self.0
            .last()
            .map(MemberDescriptor::value_type)
            .unwrap_or(&ValueType::Any)
    }

    /// Dotted member path, e.g. `Sub.SubSub.IAmACoolProperty`.
    pub fn path(&self) -> String {
        self.0
            .iter()
            .map(MemberDescriptor::name)
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Follow the chain from `source`. A `Null` (or non-object) anywhere
    /// along the way makes the whole chain `Null`.
    pub fn read(&self, source: &Object) -> Value {
        let Some((first, rest)) = self.0.split_first() else {
            return Value::Null;
        };
        let mut current = first.read(source);
        for member in rest {
            current = match &current {
                Value::Object(object) => member.read(object),
                _ => return Value::Null,
            };
        }
        current
    }

    fn prepend(mut self, head: MemberDescriptor) -> Self {
        self.0.insert(0, head);
        self
    }
}

impl fmt::Debug for MemberChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MemberChain").field(&self.path()).finish()
    }
}

/// Resolve `destination` against the members of `source`.
pub fn resolve(
    destination: &str,
    source: &TypeName,
    catalog: &TypeCatalog,
) -> Result<Option<MemberChain>> {
    let members = catalog.members(source)?;

    if let Some(direct) = members.iter().find(|m| matcher::matches(destination, m)) {
        return Ok(Some(MemberChain::new(vec![direct.clone()])));
    }

    for member in members.iter() {
        let Some(rest) = matcher::strip_member_prefix(destination, member) else {
            continue;
        };
        let ValueType::Object(inner) = member.value_type() else {
            continue;
        };
        if !catalog.contains(inner.as_str()) {
            continue;
        }
        if let Some(tail) = resolve(rest, inner, catalog)? {
            return Ok(Some(tail.prepend(member.clone())));
        }
    }

    Ok(None)
}

/// Memo of resolved chains keyed by (source type, destination member name).
///
/// Lookups take a read lock; a miss computes outside the lock and stores
/// the result. Two threads racing on the same key store identical chains.
#[derive(Default)]
pub struct ChainCache {
    entries: RwLock<HashMap<(TypeName, String), Option<MemberChain>>>,
}

impl ChainCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(
        &self,
        destination: &str,
        source: &TypeName,
        catalog: &TypeCatalog,
    ) -> Result<Option<MemberChain>> {
        let key = (source.clone(), destination.to_string());
        if let Some(hit) = self.entries.read().get(&key) {
            return Ok(hit.clone());
        }
        let chain = resolve(destination, source, catalog)?;
        trace!(
            source = %source,
            destination,
            chain = ?chain,
            "resolved member chain"
        );
        self.entries.write().insert(key, chain.clone());
        Ok(chain)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.get_mut().clear();
    }
}

impl fmt::Debug for ChainCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainCache")
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toy;

    fn path_of(destination: &str, source: &str, catalog: &TypeCatalog) -> Option<String> {
        resolve(destination, &source.into(), catalog)
            .unwrap()
            .map(|chain| chain.path())
    }

    #[test]
    fn direct_match_is_a_single_member_chain() {
        let catalog = toy::flattening_catalog();
        let chain = resolve("BaseDate", &"ModelObject".into(), &catalog)
            .unwrap()
            .unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.path(), "BaseDate");
    }

    #[test]
    fn one_level_of_nesting_gives_two_members() {
        let catalog = toy::flattening_catalog();
        assert_eq!(
            path_of("SubProperName", "ModelObject", &catalog).as_deref(),
            Some("Sub.ProperName")
        );
    }

    #[test]
    fn failed_prefix_falls_through_to_next_sibling() {
        let catalog = toy::flattening_catalog();
        // `Sub` is tried first and fails on `2ProperName`; `Sub2` succeeds.
        assert_eq!(
            path_of("Sub2ProperName", "ModelObject", &catalog).as_deref(),
            Some("Sub2.ProperName")
        );
        assert_eq!(
            path_of("SubWithExtraNameProperName", "ModelObject", &catalog).as_deref(),
            Some("SubWithExtraName.ProperName")
        );
    }

    #[test]
    fn nesting_resolves_to_any_depth() {
        let catalog = toy::flattening_catalog();
        assert_eq!(
            path_of("SubSubSubIAmACoolProperty", "ModelObject", &catalog).as_deref(),
            Some("Sub.SubSub.IAmACoolProperty")
        );
        assert_eq!(
            path_of("SubMissingSubSubIAmACoolProperty", "ModelObject", &catalog).as_deref(),
            Some("SubMissing.SubSub.IAmACoolProperty")
        );
    }

    #[test]
    fn nameless_self_typed_member_does_not_recurse() {
        let catalog = TypeCatalog::new().with(
            crate::descriptor::TypeDescriptor::new("Node")
                .property("", ValueType::object("Node"))
                .property("Label", ValueType::String),
        );
        assert_eq!(path_of("NodeValue", "Node", &catalog), None);
        assert_eq!(path_of("label", "Node", &catalog).as_deref(), Some("Label"));
    }

    #[test]
    fn non_ascii_prefixes_flatten() {
        let catalog = TypeCatalog::new()
            .with(
                crate::descriptor::TypeDescriptor::new("Bestellung")
                    .property("Größe", ValueType::object("Maß")),
            )
            .with(crate::descriptor::TypeDescriptor::new("Maß").property("Wert", ValueType::Int));
        assert_eq!(
            path_of("GRÖSSEWert", "Bestellung", &catalog),
            None,
            "ß folds to itself, not to ss"
        );
        assert_eq!(
            path_of("größeWert", "Bestellung", &catalog).as_deref(),
            Some("Größe.Wert")
        );
    }

    #[test]
    fn unresolvable_names_are_absent() {
        let catalog = toy::flattening_catalog();
        assert_eq!(path_of("BaseDate2", "ModelObject", &catalog), None);
    }

    #[test]
    fn get_methods_resolve_through_properties() {
        let catalog = toy::get_methods_catalog();
        assert_eq!(
            path_of("SubSomeOtherCoolValue", "ModelObject", &catalog).as_deref(),
            Some("Sub.GetSomeOtherCoolValue")
        );
    }

    #[test]
    fn chain_reads_null_through_missing_links() {
        let catalog = toy::flattening_catalog();
        let chain = resolve("SubMissingSubSubIAmACoolProperty", &"ModelObject".into(), &catalog)
            .unwrap()
            .unwrap();
        let source = Object::new("ModelObject")
            .with("SubMissing", Object::new("ModelSubObject").with("ProperName", "x"));
        assert_eq!(chain.read(&source), Value::Null);
    }

    #[test]
    fn cache_returns_the_computed_chain() {
        let catalog = toy::flattening_catalog();
        let mut cache = ChainCache::new();
        let first = cache
            .resolve("SubProperName", &"ModelObject".into(), &catalog)
            .unwrap();
        let second = cache
            .resolve("SubProperName", &"ModelObject".into(), &catalog)
            .unwrap();
        assert_eq!(first.map(|c| c.path()), second.map(|c| c.path()));
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
