//! Type map registry and polymorphic dispatch.
//!
//! The registry holds at most one [`TypeMap`] per ordered type pair, in
//! registration order, plus the profiles whose formatters apply to the maps
//! tagged with them.
//!
//! Dispatch picks the most specific map for a runtime instance. Starting
//! from the map registered for the declared pair, it follows the first
//! Include edge (in registration order) whose source type the instance
//! satisfies, and repeats from there. The deepest map reached wins.

use crate::descriptor::{TypeCatalog, TypeName};
use crate::error::{MapperError, Result};
use crate::type_map::{FormatterEntry, TypeMap, TypePair};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::trace;

/// Formatters shared by every type map tagged with the profile. The
/// unnamed default profile covers maps with no profile tag.
#[derive(Debug, Clone, Default)]
pub struct Profile {
    formatters: Vec<FormatterEntry>,
}

impl Profile {
    pub fn formatters(&self) -> &[FormatterEntry] {
        &self.formatters
    }
}

#[derive(Debug, Clone, Default)]
pub struct TypeMapRegistry {
    maps: Vec<TypeMap>,
    index: HashMap<TypePair, usize>,
    default_profile: Profile,
    profiles: BTreeMap<String, Profile>,
}

impl TypeMapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `map` unless its pair is already present. Returns the map
    /// stored under the pair either way.
    pub fn insert(&mut self, map: TypeMap) -> &mut TypeMap {
        let slot = match self.index.get(map.pair()) {
            Some(&slot) => slot,
            None => {
                let slot = self.maps.len();
                self.index.insert(map.pair().clone(), slot);
                self.maps.push(map);
                slot
            }
        };
        &mut self.maps[slot]
    }

    pub fn find(&self, pair: &TypePair) -> Option<&TypeMap> {
        self.index.get(pair).map(|&slot| &self.maps[slot])
    }

    pub fn find_mut(&mut self, pair: &TypePair) -> Option<&mut TypeMap> {
        self.index.get(pair).map(|&slot| &mut self.maps[slot])
    }

    /// Record an Include edge on `parent`. The included pair is resolved
    /// by identity when dispatch needs it, so it may be registered later.
    pub fn include(&mut self, parent: &TypePair, include: TypePair) -> Result<()> {
        let map = self
            .find_mut(parent)
            .ok_or_else(|| MapperError::MissingTypeMap {
                source_type: parent.source.clone(),
                destination_type: parent.destination.clone(),
            })?;
        map.add_include(include);
        Ok(())
    }

    /// Every registered map, in registration order.
    pub fn type_maps(&self) -> &[TypeMap] {
        &self.maps
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// Drop every map and profile.
    pub fn reset(&mut self) {
        self.maps.clear();
        self.index.clear();
        self.default_profile = Profile::default();
        self.profiles.clear();
    }

    pub fn profile(&self, name: Option<&str>) -> Option<&Profile> {
        match name {
            None => Some(&self.default_profile),
            Some(name) => self.profiles.get(name),
        }
    }

    pub fn add_formatter(&mut self, profile: Option<&str>, formatter: FormatterEntry) {
        let profile = match profile {
            None => &mut self.default_profile,
            Some(name) => self.profiles.entry(name.to_string()).or_default(),
        };
        profile.formatters.push(formatter);
    }

    /// Formatters applied to members of a map tagged with `profile`.
    pub fn profile_formatters(&self, profile: Option<&str>) -> &[FormatterEntry] {
        self.profile(profile)
            .map(Profile::formatters)
            .unwrap_or_default()
    }

    /// Select the map for an instance of `runtime` declared as `declared`.
    ///
    /// Returns `Ok(None)` when nothing is registered for the declared pair,
    /// nor for `(runtime, declared.destination)`. The caller decides between
    /// convention mapping and a `MissingTypeMap` error.
    pub fn dispatch(
        &self,
        declared: &TypePair,
        runtime: &TypeName,
        catalog: &TypeCatalog,
    ) -> Result<Option<&TypeMap>> {
        let root = match self.find(declared) {
            Some(map) => map,
            None if runtime != &declared.source => {
                let exact = TypePair::new(runtime.clone(), declared.destination.clone());
                match self.find(&exact) {
                    Some(map) => map,
                    None => return Ok(None),
                }
            }
            None => return Ok(None),
        };
        let mut visited = HashSet::new();
        let chosen = self.most_specific(root, runtime, catalog, &mut visited)?;
        trace!(
            declared = %declared,
            runtime = %runtime,
            chosen = %chosen.pair(),
            "dispatched type map"
        );
        Ok(Some(chosen))
    }

    fn most_specific<'a>(
        &'a self,
        map: &'a TypeMap,
        runtime: &TypeName,
        catalog: &TypeCatalog,
        visited: &mut HashSet<TypePair>,
    ) -> Result<&'a TypeMap> {
        if !visited.insert(map.pair().clone()) {
            return Ok(map);
        }
        for edge in map.includes() {
            if !catalog.is_assignable(&edge.source, runtime) {
                continue;
            }
            let included = self
                .find(edge)
                .ok_or_else(|| MapperError::MissingTypeMap {
                    source_type: edge.source.clone(),
                    destination_type: edge.destination.clone(),
                })?;
            return self.most_specific(included, runtime, catalog, visited);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::TypeDescriptor;
    use crate::value::{Value, ValueType};

    fn animals() -> TypeCatalog {
        TypeCatalog::new()
            .with(TypeDescriptor::new("Animal").property("Name", ValueType::String))
            .with(TypeDescriptor::new("Dog").extends("Animal"))
            .with(TypeDescriptor::new("Puppy").extends("Dog"))
            .with(TypeDescriptor::new("Cat").extends("Animal"))
    }

    fn registry_with(pairs: &[(&str, &str)]) -> TypeMapRegistry {
        let mut registry = TypeMapRegistry::new();
        for (source, destination) in pairs {
            registry.insert(TypeMap::new(TypePair::new(*source, *destination), Vec::new()));
        }
        registry
    }

    fn chosen(registry: &TypeMapRegistry, runtime: &str) -> TypePair {
        registry
            .dispatch(&TypePair::new("Animal", "AnimalDto"), &runtime.into(), &animals())
            .unwrap()
            .unwrap()
            .pair()
            .clone()
    }

    #[test]
    fn insert_returns_the_existing_map_for_a_known_pair() {
        let mut registry = registry_with(&[("Animal", "AnimalDto")]);
        registry
            .insert(TypeMap::new(TypePair::new("Animal", "AnimalDto"), Vec::new()))
            .set_profile("second");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.type_maps()[0].profile(), Some("second"));
    }

    #[test]
    fn dispatch_walks_include_chains_to_the_deepest_map() {
        let mut registry = registry_with(&[
            ("Animal", "AnimalDto"),
            ("Dog", "DogDto"),
            ("Puppy", "PuppyDto"),
        ]);
        let root = TypePair::new("Animal", "AnimalDto");
        registry.include(&root, TypePair::new("Dog", "DogDto")).unwrap();
        registry
            .include(&TypePair::new("Dog", "DogDto"), TypePair::new("Puppy", "PuppyDto"))
            .unwrap();

        assert_eq!(chosen(&registry, "Puppy"), TypePair::new("Puppy", "PuppyDto"));
        assert_eq!(chosen(&registry, "Dog"), TypePair::new("Dog", "DogDto"));
        assert_eq!(chosen(&registry, "Cat"), root);
    }

    #[test]
    fn earliest_compatible_include_wins() {
        let mut registry = registry_with(&[
            ("Animal", "AnimalDto"),
            ("Dog", "DogDto"),
            ("Puppy", "PuppyDto"),
        ]);
        let root = TypePair::new("Animal", "AnimalDto");
        registry.include(&root, TypePair::new("Dog", "DogDto")).unwrap();
        registry.include(&root, TypePair::new("Puppy", "PuppyDto")).unwrap();

        // Puppy satisfies both edges; the Dog edge was registered first and
        // has no further includes.
        assert_eq!(chosen(&registry, "Puppy"), TypePair::new("Dog", "DogDto"));
    }

    #[test]
    fn unregistered_include_target_is_a_missing_type_map() {
        let mut registry = registry_with(&[("Animal", "AnimalDto")]);
        let root = TypePair::new("Animal", "AnimalDto");
        registry.include(&root, TypePair::new("Dog", "DogDto")).unwrap();

        let err = registry
            .dispatch(&root, &"Dog".into(), &animals())
            .unwrap_err();
        assert!(matches!(
            err,
            MapperError::MissingTypeMap { source_type, .. } if source_type.as_str() == "Dog"
        ));
        // Cats never touch the dangling edge.
        assert_eq!(chosen(&registry, "Cat"), root);
    }

    #[test]
    fn runtime_pair_is_used_when_the_declared_pair_is_missing() {
        let registry = registry_with(&[("Dog", "AnimalDto")]);
        assert_eq!(chosen(&registry, "Dog"), TypePair::new("Dog", "AnimalDto"));
        assert!(
            registry
                .dispatch(&TypePair::new("Animal", "AnimalDto"), &"Cat".into(), &animals())
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn include_on_unknown_parent_fails() {
        let mut registry = TypeMapRegistry::new();
        let err = registry
            .include(&TypePair::new("A", "B"), TypePair::new("C", "D"))
            .unwrap_err();
        assert!(matches!(err, MapperError::MissingTypeMap { .. }));
    }

    #[test]
    fn reset_clears_maps_and_profiles() {
        let mut registry = registry_with(&[("Animal", "AnimalDto")]);
        registry.add_formatter(Some("loud"), FormatterEntry::new(|v: Value| v));
        registry.reset();
        assert!(registry.is_empty());
        assert!(registry.find(&TypePair::new("Animal", "AnimalDto")).is_none());
        assert!(registry.profile(Some("loud")).is_none());
    }
}
