//! Configuration validation.
//!
//! Walks every registered type map and checks that each destination member
//! of its destination type has a satisfied property map. Maps with a
//! whole-object converter are complete by definition. Maps onto scalar
//! types have no members, so they need a converter. Include edges are
//! checked too: the pair must be registered, and its source and destination
//! must be subtypes of the parent map's source and destination.
//!
//! The report lists every problem found, never just the first.

use crate::descriptor::{TypeCatalog, TypeName};
use crate::error::{MapperError, Result};
use crate::registry::TypeMapRegistry;
use crate::type_map::{TypeMap, TypePair};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

pub mod failure_class {
    pub const UNMAPPED_MEMBERS: &str = "unmapped_destination_members";
    pub const MISSING_INCLUDE: &str = "missing_include_type_map";
    pub const INCLUDE_NOT_SUBTYPE: &str = "include_not_subtype";
    pub const MISSING_SCALAR_CONVERTER: &str = "missing_scalar_converter";
}

/// One type map with destination members nothing accounts for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UnmappedTypeMap {
    pub source: TypeName,
    pub destination: TypeName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    pub unmapped_members: Vec<String>,
}

/// An Include edge reported by the validator, with the map it hangs off.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IncludeEdge {
    pub parent: TypePair,
    pub include: TypePair,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub result: String,
    pub failure_classes: Vec<String>,
    pub unmapped: Vec<UnmappedTypeMap>,
    pub missing_includes: Vec<IncludeEdge>,
    /// Include edges whose pair does not refine the parent pair.
    pub invalid_includes: Vec<IncludeEdge>,
    /// Maps onto a scalar type with no converter.
    pub missing_converters: Vec<TypePair>,
}

#[derive(Default)]
struct Findings {
    unmapped: Vec<UnmappedTypeMap>,
    missing_includes: Vec<IncludeEdge>,
    invalid_includes: Vec<IncludeEdge>,
    missing_converters: Vec<TypePair>,
}

impl ValidationReport {
    fn new(findings: Findings) -> Self {
        let Findings {
            unmapped,
            missing_includes,
            invalid_includes,
            missing_converters,
        } = findings;
        let mut failure_classes = BTreeSet::new();
        if !unmapped.is_empty() {
            failure_classes.insert(failure_class::UNMAPPED_MEMBERS.to_string());
        }
        if !missing_includes.is_empty() {
            failure_classes.insert(failure_class::MISSING_INCLUDE.to_string());
        }
        if !invalid_includes.is_empty() {
            failure_classes.insert(failure_class::INCLUDE_NOT_SUBTYPE.to_string());
        }
        if !missing_converters.is_empty() {
            failure_classes.insert(failure_class::MISSING_SCALAR_CONVERTER.to_string());
        }
        Self {
            result: if failure_classes.is_empty() {
                "accepted".to_string()
            } else {
                "rejected".to_string()
            },
            failure_classes: failure_classes.into_iter().collect(),
            unmapped,
            missing_includes,
            invalid_includes,
            missing_converters,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.result == "accepted"
    }

    /// Unmapped member names for one pair, if that map was reported.
    pub fn unmapped_for(&self, source: &str, destination: &str) -> Option<&[String]> {
        self.unmapped
            .iter()
            .find(|u| u.source.as_str() == source && u.destination.as_str() == destination)
            .map(|u| u.unmapped_members.as_slice())
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_accepted() {
            return write!(f, "accepted");
        }
        let mut lines = Vec::new();
        for entry in &self.unmapped {
            let profile = entry
                .profile
                .as_deref()
                .map(|p| format!(" (profile {p})"))
                .unwrap_or_default();
            lines.push(format!(
                "unmapped members in {} -> {}{profile}: {}",
                entry.source,
                entry.destination,
                entry.unmapped_members.join(", ")
            ));
        }
        for missing in &self.missing_includes {
            lines.push(format!(
                "include {} on {} has no registered type map",
                missing.include, missing.parent
            ));
        }
        for invalid in &self.invalid_includes {
            lines.push(format!(
                "include {} on {} is not a subtype pair",
                invalid.include, invalid.parent
            ));
        }
        for pair in &self.missing_converters {
            lines.push(format!("{pair} maps onto a scalar type without a converter"));
        }
        write!(f, "{}", lines.join("\n"))
    }
}

fn unmapped_members(map: &TypeMap, catalog: &TypeCatalog) -> Vec<String> {
    if map.converter().is_some() || !catalog.contains(map.destination_type().as_str()) {
        return Vec::new();
    }
    let Ok(members) = catalog.destination_members(map.destination_type()) else {
        return Vec::new();
    };
    members
        .iter()
        .filter(|member| {
            !map.property_map(member.name())
                .is_some_and(|property_map| property_map.is_satisfied())
        })
        .map(|member| member.name().to_string())
        .collect()
}

/// `include` may only narrow `parent`: its source must stand where the parent
/// source is declared, and its destination where the parent destination is.
fn refines(parent: &TypePair, include: &TypePair, catalog: &TypeCatalog) -> bool {
    catalog.is_assignable(&parent.source, &include.source)
        && catalog.is_assignable(&parent.destination, &include.destination)
}

/// Check every registered type map. Never fails; inspect the report.
pub fn validate(registry: &TypeMapRegistry, catalog: &TypeCatalog) -> ValidationReport {
    let mut findings = Findings::default();

    for map in registry.type_maps() {
        if map.destination_type().is_scalar() && map.converter().is_none() {
            findings.missing_converters.push(map.pair().clone());
        }
        let members = unmapped_members(map, catalog);
        if !members.is_empty() {
            findings.unmapped.push(UnmappedTypeMap {
                source: map.source_type().clone(),
                destination: map.destination_type().clone(),
                profile: map.profile().map(str::to_string),
                unmapped_members: members,
            });
        }
        for include in map.includes() {
            let edge = IncludeEdge {
                parent: map.pair().clone(),
                include: include.clone(),
            };
            if !refines(map.pair(), include, catalog) {
                findings.invalid_includes.push(edge.clone());
            }
            if registry.find(include).is_none() {
                findings.missing_includes.push(edge);
            }
        }
    }

    let report = ValidationReport::new(findings);
    debug!(
        type_maps = registry.len(),
        result = %report.result,
        unmapped = report.unmapped.len(),
        missing_includes = report.missing_includes.len(),
        invalid_includes = report.invalid_includes.len(),
        missing_converters = report.missing_converters.len(),
        "validated configuration"
    );
    report
}

/// Fail with the full report if anything is unaccounted for.
pub fn assert_valid(registry: &TypeMapRegistry, catalog: &TypeCatalog) -> Result<()> {
    let report = validate(registry, catalog);
    if report.is_accepted() {
        Ok(())
    } else {
        Err(MapperError::UnmappedDestinationMembers { report })
    }
}
