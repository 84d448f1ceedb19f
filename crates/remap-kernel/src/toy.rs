//! Toy type catalogs for resolution and mapping tests.
//!
//! Each catalog models one classic mapping situation: flattening across
//! nested objects, get-methods, polymorphic hierarchies, collections of
//! subtypes, and so on. The fixture runner in `tests/` looks catalogs up
//! by name through [`get_catalog`].
//!
//! ## Catalogs
//!
//! - **flattening**: `ModelObject` with nested `ModelSubObject` /
//!   `ModelSubSubObject` members, flattened onto `ModelDto`. All members
//!   are properties. `flattening_fields` uses public fields throughout and
//!   `flattening_mixed` mixes the two.
//!
//! - **get_methods**: source values exposed only as `GetX()` methods, at
//!   the top level and one level down. `method_names` is the same shape
//!   with methods named exactly like the destination members.
//!
//! - **derived_classes**: `ModelSubObject : ModelObject` onto
//!   `DtoSubObject : DtoObject`.
//!
//! - **interfaces**: `ModelSubObject` implementing `IModelObject`, mapped
//!   onto the abstract `DtoObject` family, both at the top level and as a
//!   member of `Model` / `DtoModel`.
//!
//! - **nested_dto**: a nested source object mapped onto a nested DTO type.
//!
//! - **set_only**: a setter-only `SomeValue` next to a `GetSomeValue()`
//!   method that reads the same backing slot.
//!
//! - **custom_members**: the shape used to exercise `map_from` overrides.
//!
//! - **collections**: a list of `Item` holding `SubItem` instances, mapped
//!   onto a list of `SubItemDto`.
//!
//! - **ignore**: a destination with a get-only `Ignored` property.
//!
//! - **camel_case**: a camelCased destination member fed by a PascalCased
//!   source member.

use crate::descriptor::{MemberDescriptor, TypeCatalog, TypeDescriptor};
use crate::value::{Object, Value, ValueType};

/// Names accepted by [`get_catalog`].
pub const CATALOG_NAMES: &[&str] = &[
    "flattening",
    "flattening_fields",
    "flattening_mixed",
    "get_methods",
    "method_names",
    "derived_classes",
    "interfaces",
    "nested_dto",
    "set_only",
    "custom_members",
    "collections",
    "ignore",
    "camel_case",
];

pub fn get_catalog(name: &str) -> Option<TypeCatalog> {
    match name {
        "flattening" => Some(flattening_catalog()),
        "flattening_fields" => Some(flattening_fields_catalog()),
        "flattening_mixed" => Some(flattening_mixed_catalog()),
        "get_methods" => Some(get_methods_catalog()),
        "method_names" => Some(method_names_catalog()),
        "derived_classes" => Some(derived_classes_catalog()),
        "interfaces" => Some(interfaces_catalog()),
        "nested_dto" => Some(nested_dto_catalog()),
        "set_only" => Some(set_only_catalog()),
        "custom_members" => Some(custom_members_catalog()),
        "collections" => Some(collections_catalog()),
        "ignore" => Some(ignore_catalog()),
        "camel_case" => Some(camel_case_catalog()),
        _ => None,
    }
}

/// Build the flattening shape. `is_field(type, member)` picks which members
/// are public fields; the rest are properties.
fn flattening_with(is_field: impl Fn(&str, &str) -> bool) -> TypeCatalog {
    let descriptor = |type_name: &str, members: &[(&str, ValueType)]| {
        members
            .iter()
            .fold(TypeDescriptor::new(type_name), |descriptor, (name, value_type)| {
                let member = if is_field(type_name, *name) {
                    MemberDescriptor::field(*name, value_type.clone())
                } else {
                    MemberDescriptor::property(*name, value_type.clone())
                };
                descriptor.member(member)
            })
    };
    let sub = ValueType::object("ModelSubObject");

    TypeCatalog::new()
        .with(descriptor(
            "ModelObject",
            &[
                ("BaseDate", ValueType::DateTime),
                ("Sub", sub.clone()),
                ("Sub2", sub.clone()),
                ("SubWithExtraName", sub.clone()),
                ("SubMissing", sub),
            ],
        ))
        .with(descriptor(
            "ModelSubObject",
            &[
                ("ProperName", ValueType::String),
                ("SubSub", ValueType::object("ModelSubSubObject")),
            ],
        ))
        .with(descriptor(
            "ModelSubSubObject",
            &[("IAmACoolProperty", ValueType::String)],
        ))
        .with(descriptor(
            "ModelDto",
            &[
                ("BaseDate", ValueType::DateTime),
                ("BaseDate2", ValueType::DateTime),
                ("SubProperName", ValueType::String),
                ("Sub2ProperName", ValueType::String),
                ("SubWithExtraNameProperName", ValueType::String),
                ("SubSubSubIAmACoolProperty", ValueType::String),
                ("SubMissingSubSubIAmACoolProperty", ValueType::String),
            ],
        ))
}

pub fn flattening_catalog() -> TypeCatalog {
    flattening_with(|_, _| false)
}

pub fn flattening_fields_catalog() -> TypeCatalog {
    flattening_with(|_, _| true)
}

pub fn flattening_mixed_catalog() -> TypeCatalog {
    const FIELDS: &[(&str, &str)] = &[
        ("ModelObject", "Sub"),
        ("ModelObject", "SubWithExtraName"),
        ("ModelSubObject", "SubSub"),
        ("ModelDto", "BaseDate"),
        ("ModelDto", "SubProperName"),
        ("ModelDto", "SubWithExtraNameProperName"),
        ("ModelDto", "SubSubSubIAmACoolProperty"),
    ];
    flattening_with(|type_name, member| FIELDS.contains(&(type_name, member)))
}

fn method_catalog(prefix: &str) -> TypeCatalog {
    TypeCatalog::new()
        .with(
            TypeDescriptor::new("ModelObject")
                .method(format!("{prefix}SomeCoolValue"), ValueType::String, |_| {
                    "Cool value"
                })
                .property("Sub", ValueType::object("ModelSubObject")),
        )
        .with(TypeDescriptor::new("ModelSubObject").method(
            format!("{prefix}SomeOtherCoolValue"),
            ValueType::String,
            |_| "Even cooler",
        ))
        .with(
            TypeDescriptor::new("ModelDto")
                .property("SomeCoolValue", ValueType::String)
                .property("SubSomeOtherCoolValue", ValueType::String),
        )
}

pub fn get_methods_catalog() -> TypeCatalog {
    method_catalog("Get")
}

pub fn method_names_catalog() -> TypeCatalog {
    method_catalog("")
}

pub fn derived_classes_catalog() -> TypeCatalog {
    TypeCatalog::new()
        .with(TypeDescriptor::new("ModelObject").property("BaseString", ValueType::String))
        .with(
            TypeDescriptor::new("ModelSubObject")
                .extends("ModelObject")
                .property("SubString", ValueType::String),
        )
        .with(TypeDescriptor::new("DtoObject").property("BaseString", ValueType::String))
        .with(
            TypeDescriptor::new("DtoSubObject")
                .extends("DtoObject")
                .property("SubString", ValueType::String),
        )
}

pub fn interfaces_catalog() -> TypeCatalog {
    TypeCatalog::new()
        .with(TypeDescriptor::interface("IModelObject").property("BaseString", ValueType::String))
        .with(
            TypeDescriptor::new("ModelSubObject")
                .implements("IModelObject")
                .property("SubString", ValueType::String)
                .property("BaseString", ValueType::String),
        )
        .with(
            TypeDescriptor::new("DtoObject")
                .abstract_type()
                .property("BaseString", ValueType::String),
        )
        .with(
            TypeDescriptor::new("DtoSubObject")
                .extends("DtoObject")
                .property("SubString", ValueType::String),
        )
        .with(TypeDescriptor::new("Model").property("Object", ValueType::object("IModelObject")))
        .with(TypeDescriptor::new("DtoModel").property("Object", ValueType::object("DtoObject")))
}

pub fn nested_dto_catalog() -> TypeCatalog {
    TypeCatalog::new()
        .with(TypeDescriptor::new("ModelObject").property("Sub", ValueType::object("ModelSubObject")))
        .with(TypeDescriptor::new("ModelSubObject").property("SomeValue", ValueType::String))
        .with(TypeDescriptor::new("ModelDto").property("Sub", ValueType::object("ModelSubDto")))
        .with(TypeDescriptor::new("ModelSubDto").property("SomeValue", ValueType::String))
}

pub fn set_only_catalog() -> TypeCatalog {
    TypeCatalog::new()
        .with(
            TypeDescriptor::new("ModelObject")
                .member(MemberDescriptor::write_only_property(
                    "SomeValue",
                    ValueType::Int,
                ))
                .method("GetSomeValue", ValueType::Int, |o: &Object| {
                    o.get("SomeValue").cloned().unwrap_or(Value::Int(0))
                }),
        )
        .with(TypeDescriptor::new("ModelDto").property("SomeValue", ValueType::Int))
}

pub fn custom_members_catalog() -> TypeCatalog {
    TypeCatalog::new()
        .with(
            TypeDescriptor::new("ModelObject")
                .property("Blarg", ValueType::Int)
                .property("MoreBlarg", ValueType::String)
                .method("SomeMethodToGetMoreBlarg", ValueType::Int, |_| 45)
                .property("SomeValue", ValueType::String)
                .property("SomeWeirdSubObject", ValueType::object("ModelSubObject"))
                .method("IAmSomeMethod", ValueType::String, |_| "I am some method"),
        )
        .with(
            TypeDescriptor::new("ModelSubObject")
                .property("Narf", ValueType::Int)
                .property("SubSub", ValueType::object("ModelSubSubObject"))
                .method("SomeSubValue", ValueType::String, |_| "I am some sub value"),
        )
        .with(
            TypeDescriptor::new("ModelSubSubObject")
                .property("Norf", ValueType::Int)
                .method("SomeSubSubValue", ValueType::String, |_| {
                    "I am some sub sub value"
                }),
        )
        .with(
            TypeDescriptor::new("ModelDto")
                .property("Splorg", ValueType::Int)
                .property("SomeValue", ValueType::String)
                .property("SomeMethod", ValueType::String)
                .property("SubNarf", ValueType::Int)
                .property("SubValue", ValueType::String)
                .property("GrandChildInt", ValueType::Int)
                .property("GrandChildString", ValueType::String)
                .property("BlargBucks", ValueType::String)
                .property("BlargPlus3", ValueType::Int)
                .property("BlargMinus2", ValueType::Int)
                .property("MoreBlarg", ValueType::Int),
        )
}

pub fn collections_catalog() -> TypeCatalog {
    TypeCatalog::new()
        .with(TypeDescriptor::new("Model").property("Items", ValueType::list(ValueType::object("Item"))))
        .with(TypeDescriptor::new("Item").property("Prop", ValueType::String))
        .with(
            TypeDescriptor::new("SubItem")
                .extends("Item")
                .property("SubProp", ValueType::String),
        )
        .with(
            TypeDescriptor::new("ModelDto")
                .property("Items", ValueType::list(ValueType::object("SubItemDto"))),
        )
        .with(TypeDescriptor::new("ItemDto").property("Prop", ValueType::String))
        .with(
            TypeDescriptor::new("SubItemDto")
                .extends("ItemDto")
                .property("SubProp", ValueType::String),
        )
}

pub fn ignore_catalog() -> TypeCatalog {
    TypeCatalog::new()
        .with(TypeDescriptor::new("Source").property("Value", ValueType::String))
        .with(
            TypeDescriptor::new("Destination")
                .member(MemberDescriptor::computed_property(
                    "Ignored",
                    ValueType::Bool,
                    |_| true,
                ))
                .property("Value", ValueType::String),
        )
}

pub fn camel_case_catalog() -> TypeCatalog {
    TypeCatalog::new()
        .with(TypeDescriptor::new("Source").property("SomeValueWithPascalName", ValueType::Int))
        .with(TypeDescriptor::new("Destination").property("someValueWithPascalName", ValueType::Int))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_catalog_resolves() {
        for name in CATALOG_NAMES {
            let catalog = get_catalog(name).unwrap_or_else(|| panic!("missing catalog {name}"));
            assert!(!catalog.is_empty(), "{name} is empty");
        }
        assert!(get_catalog("nope").is_none());
    }

    #[test]
    fn flattening_members_keep_declaration_order() {
        let catalog = flattening_catalog();
        let names: Vec<String> = catalog
            .members(&"ModelObject".into())
            .unwrap()
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        assert_eq!(
            names,
            vec!["BaseDate", "Sub", "Sub2", "SubWithExtraName", "SubMissing"]
        );
    }

    #[test]
    fn set_only_getter_reads_the_backing_slot() {
        let catalog = set_only_catalog();
        let getter = catalog
            .member(&"ModelObject".into(), "GetSomeValue")
            .unwrap()
            .unwrap();
        let model = Object::new("ModelObject").with("SomeValue", 46);
        assert_eq!(getter.read(&model), Value::Int(46));
    }
}
