//! # Remap Kernel
//!
//! Object-to-object mapping: an instance of one shape becomes an instance
//! of another through registered type maps plus name-based member
//! resolution, with no per-field copy code.
//!
//! This crate is **shape-agnostic**: it does not prescribe what source and
//! destination types are. Types are described to it through a
//! [`TypeCatalog`], and instances are dynamic [`Value`]s. Rust structs reach
//! it through their JSON form.
//!
//! ## Architecture
//!
//! ```text
//! TypeCatalog            ← Type descriptors: ordered members, inheritance
//!     │
//! matcher                ← Name comparison: case-insensitive, `Get` prefix
//!     │
//! resolver               ← Flattening: member chains across nested objects
//!     │
//! TypeMap / PropertyMap  ← Rules per type pair and per destination member
//!     │
//! TypeMapRegistry        ← One map per pair, Include edges, dispatch
//!     │
//! Mapper                 ← Recursive execution over objects and collections
//!     │
//! validator              ← Every destination member accounted for
//! ```
//!
//! ## Example
//!
//! ```
//! use remap_kernel::{Mapper, Object, TypeCatalog, TypeDescriptor, Value, ValueType};
//!
//! let catalog = TypeCatalog::new()
//!     .with(TypeDescriptor::new("Order").property("Customer", ValueType::object("Customer")))
//!     .with(TypeDescriptor::new("Customer").property("Name", ValueType::String))
//!     .with(TypeDescriptor::new("OrderDto").property("CustomerName", ValueType::String));
//!
//! let mut mapper = Mapper::new(catalog);
//! mapper.create_map("Order", "OrderDto")?;
//! mapper.assert_configuration_is_valid()?;
//!
//! let order = Object::new("Order").with("Customer", Object::new("Customer").with("Name", "Ada"));
//! let dto = mapper.map_object(&order, &ValueType::object("OrderDto"))?;
//! assert_eq!(dto.as_object().and_then(|o| o.get("CustomerName")), Some(&Value::from("Ada")));
//! # Ok::<(), remap_kernel::MapperError>(())
//! ```

pub mod descriptor;
pub mod engine;
pub mod error;
pub mod expression;
pub mod matcher;
pub mod registry;
pub mod resolver;
pub mod scalar;
pub mod settings;
pub mod toy;
pub mod type_map;
pub mod validator;
pub mod value;

pub use descriptor::{MemberDescriptor, MemberKind, TypeCatalog, TypeDescriptor, TypeName};
pub use engine::Mapper;
pub use error::{MapperError, Result};
pub use expression::{MappingExpression, MemberOptions, ProfileExpression};
pub use registry::{Profile, TypeMapRegistry};
pub use resolver::{ChainCache, MemberChain};
pub use settings::{IncludeDeclaration, MapDeclaration, MapperSettings};
pub use type_map::{
    PropertyMap, Resolution, TypeConverter, TypeMap, TypePair, ValueFormatter, ValueResolver,
};
pub use validator::{IncludeEdge, UnmappedTypeMap, ValidationReport};
pub use value::{Object, Value, ValueType};
