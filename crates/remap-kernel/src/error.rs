//! Error types for remap kernel operations.

use crate::descriptor::TypeName;
use crate::validator::ValidationReport;

/// Errors arising from configuration, validation, or mapping.
#[derive(Debug, thiserror::Error)]
pub enum MapperError {
    /// One or more registered type maps leave destination members without a
    /// source. The report lists every offending type map, not only the first.
    #[error("configuration is invalid:\n{report}")]
    UnmappedDestinationMembers { report: ValidationReport },

    /// Dispatch found no type map for a required pair and convention
    /// mapping is disabled.
    #[error("no type map registered for {source_type} -> {destination_type}")]
    MissingTypeMap {
        source_type: TypeName,
        destination_type: TypeName,
    },

    /// A custom resolver or converter could not be constructed or failed
    /// when invoked.
    #[error("resolver for {target} failed: {message}")]
    ResolverConstruction { target: String, message: String },

    /// A leaf value cannot be converted to the destination member's type.
    #[error("cannot convert {from} to {to} without a registered converter")]
    IncompatibleScalarConversion { from: TypeName, to: TypeName },

    /// The type is not registered in the catalog.
    #[error("unknown type: {0}")]
    UnknownType(TypeName),

    /// A destination type is abstract (or an interface) and cannot be
    /// default-constructed.
    #[error("cannot instantiate abstract type {0}")]
    AbstractDestination(TypeName),

    /// A member option names a member the destination type does not have.
    #[error("{type_name} has no destination member named {member}")]
    UnknownMember { type_name: TypeName, member: String },

    /// A JSON document does not fit the declared shape.
    #[error("invalid json: {0}")]
    InvalidJson(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid toml at {path}: {source}")]
    ParseToml {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

pub type Result<T> = std::result::Result<T, MapperError>;
