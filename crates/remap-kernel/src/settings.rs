//! Declarative mapper configuration.
//!
//! Settings describe type maps as data, so a mapper can be configured from
//! a TOML or JSON file instead of code:
//!
//! ```toml
//! convention_mapping = false
//!
//! [[maps]]
//! source = "ModelObject"
//! destination = "DtoObject"
//! include = [{ source = "ModelSubObject", destination = "DtoSubObject" }]
//!
//! [[maps]]
//! source = "ModelSubObject"
//! destination = "DtoSubObject"
//! ignore = ["Internal"]
//! ```
//!
//! Closures (resolvers, converters, formatters) only exist in code; settings
//! cover the rest.

use crate::error::{MapperError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperSettings {
    /// Map unregistered object pairs by member name instead of failing with
    /// `MissingTypeMap`.
    pub convention_mapping: bool,
    pub maps: Vec<MapDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapDeclaration {
    pub source: String,
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<IncludeDeclaration>,
    /// Destination members to ignore.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeDeclaration {
    pub source: String,
    pub destination: String,
}

impl MapperSettings {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Self::parse_toml(text, "<inline>")
    }

    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        serde_json::from_value(json.clone()).map_err(|e| MapperError::InvalidJson(e.to_string()))
    }

    /// Read settings from a file. `.json` files are parsed as JSON,
    /// everything else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| MapperError::Io {
            path: path.display().to_string(),
            source,
        })?;
        if path.extension().is_some_and(|ext| ext == "json") {
            let json: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
                MapperError::InvalidJson(format!("{}: {e}", path.display()))
            })?;
            return Self::from_json(&json);
        }
        Self::parse_toml(&text, &path.display().to_string())
    }

    fn parse_toml(text: &str, path: &str) -> Result<Self> {
        toml::from_str(text).map_err(|source| MapperError::ParseToml {
            path: path.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_declarations_parse() {
        let settings = MapperSettings::from_toml_str(
            r#"
            convention_mapping = true

            [[maps]]
            source = "ModelObject"
            destination = "DtoObject"
            include = [{ source = "ModelSubObject", destination = "DtoSubObject" }]

            [[maps]]
            source = "ModelSubObject"
            destination = "DtoSubObject"
            profile = "api"
            ignore = ["Internal"]
            "#,
        )
        .unwrap();

        assert!(settings.convention_mapping);
        assert_eq!(settings.maps.len(), 2);
        assert_eq!(
            settings.maps[0].include,
            vec![IncludeDeclaration {
                source: "ModelSubObject".to_string(),
                destination: "DtoSubObject".to_string(),
            }]
        );
        assert_eq!(settings.maps[1].profile.as_deref(), Some("api"));
        assert_eq!(settings.maps[1].ignore, vec!["Internal".to_string()]);
    }

    #[test]
    fn json_defaults_missing_fields() {
        let settings = MapperSettings::from_json(&serde_json::json!({
            "maps": [{ "source": "A", "destination": "B" }]
        }))
        .unwrap();
        assert!(!settings.convention_mapping);
        assert!(settings.maps[0].include.is_empty());
        assert!(settings.maps[0].ignore.is_empty());
    }

    #[test]
    fn bad_toml_names_its_origin() {
        let err = MapperSettings::from_toml_str("maps = 3").unwrap_err();
        assert!(matches!(err, MapperError::ParseToml { ref path, .. } if path == "<inline>"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = MapperSettings::load("/nonexistent/remap.toml").unwrap_err();
        assert!(matches!(err, MapperError::Io { .. }));
    }
}
