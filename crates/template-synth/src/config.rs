//! Compiler configuration.
//!
//! Example synth.toml:
//! ```toml
//! [appsync]
//! single_integration = false   # allow several data source calls per resolver
//! stash_locals = true          # keep top-level locals in $context.stash
//!
//! [apigateway]
//! single_integration = true
//! error_status = 500           # status set when a value is not a primitive
//! ```

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Error loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Options for the statement-emitting resolver dialect.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct AppsyncConfig {
    /// Reject a second integration call within one resolver.
    pub single_integration: bool,
    /// Store top-level locals in `$context.stash` so later pipeline stages see them.
    pub stash_locals: bool,
}

impl Default for AppsyncConfig {
    fn default() -> Self {
        Self {
            single_integration: false,
            stash_locals: true,
        }
    }
}

/// Options for the JSON-path mapping dialect.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct ApiGatewayConfig {
    /// Reject a second integration call within one request template.
    pub single_integration: bool,
    /// Response status written when a value cannot be rendered as a primitive.
    pub error_status: u16,
}

impl Default for ApiGatewayConfig {
    fn default() -> Self {
        Self {
            single_integration: true,
            error_status: 500,
        }
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct SynthConfig {
    pub appsync: AppsyncConfig,
    pub apigateway: ApiGatewayConfig,
}

impl SynthConfig {
    /// Parse configuration from TOML text. Missing keys keep their defaults.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// JSON schema describing the config file.
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(SynthConfig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = SynthConfig::default();
        assert!(!config.appsync.single_integration);
        assert!(config.appsync.stash_locals);
        assert!(config.apigateway.single_integration);
        assert_eq!(config.apigateway.error_status, 500);
    }

    #[test]
    fn test_partial_override() {
        let config = SynthConfig::from_toml(
            r#"
[appsync]
single_integration = true
"#,
        )
        .unwrap();
        assert!(config.appsync.single_integration);
        assert!(config.appsync.stash_locals); // default
        assert_eq!(config.apigateway, ApiGatewayConfig::default());
    }

    #[test]
    fn test_load_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("synth.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[apigateway]
error_status = 502
"#
        )
        .unwrap();

        let config = SynthConfig::load(&path).unwrap();
        assert_eq!(config.apigateway.error_status, 502);
        assert!(config.apigateway.single_integration);
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = SynthConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_invalid_toml() {
        let err = SynthConfig::from_toml("[appsync]\nstash_locals = \"yes\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_schema_lists_sections() {
        let schema = serde_json::to_value(SynthConfig::json_schema()).unwrap();
        let properties = schema["properties"].as_object().unwrap();
        assert!(properties.contains_key("appsync"));
        assert!(properties.contains_key("apigateway"));
    }
}
