// File: src/config.rs
// Purpose: Router configuration from TOML or JSON

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConfigError;
use crate::mode::{Mode, ModeConfig};
use crate::route::RouteNode;

/// Declarative router configuration
///
/// ```toml
/// mode = "history"
/// base = "/app"
///
/// [[routes]]
/// path = "/"
/// component = "App"
///
/// [[routes.children]]
/// path = "users/:id"
/// component = "UserDetail"
/// meta = { requiresAuth = true }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default)]
    pub mode: Mode,

    /// Prefix stripped from paths in history mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,

    #[serde(default)]
    pub routes: Vec<RouteNode>,
}

impl RouterConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Loads a `.json` file as JSON and anything else as TOML
    ///
    /// An empty file yields the default config.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    pub fn mode_config(&self) -> ModeConfig {
        ModeConfig {
            mode: self.mode,
            base: self.base.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    #[test]
    fn test_empty_config() {
        let config = RouterConfig::from_toml_str("").unwrap();
        assert_eq!(config.mode, Mode::History);
        assert!(config.base.is_none());
        assert!(config.routes.is_empty());
    }

    #[test]
    fn test_nested_toml_routes() {
        let toml = r#"
            mode = "hash"

            [[routes]]
            path = "/"
            component = "App"

            [[routes.children]]
            path = "users/:id"
            component = "UserDetail"
            meta = { requiresAuth = true, title = "User" }

            [[routes.children]]
            path = "old"
            redirect = "/users/1"
        "#;
        let config = RouterConfig::from_toml_str(toml).unwrap();

        assert_eq!(config.mode, Mode::Hash);
        let root = &config.routes[0];
        assert!(root.is_root());
        assert_eq!(root.children.len(), 2);
        assert_eq!(
            root.children[0].get_meta("requiresAuth"),
            Some(&Value::Bool(true))
        );
        assert_eq!(root.children[1].redirect.as_deref(), Some("/users/1"));
    }

    #[test]
    fn test_json_config() {
        let json = r#"{
            "base": "/app",
            "routes": [{ "path": "about", "name": "about" }]
        }"#;
        let config = RouterConfig::from_json_str(json).unwrap();
        assert_eq!(
            config.mode_config(),
            ModeConfig::history().with_base("/app")
        );
        assert_eq!(config.routes[0].name.as_deref(), Some("about"));
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        let err = RouterConfig::from_toml_str(r#"mode = "memory""#).unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
        assert!(err.to_string().contains("unknown router mode `memory`"));

        let err = RouterConfig::from_json_str(r#"{"mode": "tabs"}"#).unwrap_err();
        assert!(err.to_string().contains("unknown router mode `tabs`"));
    }

    #[test]
    fn test_mode_is_case_insensitive() {
        let config = RouterConfig::from_toml_str(r#"mode = "Hash""#).unwrap();
        assert_eq!(config.mode, Mode::Hash);
    }

    #[test]
    fn test_missing_file() {
        let err = RouterConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
