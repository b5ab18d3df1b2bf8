//! Persistence configuration: key namespaces, file naming, tracked resources.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default prefix for per-user handle records.
pub const DEFAULT_HANDLE_KEY_PREFIX: &str = "directoryHandle_";
/// Key used by the unscoped handle record written before per-user scoping.
pub const DEFAULT_LEGACY_HANDLE_KEY: &str = "directoryHandle";
/// Default prefix for locally cached resources.
pub const DEFAULT_RESOURCE_KEY_PREFIX: &str = "resource:";
/// Default extension of resource files in the external directory.
pub const DEFAULT_FILE_EXTENSION: &str = "json";

fn default_tracked_resources() -> Vec<String> {
    ["categories", "groups", "questions", "statistics"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
/// Settings for the persistence engine.
pub struct StorageConfig {
    /// Prefix of per-user handle keys (`prefix + username`).
    pub handle_key_prefix: String,
    /// Unscoped handle key migrated forward on first encounter.
    pub legacy_handle_key: String,
    /// Prefix of locally cached resource keys.
    pub resource_key_prefix: String,
    /// Extension of resource files in the external directory, without the dot.
    pub file_extension: String,
    /// Resources reconciled even when absent from both backends' listings.
    pub tracked_resources: Vec<String>,
    /// Reconcile automatically whenever the session reaches external mode.
    pub sync_on_ready: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            handle_key_prefix: DEFAULT_HANDLE_KEY_PREFIX.to_string(),
            legacy_handle_key: DEFAULT_LEGACY_HANDLE_KEY.to_string(),
            resource_key_prefix: DEFAULT_RESOURCE_KEY_PREFIX.to_string(),
            file_extension: DEFAULT_FILE_EXTENSION.to_string(),
            tracked_resources: default_tracked_resources(),
            sync_on_ready: true,
        }
    }
}

impl StorageConfig {
    /// Parses a JSON config document; absent fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and any [`StorageConfig::validate`]
    /// failure.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that settings are non-empty and that handle and resource keys cannot collide.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("handle_key_prefix", &self.handle_key_prefix),
            ("legacy_handle_key", &self.legacy_handle_key),
            ("resource_key_prefix", &self.resource_key_prefix),
            ("file_extension", &self.file_extension),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Empty { field });
            }
        }

        let handle = self.handle_key_prefix.as_str();
        let resource = self.resource_key_prefix.as_str();
        if handle.starts_with(resource) || resource.starts_with(handle) {
            return Err(ConfigError::OverlappingNamespaces {
                first: handle.to_string(),
                second: resource.to_string(),
            });
        }
        if self.legacy_handle_key.starts_with(resource) {
            return Err(ConfigError::OverlappingNamespaces {
                first: self.legacy_handle_key.clone(),
                second: resource.to_string(),
            });
        }
        if self.legacy_handle_key.starts_with(handle) {
            return Err(ConfigError::OverlappingNamespaces {
                first: self.legacy_handle_key.clone(),
                second: handle.to_string(),
            });
        }
        Ok(())
    }

    /// Key of the handle record for `username`.
    pub fn user_handle_key(&self, username: &str) -> String {
        format!("{}{}", self.handle_key_prefix, username)
    }

    /// Local key of a resource.
    pub fn resource_key(&self, resource: &str) -> String {
        format!("{}{}", self.resource_key_prefix, resource)
    }

    /// Resource name for a local key, if the key belongs to the resource namespace.
    pub fn resource_from_key<'k>(&self, key: &'k str) -> Option<&'k str> {
        key.strip_prefix(self.resource_key_prefix.as_str())
            .filter(|name| !name.is_empty())
    }

    /// External file name of a resource.
    pub fn resource_file_name(&self, resource: &str) -> String {
        format!("{resource}.{}", self.file_extension)
    }

    /// Resource name for an external file name, if it carries the configured extension.
    pub fn resource_from_file_name<'f>(&self, file_name: &'f str) -> Option<&'f str> {
        file_name
            .strip_suffix(self.file_extension.as_str())
            .and_then(|stem| stem.strip_suffix('.'))
            .filter(|stem| !stem.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn default_config_is_valid_and_builds_disjoint_keys() {
        let config = StorageConfig::default();
        config.validate().expect("default config");

        assert_eq!(config.user_handle_key("ada"), "directoryHandle_ada");
        assert_eq!(config.resource_key("categories"), "resource:categories");
        assert_eq!(config.resource_file_name("categories"), "categories.json");
        assert_eq!(config.resource_from_key("resource:groups"), Some("groups"));
        assert_eq!(config.resource_from_key("directoryHandle_ada"), None);
        assert_eq!(config.resource_from_key("resource:"), None);
        assert_eq!(
            config.resource_from_file_name("statistics.json"),
            Some("statistics")
        );
        assert_eq!(config.resource_from_file_name("notes.txt"), None);
        assert_eq!(config.resource_from_file_name(".json"), None);
        assert_eq!(config.resource_from_file_name("json"), None);
    }

    #[test]
    fn partial_json_config_keeps_defaults() {
        let config = StorageConfig::from_json_str(
            r#"{"tracked_resources": ["decks"], "sync_on_ready": false}"#,
        )
        .expect("parse");
        assert_eq!(config.tracked_resources, vec!["decks".to_string()]);
        assert!(!config.sync_on_ready);
        assert_eq!(config.handle_key_prefix, DEFAULT_HANDLE_KEY_PREFIX);
    }

    #[test]
    fn overlapping_namespaces_are_rejected() {
        let config = StorageConfig {
            resource_key_prefix: "directoryHandle".to_string(),
            ..StorageConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OverlappingNamespaces { .. })
        ));

        let config = StorageConfig {
            legacy_handle_key: "resource:handle".to_string(),
            ..StorageConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OverlappingNamespaces { .. })
        ));
        let config = StorageConfig {
            legacy_handle_key: "directoryHandle_admin".to_string(),
            ..StorageConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::OverlappingNamespaces {
                first: "directoryHandle_admin".to_string(),
                second: "directoryHandle_".to_string(),
            })
        );
    }

    #[test]
    fn empty_fields_and_bad_json_are_rejected() {
        let config = StorageConfig {
            file_extension: " ".to_string(),
            ..StorageConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::Empty {
                field: "file_extension"
            })
        );
        assert!(matches!(
            StorageConfig::from_json_str("{not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
