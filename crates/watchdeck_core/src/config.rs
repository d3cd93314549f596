use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::storage::schema::DEFAULT_NAMESPACE;
use crate::tmdb::{
    client::{DEFAULT_BASE_URL, DEFAULT_LANGUAGE},
    DEFAULT_IMAGE_BASE_URL,
};

pub const API_KEY_ENV_VAR: &str = "TMDB_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    #[serde(default)]
    pub data_dir: Option<String>,
    #[serde(default)]
    pub storage_namespace: Option<String>,
    /// Keep all watch state in memory; nothing is written to disk.
    #[serde(default)]
    pub in_memory: bool,
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub metadata: MetadataSettings,
}

impl RuntimeConfig {
    /// An empty string yields the defaults.
    pub fn from_json(config_json: &str) -> anyhow::Result<Self> {
        if config_json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(config_json).context("invalid runtime config JSON")
    }

    pub fn namespace(&self) -> &str {
        self.storage_namespace
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_NAMESPACE)
    }

    pub fn resolve_data_dir(&self) -> PathBuf {
        if let Some(dir) = self.data_dir.as_deref().filter(|dir| !dir.trim().is_empty()) {
            return PathBuf::from(dir);
        }

        if let Some(dir) = dirs::data_local_dir() {
            return dir.join("watchdeck");
        }

        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".watchdeck")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataSettings {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_image_base_url")]
    pub image_base_url: String,
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for MetadataSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            image_base_url: default_image_base_url(),
            language: default_language(),
        }
    }
}

impl MetadataSettings {
    /// Configured key first, then the environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV_VAR).ok())
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_image_base_url() -> String {
    DEFAULT_IMAGE_BASE_URL.to_string()
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = RuntimeConfig::from_json("  ").unwrap();
        assert_eq!(config.namespace(), DEFAULT_NAMESPACE);
        assert!(!config.in_memory);
        assert_eq!(config.metadata.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.metadata.language, "en-US");
    }

    #[test]
    fn partial_config_keeps_nested_defaults() {
        let config = RuntimeConfig::from_json(
            r#"{"dataDir":"/tmp/wd","storageNamespace":"deck","metadata":{"apiKey":" k "}}"#,
        )
        .unwrap();
        assert_eq!(config.resolve_data_dir(), PathBuf::from("/tmp/wd"));
        assert_eq!(config.namespace(), "deck");
        assert_eq!(config.metadata.resolved_api_key().as_deref(), Some("k"));
        assert_eq!(config.metadata.image_base_url, DEFAULT_IMAGE_BASE_URL);
    }

    #[test]
    fn rejects_malformed_config() {
        assert!(RuntimeConfig::from_json("{\"inMemory\": \"yes\"}").is_err());
    }
}
