mod env;

pub use env::{ENV_BIND_ADDR, ENV_BODY_SIZE_LIMIT_BYTES};

use crate::registry::{ActionRegistry, HandlerDescriptor, RegistryError};
use crate::state::EntityStore;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Config file path variable
pub const ENV_CONFIG_PATH: &str = "INTENT_HOOK_CONFIG";

/// Config file used when `INTENT_HOOK_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "intent-hook.toml";

/// Complete service configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntentHookConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    /// Extra actions registered next to the built-in ones
    #[serde(default)]
    pub actions: Vec<ActionConfig>,
    /// Entities loaded into the local store at startup
    #[serde(default)]
    pub entities: Vec<EntitySeed>,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8123".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

/// API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Largest accepted webhook body
    #[serde(default = "default_body_size_limit")]
    pub body_size_limit_bytes: usize,
}

fn default_body_size_limit() -> usize {
    1_048_576 // 1 MB
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            body_size_limit_bytes: default_body_size_limit(),
        }
    }
}

/// Action declared in the config file
#[derive(Debug, Clone, Deserialize)]
pub struct ActionConfig {
    pub name: String,
    #[serde(default)]
    pub required_params: Vec<String>,
    pub service_domain: String,
    pub service_name: String,
    pub entity_template: String,
    pub speech: String,
}

impl ActionConfig {
    pub fn to_descriptor(&self) -> Result<HandlerDescriptor, RegistryError> {
        let required: Vec<&str> = self.required_params.iter().map(String::as_str).collect();
        HandlerDescriptor::new(
            &self.name,
            &required,
            &self.service_domain,
            &self.service_name,
            &self.entity_template,
            &self.speech,
        )
    }
}

/// Initial entity for the local store
#[derive(Debug, Clone, Deserialize)]
pub struct EntitySeed {
    pub entity_id: String,
    pub state: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl IntentHookConfig {
    /// Built-in actions plus configured ones; any duplicate name is an error
    pub fn build_registry(&self) -> Result<ActionRegistry, RegistryError> {
        let mut registry = ActionRegistry::with_builtin_actions()?;
        for action in &self.actions {
            registry.register(action.to_descriptor()?)?;
        }
        Ok(registry)
    }

    /// Loads seed entities into the store
    pub fn seed_store(&self, store: &EntityStore) {
        for seed in &self.entities {
            store.set_state(&seed.entity_id, &seed.state, seed.attributes.clone());
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &Path) -> Result<IntentHookConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    let config: IntentHookConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;
    Ok(config)
}

/// Load configuration, falling back to defaults when the file does not exist
pub fn load_or_default(path: &Path) -> Result<IntentHookConfig> {
    if !path.exists() {
        info!(path = %path.display(), "No config file, using defaults");
        return Ok(IntentHookConfig::default());
    }
    load_config(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = IntentHookConfig::default();
        assert_eq!(config.server.bind_addr, "0.0.0.0:8123");
        assert_eq!(config.api.body_size_limit_bytes, 1_048_576);
        assert!(config.actions.is_empty());
        assert!(config.entities.is_empty());
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
            [server]
            bind_addr = "127.0.0.1:9000"

            [api]
            body_size_limit_bytes = 4096

            [[actions]]
            name = "light.on"
            required_params = ["room"]
            service_domain = "light"
            service_name = "turn_on"
            entity_template = "light.{room}"
            speech = "Lighting the {room}"

            [[entities]]
            entity_id = "scene.movie"
            state = "scening"
            attributes = { friendly_name = "Movie" }
        "#;

        let config: IntentHookConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.server.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.api.body_size_limit_bytes, 4096);
        assert_eq!(config.actions.len(), 1);
        assert_eq!(config.actions[0].required_params, vec!["room"]);
        assert_eq!(config.entities[0].attributes["friendly_name"], "Movie");

        let registry = config.build_registry().unwrap();
        assert_eq!(registry.len(), 3);
        assert!(registry.resolve("light.on").is_some());

        let store = EntityStore::new();
        config.seed_store(&store);
        assert_eq!(store.get("scene.movie").unwrap().state, "scening");
    }

    #[test]
    fn test_partial_config() {
        let toml = r#"
            [api]
            body_size_limit_bytes = 512
        "#;

        let config: IntentHookConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.api.body_size_limit_bytes, 512);
        assert_eq!(config.server.bind_addr, "0.0.0.0:8123"); // Default
    }

    #[test]
    fn test_action_colliding_with_builtin_fails() {
        let toml = r#"
            [[actions]]
            name = "scene.activate"
            required_params = ["scene"]
            service_domain = "scene"
            service_name = "turn_on"
            entity_template = "scene.{scene}"
            speech = "Again: {scene}"
        "#;

        let config: IntentHookConfig = toml::from_str(toml).unwrap();
        assert_eq!(
            config.build_registry().unwrap_err(),
            RegistryError::DuplicateAction("scene.activate".to_string())
        );
    }

    #[test]
    fn test_env_overrides() {
        let mut config = IntentHookConfig::default();
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_BIND_ADDR, "127.0.0.1:7000"),
            (ENV_BODY_SIZE_LIMIT_BYTES, "not-a-number"),
        ]);

        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.bind_addr, "127.0.0.1:7000");
        assert_eq!(config.api.body_size_limit_bytes, 1_048_576); // Unparseable, kept
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nbind_addr = \"127.0.0.1:8200\"").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.server.bind_addr, "127.0.0.1:8200");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.server.bind_addr, "0.0.0.0:8123");

        assert!(load_config(&dir.path().join("absent.toml")).is_err());
    }

    #[test]
    fn test_malformed_file_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\nbind_addr = 1").unwrap();
        assert!(load_or_default(file.path()).is_err());
    }
}
