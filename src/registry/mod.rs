// Action registry: maps assistant action names to service calls

mod template;

pub use template::{Template, TemplateError};

use crate::intent::Intent;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;


/// Service turning an entity on
pub const SERVICE_TURN_ON: &str = "turn_on";

/// Static binding of one action name to the service call it triggers
#[derive(Clone, Debug)]
pub struct HandlerDescriptor {
    /// Unique action name (e.g., "scene.activate")
    pub action_name: String,

    /// Parameters that must be present and non-blank, in declaration order
    pub required_params: Vec<String>,

    /// Service domain (e.g., "scene")
    pub service_domain: String,

    /// Service name within the domain (e.g., "turn_on")
    pub service_name: String,

    /// Builds the target entity id from the parameters
    pub entity_template: Template,

    /// Confirmation spoken back to the user
    pub speech: Template,
}

/// Registry errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("action name must not be empty")]
    EmptyActionName,
    #[error("action '{0}' is already registered")]
    DuplicateAction(String),
    #[error("action '{action}': invalid template: {source}")]
    InvalidTemplate {
        action: String,
        source: TemplateError,
    },
    #[error("action '{action}': placeholder '{placeholder}' is not a required parameter")]
    UnboundPlaceholder { action: String, placeholder: String },
}

impl HandlerDescriptor {
    /// Builds a descriptor, checking that every template placeholder is a
    /// required parameter so rendering can never hit a missing value.
    pub fn new(
        action_name: &str,
        required_params: &[&str],
        service_domain: &str,
        service_name: &str,
        entity_template: &str,
        speech: &str,
    ) -> Result<Self, RegistryError> {
        let action = action_name.trim();
        if action.is_empty() {
            return Err(RegistryError::EmptyActionName);
        }

        let parse = |source: &str| {
            Template::parse(source).map_err(|source| RegistryError::InvalidTemplate {
                action: action.to_string(),
                source,
            })
        };
        let entity_template = parse(entity_template)?;
        let speech = parse(speech)?;

        let mut required: Vec<String> = Vec::with_capacity(required_params.len());
        for param in required_params {
            let param = param.trim().to_string();
            if !param.is_empty() && !required.contains(&param) {
                required.push(param);
            }
        }

        for placeholder in entity_template.placeholders().chain(speech.placeholders()) {
            if !required.iter().any(|p| p == placeholder) {
                return Err(RegistryError::UnboundPlaceholder {
                    action: action.to_string(),
                    placeholder: placeholder.to_string(),
                });
            }
        }

        Ok(Self {
            action_name: action.to_string(),
            required_params: required,
            service_domain: service_domain.to_string(),
            service_name: service_name.to_string(),
            entity_template,
            speech,
        })
    }

    /// First required parameter the intent leaves absent or blank
    pub fn missing_param(&self, intent: &Intent) -> Option<&str> {
        self.required_params
            .iter()
            .find(|p| intent.parameter(p.as_str()).is_none())
            .map(String::as_str)
    }

    /// Target entity id for these parameters
    pub fn entity_id(&self, parameters: &HashMap<String, String>) -> String {
        self.entity_template.render(parameters)
    }

    pub fn speech(&self, parameters: &HashMap<String, String>) -> String {
        self.speech.render(parameters)
    }
}

/// Action name → handler descriptor.
///
/// Populated at startup and shared read-only behind an `Arc` afterwards.
#[derive(Debug, Default)]
pub struct ActionRegistry {
    handlers: HashMap<String, Arc<HandlerDescriptor>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in assistant actions
    pub fn with_builtin_actions() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for descriptor in builtin_actions()? {
            registry.register(descriptor)?;
        }
        Ok(registry)
    }

    /// Registers a descriptor; a second registration for the same name fails
    pub fn register(&mut self, descriptor: HandlerDescriptor) -> Result<(), RegistryError> {
        if self.handlers.contains_key(&descriptor.action_name) {
            return Err(RegistryError::DuplicateAction(descriptor.action_name));
        }

        debug!(
            action = %descriptor.action_name,
            service = %format!("{}.{}", descriptor.service_domain, descriptor.service_name),
            "Registered action"
        );

        self.handlers
            .insert(descriptor.action_name.clone(), Arc::new(descriptor));
        Ok(())
    }

    pub fn resolve(&self, action_name: &str) -> Option<Arc<HandlerDescriptor>> {
        self.handlers.get(action_name).cloned()
    }

    /// Registered action names, sorted
    pub fn action_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

fn builtin_actions() -> Result<Vec<HandlerDescriptor>, RegistryError> {
    [
        HandlerDescriptor::new(
            "scene.activate",
            &["scene"],
            "scene",
            SERVICE_TURN_ON,
            "scene.{scene}",
            "Activating scene: {scene}",
        ),
        HandlerDescriptor::new(
            "appliance.turn_on",
            &["appliance"],
            "homeassistant",
            SERVICE_TURN_ON,
            "lights.{appliance}",
            "Turning on: {appliance}.",
        ),
    ]
    .into_iter()
    .collect()
}
