// Webhook intent parsing
pub mod intent;

// Entity state store and change feed
pub mod state;

// Change tracking scopes over the state store
pub mod tracker;

// Action name → service call registry
pub mod registry;

// Service invocation
pub mod service;

// Intent dispatch
pub mod dispatch;

// Webhook response assembly
pub mod response;

// HTTP APIs
pub mod api;

// Configuration
pub mod config;

pub use dispatch::{DispatchError, DispatchResult, IntentDispatcher};
pub use intent::Intent;
pub use registry::{ActionRegistry, HandlerDescriptor};
pub use response::WebhookResponse;
pub use tracker::{ChangeRecord, ChangeTracker};
