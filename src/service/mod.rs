// Service invocation: the side-effecting half of a dispatch

use crate::state::{EntityStore, Transition};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};


/// Service call payload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceData {
    pub entity_id: String,
}

/// Service invocation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    #[error("unknown service '{domain}.{service}'")]
    UnknownService { domain: String, service: String },
    #[error("service '{domain}.{service}' failed: {message}")]
    Failed {
        domain: String,
        service: String,
        message: String,
    },
}

/// Performs named side-effecting operations against entities.
///
/// With `blocking = true` the call must not return until its direct effects
/// are visible in the state store.
#[async_trait]
pub trait ServiceInvoker: Send + Sync {
    async fn call(
        &self,
        domain: &str,
        service: &str,
        data: ServiceData,
        blocking: bool,
    ) -> Result<(), ServiceError>;
}

/// In-process invoker applying on/off services directly to an [`EntityStore`]
#[derive(Clone)]
pub struct LocalServiceInvoker {
    store: Arc<EntityStore>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Operation {
    TurnOn,
    TurnOff,
    Toggle,
}

impl Operation {
    fn from_service(service: &str) -> Option<Self> {
        match service {
            "turn_on" => Some(Operation::TurnOn),
            "turn_off" => Some(Operation::TurnOff),
            "toggle" => Some(Operation::Toggle),
            _ => None,
        }
    }
}

impl LocalServiceInvoker {
    pub fn new(store: Arc<EntityStore>) -> Self {
        Self { store }
    }

    fn apply(store: &EntityStore, operation: Operation, entity_id: &str) {
        let outcome = store.transition(entity_id, |current| match operation {
            Operation::TurnOn => "on",
            Operation::TurnOff => "off",
            Operation::Toggle if current == "on" => "off",
            Operation::Toggle => "on",
        });

        if let Transition::NotFound = outcome {
            warn!(entity_id = %entity_id, "Service call targets unknown entity, ignoring");
        }
    }
}

#[async_trait]
impl ServiceInvoker for LocalServiceInvoker {
    async fn call(
        &self,
        domain: &str,
        service: &str,
        data: ServiceData,
        blocking: bool,
    ) -> Result<(), ServiceError> {
        let operation =
            Operation::from_service(service).ok_or_else(|| ServiceError::UnknownService {
                domain: domain.to_string(),
                service: service.to_string(),
            })?;

        debug!(
            domain = %domain,
            service = %service,
            entity_id = %data.entity_id,
            blocking,
            "Calling service"
        );

        if blocking {
            Self::apply(&self.store, operation, &data.entity_id);
        } else {
            let store = Arc::clone(&self.store);
            tokio::spawn(async move {
                Self::apply(&store, operation, &data.entity_id);
            });
        }

        Ok(())
    }
}
