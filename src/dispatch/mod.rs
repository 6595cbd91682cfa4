// Intent dispatch: action resolution, validation, tracked service call

use crate::intent::{Intent, IntentError};
use crate::registry::ActionRegistry;
use crate::response::change_message;
use crate::service::{ServiceData, ServiceError, ServiceInvoker};
use crate::state::StateStore;
use crate::tracker::{ChangeRecord, ChangeTracker};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};


/// Outcome of one dispatched intent
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchResult {
    /// Confirmation to speak back; empty when nothing was done
    pub speech: String,

    /// Entities changed while the service call ran
    pub changes: Vec<ChangeRecord>,

    /// Diagnostic for an intent that was understood but not carried out
    pub error: Option<String>,
}

impl DispatchResult {
    fn rejected(reason: &DispatchError) -> Self {
        Self {
            speech: String::new(),
            changes: Vec::new(),
            error: Some(reason.to_string()),
        }
    }
}

/// Dispatch errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error("invalid intent: {0}")]
    InvalidIntent(#[from] IntentError),
    #[error("unknown action '{0}'")]
    UnknownAction(String),
    #[error("action '{action}' called without '{param}'")]
    MissingParameter { action: String, param: String },
    #[error(transparent)]
    ServiceInvocation(#[from] ServiceError),
}

impl DispatchError {
    /// Recoverable errors become an empty-change result instead of failing the request
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DispatchError::UnknownAction(_) | DispatchError::MissingParameter { .. }
        )
    }
}

/// Resolves intents to service calls and reports the entities they changed.
///
/// Each dispatch makes at most one blocking service call inside a change
/// tracking scope. Nothing is retried and no timeout is applied to the call.
pub struct IntentDispatcher {
    registry: Arc<ActionRegistry>,
    tracker: ChangeTracker,
    invoker: Arc<dyn ServiceInvoker>,
}

impl IntentDispatcher {
    pub fn new(
        registry: Arc<ActionRegistry>,
        store: Arc<dyn StateStore>,
        invoker: Arc<dyn ServiceInvoker>,
    ) -> Self {
        Self {
            registry,
            tracker: ChangeTracker::new(store),
            invoker,
        }
    }

    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    /// Handles a raw webhook body.
    ///
    /// Fails only for malformed bodies and service failures; unknown actions
    /// and missing parameters yield an empty result carrying the diagnostic.
    pub async fn handle(&self, raw_body: &[u8]) -> Result<DispatchResult, DispatchError> {
        let intent = Intent::parse(raw_body).map_err(|e| {
            warn!(error = %e, "Rejecting malformed intent");
            DispatchError::from(e)
        })?;

        self.dispatch(&intent).await
    }

    /// Dispatches an already parsed intent
    pub async fn dispatch(&self, intent: &Intent) -> Result<DispatchResult, DispatchError> {
        match self.execute(intent).await {
            Err(e) if e.is_recoverable() => {
                warn!(
                    action = %intent.action,
                    error = %e,
                    "Could not process intent"
                );
                Ok(DispatchResult::rejected(&e))
            }
            other => other,
        }
    }

    async fn execute(&self, intent: &Intent) -> Result<DispatchResult, DispatchError> {
        let descriptor = self
            .registry
            .resolve(&intent.action)
            .ok_or_else(|| DispatchError::UnknownAction(intent.action.clone()))?;

        if let Some(param) = descriptor.missing_param(intent) {
            return Err(DispatchError::MissingParameter {
                action: descriptor.action_name.clone(),
                param: param.to_string(),
            });
        }

        let entity_id = descriptor.entity_id(&intent.parameters);
        let speech = descriptor.speech(&intent.parameters);

        info!(
            action = %descriptor.action_name,
            entity_id = %entity_id,
            "{}", speech
        );

        let scope = self.tracker.open_scope().await;
        let outcome = self
            .invoker
            .call(
                &descriptor.service_domain,
                &descriptor.service_name,
                ServiceData {
                    entity_id: entity_id.clone(),
                },
                true,
            )
            .await;
        let changes = self.tracker.close_scope(scope).await;

        if let Err(e) = outcome {
            error!(
                action = %descriptor.action_name,
                entity_id = %entity_id,
                error = %e,
                "Service call failed"
            );
            return Err(e.into());
        }

        for change in &changes {
            info!(action = %descriptor.action_name, "{}", change_message(change));
        }

        Ok(DispatchResult {
            speech,
            changes,
            error: None,
        })
    }
}
