use anyhow::{Context, Result};
use intent_hook::api::{create_router, QueryAppState, WebhookAppState};
use intent_hook::config::{self, DEFAULT_CONFIG_PATH, ENV_CONFIG_PATH};
use intent_hook::service::LocalServiceInvoker;
use intent_hook::state::EntityStore;
use intent_hook::IntentDispatcher;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "intent_hook=info".into()),
        )
        .init();

    info!("Intent hook starting...");

    let config_path = std::env::var(ENV_CONFIG_PATH)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
    let mut config = config::load_or_default(&config_path)?;
    config.apply_env_overrides();

    let registry = config
        .build_registry()
        .context("Failed to build action registry")?;
    info!(actions = ?registry.action_names(), "Action registry ready");

    let store = Arc::new(EntityStore::new());
    config.seed_store(&store);
    info!(entities = store.len(), "Entity store seeded");

    tokio::spawn(log_state_changes(store.clone()));

    let invoker = Arc::new(LocalServiceInvoker::new(store.clone()));
    let dispatcher = Arc::new(IntentDispatcher::new(
        Arc::new(registry),
        store.clone(),
        invoker,
    ));

    let app = create_router(
        WebhookAppState {
            dispatcher,
            body_size_limit_bytes: config.api.body_size_limit_bytes,
        },
        QueryAppState { store },
    );

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;
    info!(addr = %config.server.bind_addr, "HTTP server listening");

    axum::serve(listener, app).await.context("HTTP server error")?;

    Ok(())
}

/// Logs the store's change feed
async fn log_state_changes(store: Arc<EntityStore>) {
    let mut rx = store.subscribe();
    loop {
        match rx.recv().await {
            Ok(change) => debug!(
                entity_id = %change.entity_id,
                old_state = ?change.old_state,
                new_state = %change.new_state,
                "State changed"
            ),
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "State change logger lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
