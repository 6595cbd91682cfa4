// HTTP APIs: intent webhook and entity state queries

mod query;
mod webhook;

pub use query::{create_query_router, QueryAppState};
pub use webhook::{create_webhook_router, WebhookAppState};

use axum::Router;

/// Full application router
pub fn create_router(webhook: WebhookAppState, query: QueryAppState) -> Router {
    create_webhook_router(webhook).merge(create_query_router(query))
}
