use crate::state::EntityStore;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Shared state for query API
#[derive(Clone)]
pub struct QueryAppState {
    pub store: Arc<EntityStore>,
}

/// Query parameters for entity listing
#[derive(Deserialize)]
pub struct EntityQueryParams {
    /// Filter by domain (exact match on the part before the first '.')
    pub domain: Option<String>,
}

/// Entity response
#[derive(Serialize)]
pub struct EntityResponse {
    pub entity_id: String,
    pub state: String,
    pub attributes: HashMap<String, String>,
    pub last_changed: String,
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Create query API router
pub fn create_query_router(state: QueryAppState) -> Router {
    Router::new()
        .route("/api/state/entities", get(list_entities))
        .route("/api/state/entities/:id", get(get_entity))
        .with_state(Arc::new(state))
}

/// GET /api/state/entities - List all entities, sorted by id
///
/// Query parameters:
/// - `domain`: keep only ids in this domain (e.g., ?domain=lights)
async fn list_entities(
    State(state): State<Arc<QueryAppState>>,
    Query(params): Query<EntityQueryParams>,
) -> Json<Vec<EntityResponse>> {
    let response = state
        .store
        .all()
        .into_iter()
        .filter(|entity| match params.domain {
            Some(ref domain) => entity.domain() == domain.as_str(),
            None => true,
        })
        .map(|entity| EntityResponse {
            entity_id: entity.entity_id,
            state: entity.state,
            attributes: entity.attributes,
            last_changed: entity.last_changed.to_rfc3339(),
        })
        .collect();

    Json(response)
}

/// GET /api/state/entities/:id - Get specific entity
async fn get_entity(
    State(state): State<Arc<QueryAppState>>,
    Path(id): Path<String>,
) -> Result<Json<EntityResponse>, QueryError> {
    let entity = state.store.get(&id).ok_or(QueryError::NotFound)?;

    Ok(Json(EntityResponse {
        entity_id: entity.entity_id,
        state: entity.state,
        attributes: entity.attributes,
        last_changed: entity.last_changed.to_rfc3339(),
    }))
}

/// Query error types
#[derive(Debug)]
enum QueryError {
    NotFound,
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            QueryError::NotFound => (StatusCode::NOT_FOUND, "entity not found"),
        };

        let body = Json(ErrorResponse {
            error: error_message.to_string(),
        });

        (status, body).into_response()
    }
}
