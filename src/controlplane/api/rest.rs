//! REST API Handlers
//!
//! Exposes the namespace controller over HTTP, along with registry
//! statistics, health and Prometheus metrics.

use crate::controlplane::NamespaceController;
use crate::domain::model::{
    CreateNamespaceRequest, DeleteNamespaceRequest, GetNamespaceRequest, ListNamespacesRequest,
    Namespace, NamespaceStatsRequest, UpdateNamespaceRequest,
};
use crate::domain::resource::namespace_name;
use crate::error::{Error, ErrorKind};
use crate::registry::NamespaceRegistry;
use axum::{
    extract::{Json, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct CreateQuery {
    namespace_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DeleteQuery {
    #[serde(default)]
    allow_missing: bool,
}

#[derive(Debug, Default, Deserialize)]
struct UpdateQuery {
    /// Comma separated field paths
    update_mask: Option<String>,
    #[serde(default)]
    allow_missing: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    #[serde(default)]
    page_size: i32,
    page_token: Option<String>,
}

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// HTTP status for an error kind
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Unimplemented => StatusCode::NOT_IMPLEMENTED,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
    }
}

fn error_response(e: Error) -> Response {
    let kind = e.kind();
    let details = e.is_retryable().then(|| "retryable".to_string());
    (
        status_for(kind),
        Json(ApiErrorResponse {
            error: kind.to_string(),
            message: e.to_string(),
            details,
        }),
    )
        .into_response()
}

// =============================================================================
// REST Router
// =============================================================================

/// REST API router builder
pub struct RestRouter {
    controller: Arc<NamespaceController>,
    registry: Arc<NamespaceRegistry>,
}

impl RestRouter {
    /// Create a new REST router
    pub fn new(controller: Arc<NamespaceController>, registry: Arc<NamespaceRegistry>) -> Self {
        Self {
            controller,
            registry,
        }
    }

    /// Build the Axum router
    pub fn build(self) -> Router {
        let state = AppState {
            controller: self.controller,
            registry: self.registry,
        };

        Router::new()
            // Namespace endpoints
            .route(
                "/v1/subsystems/:subsystem/namespaces",
                get(list_namespaces).post(create_namespace),
            )
            .route(
                "/v1/namespaces/:id",
                get(get_namespace)
                    .patch(update_namespace)
                    .delete(delete_namespace),
            )
            .route("/v1/namespaces/:id/stats", get(namespace_stats))
            // Registry endpoint
            .route("/v1/registry", get(registry_stats))
            // Health and metrics
            .route("/health", get(health_check))
            .route("/ready", get(readiness_check))
            .route("/metrics", get(metrics))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    controller: Arc<NamespaceController>,
    registry: Arc<NamespaceRegistry>,
}

fn subsystem_name(id: &str) -> String {
    format!("subsystems/{}", id)
}

// =============================================================================
// Handlers
// =============================================================================

/// Create a namespace under a subsystem
async fn create_namespace(
    State(state): State<AppState>,
    Path(subsystem): Path<String>,
    Query(query): Query<CreateQuery>,
    Json(mut namespace): Json<Namespace>,
) -> Response {
    namespace.spec.subsystem_id = subsystem_name(&subsystem);
    let request = CreateNamespaceRequest {
        namespace,
        namespace_id: query.namespace_id,
    };

    match state.controller.create_namespace(request).await {
        Ok(namespace) => (StatusCode::CREATED, Json(namespace)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Delete a namespace
async fn delete_namespace(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> Response {
    let request = DeleteNamespaceRequest {
        name: namespace_name(&id),
        allow_missing: query.allow_missing,
    };

    match state.controller.delete_namespace(request).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

/// Update a namespace
async fn update_namespace(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<UpdateQuery>,
    Json(mut namespace): Json<Namespace>,
) -> Response {
    namespace.name = namespace_name(&id);
    let update_mask = query
        .update_mask
        .map(|mask| {
            mask.split(',')
                .map(str::trim)
                .filter(|path| !path.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let request = UpdateNamespaceRequest {
        namespace,
        update_mask,
        allow_missing: query.allow_missing,
    };

    match state.controller.update_namespace(request).await {
        Ok(namespace) => (StatusCode::OK, Json(namespace)).into_response(),
        Err(e) => error_response(e),
    }
}

/// List namespaces of a subsystem
async fn list_namespaces(
    State(state): State<AppState>,
    Path(subsystem): Path<String>,
    Query(query): Query<ListQuery>,
) -> Response {
    let request = ListNamespacesRequest {
        parent: subsystem_name(&subsystem),
        page_size: query.page_size,
        page_token: query.page_token.filter(|token| !token.is_empty()),
    };

    match state.controller.list_namespaces(request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Get a namespace
async fn get_namespace(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let request = GetNamespaceRequest {
        name: namespace_name(&id),
    };

    match state.controller.get_namespace(request).await {
        Ok(namespace) => (StatusCode::OK, Json(namespace)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Get namespace IO statistics
async fn namespace_stats(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let request = NamespaceStatsRequest {
        namespace_id: namespace_name(&id),
    };

    match state.controller.namespace_stats(request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Registry statistics
async fn registry_stats(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.registry.stats()))
}

/// Health check
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Readiness check
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.controller.health_check().await {
        Ok(true) => (StatusCode::OK, "ready"),
        Ok(false) => (StatusCode::SERVICE_UNAVAILABLE, "engine unreachable"),
        Err(e) => {
            warn!("Readiness check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "engine unreachable")
        }
    }
}

/// Prometheus metrics
async fn metrics(State(state): State<AppState>) -> Response {
    match state.controller.metrics().render() {
        Ok(body) => {
            debug!("Rendered {} bytes of metrics", body.len());
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
                body,
            )
                .into_response()
        }
        Err(e) => error_response(e),
    }
}
