//! HTTP route handlers
//!
//! Thin wrappers over the agent tools in [`crate::tools`]: the JSON bodies
//! are the tools' outcomes, the status code reflects what happened.

use axum::{
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::error::Error;
use crate::server::AppState;
use crate::tools::{self, GetOutcome, QueryArgs, QueryOutcome, SaveOutcome};

/// Query-string form of a query; the value always arrives as text.
#[derive(Debug, Deserialize)]
pub struct QueryParams {
    pub key: Option<String>,
    pub value: Option<String>,
    pub limit: Option<i64>,
}

impl From<QueryParams> for QueryArgs {
    fn from(params: QueryParams) -> Self {
        QueryArgs {
            key: params.key,
            value: params.value.map(serde_json::Value::String),
            limit: params.limit,
        }
    }
}

fn error_status(err: &Error) -> StatusCode {
    if err.is_invalid_argument() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// Save a document
///
/// POST /api/tables/:table/documents
#[instrument(skip(state, body))]
pub async fn save_document(
    Extension(state): Extension<Arc<AppState>>,
    Path(table): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let result = tools::save(&state.storage, &table, body).await;
    let status = match &result {
        Ok(saved) if saved.created => StatusCode::CREATED,
        Ok(_) => StatusCode::OK,
        Err(e) => error_status(e),
    };
    (status, Json(SaveOutcome::from_result(&table, result))).into_response()
}

/// Get a document by id
///
/// GET /api/tables/:table/documents/:id
#[instrument(skip(state))]
pub async fn get_document(
    Extension(state): Extension<Arc<AppState>>,
    Path((table, id)): Path<(String, u64)>,
) -> Response {
    let result = tools::get(&state.storage, &table, id).await;
    let status = match &result {
        Ok(Some(_)) => StatusCode::OK,
        Ok(None) => StatusCode::NOT_FOUND,
        Err(e) => error_status(e),
    };
    (status, Json(GetOutcome::from_result(id, result))).into_response()
}

/// Query documents with query-string parameters
///
/// GET /api/tables/:table/documents?key=status&value=ok&limit=5
#[instrument(skip(state))]
pub async fn list_documents(
    Extension(state): Extension<Arc<AppState>>,
    Path(table): Path<String>,
    Query(params): Query<QueryParams>,
) -> Response {
    run_query(&state, &table, params.into()).await
}

/// Query documents with a typed JSON body
///
/// POST /api/tables/:table/query
#[instrument(skip(state))]
pub async fn query_documents(
    Extension(state): Extension<Arc<AppState>>,
    Path(table): Path<String>,
    Json(args): Json<QueryArgs>,
) -> Response {
    run_query(&state, &table, args).await
}

async fn run_query(state: &AppState, table: &str, args: QueryArgs) -> Response {
    let result = tools::query(&state.storage, table, &args).await;
    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(e) => error_status(e),
    };
    (status, Json(QueryOutcome::from_result(result))).into_response()
}

/// List all tables
///
/// GET /api/tables
#[instrument(skip(state))]
pub async fn list_tables(Extension(state): Extension<Arc<AppState>>) -> Response {
    info!("Listing all tables");

    match state.storage.list_namespaces().await {
        Ok(tables) => Json(serde_json::json!({
            "success": true,
            "count": tables.len(),
            "tables": tables,
        }))
        .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to list tables");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "success": false,
                    "error": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

/// Health check
pub async fn health_check(Extension(state): Extension<Arc<AppState>>) -> Response {
    let stats = state.storage.stats().await.ok();
    Json(serde_json::json!({
        "status": "healthy",
        "version": crate::VERSION,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "store": stats,
    }))
    .into_response()
}

/// Metrics endpoint (Prometheus format)
pub async fn metrics(Extension(state): Extension<Arc<AppState>>) -> Response {
    if let Ok(stats) = state.storage.stats().await {
        crate::metrics::DOCUMENTS.set(i64::try_from(stats.documents).unwrap_or(i64::MAX));
    }
    match crate::metrics::export_metrics() {
        Ok(text) => text.into_response(),
        Err(e) => {
            error!(error = %e, "Failed to export metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
