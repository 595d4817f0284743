//! HTTP routes definition

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Document routes
///
/// - GET  /api/tables                        - List tables with document counts
/// - POST /api/tables/:table/documents       - Save (upsert) a document
/// - GET  /api/tables/:table/documents       - Query with ?key=&value=&limit=
/// - GET  /api/tables/:table/documents/:id   - Get a document
/// - POST /api/tables/:table/query           - Query with a JSON body
pub fn document_routes() -> Router {
    Router::new()
        .route("/api/tables", get(handlers::list_tables))
        .route(
            "/api/tables/:table/documents",
            post(handlers::save_document).get(handlers::list_documents),
        )
        .route(
            "/api/tables/:table/documents/:id",
            get(handlers::get_document),
        )
        .route("/api/tables/:table/query", post(handlers::query_documents))
}

/// Health check routes
pub fn health_routes() -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/_metrics", get(handlers::metrics))
}
