//! Axum router configuration with middleware.
//!
//! Page bootstraps live at `/` and `/chat/{id}`, the JSON + SSE API under
//! `/api/`. Middleware: CORS, request tracing.

use axum::Router;
use axum::routing::{get, patch, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Auth
        .route("/auth/guest", get(handlers::auth::guest))
        .route("/auth/signout", post(handlers::auth::signout))
        // Turns and chat management
        .route(
            "/chat",
            post(handlers::chat::stream_chat).delete(handlers::chat::delete_chat),
        )
        .route("/chat/{id}/stop", post(handlers::chat::stop_chat))
        .route(
            "/chat/{id}/visibility",
            patch(handlers::chat::update_visibility),
        )
        .route(
            "/chat/{id}/messages",
            axum::routing::delete(handlers::chat::delete_trailing_messages),
        )
        // History
        .route("/history", get(handlers::history::list_history))
        // Votes
        .route(
            "/vote",
            get(handlers::vote::get_votes).patch(handlers::vote::vote_message),
        )
        // Documents
        .route(
            "/document",
            get(handlers::document::get_document)
                .post(handlers::document::save_document)
                .delete(handlers::document::delete_document_versions),
        )
        .route(
            "/suggestions",
            get(handlers::suggestion::get_suggestions).post(handlers::suggestion::save_suggestions),
        );

    Router::new()
        .route("/", get(handlers::page::new_chat))
        .route("/chat/{id}", get(handlers::page::existing_chat))
        .nest("/api", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint (no auth required).
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
