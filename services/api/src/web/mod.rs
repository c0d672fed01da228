pub mod onboarding_task;
pub mod protocol;
pub mod rest;
pub mod speech;
pub mod state;
pub mod ws_handler;

use crate::{config::ConfigError, error::ApiError};
use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use rest::ApiDoc;
use state::AppState;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Re-export the main handlers to make them easily accessible
// to the binary that builds the web server.
pub use rest::{
    ai_completion_handler, health_handler, persist_report_handler, validate_industry_handler,
};
pub use ws_handler::ws_handler;

/// Builds the complete application: REST routes, the WebSocket endpoint and Swagger UI.
pub fn build_router(app_state: Arc<AppState>) -> Result<Router, ApiError> {
    let origin = app_state
        .config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ConfigError::InvalidValue("CORS_ORIGIN".to_string(), e.to_string()))?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    let api_router = Router::new()
        .route("/health", get(health_handler))
        .route("/validate-industry", get(validate_industry_handler))
        .route("/ai-completion", post(ai_completion_handler))
        .route("/report", post(persist_report_handler))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    Ok(Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())))
}
