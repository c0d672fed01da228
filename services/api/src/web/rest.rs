//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use onboarding_core::{domain::Report, ports::PortError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use utoipa::{IntoParams, OpenApi, ToSchema};

const UNEXPECTED_VALIDATION_ERROR: &str =
    "There was an unexpected issue with the api, please try again.";
const AI_REQUEST_ERROR: &str = "Failed to process AI request";
const PERSIST_ERROR: &str = "Issue persisting the onboarding report";

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(health_handler, validate_industry_handler, ai_completion_handler, persist_report_handler),
    components(schemas(
        HealthResponse,
        IndustryValidationResponse,
        AiCompletionRequest,
        AiCompletionResponse,
        PersistReportRequest,
        MessageResponse,
        ErrorResponse
    )),
    tags(
        (name = "Onboarding API", description = "Supporting endpoints for the conversational onboarding wizard.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ValidateIndustryParams {
    /// The company to look up.
    pub company_name: Option<String>,
}

/// Whether a company belongs to the food and beverage group.
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IndustryValidationResponse {
    pub industry_match: bool,
    pub company_overview: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct AiCompletionRequest {
    pub prompt: String,
    /// Falls back to the configured temperature.
    pub temperature: Option<f32>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct AiCompletionResponse {
    /// The JSON object the model produced.
    #[schema(value_type = Object)]
    pub content: Value,
    #[schema(value_type = Option<Object>)]
    pub usage: Option<Value>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct PersistReportRequest {
    #[schema(value_type = Object)]
    pub report: Report,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}

fn failure(text: &str) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": text }))).into_response()
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Liveness check.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "The service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Checks whether a company is part of the food and beverage group.
#[utoipa::path(
    get,
    path = "/validate-industry",
    params(ValidateIndustryParams),
    responses(
        (status = 200, description = "Validation result", body = IndustryValidationResponse),
        (status = 400, description = "The company name is missing", body = MessageResponse),
        (status = 500, description = "The validator failed", body = MessageResponse)
    )
)]
pub async fn validate_industry_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<ValidateIndustryParams>,
) -> Response {
    let company_name = params.company_name.unwrap_or_default();
    info!("Validating industry for '{}'", company_name.trim());

    match app_state.validator.validate_company(&company_name).await {
        Ok(result) => Json(IndustryValidationResponse {
            industry_match: result.industry_match,
            company_overview: result.company_overview,
        })
        .into_response(),
        Err(PortError::InvalidInput(reason)) => message(StatusCode::BAD_REQUEST, &reason),
        Err(e) => {
            error!("Industry validation failed: {}", e);
            message(StatusCode::INTERNAL_SERVER_ERROR, UNEXPECTED_VALIDATION_ERROR)
        }
    }
}

/// Runs a single JSON-mode completion against the configured model.
#[utoipa::path(
    post,
    path = "/ai-completion",
    request_body = AiCompletionRequest,
    responses(
        (status = 200, description = "The model's JSON reply", body = AiCompletionResponse),
        (status = 500, description = "The request could not be processed", body = ErrorResponse)
    )
)]
pub async fn ai_completion_handler(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<AiCompletionRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!("Rejected AI completion body: {}", rejection);
            return failure(AI_REQUEST_ERROR);
        }
    };

    let temperature = request
        .temperature
        .unwrap_or(app_state.config.ai_temperature);
    let start_time = Instant::now();
    let result = app_state.completion.complete(&request.prompt, temperature).await;
    info!("AI completion took: {:?}", start_time.elapsed());

    match result {
        Ok(completion) => Json(AiCompletionResponse {
            content: completion.content,
            usage: completion.usage,
        })
        .into_response(),
        Err(e) => {
            error!("Error in AI completion: {}", e);
            failure(AI_REQUEST_ERROR)
        }
    }
}

/// Stores a finished onboarding report.
#[utoipa::path(
    post,
    path = "/report",
    request_body = PersistReportRequest,
    responses(
        (status = 200, description = "The report was stored", body = MessageResponse),
        (status = 500, description = "The report could not be stored", body = ErrorResponse)
    )
)]
pub async fn persist_report_handler(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<PersistReportRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!("Rejected report body: {}", rejection);
            return failure(PERSIST_ERROR);
        }
    };

    match app_state.store.persist(&request.report).await {
        Ok(()) => {
            info!("Persisted report {}", request.report.id);
            message(StatusCode::OK, "Report Persisted")
        }
        Err(e) => {
            error!("Failed to persist report {}: {}", request.report.id, e);
            failure(PERSIST_ERROR)
        }
    }
}
