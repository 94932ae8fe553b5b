//! HTTP request handlers for the policy engine API.
//!
//! This module contains the handler functions for all API endpoints.

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{PayrollLine, Period, PolicyException};

use super::request::{
    EvaluateRequest, ExceptionCreateRequest, RetroCreateRequest, SimulationRequest,
};
use super::response::{ApiError, ApiErrorResponse};
use super::state::AppState;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/evaluate", post(evaluate_handler))
        .route("/simulations", post(simulate_handler))
        .route("/simulations/:id", get(get_simulation_handler))
        .route("/retro", post(create_retro_handler))
        .route("/retro/:id", get(get_retro_handler))
        .route("/retro/:id/calculate", post(calculate_retro_handler))
        .route("/retro/:id/approve", post(approve_retro_handler))
        .route("/retro/:id/apply", post(apply_retro_handler))
        .route("/retro/:id/cancel", post(cancel_retro_handler))
        .route("/exceptions", post(create_exception_handler))
        .route("/policies/:id/exceptions", get(list_exceptions_handler))
        .with_state(state)
}

/// Response body for the `/evaluate` endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EvaluateResponse {
    employee_id: String,
    period: Period,
    lines: Vec<PayrollLine>,
}

/// Converts a JSON extraction rejection into an API error, logging it
/// against the request's correlation id.
fn rejection_error(rejection: JsonRejection, correlation_id: Uuid) -> ApiError {
    match rejection {
        JsonRejection::JsonDataError(err) => {
            let body_text = err.body_text();
            warn!(correlation_id = %correlation_id, error = %body_text, "JSON data error");
            if body_text.contains("missing field") {
                ApiError::validation_error(body_text)
            } else {
                ApiError::malformed_json(body_text)
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            warn!(correlation_id = %correlation_id, error = %err, "JSON syntax error");
            ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
        }
        JsonRejection::MissingJsonContentType(_) => ApiError::new(
            "MISSING_CONTENT_TYPE",
            "Content-Type must be application/json",
        ),
        _ => ApiError::malformed_json("Failed to parse request body"),
    }
}

/// Handler for GET /health.
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Handler for POST /evaluate.
///
/// Runs every applicable policy for one employee and period and returns
/// the resulting payroll lines.
async fn evaluate_handler(
    State(state): State<AppState>,
    payload: Result<Json<EvaluateRequest>, JsonRejection>,
) -> impl IntoResponse {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing evaluate request");

    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                [(header::CONTENT_TYPE, "application/json")],
                Json(rejection_error(rejection, correlation_id)),
            )
                .into_response();
        }
    };

    match state
        .executor()
        .execute_for_employee(&request.employee_id, request.period)
        .await
    {
        Ok(lines) => {
            info!(
                correlation_id = %correlation_id,
                employee_id = %request.employee_id,
                period = %request.period,
                line_count = lines.len(),
                "Evaluation completed"
            );
            Json(EvaluateResponse {
                employee_id: request.employee_id,
                period: request.period,
                lines,
            })
            .into_response()
        }
        Err(err) => {
            warn!(correlation_id = %correlation_id, error = %err, "Evaluation failed");
            ApiErrorResponse::from(err).into_response()
        }
    }
}

/// Handler for POST /simulations.
async fn simulate_handler(
    State(state): State<AppState>,
    payload: Result<Json<SimulationRequest>, JsonRejection>,
) -> impl IntoResponse {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing simulation request");

    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(rejection_error(rejection, correlation_id)),
            )
                .into_response();
        }
    };

    match state
        .simulations()
        .simulate(&request.policy_id, request.period, &request.actor_id)
        .await
    {
        Ok(run) => (StatusCode::CREATED, Json(run)).into_response(),
        Err(err) => {
            warn!(correlation_id = %correlation_id, error = %err, "Simulation failed");
            ApiErrorResponse::from(err).into_response()
        }
    }
}

/// Handler for GET /simulations/:id.
async fn get_simulation_handler(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> impl IntoResponse {
    match state.simulations().get(&run_id).await {
        Ok(run) => Json(run).into_response(),
        Err(err) => ApiErrorResponse::from(err).into_response(),
    }
}

/// Handler for POST /retro.
async fn create_retro_handler(
    State(state): State<AppState>,
    payload: Result<Json<RetroCreateRequest>, JsonRejection>,
) -> impl IntoResponse {
    let correlation_id = Uuid::new_v4();
    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(rejection_error(rejection, correlation_id)),
            )
                .into_response();
        }
    };

    match state
        .retro()
        .create(
            &request.policy_id,
            &request.company_id,
            request.from_period,
            request.to_period,
            request.target_period,
            &request.requested_by,
        )
        .await
    {
        Ok(application) => (StatusCode::CREATED, Json(application)).into_response(),
        Err(err) => {
            warn!(correlation_id = %correlation_id, error = %err, "Retro creation failed");
            ApiErrorResponse::from(err).into_response()
        }
    }
}

/// Handler for GET /retro/:id.
async fn get_retro_handler(
    State(state): State<AppState>,
    Path(application_id): Path<String>,
) -> impl IntoResponse {
    match state.retro().get(&application_id).await {
        Ok(application) => Json(application).into_response(),
        Err(err) => ApiErrorResponse::from(err).into_response(),
    }
}

/// Handler for POST /retro/:id/calculate.
async fn calculate_retro_handler(
    State(state): State<AppState>,
    Path(application_id): Path<String>,
) -> impl IntoResponse {
    match state.retro().calculate(&application_id).await {
        Ok(application) => Json(application).into_response(),
        Err(err) => ApiErrorResponse::from(err).into_response(),
    }
}

/// Handler for POST /retro/:id/approve.
async fn approve_retro_handler(
    State(state): State<AppState>,
    Path(application_id): Path<String>,
) -> impl IntoResponse {
    match state.retro().approve(&application_id).await {
        Ok(application) => Json(application).into_response(),
        Err(err) => ApiErrorResponse::from(err).into_response(),
    }
}

/// Handler for POST /retro/:id/apply.
async fn apply_retro_handler(
    State(state): State<AppState>,
    Path(application_id): Path<String>,
) -> impl IntoResponse {
    match state.retro().apply(&application_id).await {
        Ok(application) => Json(application).into_response(),
        Err(err) => ApiErrorResponse::from(err).into_response(),
    }
}

/// Handler for POST /retro/:id/cancel.
async fn cancel_retro_handler(
    State(state): State<AppState>,
    Path(application_id): Path<String>,
) -> impl IntoResponse {
    match state.retro().cancel(&application_id).await {
        Ok(application) => Json(application).into_response(),
        Err(err) => ApiErrorResponse::from(err).into_response(),
    }
}

/// Handler for POST /exceptions.
async fn create_exception_handler(
    State(state): State<AppState>,
    payload: Result<Json<ExceptionCreateRequest>, JsonRejection>,
) -> impl IntoResponse {
    let correlation_id = Uuid::new_v4();
    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(rejection_error(rejection, correlation_id)),
            )
                .into_response();
        }
    };

    let company_id = request.company_id.clone();
    let exception: PolicyException = request.into();
    match state.exceptions().create(&company_id, exception).await {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(err) => {
            warn!(correlation_id = %correlation_id, error = %err, "Exception creation failed");
            ApiErrorResponse::from(err).into_response()
        }
    }
}

/// Handler for GET /policies/:id/exceptions.
async fn list_exceptions_handler(
    State(state): State<AppState>,
    Path(policy_id): Path<String>,
) -> impl IntoResponse {
    match state.exceptions().list(&policy_id).await {
        Ok(exceptions) => Json(exceptions).into_response(),
        Err(err) => ApiErrorResponse::from(err).into_response(),
    }
}
