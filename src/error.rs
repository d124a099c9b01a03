use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Engine initialization failed during {step}: {cause}")]
    Initialization { step: String, cause: String },

    #[error("{resource} not found: {key}")]
    NotFound { resource: &'static str, key: String },

    #[error("Query {query} failed: {cause}")]
    QueryFailed { query: String, cause: String },

    #[error("Query {query} exceeded its deadline of {timeout_ms}ms")]
    QueryTimeout { query: String, timeout_ms: u64 },

    #[error("No engine connection available for {query}: {cause}")]
    EngineBusy { query: String, cause: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            GatewayError::Initialization { step, cause } => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse {
                    error: "engine_unavailable".to_string(),
                    message: format!(
                        "Data lake connection failed during {}; restart the gateway to retry",
                        step
                    ),
                    query: None,
                    cause: Some(cause.clone()),
                },
            ),
            GatewayError::NotFound { resource, key } => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: "not_found".to_string(),
                    message: format!("{} '{}' not found", resource, key),
                    query: None,
                    cause: None,
                },
            ),
            GatewayError::QueryFailed { query, cause } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "query_failed".to_string(),
                    message: format!("Query '{}' failed", query),
                    query: Some(query.clone()),
                    cause: Some(cause.clone()),
                },
            ),
            GatewayError::QueryTimeout { query, timeout_ms } => (
                StatusCode::GATEWAY_TIMEOUT,
                ErrorResponse {
                    error: "query_timeout".to_string(),
                    message: format!("Query '{}' exceeded {}ms and was aborted", query, timeout_ms),
                    query: Some(query.clone()),
                    cause: None,
                },
            ),
            GatewayError::EngineBusy { query, cause } => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse {
                    error: "engine_busy".to_string(),
                    message: "No engine connection became available".to_string(),
                    query: Some(query.clone()),
                    cause: Some(cause.clone()),
                },
            ),
            GatewayError::InvalidRequest { message } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "invalid_request".to_string(),
                    message: message.clone(),
                    query: None,
                    cause: None,
                },
            ),
            GatewayError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "internal_error".to_string(),
                    message: msg.clone(),
                    query: None,
                    cause: None,
                },
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<tokio::task::JoinError> for GatewayError {
    fn from(err: tokio::task::JoinError) -> Self {
        GatewayError::Internal(format!("Engine task aborted: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
