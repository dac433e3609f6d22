use crate::llm::LlmError;
use crate::profile::ProfileError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid profile: {0}")]
    InvalidProfile(#[from] ProfileError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("LLM API key not configured. Please add {0}=your_key to your .env.local file or environment and restart the server.")]
    MissingApiKey(String),

    #[error("Failed to generate diet plan. API Error: {message}")]
    Upstream { status: u16, message: String },

    #[error("No response generated from AI")]
    EmptyResponse,

    #[error("HTTP request error: {0}")]
    HttpError(String),

    #[error("Timeout error: {0}")]
    Timeout(String),
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::MissingApiKey { env_var } => AppError::MissingApiKey(env_var),
            LlmError::Api { status, message } => AppError::Upstream { status, message },
            LlmError::EmptyResponse => AppError::EmptyResponse,
            LlmError::Timeout(msg) => AppError::Timeout(msg),
            LlmError::Http(e) => AppError::HttpError(e.to_string()),
            LlmError::Parse(e) => AppError::HttpError(format!("Malformed LLM response: {}", e)),
        }
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidProfile(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::MissingApiKey(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            AppError::EmptyResponse => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::HttpError(_) => StatusCode::BAD_GATEWAY,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidProfile(_) => "invalid_profile",
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::MissingApiKey(_) => "api_key_missing",
            AppError::Upstream { .. } => "llm_error",
            AppError::EmptyResponse => "empty_response",
            AppError::HttpError(_) => "http_error",
            AppError::Timeout(_) => "timeout_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();
        let message = self.to_string();

        error!(error_code = code, message = %message, "Request failed");

        let body = Json(json!({
            "error": {
                "message": message,
                "code": code
            }
        }));

        (status, body).into_response()
    }
}
