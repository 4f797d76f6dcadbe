//! HTTP mapping for crate errors

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, error};

use crate::core::error::Error;

/// A crate error plus the generic message shown when the server is at fault
#[derive(Debug)]
pub struct ApiError {
    pub error: Error,
    pub context: &'static str,
}

impl ApiError {
    pub fn new(error: Error, context: &'static str) -> Self {
        Self { error, context }
    }

    pub fn status(&self) -> StatusCode {
        match self.error {
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::OutsideSandbox { .. } => StatusCode::FORBIDDEN,
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message for the `error` field of the body
    pub fn message(&self) -> String {
        match &self.error {
            Error::NotFound { .. } => "File or directory not found".to_string(),
            Error::OutsideSandbox { .. } => "Path is outside the sandbox".to_string(),
            Error::Validation { message } => message.clone(),
            _ => self.context.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(Error::validation(rejection.body_text()), "Invalid request body")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.error.is_client_error() {
            debug!("{}: {}", self.context, self.error);
        } else {
            error!("{}: {}", self.context, self.error);
        }

        (self.status(), Json(json!({ "error": self.message() }))).into_response()
    }
}

/// Attach a context message to a fallible operation
pub trait Context<T> {
    fn context(self, context: &'static str) -> std::result::Result<T, ApiError>;
}

impl<T> Context<T> for crate::core::error::Result<T> {
    fn context(self, context: &'static str) -> std::result::Result<T, ApiError> {
        self.map_err(|error| ApiError::new(error, context))
    }
}
