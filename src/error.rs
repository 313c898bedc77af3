use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::face::engine::FaceError;
use crate::face::matcher::MatchError;
use crate::geofence::GeofenceError;

/// Service-level error taxonomy. Every variant renders as a JSON body
/// `{"message": ...}` with the matching HTTP status, so handlers can
/// `?` service results straight into responses.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Face(#[from] FaceError),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    Location(#[from] GeofenceError),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Face(e) => match e {
                // user-correctable: retake the photo
                FaceError::NoFaceDetected | FaceError::DecodeError(_) => StatusCode::BAD_REQUEST,
                // model problems are ours, not the caller's
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Match(_) => StatusCode::BAD_REQUEST,
            AppError::Location(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }

    fn error_response(&self) -> HttpResponse {
        if self.status().is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        HttpResponse::build(self.status()).json(json!({ "message": self.to_string() }))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!(error = %e, "database error");
        AppError::Internal("Internal Server Error".to_string())
    }
}
