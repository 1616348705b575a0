use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    UnprocessableEntity(String),
    #[error("{0}")]
    Dependency(String),
    #[error("{0}")]
    Internal(String),
    #[error("{family} rollup failed at {level} level: {message}")]
    Rollup {
        family: String,
        level: &'static str,
        message: String,
    },
}

impl AppError {
    /// Wraps a store failure so the response names the metric family and
    /// hierarchy level that produced it.
    pub fn rollup(family: &str, level: &'static str, source: AppError) -> Self {
        match source {
            already @ AppError::Rollup { .. } => already,
            other => AppError::Rollup {
                family: family.to_string(),
                level,
                message: other.to_string(),
            },
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Dependency(_) | AppError::Rollup { .. } => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            match &self {
                AppError::Rollup { family, level, message } => {
                    tracing::error!(family = %family, level = %level, error = %message, "KPI rollup failed");
                }
                other => tracing::error!(status = status.as_u16(), error = %other, "Request failed"),
            }
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
