use axum::{
    Json,
    extract::multipart::MultipartError,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::ocr::OcrError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("field required: file")]
    MissingFile,
    #[error("could not read upload: {message}")]
    Upload { status: StatusCode, message: String },
    #[error("unauthorized")]
    Unauthorized,
    #[error("image echo is disabled")]
    EchoDisabled,
    #[error("invalid image")]
    InvalidImage,
    #[error("ocr engine unavailable: {0}")]
    OcrUnavailable(String),
    #[error("ocr failed: {0}")]
    Ocr(String),
    #[error("template error: {0}")]
    Template(#[from] askama::Error),
    #[error("worker failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingFile => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Upload { status, .. } => *status,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::EchoDisabled | AppError::InvalidImage => StatusCode::BAD_REQUEST,
            AppError::OcrUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Ocr(_) | AppError::Template(_) | AppError::Join(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<OcrError> for AppError {
    fn from(e: OcrError) -> Self {
        match e {
            OcrError::Decode(_) => AppError::InvalidImage,
            OcrError::NotAvailable(msg) => AppError::OcrUnavailable(msg),
            other => AppError::Ocr(other.to_string()),
        }
    }
}

/// Keeps the status axum derives for the failure, e.g. 413 once the body
/// limit is hit.
impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        AppError::Upload { status: e.status(), message: e.body_text() }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }

        let body = Json(serde_json::json!({ "detail": self.to_string() }));
        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
