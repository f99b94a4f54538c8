use axum::extract::multipart::MultipartError;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::fmt::Display;

use crate::model::ocr::ErrorResponse;
use processing::{BatchError, OcrErrorKind, OcrFailure};
use validation::ValidationError;

pub mod auth;
pub mod config;
pub mod log;
pub mod logging;
pub mod middleware;
pub mod processing;
pub mod validation;

/// 接口统一错误：状态码 + `{success:false, error, processing_time_ms}`
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub processing_time_ms: u64,
    pub retry_after_secs: Option<u64>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            processing_time_ms: 0,
            retry_after_secs: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn too_many_requests(message: impl Into<String>, retry_after_secs: u64) -> Self {
        Self {
            retry_after_secs: Some(retry_after_secs),
            ..Self::new(StatusCode::TOO_MANY_REQUESTS, message)
        }
    }

    /// 记录失败前已耗费的处理时间
    pub fn with_elapsed(mut self, processing_time_ms: u64) -> Self {
        self.processing_time_ms = processing_time_ms;
        self
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse::new(self.message, self.processing_time_ms));
        let mut response = (self.status, body).into_response();
        if let Some(secs) = self.retry_after_secs {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

impl From<OcrFailure> for ApiError {
    fn from(failure: OcrFailure) -> Self {
        let status = match failure.kind {
            OcrErrorKind::InvalidOrCorruptImage => StatusCode::UNPROCESSABLE_ENTITY,
            OcrErrorKind::ProviderAuthFailure | OcrErrorKind::ProviderGenericFailure => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, failure.message)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::new(err.status_code(), err.to_string())
    }
}

impl From<BatchError> for ApiError {
    fn from(err: BatchError) -> Self {
        match err {
            BatchError::EmptyBatch => Self::bad_request(err.to_string()),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        let status = err.status();
        let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
            "File size exceeds the maximum allowed limit.".to_string()
        } else {
            err.body_text()
        };
        Self::new(status, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use processing::FailureSeverity;

    #[test]
    fn test_ocr_failure_status_mapping() {
        let invalid: ApiError = OcrFailure::new(
            OcrErrorKind::InvalidOrCorruptImage,
            "Invalid or corrupted image file.",
        )
        .into();
        assert_eq!(invalid.status, StatusCode::UNPROCESSABLE_ENTITY);

        let auth = OcrFailure::new(OcrErrorKind::ProviderAuthFailure, "auth");
        assert_eq!(auth.severity, FailureSeverity::Transient);
        assert_eq!(ApiError::from(auth).status, StatusCode::INTERNAL_SERVER_ERROR);

        let generic: ApiError = OcrFailure::new(OcrErrorKind::ProviderGenericFailure, "boom").into();
        assert_eq!(generic.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(generic.message, "boom");
    }

    #[test]
    fn test_validation_status_is_kept() {
        let err: ApiError = ValidationError::EmptyFile.into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "File is empty.");
    }

    #[test]
    fn test_rate_limited_response_has_retry_after() {
        let response = ApiError::too_many_requests("slow down", 60)
            .with_elapsed(0)
            .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "60");
    }
}
