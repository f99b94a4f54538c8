//! 单图识别流程与错误分类

use ocr_conn::{status_code, ProviderError, RecognitionOutcome, RecognitionProvider};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::confidence::{aggregate, round_confidence};
use crate::model::ocr::ProcessedResult;

pub const INVALID_IMAGE_MESSAGE: &str = "Invalid or corrupted image file.";
pub const AUTH_FAILURE_MESSAGE: &str =
    "Google Cloud Vision API authentication failed. Please check your credentials.";
pub const GENERIC_FAILURE_MESSAGE: &str = "An error occurred while processing the image.";

/// 识别失败的类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OcrErrorKind {
    /// 图片无法被服务解码
    InvalidOrCorruptImage,
    /// 服务凭据或权限问题，属于服务端配置错误
    ProviderAuthFailure,
    ProviderGenericFailure,
}

/// 失败的性质：调用方输入问题，或服务端/临时问题
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureSeverity {
    Permanent,
    Transient,
}

impl OcrErrorKind {
    pub fn severity(self) -> FailureSeverity {
        match self {
            OcrErrorKind::InvalidOrCorruptImage => FailureSeverity::Permanent,
            OcrErrorKind::ProviderAuthFailure | OcrErrorKind::ProviderGenericFailure => {
                FailureSeverity::Transient
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct OcrFailure {
    pub kind: OcrErrorKind,
    /// 对外的 HTTP 错误信息
    pub message: String,
    /// 服务返回的原始信息，批量结果中使用
    pub provider_message: String,
    pub severity: FailureSeverity,
}

impl OcrFailure {
    pub fn new(kind: OcrErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind,
            provider_message: message.clone(),
            message,
            severity: kind.severity(),
        }
    }

    pub fn with_provider_message(mut self, provider_message: impl Into<String>) -> Self {
        self.provider_message = provider_message.into();
        self
    }
}

/// 将服务错误归类；纯函数，不做重试
///
/// 信息匹配区分大小写。
pub fn classify_provider_error(error: &ProviderError) -> OcrFailure {
    let raw = if error.message.trim().is_empty() {
        GENERIC_FAILURE_MESSAGE
    } else {
        error.message.as_str()
    };

    let failure = if error.code == status_code::INVALID_ARGUMENT
        || error.message.contains("Invalid image")
    {
        OcrFailure::new(OcrErrorKind::InvalidOrCorruptImage, INVALID_IMAGE_MESSAGE)
    } else if matches!(
        error.code,
        status_code::PERMISSION_DENIED | status_code::UNAUTHENTICATED
    ) || error.message.contains("permission")
    {
        OcrFailure::new(OcrErrorKind::ProviderAuthFailure, AUTH_FAILURE_MESSAGE)
    } else {
        OcrFailure::new(OcrErrorKind::ProviderGenericFailure, raw)
    };

    failure.with_provider_message(raw)
}

/// 将一次识别结果归约为处理结果
///
/// 文本为空（或没有检测结果）时直接返回空结果，置信度为 0，
/// 不论注释树中是否有置信度。
pub fn process_outcome(outcome: &RecognitionOutcome) -> ProcessedResult {
    let text = outcome.full_text().map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return ProcessedResult::empty();
    }

    ProcessedResult {
        text: text.to_string(),
        confidence: round_confidence(aggregate(outcome.annotation.as_ref())),
        has_text: true,
    }
}

/// 调用识别服务一次并处理结果
pub async fn recognize_and_process(
    provider: &dyn RecognitionProvider,
    image: &[u8],
) -> Result<ProcessedResult, OcrFailure> {
    match provider.recognize(image).await {
        Ok(outcome) => {
            let processed = process_outcome(&outcome);
            debug!(
                provider = provider.provider_name(),
                detections = outcome.text_detections.len(),
                has_text = processed.has_text,
                confidence = processed.confidence,
                "识别结果处理完成"
            );
            Ok(processed)
        }
        Err(error) => {
            let failure = classify_provider_error(&error);
            warn!(
                provider = provider.provider_name(),
                code = error.code,
                reason = error.code_description(),
                kind = ?failure.kind,
                error = %error,
                "识别服务调用失败"
            );
            Err(failure)
        }
    }
}
