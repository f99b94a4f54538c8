//! OCR 识别接口

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::model::ocr::{BatchOcrResponse, OcrResponse};
use crate::util::logging::standards::events;
use crate::util::processing::{process_batch, recognize_and_process};
use crate::util::validation::{UploadValidator, UploadedFile, ValidationError};
use crate::util::ApiError;
use crate::AppState;

pub const SINGLE_FIELD: &str = "image";
pub const BATCH_FIELD: &str = "images";

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

fn reject(err: impl Into<ApiError>, started: Instant) -> ApiError {
    let err = err.into().with_elapsed(elapsed_ms(started));
    warn!(
        event = events::UPLOAD_REJECTED,
        status = err.status.as_u16(),
        error = %err.message
    );
    err
}

/// 非 multipart 请求等同于未上传文件
fn multipart_or_missing(
    multipart: Result<Multipart, MultipartRejection>,
    missing: ValidationError,
    started: Instant,
) -> Result<Multipart, ApiError> {
    multipart.map_err(|rejection| {
        tracing::debug!(
            event = events::UPLOAD_REJECTED,
            rejection = %rejection.body_text()
        );
        reject(missing, started)
    })
}

/// 读取表单中的文件字段
///
/// 非文件字段忽略；文件字段名不是 `field` 时拒绝。
pub async fn collect_uploads(
    mut multipart: Multipart,
    field: &str,
) -> Result<Vec<UploadedFile>, ApiError> {
    let mut files = Vec::new();

    while let Some(part) = multipart.next_field().await? {
        let Some(filename) = part.file_name().map(str::to_string) else {
            continue;
        };
        let name = part.name().unwrap_or_default().to_string();
        if name != field {
            return Err(ValidationError::UnexpectedField(name).into());
        }

        let content_type = part.content_type().map(str::to_string);
        let bytes = part.bytes().await?;
        files.push(UploadedFile {
            field_name: name,
            filename: Some(filename),
            content_type,
            bytes,
        });
    }

    Ok(files)
}

/// 单图识别
pub async fn process_ocr(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<OcrResponse>, ApiError> {
    let started = Instant::now();

    let multipart = multipart_or_missing(
        multipart,
        ValidationError::MissingFile(SINGLE_FIELD.to_string()),
        started,
    )?;
    let files = collect_uploads(multipart, SINGLE_FIELD)
        .await
        .map_err(|e| reject(e, started))?;
    let file = UploadValidator::new(&state.config.limits)
        .validate_single(SINGLE_FIELD, files)
        .map_err(|e| reject(e, started))?;

    info!(
        event = events::OCR_START,
        filename = %file.display_name(),
        bytes = file.bytes.len(),
        provider = state.recognizer.provider_name()
    );

    match recognize_and_process(state.recognizer.as_ref(), &file.bytes).await {
        Ok(processed) => {
            let processing_time_ms = elapsed_ms(started);
            if processed.has_text {
                info!(
                    event = events::OCR_COMPLETE,
                    filename = %file.display_name(),
                    chars = processed.text.chars().count(),
                    confidence = processed.confidence,
                    processing_time_ms
                );
            } else {
                info!(
                    event = events::OCR_NO_TEXT,
                    filename = %file.display_name(),
                    processing_time_ms
                );
            }
            Ok(Json(OcrResponse::from_processed(processed, processing_time_ms)))
        }
        Err(failure) => {
            let processing_time_ms = elapsed_ms(started);
            error!(
                event = events::OCR_ERROR,
                filename = %file.display_name(),
                kind = ?failure.kind,
                severity = ?failure.severity,
                error = %failure.message,
                processing_time_ms
            );
            Err(ApiError::from(failure).with_elapsed(processing_time_ms))
        }
    }
}

/// 批量识别：单张失败记录在结果中，不影响整体状态码
pub async fn process_batch_ocr(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<BatchOcrResponse>, ApiError> {
    let started = Instant::now();

    let multipart = multipart_or_missing(
        multipart,
        ValidationError::MissingFiles(BATCH_FIELD.to_string()),
        started,
    )?;
    let files = collect_uploads(multipart, BATCH_FIELD)
        .await
        .map_err(|e| reject(e, started))?;
    let files = UploadValidator::new(&state.config.limits)
        .validate_batch(BATCH_FIELD, files)
        .map_err(|e| reject(e, started))?;

    let items = files.into_iter().map(UploadedFile::into_batch_item).collect();
    let results = process_batch(state.recognizer.as_ref(), items)
        .await
        .map_err(|e| ApiError::from(e).with_elapsed(elapsed_ms(started)))?;

    Ok(Json(BatchOcrResponse::new(results, elapsed_ms(started))))
}
