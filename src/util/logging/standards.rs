//! Centralised logging metadata (event names, shared keys, etc.).

/// Canonical event names used across the service.
pub mod events {
    /// HTTP request lifecycle.
    pub const REQUEST_START: &str = "request.start";
    pub const REQUEST_COMPLETE: &str = "request.complete";
    pub const REQUEST_ERROR: &str = "request.error";
    pub const REQUEST_SLOW: &str = "request.slow";
    pub const REQUEST_RATE_LIMITED: &str = "request.rate_limited";

    /// Upload validation.
    pub const UPLOAD_REJECTED: &str = "upload.rejected";

    /// Single-image recognition.
    pub const OCR_START: &str = "ocr.start";
    pub const OCR_COMPLETE: &str = "ocr.complete";
    pub const OCR_NO_TEXT: &str = "ocr.no_text";
    pub const OCR_ERROR: &str = "ocr.error";

    /// Batch fan-out.
    pub const BATCH_START: &str = "ocr.batch_start";
    pub const BATCH_ITEM_COMPLETE: &str = "ocr.batch_item_complete";
    pub const BATCH_ITEM_ERROR: &str = "ocr.batch_item_error";
    pub const BATCH_COMPLETE: &str = "ocr.batch_complete";
}

/// Slow request threshold for the access log.
pub const SLOW_REQUEST_THRESHOLD_MS: u64 = 5_000;
