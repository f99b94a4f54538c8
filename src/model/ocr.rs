//! OCR 接口的数据模型

use serde::{Deserialize, Serialize};

pub const NO_TEXT_MESSAGE: &str = "No text found in the image.";

/// 单次识别的处理结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedResult {
    /// 去除首尾空白后的全文
    pub text: String,
    /// 保留两位小数的置信度
    pub confidence: f64,
    pub has_text: bool,
}

impl ProcessedResult {
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
            has_text: false,
        }
    }
}

/// 批量请求中单张图片的结果，顺序与上传顺序一致
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchItemResult {
    Success {
        filename: String,
        success: bool,
        text: String,
        confidence: f64,
    },
    Failure {
        filename: String,
        success: bool,
        error: String,
    },
}

impl BatchItemResult {
    pub fn success(filename: impl Into<String>, processed: ProcessedResult) -> Self {
        BatchItemResult::Success {
            filename: filename.into(),
            success: true,
            text: processed.text,
            confidence: processed.confidence,
        }
    }

    pub fn failure(filename: impl Into<String>, error: impl Into<String>) -> Self {
        BatchItemResult::Failure {
            filename: filename.into(),
            success: false,
            error: error.into(),
        }
    }

    pub fn filename(&self) -> &str {
        match self {
            BatchItemResult::Success { filename, .. } | BatchItemResult::Failure { filename, .. } => {
                filename
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BatchItemResult::Success { .. })
    }
}

/// 单图识别响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrResponse {
    pub success: bool,
    pub text: String,
    pub confidence: f64,
    pub processing_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl OcrResponse {
    /// 无文字时返回空文本、零置信度并附带提示
    pub fn from_processed(processed: ProcessedResult, processing_time_ms: u64) -> Self {
        if !processed.has_text {
            return Self {
                success: true,
                text: String::new(),
                confidence: 0.0,
                processing_time_ms,
                message: Some(NO_TEXT_MESSAGE.to_string()),
            };
        }

        Self {
            success: true,
            text: processed.text,
            confidence: processed.confidence,
            processing_time_ms,
            message: None,
        }
    }
}

/// 批量识别响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOcrResponse {
    pub success: bool,
    pub results: Vec<BatchItemResult>,
    pub total_images: usize,
    pub processing_time_ms: u64,
}

impl BatchOcrResponse {
    pub fn new(results: Vec<BatchItemResult>, processing_time_ms: u64) -> Self {
        Self {
            success: true,
            total_images: results.len(),
            results,
            processing_time_ms,
        }
    }
}

/// 统一错误响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub processing_time_ms: u64,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, processing_time_ms: u64) -> Self {
        Self {
            success: false,
            error: error.into(),
            processing_time_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_batch_item_wire_shape() {
        let ok = BatchItemResult::success(
            "a.png",
            ProcessedResult {
                text: "Hi".to_string(),
                confidence: 0.91,
                has_text: true,
            },
        );
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"filename": "a.png", "success": true, "text": "Hi", "confidence": 0.91})
        );

        let failed = BatchItemResult::failure("b.png", "Invalid or corrupted image file.");
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            json!({"filename": "b.png", "success": false, "error": "Invalid or corrupted image file."})
        );
        assert_eq!(failed.filename(), "b.png");
        assert!(!failed.is_success());
    }

    #[test]
    fn test_no_text_response_carries_message() {
        let response = OcrResponse::from_processed(ProcessedResult::empty(), 12);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["text"], "");
        assert_eq!(value["confidence"], 0.0);
        assert_eq!(value["message"], NO_TEXT_MESSAGE);
        assert_eq!(value["processing_time_ms"], 12);
    }

    #[test]
    fn test_text_response_omits_message() {
        let response = OcrResponse::from_processed(
            ProcessedResult {
                text: "Hello".to_string(),
                confidence: 0.5,
                has_text: true,
            },
            3,
        );
        let value = serde_json::to_value(&response).unwrap();
        assert!(value.get("message").is_none());
        assert_eq!(value["success"], true);
    }
}
