//! Google Cloud Vision REST 客户端
//!
//! 使用 `images:annotate` 接口的 `DOCUMENT_TEXT_DETECTION` 特性，
//! 将响应转换为 [`RecognitionOutcome`]。

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::annotation::AnnotationNode;
use crate::error::{status_code, ProviderError};
use crate::provider::{RecognitionOutcome, RecognitionProvider};

pub const DEFAULT_ENDPOINT: &str = "https://vision.googleapis.com";
const ANNOTATE_PATH: &str = "/v1/images:annotate";
const DOCUMENT_TEXT_DETECTION: &str = "DOCUMENT_TEXT_DETECTION";
const SLOW_CALL_WARN_THRESHOLD_MS: u128 = 8_000;

/// 客户端启动选项（由上层配置传入）
#[derive(Debug, Clone)]
pub struct VisionOptions {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for VisionOptions {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            access_token: None,
            timeout_secs: 60,
            connect_timeout_secs: 30,
            user_agent: "Vision-OCR-Server/1.0".to_string(),
        }
    }
}

pub struct VisionClient {
    client: Client,
    annotate_url: String,
    options: VisionOptions,
}

impl VisionClient {
    pub fn new(options: VisionOptions) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .connect_timeout(Duration::from_secs(options.connect_timeout_secs))
            .user_agent(&options.user_agent)
            .build()?;

        let annotate_url = format!(
            "{}{}",
            options.endpoint.trim_end_matches('/'),
            ANNOTATE_PATH
        );

        Ok(Self {
            client,
            annotate_url,
            options,
        })
    }

    pub fn annotate_url(&self) -> &str {
        &self.annotate_url
    }

    pub fn has_credentials(&self) -> bool {
        self.options.api_key.is_some() || self.options.access_token.is_some()
    }
}

#[async_trait]
impl RecognitionProvider for VisionClient {
    async fn recognize(&self, image: &[u8]) -> Result<RecognitionOutcome, ProviderError> {
        let started = Instant::now();
        let body = AnnotateRequest::document_text(image);

        let mut request = self.client.post(&self.annotate_url).json(&body);
        if let Some(key) = &self.options.api_key {
            request = request.query(&[("key", key)]);
        } else if let Some(token) = &self.options.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(ProviderError::from_transport)?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(ProviderError::from_transport)?;

        let elapsed = started.elapsed().as_millis();
        if elapsed > SLOW_CALL_WARN_THRESHOLD_MS {
            warn!(
                target: "ocr.vision",
                event = "vision.request.slow",
                elapsed_ms = elapsed as u64,
                image_bytes = image.len()
            );
        }

        if !status.is_success() {
            let error = parse_error_body(status.as_u16(), &bytes);
            warn!(
                target: "ocr.vision",
                event = "vision.request.failed",
                http_status = status.as_u16(),
                code = error.code,
                reason = error.code_description(),
                elapsed_ms = elapsed as u64
            );
            return Err(error);
        }

        let outcome = parse_annotate_body(&bytes)?;
        debug!(
            target: "ocr.vision",
            event = "vision.request.complete",
            detections = outcome.text_detections.len(),
            has_annotation = outcome.annotation.is_some(),
            elapsed_ms = elapsed as u64
        );
        Ok(outcome)
    }

    fn provider_name(&self) -> &str {
        "google-vision"
    }
}

#[derive(Serialize)]
struct AnnotateRequest {
    requests: [ImageRequest; 1],
}

#[derive(Serialize)]
struct ImageRequest {
    image: ImageContent,
    features: [Feature; 1],
}

#[derive(Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
}

impl AnnotateRequest {
    fn document_text(image: &[u8]) -> Self {
        let engine = base64::engine::general_purpose::STANDARD;
        Self {
            requests: [ImageRequest {
                image: ImageContent {
                    content: engine.encode(image),
                },
                features: [Feature {
                    kind: DOCUMENT_TEXT_DETECTION,
                }],
            }],
        }
    }
}

#[derive(Deserialize, Default)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    #[serde(default)]
    text_annotations: Vec<EntityAnnotation>,
    #[serde(default)]
    full_text_annotation: Option<Value>,
    #[serde(default)]
    error: Option<RpcStatus>,
}

#[derive(Deserialize)]
struct EntityAnnotation {
    #[serde(default)]
    description: String,
}

#[derive(Deserialize)]
struct RpcStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: RpcStatus,
}

fn parse_annotate_body(bytes: &[u8]) -> Result<RecognitionOutcome, ProviderError> {
    let parsed: AnnotateResponse = serde_json::from_slice(bytes).map_err(|e| {
        ProviderError::new(
            status_code::INTERNAL,
            format!("Unreadable response from the recognition provider: {e}"),
        )
    })?;

    let Some(response) = parsed.responses.into_iter().next() else {
        return Ok(RecognitionOutcome::default());
    };

    // 单图响应内嵌的错误使用规范状态码
    if let Some(error) = response.error.filter(|e| e.code != status_code::OK) {
        return Err(ProviderError::new(error.code, error.message));
    }

    let text_detections = response
        .text_annotations
        .into_iter()
        .map(|annotation| annotation.description)
        .collect();
    let annotation = response
        .full_text_annotation
        .as_ref()
        .and_then(AnnotationNode::from_value);

    Ok(RecognitionOutcome::new(text_detections, annotation))
}

fn parse_error_body(http_status: u16, bytes: &[u8]) -> ProviderError {
    match serde_json::from_slice::<ErrorEnvelope>(bytes) {
        Ok(ErrorEnvelope { error }) => {
            // 外层错误的 code 是 HTTP 状态，规范状态码需从 status 名称得出
            let code = error
                .status
                .as_deref()
                .and_then(status_code::from_status_name)
                .unwrap_or_else(|| status_code::from_http_status(http_status));
            ProviderError::new(code, error.message)
        }
        Err(_) => ProviderError::new(
            status_code::from_http_status(http_status),
            format!("Recognition provider responded with HTTP {http_status}"),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::ChildRole;

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(AnnotateRequest::document_text(b"abc")).unwrap();
        assert_eq!(body["requests"][0]["image"]["content"], "YWJj");
        assert_eq!(
            body["requests"][0]["features"][0]["type"],
            "DOCUMENT_TEXT_DETECTION"
        );
    }

    #[test]
    fn test_parse_successful_response() {
        let body = br#"{
            "responses": [{
                "textAnnotations": [
                    {"description": "Hello World\n", "locale": "en"},
                    {"description": "Hello"},
                    {"description": "World"}
                ],
                "fullTextAnnotation": {
                    "text": "Hello World\n",
                    "pages": [{"confidence": 0.98, "blocks": [{"confidence": 0.97}]}]
                }
            }]
        }"#;

        let outcome = parse_annotate_body(body).unwrap();
        assert_eq!(outcome.text_detections.len(), 3);
        assert_eq!(outcome.full_text(), Some("Hello World\n"));
        let tree = outcome.annotation.unwrap();
        assert_eq!(tree.children(ChildRole::Pages).len(), 1);
    }

    #[test]
    fn test_parse_empty_response_means_no_text() {
        let outcome = parse_annotate_body(br#"{"responses":[{}]}"#).unwrap();
        assert!(outcome.text_detections.is_empty());
        assert!(outcome.annotation.is_none());

        let outcome = parse_annotate_body(br#"{}"#).unwrap();
        assert_eq!(outcome, RecognitionOutcome::default());
    }

    #[test]
    fn test_parse_embedded_error() {
        let body = br#"{"responses":[{"error":{"code":3,"message":"Bad image data."}}]}"#;
        let err = parse_annotate_body(body).unwrap_err();
        assert_eq!(err.code, status_code::INVALID_ARGUMENT);
        assert_eq!(err.message, "Bad image data.");
    }

    #[test]
    fn test_parse_garbage_body() {
        let err = parse_annotate_body(b"<html>").unwrap_err();
        assert_eq!(err.code, status_code::INTERNAL);
    }

    #[test]
    fn test_http_error_uses_status_name() {
        let body = br#"{"error":{"code":403,"message":"The caller does not have permission","status":"PERMISSION_DENIED"}}"#;
        let err = parse_error_body(403, body);
        assert_eq!(err.code, status_code::PERMISSION_DENIED);
        assert_eq!(err.message, "The caller does not have permission");
    }

    #[test]
    fn test_http_error_without_body_falls_back_to_status() {
        let err = parse_error_body(400, b"");
        assert_eq!(err.code, status_code::INVALID_ARGUMENT);
        let err = parse_error_body(503, b"upstream down");
        assert_eq!(err.code, status_code::UNAVAILABLE);
    }

    #[test]
    fn test_annotate_url_trims_trailing_slash() {
        let client = VisionClient::new(VisionOptions {
            endpoint: "http://127.0.0.1:9000/".to_string(),
            ..VisionOptions::default()
        })
        .unwrap();
        assert_eq!(client.annotate_url(), "http://127.0.0.1:9000/v1/images:annotate");
        assert!(!client.has_credentials());
    }
}
