use async_trait::async_trait;

use crate::annotation::AnnotationNode;
use crate::error::ProviderError;

/// 一次识别调用的原始结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecognitionOutcome {
    /// 服务返回的文本检测结果，按服务给出的顺序排列
    pub text_detections: Vec<String>,
    /// 结构化注释树（页/块/段落/词/字符）
    pub annotation: Option<AnnotationNode>,
}

impl RecognitionOutcome {
    pub fn new(text_detections: Vec<String>, annotation: Option<AnnotationNode>) -> Self {
        Self {
            text_detections,
            annotation,
        }
    }

    /// 全文取第一条检测结果；服务文档约定第一条为完整文本，此处不做校验
    pub fn full_text(&self) -> Option<&str> {
        self.text_detections.first().map(String::as_str)
    }
}

/// 外部文字识别能力
///
/// 实现需可被多个任务并发调用且无需外部同步。
#[async_trait]
pub trait RecognitionProvider: Send + Sync {
    async fn recognize(&self, image: &[u8]) -> Result<RecognitionOutcome, ProviderError>;

    /// 服务名称，用于日志
    fn provider_name(&self) -> &str;
}
