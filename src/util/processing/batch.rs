//! 批量识别编排
//!
//! 每张图片一个 future，全部并发执行；单张失败只影响自己的结果，
//! 输出顺序与输入顺序一致。

use axum::body::Bytes;
use futures::future::join_all;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};

use super::recognition::recognize_and_process;
use crate::model::ocr::BatchItemResult;
use crate::util::logging::standards::events;
use ocr_conn::RecognitionProvider;

/// 批量请求中的一张图片
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub filename: String,
    pub bytes: Bytes,
}

impl BatchItem {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    #[error("No image files provided.")]
    EmptyBatch,
}

pub async fn process_batch(
    provider: &dyn RecognitionProvider,
    items: Vec<BatchItem>,
) -> Result<Vec<BatchItemResult>, BatchError> {
    if items.is_empty() {
        return Err(BatchError::EmptyBatch);
    }

    let total = items.len();
    let started = Instant::now();
    info!(
        event = events::BATCH_START,
        total,
        provider = provider.provider_name()
    );

    let tasks = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| process_item(provider, index, item));

    // join_all 按传入顺序返回结果
    let results = join_all(tasks).await;

    let succeeded = results.iter().filter(|r| r.is_success()).count();
    info!(
        event = events::BATCH_COMPLETE,
        total,
        succeeded,
        failed = total - succeeded,
        elapsed_ms = started.elapsed().as_millis() as u64
    );

    Ok(results)
}

async fn process_item(
    provider: &dyn RecognitionProvider,
    index: usize,
    item: BatchItem,
) -> BatchItemResult {
    let started = Instant::now();
    match recognize_and_process(provider, &item.bytes).await {
        Ok(processed) => {
            info!(
                event = events::BATCH_ITEM_COMPLETE,
                index,
                filename = %item.filename,
                has_text = processed.has_text,
                confidence = processed.confidence,
                elapsed_ms = started.elapsed().as_millis() as u64
            );
            BatchItemResult::success(item.filename, processed)
        }
        Err(failure) => {
            warn!(
                event = events::BATCH_ITEM_ERROR,
                index,
                filename = %item.filename,
                kind = ?failure.kind,
                error = %failure.provider_message
            );
            BatchItemResult::failure(item.filename, failure.provider_message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ocr_conn::{AnnotationNode, ChildRole, ProviderError, RecognitionOutcome};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// 按图片内容决定结果；内容越短返回越慢，用于打乱完成顺序
    struct ScriptedProvider {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RecognitionProvider for ScriptedProvider {
        async fn recognize(&self, image: &[u8]) -> Result<RecognitionOutcome, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let delay = 60u64.saturating_sub(image.len() as u64 * 10);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let content = String::from_utf8_lossy(image).to_string();
            match content.as_str() {
                "bad" => Err(ProviderError::new(3, "Bad image data.")),
                "auth" => Err(ProviderError::new(
                    7,
                    "PERMISSION_DENIED: Cloud Vision API has not been used in project 123",
                )),
                "empty" => Err(ProviderError::new(13, "")),
                "blank" => Ok(RecognitionOutcome::default()),
                text => Ok(RecognitionOutcome::new(
                    vec![format!(" {text} ")],
                    Some(AnnotationNode::new().with_children(
                        ChildRole::Words,
                        vec![AnnotationNode::new().with_confidence(0.75)],
                    )),
                )),
            }
        }

        fn provider_name(&self) -> &str {
            "scripted"
        }
    }

    #[tokio::test]
    async fn test_empty_batch_is_rejected() {
        let provider = ScriptedProvider::new();
        let result = process_batch(&provider, Vec::new()).await;
        assert_eq!(result, Err(BatchError::EmptyBatch));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_results_follow_input_order() {
        let provider = ScriptedProvider::new();
        let items = vec![
            BatchItem::new("one.png", "a"),
            BatchItem::new("two.png", "bbbb"),
            BatchItem::new("three.png", "cc"),
        ];

        let results = process_batch(&provider, items).await.unwrap();
        let names: Vec<_> = results.iter().map(|r| r.filename()).collect();
        assert_eq!(names, vec!["one.png", "two.png", "three.png"]);
        assert_eq!(
            results[1],
            BatchItemResult::Success {
                filename: "two.png".to_string(),
                success: true,
                text: "bbbb".to_string(),
                confidence: 0.75,
            }
        );
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let provider = ScriptedProvider::new();
        let items = vec![
            BatchItem::new("a.png", "ok"),
            BatchItem::new("b.png", "bad"),
            BatchItem::new("c.png", "auth"),
            BatchItem::new("d.png", "blank"),
            BatchItem::new("e.png", "empty"),
        ];

        let results = process_batch(&provider, items).await.unwrap();
        assert_eq!(results.len(), 5);
        assert!(results[0].is_success());
        // 批量结果保留服务原始信息
        assert_eq!(results[1], BatchItemResult::failure("b.png", "Bad image data."));
        assert_eq!(
            results[2],
            BatchItemResult::failure(
                "c.png",
                "PERMISSION_DENIED: Cloud Vision API has not been used in project 123"
            )
        );
        assert_eq!(
            results[4],
            BatchItemResult::failure("e.png", "An error occurred while processing the image.")
        );
        // 无文字仍是成功结果
        assert_eq!(
            results[3],
            BatchItemResult::Success {
                filename: "d.png".to_string(),
                success: true,
                text: String::new(),
                confidence: 0.0,
            }
        );
        assert_eq!(provider.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_items_run_concurrently() {
        let provider = ScriptedProvider::new();
        let items = (0..5)
            .map(|i| BatchItem::new(format!("{i}.png"), "x"))
            .collect();

        let results = process_batch(&provider, items).await.unwrap();
        assert_eq!(results.len(), 5);
        assert!(provider.max_in_flight.load(Ordering::SeqCst) > 1);
    }
}
