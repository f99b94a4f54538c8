//! 识别处理流水线：置信度聚合、单图识别与批量编排

pub mod batch;
pub mod confidence;
pub mod recognition;

pub use batch::{process_batch, BatchError, BatchItem};
pub use confidence::{aggregate, round_confidence};
pub use recognition::{
    classify_provider_error, process_outcome, recognize_and_process, FailureSeverity,
    OcrErrorKind, OcrFailure,
};
