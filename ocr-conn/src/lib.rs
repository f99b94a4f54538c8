//! 外部文字识别服务连接层
//!
//! - `annotation`: 结构化注释树
//! - `provider`: 识别能力抽象与单次调用结果
//! - `vision`: Google Cloud Vision REST 实现
//! - `error`: 服务错误与规范状态码

pub mod annotation;
pub mod error;
pub mod provider;
pub mod vision;

pub use annotation::{AnnotationNode, ChildRole};
pub use error::{status_code, ProviderError};
pub use provider::{RecognitionOutcome, RecognitionProvider};
pub use vision::{VisionClient, VisionOptions};
