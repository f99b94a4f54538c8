use serde::{Deserialize, Serialize};

pub mod ocr;

// 健康检查相关的数据结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
    pub timestamp: String,
    pub version: String,
    pub build: String,
    pub provider: String,
}
