//! 配置数据结构定义
//!
//! 所有段落都带 `#[serde(default)]`，配置文件只需写出与默认值不同的部分。

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024; // 10MB
pub const DEFAULT_MAX_BATCH_SIZE: usize = 10;

/// 服务配置根
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    /// 路由前缀中的 API 版本，如 `v1` → `/api/v1/ocr`
    pub api_version: String,
    pub limits: LimitsConfig,
    pub vision: VisionConfig,
    pub rate_limit: RateLimitConfig,
    pub cors: CorsConfig,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            api_version: "v1".to_string(),
            limits: LimitsConfig::default(),
            vision: VisionConfig::default(),
            rate_limit: RateLimitConfig::default(),
            cors: CorsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    pub fn get_port(&self) -> u16 {
        self.server.port
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// OCR 路由前缀
    pub fn api_prefix(&self) -> String {
        format!("/api/{}", self.api_version)
    }

    /// 请求体上限：一次批量请求的全部文件再留出表单开销
    pub fn request_body_limit(&self) -> usize {
        const MULTIPART_OVERHEAD: usize = 64 * 1024;
        self.limits
            .max_file_size
            .saturating_mul(self.limits.max_batch_size.max(1))
            .saturating_add(MULTIPART_OVERHEAD)
    }
}

/// HTTP 服务配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// 上传限制
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    /// 单文件最大字节数
    pub max_file_size: usize,
    /// 批量接口一次最多文件数
    pub max_batch_size: usize,
    pub allowed_mime_types: Vec<String>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            allowed_mime_types: vec![
                "image/jpeg".to_string(),
                "image/jpg".to_string(),
                "image/png".to_string(),
                "image/gif".to_string(),
            ],
        }
    }
}

/// Google Cloud Vision 连接配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VisionConfig {
    pub endpoint: String,
    /// API Key（与 access_token 二选一，优先使用 API Key）
    pub api_key: Option<String>,
    /// OAuth2 访问令牌
    pub access_token: Option<String>,
    /// 单次识别调用的超时（秒）
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            endpoint: ocr_conn::vision::DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            access_token: None,
            timeout_secs: 60,
            connect_timeout_secs: 30,
            user_agent: "Vision-OCR-Server/1.0".to_string(),
        }
    }
}

impl VisionConfig {
    pub fn to_options(&self) -> ocr_conn::VisionOptions {
        ocr_conn::VisionOptions {
            endpoint: self.endpoint.clone(),
            api_key: self.api_key.clone().filter(|k| !k.trim().is_empty()),
            access_token: self.access_token.clone().filter(|t| !t.trim().is_empty()),
            timeout_secs: self.timeout_secs,
            connect_timeout_secs: self.connect_timeout_secs,
            user_agent: self.user_agent.clone(),
        }
    }
}

/// 频率限制配置（按客户端IP滑动窗口计数）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub window_secs: u64,
    /// 全部接口（健康检查除外）的窗口内上限
    pub global_max_requests: u32,
    /// OCR 接口的窗口内上限
    pub ocr_max_requests: u32,
    /// 以 X-Forwarded-For / X-Real-IP 作为限流键；仅在可信反向代理之后开启
    pub trust_proxy_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_secs: 60,
            global_max_requests: 300,
            ocr_max_requests: 30,
            trust_proxy_headers: false,
        }
    }
}

/// 跨域配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CorsConfig {
    /// 允许的源；包含 `*` 时允许任意源
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: LogFileConfig,
    /// 是否输出 JSON 结构化日志
    pub structured: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: LogFileConfig::default(),
            structured: false,
        }
    }
}

/// 日志文件配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogFileConfig {
    pub enabled: bool,
    pub directory: String,
    pub retention_days: Option<u32>,
}

impl Default for LogFileConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            directory: "logs".to_string(),
            retention_days: Some(7),
        }
    }
}
