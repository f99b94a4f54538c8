//! 配置加载和管理模块
//! 处理配置文件的读取、写入和环境变量覆盖

use super::types::*;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从YAML文件读取配置
    pub fn read_yaml(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let config_str = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        let config = serde_yaml::from_str(&config_str)
            .with_context(|| format!("解析配置文件失败: {}", path.display()))?;
        Ok(config)
    }

    /// 智能配置加载（配置文件 + 环境变量）
    ///
    /// 配置文件不存在时使用默认值，存在但无法解析时返回错误。
    pub fn load_with_env_overrides(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let base_config = if path.exists() {
            Self::read_yaml(path)?
        } else {
            tracing::warn!(
                event = "config.missing",
                path = %path.display(),
                "配置文件不存在，使用默认配置"
            );
            Config::default()
        };

        Ok(Self::apply_env_overrides(base_config))
    }

    /// 从进程环境变量读取配置覆盖
    pub fn apply_env_overrides(config: Config) -> Config {
        Self::apply_overrides_from(config, |key| std::env::var(key).ok())
    }

    /// 从任意键值来源读取配置覆盖
    pub fn apply_overrides_from<F>(mut config: Config, lookup: F) -> Config
    where
        F: Fn(&str) -> Option<String>,
    {
        // 服务器配置覆盖
        if let Some(host) = lookup("OCR_HOST") {
            tracing::info!("[ok] 环境变量覆盖服务器地址: {}", host);
            config.server.host = host;
        }
        if let Some(port) = Self::parse_var::<u16, _>(&lookup, "PORT") {
            config.server.port = port;
            tracing::info!("[ok] 环境变量覆盖服务器端口: {}", port);
        }
        if let Some(version) = lookup("API_VERSION").filter(|v| !v.trim().is_empty()) {
            config.api_version = version.trim().to_string();
            tracing::info!("[ok] 环境变量覆盖API版本: {}", config.api_version);
        }

        // 上传限制覆盖
        if let Some(size) = Self::parse_var::<usize, _>(&lookup, "MAX_FILE_SIZE") {
            config.limits.max_file_size = size;
            tracing::info!("[ok] 环境变量覆盖单文件上限: {} bytes", size);
        }
        if let Some(count) = Self::parse_var::<usize, _>(&lookup, "MAX_BATCH_SIZE") {
            config.limits.max_batch_size = count;
            tracing::info!("[ok] 环境变量覆盖批量上限: {}", count);
        }

        // 识别服务覆盖（凭据不打印明文）
        if let Some(key) = lookup("GOOGLE_VISION_API_KEY") {
            config.vision.api_key = Some(key);
            tracing::info!("[ok] 环境变量覆盖Vision API Key: [安全隐藏]");
        }
        if let Some(token) = lookup("GOOGLE_VISION_ACCESS_TOKEN") {
            config.vision.access_token = Some(token);
            tracing::info!("[ok] 环境变量覆盖Vision访问令牌: [安全隐藏]");
        }
        if let Some(endpoint) = lookup("GOOGLE_VISION_ENDPOINT") {
            tracing::info!("[ok] 环境变量覆盖Vision地址: {}", endpoint);
            config.vision.endpoint = endpoint;
        }
        if let Some(timeout) = Self::parse_var::<u64, _>(&lookup, "OCR_VISION_TIMEOUT_SECS") {
            config.vision.timeout_secs = timeout;
            tracing::info!("[ok] 环境变量覆盖识别超时: {}s", timeout);
        }

        // 频率限制与跨域
        if let Some(flag) = lookup("OCR_RATE_LIMIT_ENABLED") {
            match Self::parse_bool(&flag) {
                Ok(enabled) => {
                    config.rate_limit.enabled = enabled;
                    tracing::info!("[ok] 环境变量覆盖频率限制开关: {}", enabled);
                }
                Err(()) => {
                    tracing::warn!("[warn] OCR_RATE_LIMIT_ENABLED 无法解析为布尔值: {}", flag)
                }
            }
        }
        if let Some(origins) = lookup("CORS_ALLOWED_ORIGINS") {
            config.cors.allowed_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            tracing::info!("[ok] 环境变量覆盖CORS允许源: {}", origins);
        }

        // 日志配置覆盖
        if let Some(level) = lookup("OCR_LOG_LEVEL") {
            config.logging.level = level.trim().to_ascii_lowercase();
            tracing::info!("[ok] 环境变量覆盖日志级别: {}", config.logging.level);
        }

        config
    }

    fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
    where
        T: std::str::FromStr,
        F: Fn(&str) -> Option<String>,
    {
        let raw = lookup(key)?;
        match raw.trim().parse::<T>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("[warn] 环境变量 {} 无法解析，忽略: {}", key, raw);
                None
            }
        }
    }

    /// 解析布尔环境变量
    fn parse_bool(value: &str) -> Result<bool, ()> {
        match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "y" => Ok(true),
            "false" | "0" | "no" | "n" => Ok(false),
            _ => Err(()),
        }
    }
}

/// 配置写入器
pub struct ConfigWriter;

impl ConfigWriter {
    /// 写入配置到指定路径，确保目录存在
    pub fn write_yaml_with_dir(config: &Config, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let yaml_content = serde_yaml::to_string(config)?;
        fs::write(path, yaml_content)?;
        Ok(())
    }
}
