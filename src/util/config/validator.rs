//! 配置验证模块
//! 提供配置的验证、检查和诊断功能

use super::types::*;
use url::Url;

/// 配置验证器
pub struct ConfigValidator;

impl ConfigValidator {
    /// 全面验证配置
    pub fn validate_all(config: &Config) -> ValidationReport {
        let mut report = ValidationReport::new();

        Self::validate_server_config(config, &mut report);
        Self::validate_limits_config(&config.limits, &mut report);
        Self::validate_vision_config(&config.vision, &mut report);
        Self::validate_rate_limit_config(&config.rate_limit, &mut report);
        Self::validate_logging_config(&config.logging, &mut report);

        report
    }

    fn validate_server_config(config: &Config, report: &mut ValidationReport) {
        if config.server.port == 0 {
            report.add_error("server.port", "端口不能为0");
        } else if config.server.port < 1024 {
            report.add_warning("server.port", "使用了特权端口，可能需要管理员权限");
        }

        if config.server.host.trim().is_empty() {
            report.add_error("server.host", "监听地址不能为空");
        }

        let version = config.api_version.trim();
        if version.is_empty() {
            report.add_error("api_version", "API版本不能为空");
        } else if !version
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_')
        {
            report.add_error(
                "api_version",
                &format!("API版本只能包含字母、数字、点、横线和下划线: {}", version),
            );
        }
    }

    fn validate_limits_config(limits: &LimitsConfig, report: &mut ValidationReport) {
        if limits.max_file_size == 0 {
            report.add_error("limits.max_file_size", "单文件上限必须大于0");
        }
        if limits.max_batch_size == 0 {
            report.add_error("limits.max_batch_size", "批量上限必须大于0");
        } else if limits.max_batch_size > 100 {
            report.add_warning(
                "limits.max_batch_size",
                "批量上限较大，单个请求会同时发起大量识别调用",
            );
        }
        if limits.allowed_mime_types.is_empty() {
            report.add_error("limits.allowed_mime_types", "至少需要允许一种图片类型");
        }
    }

    fn validate_vision_config(vision: &VisionConfig, report: &mut ValidationReport) {
        match Url::parse(&vision.endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => report.add_error(
                "vision.endpoint",
                &format!("不支持的协议: {}", url.scheme()),
            ),
            Err(e) => report.add_error(
                "vision.endpoint",
                &format!("地址解析失败: {} ({})", vision.endpoint, e),
            ),
        }

        let has_key = vision.api_key.as_ref().is_some_and(|k| !k.trim().is_empty());
        let has_token = vision
            .access_token
            .as_ref()
            .is_some_and(|t| !t.trim().is_empty());
        if !has_key && !has_token {
            report.add_warning(
                "vision.api_key",
                "未配置 API Key 或访问令牌，识别调用将返回认证失败",
            );
        }

        if vision.timeout_secs == 0 {
            report.add_error("vision.timeout_secs", "识别超时必须大于0");
        }
    }

    fn validate_rate_limit_config(rate_limit: &RateLimitConfig, report: &mut ValidationReport) {
        if !rate_limit.enabled {
            return;
        }
        if rate_limit.window_secs == 0 {
            report.add_error("rate_limit.window_secs", "限流窗口必须大于0");
        }
        if rate_limit.global_max_requests == 0 || rate_limit.ocr_max_requests == 0 {
            report.add_error("rate_limit", "启用限流时窗口上限必须大于0");
        }
        if rate_limit.ocr_max_requests > rate_limit.global_max_requests {
            report.add_warning(
                "rate_limit.ocr_max_requests",
                "OCR 限额高于全局限额，实际以全局限额为准",
            );
        }
    }

    fn validate_logging_config(logging: &LoggingConfig, report: &mut ValidationReport) {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&logging.level.as_str()) {
            report.add_error(
                "logging.level",
                &format!("无效的日志级别: {}", logging.level),
            );
        }
        if logging.file.enabled && logging.file.directory.trim().is_empty() {
            report.add_error("logging.file.directory", "启用文件日志时目录不能为空");
        }
    }
}

/// 单条验证问题
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

/// 验证报告
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, field: &str, message: &str) {
        self.errors.push(ValidationIssue {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}
