use thiserror::Error;

/// 识别服务返回的规范状态码（google.rpc.Code）
pub mod status_code {
    pub const OK: i32 = 0;
    pub const CANCELLED: i32 = 1;
    pub const UNKNOWN: i32 = 2;
    pub const INVALID_ARGUMENT: i32 = 3;
    pub const DEADLINE_EXCEEDED: i32 = 4;
    pub const NOT_FOUND: i32 = 5;
    pub const PERMISSION_DENIED: i32 = 7;
    pub const RESOURCE_EXHAUSTED: i32 = 8;
    pub const FAILED_PRECONDITION: i32 = 9;
    pub const INTERNAL: i32 = 13;
    pub const UNAVAILABLE: i32 = 14;
    pub const UNAUTHENTICATED: i32 = 16;

    /// 按状态名（如 `PERMISSION_DENIED`）查找状态码
    pub fn from_status_name(name: &str) -> Option<i32> {
        let code = match name.trim().to_ascii_uppercase().as_str() {
            "OK" => OK,
            "CANCELLED" => CANCELLED,
            "UNKNOWN" => UNKNOWN,
            "INVALID_ARGUMENT" => INVALID_ARGUMENT,
            "DEADLINE_EXCEEDED" => DEADLINE_EXCEEDED,
            "NOT_FOUND" => NOT_FOUND,
            "PERMISSION_DENIED" => PERMISSION_DENIED,
            "RESOURCE_EXHAUSTED" => RESOURCE_EXHAUSTED,
            "FAILED_PRECONDITION" => FAILED_PRECONDITION,
            "INTERNAL" => INTERNAL,
            "UNAVAILABLE" => UNAVAILABLE,
            "UNAUTHENTICATED" => UNAUTHENTICATED,
            _ => return None,
        };
        Some(code)
    }

    /// HTTP 状态到状态码的兜底映射（响应体缺少 status 字段时使用）
    pub fn from_http_status(status: u16) -> i32 {
        match status {
            400 => INVALID_ARGUMENT,
            401 => UNAUTHENTICATED,
            403 => PERMISSION_DENIED,
            404 => NOT_FOUND,
            429 => RESOURCE_EXHAUSTED,
            499 => CANCELLED,
            503 => UNAVAILABLE,
            504 => DEADLINE_EXCEEDED,
            500..=599 => INTERNAL,
            _ => UNKNOWN,
        }
    }

    /// 状态码的可读描述
    pub fn description(code: i32) -> &'static str {
        match code {
            OK => "成功",
            CANCELLED => "请求被取消",
            INVALID_ARGUMENT => "请求参数无效（通常为图片无法解码）",
            DEADLINE_EXCEEDED => "请求超时",
            NOT_FOUND => "资源不存在",
            PERMISSION_DENIED => "权限不足",
            RESOURCE_EXHAUSTED => "配额耗尽",
            FAILED_PRECONDITION => "前置条件不满足",
            INTERNAL => "服务内部错误",
            UNAVAILABLE => "服务不可用",
            UNAUTHENTICATED => "认证失败",
            _ => "未知错误",
        }
    }
}

/// 识别服务调用失败
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProviderError {
    pub code: i32,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_description(&self) -> &'static str {
        status_code::description(self.code)
    }

    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(
                status_code::DEADLINE_EXCEEDED,
                "Request to the recognition provider timed out.",
            )
        } else {
            Self::new(status_code::UNAVAILABLE, err.to_string())
        }
    }
}
