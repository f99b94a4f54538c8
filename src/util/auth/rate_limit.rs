//! 频率限制模块
//! 基于滑动窗口按客户端统计请求次数

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;

use crate::util::config::RateLimitConfig;

/// 限流结果
#[derive(Debug, Clone, PartialEq)]
pub enum RateLimitResult {
    Allowed,
    Exceeded {
        limit_type: String,
        current_count: u32,
        limit: u32,
        reset_time: DateTime<Utc>,
    },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed)
    }
}

/// 滑动窗口限流器
pub struct SlidingWindowRateLimiter {
    name: String,
    window_size: Duration,
    max_requests: u32,
    client_windows: Mutex<HashMap<String, SlidingWindow>>,
}

/// 滑动窗口
#[derive(Debug, Default)]
struct SlidingWindow {
    requests: Vec<DateTime<Utc>>,
}

impl SlidingWindowRateLimiter {
    /// 创建滑动窗口限流器
    pub fn new(name: impl Into<String>, window_size: Duration, max_requests: u32) -> Self {
        Self {
            name: name.into(),
            window_size,
            max_requests,
            client_windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn window_secs(&self) -> u64 {
        self.window_size.num_seconds().max(0) as u64
    }

    /// 检查滑动窗口限制
    pub fn check_limit(&self, client_id: &str) -> RateLimitResult {
        self.check_limit_at(client_id, Utc::now())
    }

    fn check_limit_at(&self, client_id: &str, now: DateTime<Utc>) -> RateLimitResult {
        let mut windows = self.client_windows.lock();
        let window_start = now - self.window_size;

        let window = windows.entry(client_id.to_string()).or_default();

        // 清理窗口外的请求
        window.requests.retain(|&timestamp| timestamp > window_start);

        if window.requests.len() >= self.max_requests as usize {
            let oldest_request = window.requests.first().copied().unwrap_or(now);

            return RateLimitResult::Exceeded {
                limit_type: self.name.clone(),
                current_count: window.requests.len() as u32,
                limit: self.max_requests,
                reset_time: oldest_request + self.window_size,
            };
        }

        window.requests.push(now);
        RateLimitResult::Allowed
    }

    /// 清理已无有效请求的客户端窗口，返回清理数量
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Utc::now())
    }

    fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let window_start = now - self.window_size;
        let mut windows = self.client_windows.lock();
        let before = windows.len();

        windows.retain(|_, window| {
            window.requests.retain(|&timestamp| timestamp > window_start);
            !window.requests.is_empty()
        });

        let purged = before - windows.len();
        if purged > 0 {
            debug!(limiter = %self.name, purged, "清理过期限流窗口");
        }
        purged
    }

    pub fn tracked_clients(&self) -> usize {
        self.client_windows.lock().len()
    }
}

/// 服务使用的两级限流：全局请求与 OCR 请求
pub struct RateLimiters {
    pub enabled: bool,
    pub trust_proxy_headers: bool,
    pub global: SlidingWindowRateLimiter,
    pub ocr: SlidingWindowRateLimiter,
}

impl RateLimiters {
    pub fn from_config(config: &RateLimitConfig) -> Self {
        let window = Duration::seconds(config.window_secs as i64);
        Self {
            enabled: config.enabled,
            trust_proxy_headers: config.trust_proxy_headers,
            global: SlidingWindowRateLimiter::new("global", window, config.global_max_requests),
            ocr: SlidingWindowRateLimiter::new("ocr", window, config.ocr_max_requests),
        }
    }

    /// 被限流时返回给客户端的 Retry-After 秒数
    pub fn retry_after_secs(&self) -> u64 {
        self.global.window_secs().max(1)
    }

    pub fn purge_expired(&self) -> usize {
        self.global.purge_expired() + self.ocr.purge_expired()
    }
}
