//! 访问控制
//!
//! 目前只包含按客户端地址的频率限制。

pub mod rate_limit;

pub use rate_limit::{RateLimitResult, RateLimiters, SlidingWindowRateLimiter};
