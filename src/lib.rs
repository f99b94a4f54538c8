use std::sync::Arc;

use ocr_conn::RecognitionProvider;

pub mod api;
pub mod build_info;
pub mod model;
pub mod server;
pub mod util;

use util::auth::RateLimiters;
use util::config::Config;

/// 应用状态结构
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// 识别服务（无状态，可并发调用）
    pub recognizer: Arc<dyn RecognitionProvider>,
    pub rate_limiters: Arc<RateLimiters>,
}

impl AppState {
    pub fn new(config: Config, recognizer: Arc<dyn RecognitionProvider>) -> Self {
        let rate_limiters = Arc::new(RateLimiters::from_config(&config.rate_limit));
        Self {
            config: Arc::new(config),
            recognizer,
            rate_limiters,
        }
    }
}
