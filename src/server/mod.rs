//! 服务器模块
//!
//! - 配置管理 (config.rs)
//! - HTTP服务器设置 (http.rs)
//!
//! ```rust,ignore
//! use vision_ocr_server::server::ServerBootstrap;
//!
//! let server = ServerBootstrap::new()?;
//! server.start().await?;
//! ```

pub mod config;
pub mod http;

pub use config::ConfigManager;
pub use http::{HttpServer, ServerManager};

use crate::build_info;
use crate::util::auth::RateLimiters;
use crate::util::config::{Config, ValidationReport};
use crate::AppState;
use anyhow::{anyhow, Context, Result};
use ocr_conn::VisionClient;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

/// 服务器引导程序 - 统一的服务器启动入口
pub struct ServerBootstrap {
    config: Config,
    validation_report: ValidationReport,
    _log_guards: Vec<WorkerGuard>,
}

impl ServerBootstrap {
    /// 加载配置并初始化日志
    pub fn new() -> Result<Self> {
        let (config, validation_report) = ConfigManager::load_and_validate()?;
        let log_guards = ConfigManager::initialize_logging(&config)?;

        info!("[launch] 开始服务器引导程序...");
        ConfigManager::log_validation_report(&validation_report);

        if validation_report.has_errors() {
            return Err(anyhow!(
                "配置验证失败: {} 个错误",
                validation_report.error_count()
            ));
        }

        info!("[ok] 服务器引导程序初始化完成");
        Ok(Self {
            config,
            validation_report,
            _log_guards: log_guards,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn validation_report(&self) -> &ValidationReport {
        &self.validation_report
    }

    /// 启动服务器（阻塞直到关闭）
    pub async fn start(self) -> Result<()> {
        info!("=== OCR服务启动 ===");
        info!("版本信息: {}", build_info::summary());
        info!("监听地址: {}", self.config.bind_address());
        info!("接口前缀: {}", self.config.api_prefix());

        let app_state = self.create_app_state()?;
        spawn_rate_limit_janitor(
            Arc::clone(&app_state.rate_limiters),
            self.config.rate_limit.window_secs,
        );

        let server = ServerManager::create_server(&self.config, app_state).await?;
        ServerManager::start_server(server).await
    }

    /// 创建应用状态
    fn create_app_state(&self) -> Result<AppState> {
        info!("[build] 创建应用状态...");

        let vision = VisionClient::new(self.config.vision.to_options())
            .context("创建 Google Cloud Vision 客户端失败")?;
        if !vision.has_credentials() {
            warn!("[warn] 未配置 Google Cloud Vision 凭据，识别请求将返回认证失败");
        }
        info!(
            event = "vision.client.ready",
            endpoint = %vision.annotate_url(),
            timeout_secs = self.config.vision.timeout_secs
        );

        Ok(AppState::new(self.config.clone(), Arc::new(vision)))
    }
}

/// 定期清理过期的限流窗口
fn spawn_rate_limit_janitor(limiters: Arc<RateLimiters>, window_secs: u64) {
    if !limiters.enabled {
        return;
    }

    let period = Duration::from_secs(window_secs.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await;
        loop {
            interval.tick().await;
            let purged = limiters.purge_expired();
            if purged > 0 {
                debug!(event = "rate_limit.purge", purged);
            }
        }
    });
}

/// 启动HTTP服务
pub async fn start_server() -> Result<()> {
    ServerBootstrap::new()?.start().await
}

/// 只检查配置，不启动服务；返回验证报告
pub fn check_config() -> Result<(std::path::PathBuf, ValidationReport)> {
    let path = ConfigManager::find_config_file_path(config::CONFIG_FILE_NAME);
    let (_, report) = ConfigManager::load_from_path(&path)?;
    Ok((path, report))
}
