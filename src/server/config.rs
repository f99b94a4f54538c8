//! 配置管理模块
//! 负责配置文件的查找、加载、验证和日志初始化

use crate::util::config::{Config, ConfigLoader, ValidationReport};
use crate::util::log::{cleanup_old_logs, log_init_with_config};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

pub const CONFIG_FILE_NAME: &str = "config.yaml";
pub const LOG_FILE_PREFIX: &str = "vision-ocr-server";

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 加载配置（文件 + 环境变量覆盖）并验证
    ///
    /// 此时日志系统尚未初始化，验证结果由调用方在日志就绪后输出。
    pub fn load_and_validate() -> Result<(Config, ValidationReport)> {
        let config_path = Self::find_config_file_path(CONFIG_FILE_NAME);
        Self::load_from_path(&config_path)
    }

    pub fn load_from_path(config_path: &Path) -> Result<(Config, ValidationReport)> {
        let config = ConfigLoader::load_with_env_overrides(config_path)
            .with_context(|| format!("配置文件解析失败: {}", config_path.display()))?;
        let report = config.validate();
        Ok((config, report))
    }

    /// 初始化日志系统，并按保留天数清理旧日志
    pub fn initialize_logging(config: &Config) -> Result<Vec<WorkerGuard>> {
        let guards = log_init_with_config(LOG_FILE_PREFIX, &config.logging)
            .context("日志系统初始化失败")?;

        if config.logging.file.enabled {
            if let Some(retention_days) = config.logging.file.retention_days {
                let log_path = Path::new(&config.logging.file.directory);
                match cleanup_old_logs(log_path, LOG_FILE_PREFIX, retention_days) {
                    Ok(_) => info!("[ok] 日志清理完成，保留 {} 天", retention_days),
                    Err(e) => warn!("日志清理失败: {}", e),
                }
            }
        }

        Ok(guards)
    }

    /// 输出验证结果
    pub fn log_validation_report(report: &ValidationReport) {
        if report.has_errors() {
            warn!("[warn] 配置验证发现错误: {}", report.error_count());
            for error in &report.errors {
                warn!("  - {}: {}", error.field, error.message);
            }
        }

        if report.has_warnings() {
            info!("配置验证发现警告: {}", report.warning_count());
            for warning in &report.warnings {
                info!("  - {}: {}", warning.field, warning.message);
            }
        }
    }

    /// 查找配置文件路径，适应开发和部署目录
    pub fn find_config_file_path(filename: &str) -> PathBuf {
        let current_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

        // 当前目录下的 config/
        let config_in_current = current_dir.join("config").join(filename);
        if config_in_current.exists() {
            return config_in_current;
        }

        // 在 bin/ 下运行时，上级目录的 config/
        if let Some(parent) = current_dir.parent() {
            let config_in_parent = parent.join("config").join(filename);
            if config_in_parent.exists() {
                return config_in_parent;
            }
        }

        // 可执行文件同级的 config/
        if let Some(exe_dir) = std::env::current_exe()
            .ok()
            .and_then(|path| path.parent().map(Path::to_path_buf))
        {
            let config_beside_exe = exe_dir.join("config").join(filename);
            if config_beside_exe.exists() {
                return config_beside_exe;
            }
        }

        // 都不存在时使用当前目录；文件缺失时加载器返回默认配置
        current_dir.join(filename)
    }
}
