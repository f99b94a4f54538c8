use crate::util::config::LoggingConfig;
use std::io;
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::daily;
use tracing_subscriber::fmt::format::Format;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{filter::EnvFilter, Layer, Registry};

/// 访问日志使用的 target，单独写入 `-access` 文件
pub const ACCESS_TARGET: &str = "http.server";

/// 初始化日志系统
///
/// 控制台始终输出；启用文件日志时按天滚动，业务日志与访问日志分文件保存。
/// 返回的 guard 需在进程生命周期内持有，否则文件日志会丢失尾部内容。
pub fn log_init_with_config(
    file_prefix: &str,
    config: &LoggingConfig,
) -> anyhow::Result<Vec<WorkerGuard>> {
    let level_filter = parse_level(&config.level);
    let level = level_filter_to_str(level_filter);
    let use_json = config.structured;

    let stdout_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    if !config.file.enabled {
        if use_json {
            let stdout_layer = layer()
                .json()
                .with_writer(io::stdout)
                .with_filter(stdout_filter);
            Registry::default().with(stdout_layer).try_init()?;
        } else {
            let stdout_layer = layer()
                .event_format(Format::default().with_target(false))
                .with_writer(io::stdout)
                .with_filter(stdout_filter);
            Registry::default().with(stdout_layer).try_init()?;
        }

        tracing::info!(event = "log.init", level = %config.level, console = true, file = false, structured = use_json);
        return Ok(Vec::new());
    }

    let log_dir = resolve_log_dir(&config.file.directory);
    std::fs::create_dir_all(&log_dir)?;

    let main_filter = EnvFilter::try_new(format!("{level},{ACCESS_TARGET}=off"))
        .unwrap_or_else(|_| EnvFilter::new(level));
    let access_filter = EnvFilter::try_new(format!("{ACCESS_TARGET}={level}"))
        .unwrap_or_else(|_| EnvFilter::new("http.server=info"));

    let (main_writer, main_guard) =
        tracing_appender::non_blocking(daily(&log_dir, format!("{file_prefix}-info")));
    let (access_writer, access_guard) =
        tracing_appender::non_blocking(daily(&log_dir, format!("{file_prefix}-access")));

    if use_json {
        let stdout_layer = layer()
            .json()
            .with_writer(io::stdout)
            .with_filter(stdout_filter);
        let file_layer = layer()
            .json()
            .with_ansi(false)
            .with_writer(main_writer)
            .with_filter(main_filter);
        let access_layer = layer()
            .json()
            .with_ansi(false)
            .with_writer(access_writer)
            .with_filter(access_filter);

        Registry::default()
            .with(stdout_layer)
            .with(file_layer)
            .with(access_layer)
            .try_init()?;
    } else {
        let stdout_layer = layer()
            .event_format(Format::default().with_target(false))
            .with_writer(io::stdout)
            .with_filter(stdout_filter);
        let file_layer = layer()
            .event_format(Format::default().with_target(false))
            .with_ansi(false)
            .with_writer(main_writer)
            .with_filter(main_filter);
        let access_layer = layer()
            .event_format(Format::default().with_target(false))
            .with_ansi(false)
            .with_writer(access_writer)
            .with_filter(access_filter);

        Registry::default()
            .with(stdout_layer)
            .with(file_layer)
            .with(access_layer)
            .try_init()?;
    }

    tracing::info!(
        event = "log.init",
        level = %config.level,
        console = true,
        file = true,
        directory = %log_dir.display(),
        rotation = "daily",
        structured = use_json,
        access_file = format!("{}-access", file_prefix)
    );
    if let Some(retention) = config.file.retention_days {
        tracing::info!(event = "log.retention", days = retention);
    }

    Ok(vec![main_guard, access_guard])
}

/// 相对路径基于当前工作目录；在 bin/ 下运行时基于上级目录
fn resolve_log_dir(directory: &str) -> PathBuf {
    let path = Path::new(directory);
    if path.is_absolute() {
        return path.to_path_buf();
    }

    let current_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    if current_dir.file_name() == Some(std::ffi::OsStr::new("bin")) {
        if let Some(parent) = current_dir.parent() {
            return parent.join(path);
        }
    }
    current_dir.join(path)
}

pub fn cleanup_old_logs(log_dir: &Path, file_prefix: &str, retention_days: u32) -> anyhow::Result<usize> {
    if !log_dir.exists() {
        tracing::debug!("日志目录不存在: {}", log_dir.display());
        return Ok(0);
    }

    let retention = std::time::Duration::from_secs(retention_days as u64 * 24 * 60 * 60);
    let cutoff = std::time::SystemTime::now()
        .checked_sub(retention)
        .unwrap_or(std::time::UNIX_EPOCH);

    let mut deleted_count = 0;
    let mut error_count = 0;

    for entry in std::fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();

        // 只处理本服务的日志文件
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("");
        if !file_name.starts_with(file_prefix) {
            continue;
        }

        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }

        let modified = metadata
            .modified()
            .or_else(|_| metadata.created())
            .unwrap_or_else(|_| std::time::SystemTime::now());
        if modified >= cutoff {
            continue;
        }

        match std::fs::remove_file(&path) {
            Ok(()) => {
                deleted_count += 1;
                tracing::debug!("已删除过期日志: {}", path.display());
            }
            Err(e) => {
                error_count += 1;
                tracing::warn!("删除日志文件失败: {} - {}", path.display(), e);
            }
        }
    }

    if deleted_count > 0 {
        tracing::info!("已清理 {} 个过期日志文件", deleted_count);
    }
    if error_count > 0 {
        tracing::warn!("有 {} 个文件清理失败", error_count);
    }

    Ok(deleted_count)
}

fn parse_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        _ => LevelFilter::INFO,
    }
}

fn level_filter_to_str(level: LevelFilter) -> &'static str {
    match level {
        LevelFilter::OFF => "off",
        LevelFilter::ERROR => "error",
        LevelFilter::WARN => "warn",
        LevelFilter::INFO => "info",
        LevelFilter::DEBUG => "debug",
        LevelFilter::TRACE => "trace",
    }
}
