use std::io::Write;

use vision_ocr_server::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    std::panic::set_hook(Box::new(|panic_info| {
        let payload = panic_info.payload();
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s
        } else {
            "Unknown panic payload"
        };

        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "Unknown location".to_string());

        eprintln!("[PANIC] 程序异常退出");
        eprintln!("位置: {}", location);
        eprintln!("原因: {}", message);
        eprintln!(
            "时间: {}",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        );

        tracing::error!(event = "panic.raised", location = %location, reason = %message);

        let panic_msg = format!(
            "PANIC OCCURRED\nLocation: {}\nReason: {}\nTime: {}\n\n",
            location,
            message,
            chrono::Utc::now()
        );
        if let Err(e) = std::fs::write("./panic.log", &panic_msg) {
            eprintln!("[WARN] 无法写入panic.log: {}", e);
        }

        std::io::stderr().flush().ok();
    }));

    let mut args = std::env::args();
    let _ = args.next();

    match args.next().as_deref() {
        Some("check-config") | Some("--check-config") => {
            let (path, report) = server::check_config()?;
            println!("配置文件: {}", path.display());
            for error in &report.errors {
                println!("  [error] {}: {}", error.field, error.message);
            }
            for warning in &report.warnings {
                println!("  [warn] {}: {}", warning.field, warning.message);
            }
            if report.has_errors() {
                anyhow::bail!("配置验证失败: {} 个错误", report.error_count());
            }
            println!("配置检查通过");
            Ok(())
        }
        Some("version") | Some("--version") => {
            println!("{}", vision_ocr_server::build_info::summary());
            Ok(())
        }
        _ => server::start_server().await,
    }
}
