use chrono::Utc;
use std::{fs, io, path::Path, process::Command};

fn main() -> io::Result<()> {
    println!("cargo:rerun-if-changed=VERSION");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads");
    println!("cargo:rerun-if-changed=config/config.example.yaml");

    set_build_metadata();
    copy_config_template()?;

    Ok(())
}

fn set_build_metadata() {
    let git_commit = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string());

    let build_version = fs::read_to_string("VERSION")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| git_commit.clone());

    let build_timestamp = Utc::now().to_rfc3339();

    println!("cargo:rustc-env=APP_BUILD_VERSION={}", build_version);
    println!("cargo:rustc-env=APP_BUILD_COMMIT={}", git_commit);
    println!("cargo:rustc-env=APP_BUILD_TIMESTAMP={}", build_timestamp);
}

// 将示例配置复制到 target/<profile>/config 下，便于直接运行二进制
fn copy_config_template() -> io::Result<()> {
    let template = Path::new("config/config.example.yaml");
    if !template.exists() {
        return Ok(());
    }

    let Ok(out_dir) = std::env::var("OUT_DIR") else {
        return Ok(());
    };
    // OUT_DIR = target/<profile>/build/<pkg>/out
    let Some(profile_dir) = Path::new(&out_dir).ancestors().nth(3) else {
        return Ok(());
    };

    let config_dir = profile_dir.join("config");
    fs::create_dir_all(&config_dir)?;
    fs::copy(template, config_dir.join("config.example.yaml"))?;
    println!("cargo:warning=已复制示例配置到 {}", config_dir.display());
    Ok(())
}
