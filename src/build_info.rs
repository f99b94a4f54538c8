/// Build-time metadata exposed at runtime.
pub const BUILD_VERSION: &str = env!("APP_BUILD_VERSION");
pub const BUILD_COMMIT: &str = env!("APP_BUILD_COMMIT");
pub const BUILD_TIMESTAMP: &str = env!("APP_BUILD_TIMESTAMP");

pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Short build tag used by `/health`, e.g. `1.0.0+a1b2c3d`.
pub fn build_tag() -> String {
    format!("{}+{}", PKG_VERSION, BUILD_COMMIT)
}

/// Human-readable summary printed at startup.
pub fn summary() -> String {
    format!(
        "{} {} (build {}, commit {}, built at {})",
        PKG_NAME, PKG_VERSION, BUILD_VERSION, BUILD_COMMIT, BUILD_TIMESTAMP
    )
}
