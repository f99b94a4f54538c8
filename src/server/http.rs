//! HTTP服务器设置模块
//! 负责创建和配置HTTP服务器

use crate::api::routes;
use crate::util::config::Config;
use crate::AppState;
use anyhow::{Context, Result};
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};

/// 已绑定端口、待启动的HTTP服务器
pub struct HttpServer {
    pub listener: TcpListener,
    pub app_routes: Router,
    pub local_addr: SocketAddr,
}

/// HTTP服务器管理器
pub struct ServerManager;

impl ServerManager {
    /// 创建HTTP服务器
    pub async fn create_server(config: &Config, app_state: AppState) -> Result<HttpServer> {
        info!(
            target: "server.http",
            event = "http.server.create",
            "创建HTTP服务器"
        );

        let listener = Self::bind_listener(&config.bind_address()).await?;
        let local_addr = listener.local_addr()?;

        info!(
            target: "server.http",
            event = "http.router.build",
            api_prefix = %config.api_prefix()
        );
        let app_routes = routes(app_state);

        info!(
            target: "server.http",
            event = "http.server.ready",
            address = %local_addr
        );

        Ok(HttpServer {
            listener,
            app_routes,
            local_addr,
        })
    }

    /// 绑定监听地址
    async fn bind_listener(address: &str) -> Result<TcpListener> {
        info!(
            target: "server.http",
            event = "http.server.bind_start",
            address
        );
        let listener = TcpListener::bind(address)
            .await
            .with_context(|| format!("地址 {} 绑定失败", address))?;
        info!(
            target: "server.http",
            event = "http.server.bound",
            address
        );
        Ok(listener)
    }

    /// 启动服务器，直到收到关闭信号
    pub async fn start_server(server: HttpServer) -> Result<()> {
        info!(
            target: "server.http",
            event = "http.server.start",
            address = %server.local_addr
        );

        // 限流需要连接地址
        axum::serve(
            server.listener,
            server
                .app_routes
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(Self::shutdown_signal())
        .await?;

        info!("HTTP服务器已关闭");
        Ok(())
    }

    /// 优雅关闭信号处理
    async fn shutdown_signal() {
        info!(
            target: "server.http",
            event = "http.server.shutdown_wait"
        );

        tokio::select! {
            // Ctrl+C 信号 (SIGINT)
            _ = ctrl_c() => {
                info!(
                    target: "server.http",
                    event = "http.server.signal",
                    signal = "SIGINT"
                );
            }
            _ = Self::wait_for_sigterm() => {
                info!(
                    target: "server.http",
                    event = "http.server.signal",
                    signal = "SIGTERM"
                );
            }
            _ = Self::wait_for_sighup() => {
                warn!(
                    target: "server.http",
                    event = "http.server.signal",
                    signal = "SIGHUP",
                    "暂不支持配置重载，准备退出"
                );
            }
        }

        info!(
            target: "server.http",
            event = "http.server.shutdown_begin"
        );
    }

    /// 等待 SIGTERM 信号
    async fn wait_for_sigterm() -> std::io::Result<()> {
        #[cfg(unix)]
        {
            let mut term_signal = signal(SignalKind::terminate())?;
            term_signal.recv().await;
            Ok(())
        }
        #[cfg(not(unix))]
        {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    /// 等待 SIGHUP 信号
    async fn wait_for_sighup() -> std::io::Result<()> {
        #[cfg(unix)]
        {
            let mut hup_signal = signal(SignalKind::hangup())?;
            hup_signal.recv().await;
            Ok(())
        }
        #[cfg(not(unix))]
        {
            std::future::pending::<()>().await;
            Ok(())
        }
    }
}
