mod health;
pub mod ocr;

use crate::util::config::CorsConfig;
use crate::util::middleware;
use crate::util::ApiError;
use crate::AppState;
use axum::extract::{DefaultBodyLimit, OriginalUri};
use axum::http::{header, Method};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

/// 创建CORS配置，`*` 表示允许任意来源
fn create_cors_layer(config: &CorsConfig) -> CorsLayer {
    info!("[global] CORS配置 - 允许的源: {}", config.allowed_origins.join(","));

    let allow_origin = if config.allowed_origins.iter().any(|o| o.trim() == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(config.allowed_origins.iter().filter_map(|s| {
            match s.trim().parse() {
                Ok(origin) => Some(origin),
                Err(e) => {
                    warn!("无效的CORS源: {} - {}", s, e);
                    None
                }
            }
        }))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
}

async fn not_found(method: Method, OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::not_found(format!("Endpoint not found: {} {}.", method, uri))
}

pub fn routes(app_state: AppState) -> Router {
    let config = app_state.config.clone();

    let ocr_routes = Router::new()
        .route("/ocr", post(ocr::process_ocr).fallback(not_found))
        .route("/ocr/batch", post(ocr::process_batch_ocr).fallback(not_found))
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::ocr_rate_limit_middleware,
        ));

    Router::new()
        .route("/health", get(health::health_check))
        .nest(&config.api_prefix(), ocr_routes)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(config.request_body_limit()))
        .layer(from_fn_with_state(
            app_state.clone(),
            middleware::global_rate_limit_middleware,
        ))
        .with_state(app_state)
        .layer(from_fn(middleware::request_logging_middleware))
        .layer(create_cors_layer(&config.cors))
}
