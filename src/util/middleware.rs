use crate::util::auth::{RateLimitResult, SlidingWindowRateLimiter};
use crate::util::logging::standards::{events, SLOW_REQUEST_THRESHOLD_MS};
use crate::util::ApiError;
use crate::AppState;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::time::Instant;
use uuid::Uuid;

pub const GLOBAL_RATE_LIMIT_MESSAGE: &str = "Too many requests. Please try again later.";
pub const OCR_RATE_LIMIT_MESSAGE: &str = "Too many OCR requests. Slow down and retry later.";

fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .or_else(|| headers.get("x-real-ip"))
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn peer_ip(request: &Request) -> Option<String> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}

/// 访问日志中的客户端地址：代理头优先，其次为连接地址
pub fn client_id(request: &Request) -> String {
    extract_client_ip(request.headers())
        .or_else(|| peer_ip(request))
        .unwrap_or_else(|| "unknown".to_string())
}

/// 限流键：默认只用连接地址，代理头可被客户端伪造
pub fn rate_limit_key(request: &Request, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers {
        return client_id(request);
    }
    peer_ip(request).unwrap_or_else(|| "unknown".to_string())
}

fn extract_user_agent(headers: &HeaderMap) -> &str {
    headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

fn parse_content_length(headers: &HeaderMap) -> usize {
    headers
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0)
}

fn is_quiet_path(path: &str) -> bool {
    matches!(path, "/health" | "/favicon.ico")
}

// 统一请求日志中间件
pub async fn request_logging_middleware(mut request: Request, next: Next) -> Response {
    let start_time = Instant::now();
    let request_id = Uuid::new_v4().to_string();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let client_ip = client_id(&request);
    let user_agent = extract_user_agent(request.headers()).to_string();
    let request_size = parse_content_length(request.headers());
    request.extensions_mut().insert(request_id.clone());

    let quiet_path = is_quiet_path(uri.path());
    if !quiet_path {
        tracing::debug!(
            target: "http.server",
            event = events::REQUEST_START,
            request_id = %request_id,
            method = %method,
            path = %uri.path(),
            query = uri.query().unwrap_or(""),
            user_agent = %user_agent,
            client_ip = %client_ip
        );
    }

    let response = next.run(request).await;
    let duration_ms = start_time.elapsed().as_millis() as u64;
    let status = response.status();
    let response_size = parse_content_length(response.headers());

    if status.is_server_error() {
        tracing::error!(
            target: "http.server",
            event = events::REQUEST_ERROR,
            request_id = %request_id,
            method = %method,
            path = %uri.path(),
            status = status.as_u16(),
            duration_ms,
            request_bytes = request_size,
            response_bytes = response_size,
            user_agent = %user_agent,
            client_ip = %client_ip
        );
    } else if status.is_client_error() && !quiet_path {
        tracing::warn!(
            target: "http.server",
            event = events::REQUEST_COMPLETE,
            request_id = %request_id,
            method = %method,
            path = %uri.path(),
            status = status.as_u16(),
            duration_ms,
            request_bytes = request_size,
            response_bytes = response_size,
            user_agent = %user_agent,
            client_ip = %client_ip
        );
    } else if quiet_path {
        tracing::debug!(
            target: "http.server",
            event = events::REQUEST_COMPLETE,
            request_id = %request_id,
            method = %method,
            path = %uri.path(),
            status = status.as_u16(),
            duration_ms
        );
    } else {
        tracing::info!(
            target: "http.server",
            event = events::REQUEST_COMPLETE,
            request_id = %request_id,
            method = %method,
            path = %uri.path(),
            status = status.as_u16(),
            duration_ms,
            request_bytes = request_size,
            response_bytes = response_size,
            user_agent = %user_agent,
            client_ip = %client_ip
        );
    }

    if !quiet_path && duration_ms > SLOW_REQUEST_THRESHOLD_MS {
        tracing::warn!(
            target: "http.server",
            event = events::REQUEST_SLOW,
            request_id = %request_id,
            method = %method,
            path = %uri.path(),
            duration_ms,
            status = status.as_u16()
        );
    }

    response
}

fn enforce_limit(
    limiter: &SlidingWindowRateLimiter,
    client: &str,
    path: &str,
    message: &str,
    retry_after_secs: u64,
) -> Result<(), ApiError> {
    match limiter.check_limit(client) {
        RateLimitResult::Allowed => Ok(()),
        RateLimitResult::Exceeded {
            limit_type,
            current_count,
            limit,
            reset_time,
        } => {
            tracing::warn!(
                target: "http.server",
                event = events::REQUEST_RATE_LIMITED,
                client_ip = %client,
                path = %path,
                limit_type = %limit_type,
                current_count,
                limit,
                reset_time = %reset_time.to_rfc3339()
            );
            Err(ApiError::too_many_requests(message, retry_after_secs))
        }
    }
}

/// 全局限流，健康检查不计数
pub async fn global_rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let limiters = &state.rate_limiters;
    if !limiters.enabled || is_quiet_path(request.uri().path()) {
        return next.run(request).await;
    }

    let client = rate_limit_key(&request, limiters.trust_proxy_headers);
    match enforce_limit(
        &limiters.global,
        &client,
        request.uri().path(),
        GLOBAL_RATE_LIMIT_MESSAGE,
        limiters.retry_after_secs(),
    ) {
        Ok(()) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}

/// OCR 接口限流
pub async fn ocr_rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let limiters = &state.rate_limiters;
    if !limiters.enabled {
        return next.run(request).await;
    }

    let client = rate_limit_key(&request, limiters.trust_proxy_headers);
    match enforce_limit(
        &limiters.ocr,
        &client,
        request.uri().path(),
        OCR_RATE_LIMIT_MESSAGE,
        limiters.retry_after_secs(),
    ) {
        Ok(()) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_client_id_prefers_forwarded_header() {
        let request = Request::builder()
            .uri("/api/v1/ocr")
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_id(&request), "203.0.113.7");
    }

    #[test]
    fn test_client_id_uses_connect_info() {
        let mut request = Request::builder().uri("/").body(Body::empty()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 5000))));
        assert_eq!(client_id(&request), "192.0.2.1");

        let bare = Request::builder().uri("/").body(Body::empty()).unwrap();
        assert_eq!(client_id(&bare), "unknown");
    }

    #[test]
    fn test_rate_limit_key_ignores_proxy_headers_by_default() {
        let mut request = Request::builder()
            .uri("/api/v1/ocr")
            .header("x-forwarded-for", "203.0.113.7")
            .header("x-real-ip", "203.0.113.8")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([198, 51, 100, 9], 4000))));

        assert_eq!(rate_limit_key(&request, false), "198.51.100.9");
        assert_eq!(rate_limit_key(&request, true), "203.0.113.7");
    }
}
