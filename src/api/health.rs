use axum::extract::State;
use axum::Json;

use crate::build_info;
use crate::model::HealthStatus;
use crate::AppState;

pub const SERVICE_NAME: &str = "OCR API";

/// 健康检查，不调用识别服务
pub async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        service: SERVICE_NAME.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        version: state.config.api_version.clone(),
        build: build_info::build_tag(),
        provider: state.recognizer.provider_name().to_string(),
    })
}
