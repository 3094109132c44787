use crate::infra::{record_report, AppState, RecordReport};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use faculty_appraisal::workflows::appraisal::{
    appraisal_router, AccountDirectory, AppraisalRepository, AppraisalService,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

pub(crate) fn with_appraisal_routes<R, D>(service: Arc<AppraisalService<R, D>>) -> axum::Router
where
    R: AppraisalRepository + 'static,
    D: AccountDirectory + 'static,
{
    appraisal_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/completion/report",
            axum::routing::post(completion_report_endpoint),
        )
}

/// Lets the browser dashboard call the API from the configured origins.
pub(crate) fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|origin| origin == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins.iter().filter_map(|origin| {
            match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(%origin, "skipping unusable CORS origin");
                    None
                }
            }
        }))
    };

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(allow_origin)
        .max_age(Duration::from_secs(60 * 60))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Completion breakdown for a draft or stored record posted in the flat shape.
pub(crate) async fn completion_report_endpoint(
    Json(record): Json<Map<String, Value>>,
) -> Json<RecordReport> {
    Json(record_report(&record, None, None))
}
