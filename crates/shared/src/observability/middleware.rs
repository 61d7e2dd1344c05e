//! HTTP 中间件
//!
//! 为每个请求建立 `http_request` span，并按路由模板记录请求数和耗时。

use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use tracing::{Instrument, info_span, warn};

use super::metrics;

/// 未命中任何路由时使用的 path 标签
const UNMATCHED_ROUTE: &str = "<unmatched>";

/// HTTP 请求追踪和指标中间件
///
/// 指标的 path 标签取路由模板（如 `/loyalty/accounts/{owner_id}`），
/// 不使用原始 URI，避免会员 ID 等路径参数撑爆标签基数。
///
/// ```ignore
/// let app = Router::new()
///     .route("/health", get(health))
///     .layer(axum::middleware::from_fn(http_tracing));
/// ```
pub async fn http_tracing(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_owned());

    let span = info_span!(
        "http_request",
        method = %method,
        uri = %request.uri().path(),
        route = %route,
        status = tracing::field::Empty,
        latency_ms = tracing::field::Empty,
    );

    let started = Instant::now();
    let response = next.run(request).instrument(span.clone()).await;
    let elapsed = started.elapsed();
    let status = response.status();

    span.record("status", status.as_u16());
    span.record("latency_ms", elapsed.as_millis() as u64);
    if status.is_server_error() {
        span.in_scope(|| warn!(status = status.as_u16(), "请求处理出现服务端错误"));
    }

    metrics::record_http_request(method.as_str(), &route, status.as_u16(), elapsed.as_secs_f64());

    response
}
