//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。
//! 未安装 recorder 时（如单元测试），记录函数为空操作。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::ObservabilityConfig;

/// 全局 Prometheus handle，用于渲染指标
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics 资源守卫
pub struct MetricsHandle {
    _server_handle: tokio::task::JoinHandle<()>,
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 端点。
pub async fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROMETHEUS_HANDLE.set(handle.clone());

    register_common_metrics(&config.service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle {
        _server_handle: server_handle,
    })
}

/// 注册通用指标描述
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    metrics::describe_counter!("loyalty_points_earned_total", "Total points credited");
    metrics::describe_counter!("loyalty_points_redeemed_total", "Total points redeemed");
    metrics::describe_counter!("loyalty_tier_upgrades_total", "Total tier upgrades");
    metrics::describe_counter!("loyalty_milestones_total", "Total milestones recorded");
    metrics::describe_counter!(
        "loyalty_referrals_completed_total",
        "Total referrals completed"
    );
    metrics::describe_counter!(
        "loyalty_concurrency_retries_total",
        "Optimistic write retries caused by version conflicts"
    );
    metrics::describe_counter!(
        "loyalty_notifications_total",
        "Notification send attempts by outcome"
    );
    metrics::describe_gauge!("worker_last_run_timestamp", "Last run of background workers");

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 启动指标 HTTP 服务器
async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

/// 获取全局 Prometheus handle（用于自定义渲染）
pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

// ============================================================================
// 指标记录函数
// ============================================================================

/// 记录 HTTP 请求
#[inline]
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str.clone()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str
    )
    .record(duration_secs);
}

/// 记录积分入账
#[inline]
pub fn record_points_earned(source: &str, points: i64) {
    metrics::counter!("loyalty_points_earned_total", "source" => source.to_string())
        .increment(points.max(0) as u64);
}

/// 记录积分消耗
#[inline]
pub fn record_points_redeemed(reward_type: &str, points: i64) {
    metrics::counter!("loyalty_points_redeemed_total", "reward_type" => reward_type.to_string())
        .increment(points.max(0) as u64);
}

/// 记录等级升级
#[inline]
pub fn record_tier_upgrade(tier: &str) {
    metrics::counter!("loyalty_tier_upgrades_total", "tier" => tier.to_string()).increment(1);
}

/// 记录里程碑
#[inline]
pub fn record_milestone(milestone_type: &str) {
    metrics::counter!("loyalty_milestones_total", "type" => milestone_type.to_string())
        .increment(1);
}

/// 记录推荐完成
#[inline]
pub fn record_referral_completed() {
    metrics::counter!("loyalty_referrals_completed_total").increment(1);
}

/// 记录乐观锁重试
#[inline]
pub fn record_concurrency_retry(operation: &str) {
    metrics::counter!("loyalty_concurrency_retries_total", "operation" => operation.to_string())
        .increment(1);
}

/// 记录通知发送结果
#[inline]
pub fn record_notification(template: &str, status: &str) {
    metrics::counter!(
        "loyalty_notifications_total",
        "template" => template.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录 Worker 最近一次运行时间
#[inline]
pub fn set_worker_last_run(worker: &str) {
    metrics::gauge!("worker_last_run_timestamp", "worker" => worker.to_string())
        .set(chrono::Utc::now().timestamp() as f64);
}
