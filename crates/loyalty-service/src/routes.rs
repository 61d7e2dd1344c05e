//! 路由配置模块
//!
//! 定义所有 REST API 端点的路由映射

use axum::{
    Json, Router, middleware,
    routing::{get, post},
};
use loyalty_shared::observability::middleware as obs_middleware;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};

use crate::{config::SERVICE_NAME, handlers, state::AppState};

/// 会员账户路由
fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", post(handlers::account::enroll))
        .route(
            "/accounts/{owner_id}",
            get(handlers::account::get_account).delete(handlers::account::delete_account),
        )
        .route(
            "/accounts/{owner_id}/summary",
            get(handlers::account::points_summary),
        )
        .route(
            "/accounts/{owner_id}/milestones/{index}/award",
            post(handlers::account::award_milestone),
        )
        .route(
            "/accounts/{owner_id}/rewards/{reward_id}/use",
            post(handlers::account::use_reward),
        )
}

/// 积分路由
fn points_routes() -> Router<AppState> {
    Router::new()
        .route("/points/earn", post(handlers::points::earn_points))
        .route("/points/redeem", post(handlers::points::redeem_points))
        .route("/points/adjust", post(handlers::points::adjust_points))
        .route("/points/expire", post(handlers::points::expire_points))
        .route("/stays", post(handlers::points::earn_for_stay))
}

/// 推荐路由
fn referral_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/referrals",
            get(handlers::referral::list_referrals).post(handlers::referral::create_referral),
        )
        .route("/referrals/apply", post(handlers::referral::apply_referral))
        .route(
            "/referrals/{code}/complete",
            post(handlers::referral::complete_referral),
        )
        .route(
            "/referrals/{code}/expire",
            post(handlers::referral::expire_referral),
        )
}

/// 等级与统计路由
fn stats_routes() -> Router<AppState> {
    Router::new()
        .route("/tiers/{tier}", get(handlers::stats::tier_benefits))
        .route("/stats", get(handlers::stats::program_stats))
}

/// 构建 /loyalty 下的全部业务路由
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(account_routes())
        .merge(points_routes())
        .merge(referral_routes())
        .merge(stats_routes())
}

/// 构建完整应用：业务路由、健康检查与公共中间件
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/loyalty", api_routes())
        .route("/health", get(health_check))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(obs_middleware::http_tracing))
                .layer(cors)
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}

/// 存活探针
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": SERVICE_NAME
    }))
}
