//! 等级权益与运营统计 API 处理器

use axum::{
    Json,
    extract::{Path, State},
};
use loyalty_engine::engine::TierBenefits;
use loyalty_engine::models::Tier;
use loyalty_engine::service::ProgramStats;

use crate::{dto::ApiResponse, error::Result, state::AppState};

/// 查询等级权益
///
/// GET /loyalty/tiers/{tier}，等级名不区分大小写
pub async fn tier_benefits(
    State(state): State<AppState>,
    Path(tier): Path<String>,
) -> Result<Json<ApiResponse<TierBenefits>>> {
    let tier: Tier = tier.parse()?;
    let benefits = state.service.tier_benefits(tier)?;
    Ok(Json(ApiResponse::success(benefits)))
}

/// 会员计划整体统计
///
/// GET /loyalty/stats
pub async fn program_stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ProgramStats>>> {
    let stats = state.service.program_stats().await?;
    Ok(Json(ApiResponse::success(stats)))
}
