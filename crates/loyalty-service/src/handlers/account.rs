//! 会员账户 API 处理器
//!
//! 入会、查询、注销、积分汇总，以及里程碑和奖励的领取

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use loyalty_engine::models::{LoyaltyAccount, Reward};
use loyalty_engine::service::PointsSummary;
use tracing::info;
use validator::Validate;

use crate::{
    dto::{ApiResponse, DeleteAccountResponse, EnrollRequest},
    error::Result,
    state::AppState,
};

/// 入会
///
/// POST /loyalty/accounts
pub async fn enroll(
    State(state): State<AppState>,
    Json(req): Json<EnrollRequest>,
) -> Result<(StatusCode, Json<ApiResponse<LoyaltyAccount>>)> {
    req.validate()?;

    let account = state.service.enroll(req.into()).await?;
    info!(
        owner_id = %account.owner_id,
        referral_code = %account.referral_code,
        "Member enrolled"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(account, "入会成功")),
    ))
}

/// 查询账户
///
/// GET /loyalty/accounts/{ownerId}
pub async fn get_account(
    State(state): State<AppState>,
    Path(owner_id): Path<String>,
) -> Result<Json<ApiResponse<LoyaltyAccount>>> {
    let account = state.service.get_account(&owner_id).await?;
    Ok(Json(ApiResponse::success(account)))
}

/// 注销账户，同时删除其创建的推荐记录
///
/// DELETE /loyalty/accounts/{ownerId}
pub async fn delete_account(
    State(state): State<AppState>,
    Path(owner_id): Path<String>,
) -> Result<Json<ApiResponse<DeleteAccountResponse>>> {
    let referrals_deleted = state.service.delete_account(&owner_id).await?;
    info!(owner_id = %owner_id, referrals_deleted, "Member account deleted");

    Ok(Json(ApiResponse::success(DeleteAccountResponse {
        owner_id,
        referrals_deleted,
    })))
}

/// 积分汇总
///
/// GET /loyalty/accounts/{ownerId}/summary
pub async fn points_summary(
    State(state): State<AppState>,
    Path(owner_id): Path<String>,
) -> Result<Json<ApiResponse<PointsSummary>>> {
    let summary = state.service.points_summary(&owner_id).await?;
    Ok(Json(ApiResponse::success(summary)))
}

/// 发放待领取的里程碑奖励
///
/// POST /loyalty/accounts/{ownerId}/milestones/{index}/award
pub async fn award_milestone(
    State(state): State<AppState>,
    Path((owner_id, index)): Path<(String, usize)>,
) -> Result<Json<ApiResponse<LoyaltyAccount>>> {
    let account = state.service.award_milestone(&owner_id, index).await?;
    info!(owner_id = %owner_id, index, "Milestone awarded");

    Ok(Json(ApiResponse::success(account)))
}

/// 核销奖励
///
/// POST /loyalty/accounts/{ownerId}/rewards/{rewardId}/use
pub async fn use_reward(
    State(state): State<AppState>,
    Path((owner_id, reward_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<Reward>>> {
    let reward = state.service.use_reward(&owner_id, &reward_id).await?;
    Ok(Json(ApiResponse::success(reward)))
}
