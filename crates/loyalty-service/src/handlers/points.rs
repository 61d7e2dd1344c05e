//! 积分 API 处理器

use axum::{Json, extract::State};
use loyalty_engine::models::LoyaltyAccount;
use loyalty_engine::service::Redemption;
use tracing::info;
use validator::Validate;

use crate::{
    dto::{
        AdjustPointsRequest, ApiResponse, EarnPointsRequest, ExpirePointsRequest,
        RedeemPointsRequest, StayRequest,
    },
    error::Result,
    state::AppState,
};

/// 发放积分
///
/// POST /loyalty/points/earn
pub async fn earn_points(
    State(state): State<AppState>,
    Json(req): Json<EarnPointsRequest>,
) -> Result<Json<ApiResponse<LoyaltyAccount>>> {
    req.validate()?;

    let (owner_id, earn) = req.into_parts();
    let account = state.service.add_points(&owner_id, earn).await?;
    Ok(Json(ApiResponse::success(account)))
}

/// 兑换积分，返回账户与生成的奖励
///
/// POST /loyalty/points/redeem
pub async fn redeem_points(
    State(state): State<AppState>,
    Json(req): Json<RedeemPointsRequest>,
) -> Result<Json<ApiResponse<Redemption>>> {
    req.validate()?;

    let (owner_id, redeem) = req.into_parts();
    let redemption = state.service.redeem_points(&owner_id, redeem).await?;
    info!(
        owner_id = %owner_id,
        reward_id = %redemption.reward.id,
        balance = redemption.account.points,
        "Points redeemed"
    );

    Ok(Json(ApiResponse::success(redemption)))
}

/// 人工调整积分
///
/// POST /loyalty/points/adjust
pub async fn adjust_points(
    State(state): State<AppState>,
    Json(req): Json<AdjustPointsRequest>,
) -> Result<Json<ApiResponse<LoyaltyAccount>>> {
    req.validate()?;

    let account = state
        .service
        .adjust_points(&req.owner_id, req.delta, &req.reason)
        .await?;
    info!(owner_id = %req.owner_id, delta = req.delta, reason = %req.reason, "Points adjusted");

    Ok(Json(ApiResponse::success(account)))
}

/// 过期积分
///
/// POST /loyalty/points/expire
pub async fn expire_points(
    State(state): State<AppState>,
    Json(req): Json<ExpirePointsRequest>,
) -> Result<Json<ApiResponse<LoyaltyAccount>>> {
    req.validate()?;

    let account = state
        .service
        .expire_points(&req.owner_id, req.amount, &req.reason)
        .await?;
    Ok(Json(ApiResponse::success(account)))
}

/// 按住宿消费发放积分
///
/// POST /loyalty/stays
pub async fn earn_for_stay(
    State(state): State<AppState>,
    Json(req): Json<StayRequest>,
) -> Result<Json<ApiResponse<LoyaltyAccount>>> {
    req.validate()?;

    let (owner_id, stay) = req.into_parts();
    let account = state.service.earn_for_stay(&owner_id, stay).await?;
    Ok(Json(ApiResponse::success(account)))
}
