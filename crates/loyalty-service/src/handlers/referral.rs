//! 推荐 API 处理器

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use loyalty_engine::models::Referral;
use tracing::info;
use validator::Validate;

use crate::{
    dto::{
        ApiResponse, ApplyReferralRequest, CompleteReferralRequest, CreateReferralRequest,
        ListReferralsQuery,
    },
    error::Result,
    state::AppState,
};

/// 生成推荐码
///
/// POST /loyalty/referrals
pub async fn create_referral(
    State(state): State<AppState>,
    Json(req): Json<CreateReferralRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Referral>>)> {
    req.validate()?;

    let referral = state.service.create_referral(&req.referrer_id).await?;
    info!(
        code = %referral.code,
        referrer_id = %referral.referrer_id,
        expiry_date = %referral.expiry_date,
        "Referral created"
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::success(referral))))
}

/// 使用推荐码
///
/// POST /loyalty/referrals/apply
pub async fn apply_referral(
    State(state): State<AppState>,
    Json(req): Json<ApplyReferralRequest>,
) -> Result<Json<ApiResponse<Referral>>> {
    req.validate()?;

    let referral = state
        .service
        .apply_referral(&req.code, &req.referee_id)
        .await?;
    Ok(Json(ApiResponse::success(referral)))
}

/// 被推荐人首单完成，发放双方奖励
///
/// POST /loyalty/referrals/{code}/complete
pub async fn complete_referral(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<CompleteReferralRequest>,
) -> Result<Json<ApiResponse<Referral>>> {
    req.validate()?;

    let referral = state
        .service
        .complete_referral(&code, &req.booking_id)
        .await?;
    Ok(Json(ApiResponse::success(referral)))
}

/// 手动使推荐码过期
///
/// POST /loyalty/referrals/{code}/expire
pub async fn expire_referral(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ApiResponse<Referral>>> {
    let referral = state.service.expire_referral(&code).await?;
    Ok(Json(ApiResponse::success(referral)))
}

/// 查询推荐人创建的全部推荐码
///
/// GET /loyalty/referrals?referrerId=
pub async fn list_referrals(
    State(state): State<AppState>,
    Query(query): Query<ListReferralsQuery>,
) -> Result<Json<ApiResponse<Vec<Referral>>>> {
    query.validate()?;

    let referrals = state.service.list_referrals(&query.referrer_id).await?;
    Ok(Json(ApiResponse::success(referrals)))
}
