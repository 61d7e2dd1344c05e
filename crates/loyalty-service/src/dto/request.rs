//! 请求 DTO 定义
//!
//! 字段统一使用 camelCase，入参在 handler 中通过 validator 校验

use loyalty_engine::engine::points::MAX_POINTS_PER_OPERATION;
use loyalty_engine::engine::{EarnPoints, RedeemPoints};
use loyalty_engine::models::sources;
use loyalty_engine::service::{EnrollAccount, StayAccrual};
use serde::Deserialize;
use validator::Validate;

/// 入会请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EnrollRequest {
    #[validate(length(min = 1, max = 64, message = "会员ID长度必须在1-64个字符之间"))]
    pub owner_id: String,
    #[validate(email(message = "邮箱格式无效"))]
    pub email: Option<String>,
    /// 入会时使用的推荐码
    pub referral_code: Option<String>,
}

impl From<EnrollRequest> for EnrollAccount {
    fn from(req: EnrollRequest) -> Self {
        Self {
            owner_id: req.owner_id,
            email: req.email,
            referral_code: req.referral_code,
        }
    }
}

/// 积分发放请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EarnPointsRequest {
    #[validate(length(min = 1, message = "会员ID不能为空"))]
    pub owner_id: String,
    /// 金额的正数校验由引擎负责，以便返回 INVALID_AMOUNT
    #[validate(range(max = MAX_POINTS_PER_OPERATION, message = "单次积分数量超出上限"))]
    pub amount: i64,
    #[serde(default)]
    pub source: Option<String>,
    pub related_booking_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl EarnPointsRequest {
    pub fn into_parts(self) -> (String, EarnPoints) {
        let source = self
            .source
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| sources::ADJUSTMENT.to_string());
        let description = self
            .description
            .unwrap_or_else(|| format!("Earned {} points ({})", self.amount, source));
        (
            self.owner_id,
            EarnPoints {
                amount: self.amount,
                source,
                related_booking_id: self.related_booking_id,
                description,
            },
        )
    }
}

/// 积分兑换请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RedeemPointsRequest {
    #[validate(length(min = 1, message = "会员ID不能为空"))]
    pub owner_id: String,
    #[validate(range(max = MAX_POINTS_PER_OPERATION, message = "单次积分数量超出上限"))]
    pub amount: i64,
    #[validate(length(min = 1, max = 64, message = "奖励类型长度必须在1-64个字符之间"))]
    pub reward_type: String,
    pub related_booking_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl RedeemPointsRequest {
    pub fn into_parts(self) -> (String, RedeemPoints) {
        let description = self
            .description
            .unwrap_or_else(|| format!("Redeemed {} points for {}", self.amount, self.reward_type));
        (
            self.owner_id,
            RedeemPoints {
                amount: self.amount,
                reward_type: self.reward_type,
                related_booking_id: self.related_booking_id,
                description,
            },
        )
    }
}

/// 人工调整请求，delta 可正可负
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdjustPointsRequest {
    #[validate(length(min = 1, message = "会员ID不能为空"))]
    pub owner_id: String,
    #[validate(range(
        min = -MAX_POINTS_PER_OPERATION,
        max = MAX_POINTS_PER_OPERATION,
        message = "调整积分数量超出上限"
    ))]
    pub delta: i64,
    #[validate(length(min = 1, max = 255, message = "调整原因长度必须在1-255个字符之间"))]
    pub reason: String,
}

/// 积分过期请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExpirePointsRequest {
    #[validate(length(min = 1, message = "会员ID不能为空"))]
    pub owner_id: String,
    #[validate(range(max = MAX_POINTS_PER_OPERATION, message = "单次积分数量超出上限"))]
    pub amount: i64,
    #[validate(length(min = 1, max = 255, message = "过期原因长度必须在1-255个字符之间"))]
    pub reason: String,
}

/// 住宿积分请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StayRequest {
    #[validate(length(min = 1, message = "会员ID不能为空"))]
    pub owner_id: String,
    #[validate(range(min = 0.0, max = 1_000_000_000.0, message = "消费金额超出范围"))]
    pub amount_spent: f64,
    #[validate(length(min = 1, message = "订单号不能为空"))]
    pub booking_id: String,
}

impl StayRequest {
    pub fn into_parts(self) -> (String, StayAccrual) {
        (
            self.owner_id,
            StayAccrual {
                amount_spent: self.amount_spent,
                booking_id: self.booking_id,
            },
        )
    }
}

/// 创建推荐码请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReferralRequest {
    #[validate(length(min = 1, message = "推荐人ID不能为空"))]
    pub referrer_id: String,
}

/// 使用推荐码请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ApplyReferralRequest {
    #[validate(length(min = 1, message = "推荐码不能为空"))]
    pub code: String,
    #[validate(length(min = 1, message = "被推荐人ID不能为空"))]
    pub referee_id: String,
}

/// 完成推荐请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CompleteReferralRequest {
    #[validate(length(min = 1, message = "首单订单号不能为空"))]
    pub booking_id: String,
}

/// 推荐列表查询参数
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ListReferralsQuery {
    #[validate(length(min = 1, message = "推荐人ID不能为空"))]
    pub referrer_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enroll_request_rejects_bad_email() {
        let req: EnrollRequest = serde_json::from_value(serde_json::json!({
            "ownerId": "guest-1",
            "email": "not-an-email"
        }))
        .unwrap();
        tokio_test::assert_err!(req.validate());
    }

    #[test]
    fn test_earn_request_defaults() {
        let req: EarnPointsRequest = serde_json::from_value(serde_json::json!({
            "ownerId": "guest-1",
            "amount": 250
        }))
        .unwrap();
        tokio_test::assert_ok!(req.validate());

        let (owner_id, earn) = req.into_parts();
        assert_eq!(owner_id, "guest-1");
        assert_eq!(earn.amount, 250);
        assert_eq!(earn.source, sources::ADJUSTMENT);
        assert_eq!(earn.description, "Earned 250 points (adjustment)");
    }

    #[test]
    fn test_point_amounts_are_bounded() {
        let req: EarnPointsRequest = serde_json::from_value(serde_json::json!({
            "ownerId": "guest-1",
            "amount": i64::MAX
        }))
        .unwrap();
        tokio_test::assert_err!(req.validate());

        let req: AdjustPointsRequest = serde_json::from_value(serde_json::json!({
            "ownerId": "guest-1",
            "delta": i64::MIN,
            "reason": "bulk"
        }))
        .unwrap();
        tokio_test::assert_err!(req.validate());

        let req: StayRequest = serde_json::from_value(serde_json::json!({
            "ownerId": "guest-1",
            "amountSpent": 1e300,
            "bookingId": "bk-1"
        }))
        .unwrap();
        tokio_test::assert_err!(req.validate());

        let req: AdjustPointsRequest = serde_json::from_value(serde_json::json!({
            "ownerId": "guest-1",
            "delta": -MAX_POINTS_PER_OPERATION,
            "reason": "correction"
        }))
        .unwrap();
        tokio_test::assert_ok!(req.validate());
    }

    #[test]
    fn test_redeem_request_requires_reward_type() {
        let req: RedeemPointsRequest = serde_json::from_value(serde_json::json!({
            "ownerId": "guest-1",
            "amount": 100,
            "rewardType": ""
        }))
        .unwrap();
        tokio_test::assert_err!(req.validate());
    }
}
