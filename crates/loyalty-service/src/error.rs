//! HTTP 层错误类型
//!
//! 把引擎错误映射为状态码和统一响应体

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use loyalty_engine::LoyaltyError;
use serde_json::json;

/// API 错误类型
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("参数验证失败: {0}")]
    Validation(String),

    #[error(transparent)]
    Loyalty(#[from] LoyaltyError),
}

impl ApiError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        let err = match self {
            Self::Validation(_) => return StatusCode::BAD_REQUEST,
            Self::Loyalty(err) => err,
        };

        match err {
            LoyaltyError::InvalidAmount(_)
            | LoyaltyError::Validation(_)
            | LoyaltyError::InvalidReferralCode(_) => StatusCode::BAD_REQUEST,

            LoyaltyError::AccountNotFound(_)
            | LoyaltyError::ReferralNotFound(_)
            | LoyaltyError::MilestoneNotFound { .. }
            | LoyaltyError::RewardNotFound { .. } => StatusCode::NOT_FOUND,

            LoyaltyError::InsufficientPoints { .. }
            | LoyaltyError::PointsOverflow { .. }
            | LoyaltyError::DuplicateEnrollment(_)
            | LoyaltyError::ReferralCodeTaken(_)
            | LoyaltyError::ReferralAlreadyClaimed(_)
            | LoyaltyError::AlreadyReferred(_)
            | LoyaltyError::ReferralNotApplied(_)
            | LoyaltyError::InvalidReferralTransition { .. }
            | LoyaltyError::MilestoneAlreadyAwarded { .. }
            | LoyaltyError::RewardUnavailable { .. }
            | LoyaltyError::ConcurrencyConflict => StatusCode::CONFLICT,

            LoyaltyError::ReferralExpired(_) => StatusCode::GONE,
            LoyaltyError::SelfReferral(_) => StatusCode::UNPROCESSABLE_ENTITY,

            LoyaltyError::CodeGenerationExhausted(_)
            | LoyaltyError::Database(_)
            | LoyaltyError::Serialization(_)
            | LoyaltyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Loyalty(err) => err.error_code(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, code = self.error_code(), "请求处理失败");
            "服务内部错误，请稍后重试".to_string()
        } else {
            self.to_string()
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_table() -> Vec<(ApiError, StatusCode, &'static str)> {
        vec![
            (ApiError::Validation("ownerId".into()), StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            (LoyaltyError::InvalidAmount(0).into(), StatusCode::BAD_REQUEST, "INVALID_AMOUNT"),
            (
                LoyaltyError::InvalidReferralCode("abc".into()).into(),
                StatusCode::BAD_REQUEST,
                "INVALID_REFERRAL_CODE",
            ),
            (
                LoyaltyError::AccountNotFound("guest-1".into()).into(),
                StatusCode::NOT_FOUND,
                "ACCOUNT_NOT_FOUND",
            ),
            (
                LoyaltyError::RewardNotFound { owner_id: "g".into(), reward_id: "r".into() }.into(),
                StatusCode::NOT_FOUND,
                "REWARD_NOT_FOUND",
            ),
            (
                LoyaltyError::InsufficientPoints { required: 10, available: 5 }.into(),
                StatusCode::CONFLICT,
                "INSUFFICIENT_POINTS",
            ),
            (
                LoyaltyError::PointsOverflow { owner_id: "guest-1".into(), amount: 1 }.into(),
                StatusCode::CONFLICT,
                "POINTS_OVERFLOW",
            ),
            (
                LoyaltyError::DuplicateEnrollment("guest-1".into()).into(),
                StatusCode::CONFLICT,
                "DUPLICATE_ENROLLMENT",
            ),
            (LoyaltyError::ConcurrencyConflict.into(), StatusCode::CONFLICT, "CONCURRENCY_CONFLICT"),
            (
                LoyaltyError::ReferralExpired("ABCD1234".into()).into(),
                StatusCode::GONE,
                "REFERRAL_EXPIRED",
            ),
            (
                LoyaltyError::SelfReferral("ABCD1234".into()).into(),
                StatusCode::UNPROCESSABLE_ENTITY,
                "SELF_REFERRAL",
            ),
            (
                LoyaltyError::Internal("boom".into()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
            ),
        ]
    }

    #[test]
    fn test_status_code_mapping() {
        for (err, status, code) in status_table() {
            assert_eq!(err.status_code(), status, "{code}");
            assert_eq!(err.error_code(), code);
        }
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let response = ApiError::from(LoyaltyError::Internal("pool exhausted".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "INTERNAL_ERROR");
        assert_eq!(json["message"], "服务内部错误，请稍后重试");
    }

    #[tokio::test]
    async fn test_business_error_keeps_message() {
        let response = ApiError::from(LoyaltyError::InsufficientPoints {
            required: 500,
            available: 100,
        })
        .into_response();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "积分余额不足: 需要 500, 可用 100");
        assert!(json["data"].is_null());
    }
}
