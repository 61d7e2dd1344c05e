//! 会员积分服务错误类型
//!
//! 定义服务层的业务错误和系统错误

use thiserror::Error;

/// 会员积分服务错误类型
#[derive(Debug, Error)]
pub enum LoyaltyError {
    // === 积分相关错误 ===
    #[error("积分数量无效: {0}，必须为正整数")]
    InvalidAmount(i64),

    #[error("积分余额不足: 需要 {required}, 可用 {available}")]
    InsufficientPoints { required: i64, available: i64 },

    #[error("积分累计超出上限: owner_id={owner_id}, amount={amount}")]
    PointsOverflow { owner_id: String, amount: i64 },

    // === 会员账户相关错误 ===
    #[error("会员账户不存在: {0}")]
    AccountNotFound(String),

    #[error("会员账户已存在: {0}")]
    DuplicateEnrollment(String),

    #[error("会员推荐码已被占用: {0}")]
    ReferralCodeTaken(String),

    // === 推荐相关错误 ===
    #[error("推荐码不存在: {0}")]
    ReferralNotFound(String),

    #[error("推荐码格式无效: {0}")]
    InvalidReferralCode(String),

    #[error("推荐码已失效: {0}")]
    ReferralExpired(String),

    #[error("不能使用自己的推荐码: {0}")]
    SelfReferral(String),

    #[error("推荐码已被其他会员使用: {0}")]
    ReferralAlreadyClaimed(String),

    #[error("会员已有推荐人: {0}")]
    AlreadyReferred(String),

    #[error("推荐码尚未被使用，无法完成: {0}")]
    ReferralNotApplied(String),

    #[error("推荐状态不允许此操作: code={code}, current_status={status}")]
    InvalidReferralTransition { code: String, status: String },

    #[error("推荐码生成失败，已尝试 {0} 次")]
    CodeGenerationExhausted(u32),

    // === 里程碑 / 奖励相关错误 ===
    #[error("里程碑不存在: owner_id={owner_id}, index={index}")]
    MilestoneNotFound { owner_id: String, index: usize },

    #[error("里程碑奖励已发放: owner_id={owner_id}, index={index}")]
    MilestoneAlreadyAwarded { owner_id: String, index: usize },

    #[error("奖励不存在: owner_id={owner_id}, reward_id={reward_id}")]
    RewardNotFound { owner_id: String, reward_id: String },

    #[error("奖励不可用: reward_id={reward_id}, status={status}")]
    RewardUnavailable { reward_id: String, status: String },

    // === 系统错误 ===
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON 序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("内部错误: {0}")]
    Internal(String),

    #[error("参数校验失败: {0}")]
    Validation(String),

    #[error("并发冲突，请重试")]
    ConcurrencyConflict,
}

/// 会员积分服务 Result 类型别名
pub type Result<T> = std::result::Result<T, LoyaltyError>;

impl LoyaltyError {
    /// 检查是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_) | Self::ConcurrencyConflict)
    }

    /// 检查是否为业务错误（非系统错误）
    pub fn is_business_error(&self) -> bool {
        !matches!(
            self,
            Self::Database(_)
                | Self::Serialization(_)
                | Self::Internal(_)
                | Self::ConcurrencyConflict
                | Self::CodeGenerationExhausted(_)
        )
    }

    /// 获取错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::InsufficientPoints { .. } => "INSUFFICIENT_POINTS",
            Self::PointsOverflow { .. } => "POINTS_OVERFLOW",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::DuplicateEnrollment(_) => "DUPLICATE_ENROLLMENT",
            Self::ReferralCodeTaken(_) => "REFERRAL_CODE_TAKEN",
            Self::ReferralNotFound(_) => "REFERRAL_NOT_FOUND",
            Self::InvalidReferralCode(_) => "INVALID_REFERRAL_CODE",
            Self::ReferralExpired(_) => "REFERRAL_EXPIRED",
            Self::SelfReferral(_) => "SELF_REFERRAL",
            Self::ReferralAlreadyClaimed(_) => "REFERRAL_ALREADY_CLAIMED",
            Self::AlreadyReferred(_) => "ALREADY_REFERRED",
            Self::ReferralNotApplied(_) => "REFERRAL_NOT_APPLIED",
            Self::InvalidReferralTransition { .. } => "INVALID_REFERRAL_TRANSITION",
            Self::CodeGenerationExhausted(_) => "CODE_GENERATION_EXHAUSTED",
            Self::MilestoneNotFound { .. } => "MILESTONE_NOT_FOUND",
            Self::MilestoneAlreadyAwarded { .. } => "MILESTONE_ALREADY_AWARDED",
            Self::RewardNotFound { .. } => "REWARD_NOT_FOUND",
            Self::RewardUnavailable { .. } => "REWARD_UNAVAILABLE",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::ConcurrencyConflict => "CONCURRENCY_CONFLICT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_retryable() {
        assert!(LoyaltyError::ConcurrencyConflict.is_retryable());
        assert!(LoyaltyError::Database(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(!LoyaltyError::AccountNotFound("guest-1".to_string()).is_retryable());
        assert!(
            !LoyaltyError::InsufficientPoints {
                required: 500,
                available: 300
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_error_is_business_error() {
        assert!(LoyaltyError::InvalidAmount(0).is_business_error());
        assert!(LoyaltyError::SelfReferral("ABCD1234".to_string()).is_business_error());
        assert!(!LoyaltyError::Internal("panic".to_string()).is_business_error());
        assert!(!LoyaltyError::ConcurrencyConflict.is_business_error());
    }

    #[test]
    fn test_error_code() {
        assert_eq!(LoyaltyError::InvalidAmount(-5).error_code(), "INVALID_AMOUNT");
        let overflow = LoyaltyError::PointsOverflow {
            owner_id: "guest-1".to_string(),
            amount: 1,
        };
        assert_eq!(overflow.error_code(), "POINTS_OVERFLOW");
        assert!(overflow.is_business_error());
        assert_eq!(
            LoyaltyError::ReferralExpired("ABCD1234".to_string()).error_code(),
            "REFERRAL_EXPIRED"
        );
        assert_eq!(
            LoyaltyError::DuplicateEnrollment("guest-1".to_string()).error_code(),
            "DUPLICATE_ENROLLMENT"
        );
    }

    #[test]
    fn test_error_display() {
        let err = LoyaltyError::InsufficientPoints {
            required: 500,
            available: 300,
        };
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("300"));

        let err = LoyaltyError::MilestoneNotFound {
            owner_id: "guest-42".to_string(),
            index: 3,
        };
        assert!(err.to_string().contains("guest-42"));
    }
}
