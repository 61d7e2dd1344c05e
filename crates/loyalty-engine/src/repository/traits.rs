//! Repository trait 定义
//!
//! 服务层只依赖这些 trait，便于替换存储后端和使用 mock 测试

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{LoyaltyAccount, Referral};

/// 会员账户仓储
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find(&self, owner_id: &str) -> Result<Option<LoyaltyAccount>>;

    /// 新建账户，owner 已存在时返回 `DuplicateEnrollment`，
    /// 会员码已被其他账户占用时返回 `ReferralCodeTaken`
    async fn insert(&self, account: &LoyaltyAccount) -> Result<()>;

    /// 以 `account.version` 为期望版本保存，版本不一致返回 `ConcurrencyConflict`。
    /// 成功时返回递增版本后的文档
    async fn save(&self, account: &LoyaltyAccount) -> Result<LoyaltyAccount>;

    async fn delete(&self, owner_id: &str) -> Result<bool>;

    async fn list(&self) -> Result<Vec<LoyaltyAccount>>;

    /// 列出持有已过有效期但仍为可用状态奖励的账户
    async fn list_with_expired_rewards(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<LoyaltyAccount>>;

    async fn referral_code_exists(&self, code: &str) -> Result<bool>;
}

/// 推荐记录仓储
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReferralRepository: Send + Sync {
    async fn find(&self, code: &str) -> Result<Option<Referral>>;

    /// 新建推荐记录，推荐码已存在时返回 `ConcurrencyConflict`
    async fn insert(&self, referral: &Referral) -> Result<()>;

    /// 语义同 `AccountRepository::save`
    async fn save(&self, referral: &Referral) -> Result<Referral>;

    async fn list_by_referrer(&self, referrer_id: &str) -> Result<Vec<Referral>>;

    /// 列出已到期但仍为 Pending 的推荐记录
    async fn list_expirable(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<Referral>>;

    async fn delete_by_referrer(&self, referrer_id: &str) -> Result<u64>;

    async fn code_exists(&self, code: &str) -> Result<bool>;
}
