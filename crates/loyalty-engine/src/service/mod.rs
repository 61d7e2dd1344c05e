//! 会员积分服务
//!
//! 负责读取账户、执行纯状态转换、按版本保存，并在保存成功后派发通知。
//! 同一账户的并发写入通过版本冲突重试串行化

mod accounts;
mod dto;
mod maintenance;
mod points;
mod referrals;
mod reporting;

pub use dto::{
    EnrollAccount, PointsSummary, ProgramStats, Redemption, StayAccrual, SweepReport,
};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use loyalty_shared::observability::metrics;
use tracing::warn;

use crate::clock::{Clock, SystemClock};
use crate::code_generator::{CodeGenerator, RandomCodeGenerator};
use crate::engine::LoyaltyEvent;
use crate::error::{LoyaltyError, Result};
use crate::models::{LoyaltyAccount, Referral};
use crate::notification::{NotificationSender, Notifier};
use crate::repository::{AccountRepository, ReferralRepository};
use crate::rules::LoyaltyRules;

/// 会员积分服务
pub struct LoyaltyService {
    accounts: Arc<dyn AccountRepository>,
    referrals: Arc<dyn ReferralRepository>,
    rules: Arc<LoyaltyRules>,
    clock: Arc<dyn Clock>,
    codes: Arc<dyn CodeGenerator>,
    notifier: Notifier,
}

impl LoyaltyService {
    /// 创建服务实例，规则表不合法时返回 `Validation`
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        referrals: Arc<dyn ReferralRepository>,
        rules: LoyaltyRules,
    ) -> Result<Self> {
        rules.validate()?;
        Ok(Self {
            accounts,
            referrals,
            rules: Arc::new(rules),
            clock: Arc::new(SystemClock),
            codes: Arc::new(RandomCodeGenerator),
            notifier: Notifier::default(),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_code_generator(mut self, codes: Arc<dyn CodeGenerator>) -> Self {
        self.codes = codes;
        self
    }

    pub fn with_notification_sender(mut self, sender: Arc<dyn NotificationSender>) -> Self {
        self.notifier = Notifier::new(sender);
        self
    }

    pub fn rules(&self) -> &LoyaltyRules {
        &self.rules
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    async fn load_account(&self, owner_id: &str) -> Result<LoyaltyAccount> {
        self.accounts
            .find(owner_id)
            .await?
            .ok_or_else(|| LoyaltyError::AccountNotFound(owner_id.to_string()))
    }

    async fn load_referral(&self, code: &str) -> Result<Referral> {
        self.referrals
            .find(code)
            .await?
            .ok_or_else(|| LoyaltyError::ReferralNotFound(code.to_string()))
    }

    /// 读取-修改-保存，版本冲突时重新读取并重放 `apply`
    ///
    /// `apply` 返回错误时不会保存任何变更
    async fn mutate_account<T, F>(
        &self,
        owner_id: &str,
        operation: &'static str,
        mut apply: F,
    ) -> Result<(LoyaltyAccount, T)>
    where
        F: FnMut(&mut LoyaltyAccount, DateTime<Utc>) -> Result<T> + Send,
        T: Send,
    {
        let max_attempts = self.rules.max_write_retries + 1;
        for attempt in 1..=max_attempts {
            let mut account = self.load_account(owner_id).await?;
            let output = apply(&mut account, self.clock.now())?;
            match self.accounts.save(&account).await {
                Ok(saved) => return Ok((saved, output)),
                Err(LoyaltyError::ConcurrencyConflict) if attempt < max_attempts => {
                    metrics::record_concurrency_retry(operation);
                    warn!(owner_id, operation, attempt, "账户版本冲突，重新读取后重试");
                }
                Err(e) => return Err(e),
            }
        }
        Err(LoyaltyError::ConcurrencyConflict)
    }

    /// 推荐记录的读取-修改-保存，语义同 `mutate_account`
    async fn mutate_referral<T, F>(
        &self,
        code: &str,
        operation: &'static str,
        mut apply: F,
    ) -> Result<(Referral, T)>
    where
        F: FnMut(&mut Referral, DateTime<Utc>) -> Result<T> + Send,
        T: Send,
    {
        let max_attempts = self.rules.max_write_retries + 1;
        for attempt in 1..=max_attempts {
            let mut referral = self.load_referral(code).await?;
            let output = apply(&mut referral, self.clock.now())?;
            match self.referrals.save(&referral).await {
                Ok(saved) => return Ok((saved, output)),
                Err(LoyaltyError::ConcurrencyConflict) if attempt < max_attempts => {
                    metrics::record_concurrency_retry(operation);
                    warn!(code, operation, attempt, "推荐记录版本冲突，重新读取后重试");
                }
                Err(e) => return Err(e),
            }
        }
        Err(LoyaltyError::ConcurrencyConflict)
    }

    /// 记录指标并发送通知，只在状态保存成功后调用
    async fn publish(&self, account: &LoyaltyAccount, events: &[LoyaltyEvent]) {
        for event in events {
            record_event_metrics(event);
        }
        self.notifier.dispatch(account.email.as_deref(), events).await;
    }
}

fn record_event_metrics(event: &LoyaltyEvent) {
    match event {
        LoyaltyEvent::PointsEarned { points, source, .. } => {
            metrics::record_points_earned(source, *points)
        }
        LoyaltyEvent::PointsRedeemed {
            points,
            reward_type,
            ..
        } => metrics::record_points_redeemed(reward_type, *points),
        LoyaltyEvent::TierUpgraded { to, .. } => metrics::record_tier_upgrade(to.as_str()),
        LoyaltyEvent::MilestoneReached { milestone, .. } => {
            metrics::record_milestone(milestone.milestone_type.as_str())
        }
        LoyaltyEvent::ReferralCompleted { .. } => metrics::record_referral_completed(),
        LoyaltyEvent::Enrolled { .. }
        | LoyaltyEvent::MilestoneAwarded { .. }
        | LoyaltyEvent::RewardIssued { .. } => {}
    }
}
