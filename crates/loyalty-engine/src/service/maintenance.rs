//! 到期清理

use tracing::{info, instrument, warn};

use super::{LoyaltyService, SweepReport};
use crate::engine::{self, referral};
use crate::error::{LoyaltyError, Result};

impl LoyaltyService {
    /// 将已到期的 Pending 推荐标记为过期，返回处理数量
    #[instrument(skip(self))]
    pub async fn expire_due_referrals(&self, batch_size: usize) -> Result<usize> {
        let now = self.clock.now();
        let due = self.referrals.list_expirable(now, batch_size).await?;

        let mut expired = 0;
        for candidate in due {
            let outcome = self
                .mutate_referral(&candidate.code, "expire_due_referrals", |referral, now| {
                    if !referral.is_past_expiry(now) {
                        return Ok(false);
                    }
                    referral::expire_referral(referral)?;
                    Ok(true)
                })
                .await;
            match outcome {
                Ok((_, true)) => expired += 1,
                Ok((_, false)) => {}
                // 期间已被完成或过期
                Err(LoyaltyError::InvalidReferralTransition { .. }) => {}
                Err(e) => {
                    warn!(code = %candidate.code, error = %e, "推荐过期处理失败");
                }
            }
        }
        if expired > 0 {
            info!(expired, "已过期推荐码处理完成");
        }
        Ok(expired)
    }

    /// 将已过有效期的可用奖励标记为过期，返回处理数量
    #[instrument(skip(self))]
    pub async fn expire_due_rewards(&self, batch_size: usize) -> Result<usize> {
        let now = self.clock.now();
        let due = self.accounts.list_with_expired_rewards(now, batch_size).await?;

        let mut expired = 0;
        for account in &due {
            match self
                .mutate_account(&account.owner_id, "expire_due_rewards", |account, now| {
                    Ok(engine::expire_rewards(account, now))
                })
                .await
            {
                Ok((_, count)) => expired += count,
                Err(e) => {
                    warn!(owner_id = %account.owner_id, error = %e, "奖励过期处理失败");
                }
            }
        }
        if expired > 0 {
            info!(expired, "已过期奖励处理完成");
        }
        Ok(expired)
    }

    /// 完整清理一轮
    pub async fn run_expiry_sweep(&self, batch_size: usize) -> Result<SweepReport> {
        Ok(SweepReport {
            referrals_expired: self.expire_due_referrals(batch_size).await?,
            rewards_expired: self.expire_due_rewards(batch_size).await?,
        })
    }
}
