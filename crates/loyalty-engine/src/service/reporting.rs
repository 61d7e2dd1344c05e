//! 报表查询
//!
//! 直接对账户文档和积分流水做折叠，不参与事务写入

use tracing::instrument;

use super::{LoyaltyService, PointsSummary, ProgramStats};
use crate::engine::{TierBenefits, tier_benefits};
use crate::error::{LoyaltyError, Result};
use crate::models::{HistoryType, LoyaltyAccount, RewardStatus, Tier};

impl LoyaltyService {
    #[instrument(skip(self))]
    pub async fn points_summary(&self, owner_id: &str) -> Result<PointsSummary> {
        let account = self.load_account(owner_id).await?;
        Ok(summarize(&account))
    }

    #[instrument(skip(self))]
    pub async fn program_stats(&self) -> Result<ProgramStats> {
        let accounts = self.accounts.list().await?;
        Ok(program_stats(&accounts))
    }

    pub fn tier_benefits(&self, tier: Tier) -> Result<TierBenefits> {
        tier_benefits(&self.rules, tier)
            .ok_or_else(|| LoyaltyError::Validation(format!("等级未配置: {tier}")))
    }
}

/// 按流水类型和来源汇总单个账户
pub fn summarize(account: &LoyaltyAccount) -> PointsSummary {
    let mut summary = PointsSummary {
        owner_id: account.owner_id.clone(),
        tier: account.tier,
        balance: account.points,
        lifetime_points: account.lifetime_points,
        transaction_count: account.points_history.len(),
        pending_milestones: account.pending_milestones().count(),
        available_rewards: account
            .rewards
            .iter()
            .filter(|r| r.status == RewardStatus::Available)
            .count(),
        ..PointsSummary::default()
    };

    for entry in &account.points_history {
        match entry.entry_type {
            HistoryType::Earned => {
                summary.total_earned += entry.points;
                *summary
                    .earned_by_source
                    .entry(entry.source.clone())
                    .or_default() += entry.points;
            }
            HistoryType::Redeemed => summary.total_redeemed += -entry.points,
            HistoryType::Expired => summary.total_expired += -entry.points,
            HistoryType::Adjusted => summary.total_adjusted += entry.points,
        }
    }
    summary
}

/// 汇总全体会员
pub fn program_stats(accounts: &[LoyaltyAccount]) -> ProgramStats {
    let mut stats = ProgramStats {
        tier_distribution: Tier::ALL.iter().map(|t| (*t, 0)).collect(),
        ..ProgramStats::default()
    };
    for account in accounts {
        stats.member_count += 1;
        *stats.tier_distribution.entry(account.tier).or_default() += 1;
        stats.outstanding_points += account.points;
        stats.lifetime_points += account.lifetime_points;
        stats.pending_milestones += account.pending_milestones().count();
        stats.completed_referrals += account.referral_count;
        if account.referred_by.is_some() {
            stats.referred_members += 1;
        }
    }
    stats
}
