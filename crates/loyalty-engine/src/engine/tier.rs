//! 等级重算

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::LoyaltyEvent;
use crate::models::{LoyaltyAccount, Milestone, MilestoneType, Tier};
use crate::rules::LoyaltyRules;

/// 按累计积分重算等级
///
/// 等级变化时先记录待发放的升级里程碑，再覆盖等级。
/// 计算结果低于当前等级时不做降级
pub fn update_membership_tier(
    account: &mut LoyaltyAccount,
    rules: &LoyaltyRules,
    now: DateTime<Utc>,
) -> Vec<LoyaltyEvent> {
    let computed = rules.tiers.tier_for(account.lifetime_points);
    if computed <= account.tier {
        return Vec::new();
    }

    let mut events = Vec::with_capacity(2);
    let description = upgrade_description(computed);
    if !account.has_milestone(&description) {
        let milestone = Milestone::pending(
            MilestoneType::TierUpgrade,
            description,
            rules.milestones.tier_upgrade_bonus,
            now,
        );
        account.milestones.push(milestone.clone());
        events.push(LoyaltyEvent::MilestoneReached {
            owner_id: account.owner_id.clone(),
            milestone,
        });
    }

    let from = account.tier;
    account.tier = computed;
    events.push(LoyaltyEvent::TierUpgraded {
        owner_id: account.owner_id.clone(),
        from,
        to: computed,
    });
    events
}

pub fn upgrade_description(tier: Tier) -> String {
    format!("Upgraded to {} tier", tier.display_name())
}

/// 等级权益
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierBenefits {
    pub tier: Tier,
    pub threshold: i64,
    pub earn_multiplier: f64,
    pub discount_percent: u8,
    /// 下一等级及其门槛，最高等级为 None
    pub next_tier: Option<Tier>,
    pub next_threshold: Option<i64>,
}

pub fn tier_benefits(rules: &LoyaltyRules, tier: Tier) -> Option<TierBenefits> {
    let table = rules.tiers.rules();
    let position = table.iter().position(|r| r.tier == tier)?;
    let rule = &table[position];
    let next = table.get(position + 1);
    Some(TierBenefits {
        tier,
        threshold: rule.threshold,
        earn_multiplier: rule.earn_multiplier,
        discount_percent: rule.discount_percent,
        next_tier: next.map(|r| r.tier),
        next_threshold: next.map(|r| r.threshold),
    })
}
