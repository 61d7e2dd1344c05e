//! 积分入账、兑换与调整
//!
//! 所有函数在校验失败时不修改账户

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{LoyaltyEvent, milestone, tier};
use crate::error::{LoyaltyError, Result};
use crate::models::{
    HistoryType, LoyaltyAccount, MilestoneStatus, PointsHistoryEntry, Reward, RewardStatus, Tier,
    sources,
};
use crate::rules::LoyaltyRules;

/// 积分入账参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarnPoints {
    pub amount: i64,
    pub source: String,
    #[serde(default)]
    pub related_booking_id: Option<String>,
    #[serde(default)]
    pub description: String,
}

/// 积分兑换参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemPoints {
    pub amount: i64,
    pub reward_type: String,
    #[serde(default)]
    pub related_booking_id: Option<String>,
    #[serde(default)]
    pub description: String,
}

/// 单次操作允许的最大积分数量
pub const MAX_POINTS_PER_OPERATION: i64 = 1_000_000_000;

fn ensure_positive(amount: i64) -> Result<()> {
    if amount <= 0 || amount > MAX_POINTS_PER_OPERATION {
        return Err(LoyaltyError::InvalidAmount(amount));
    }
    Ok(())
}

/// 积分入账
///
/// 先更新余额和累计积分并追加流水，再用更新后的累计积分重算等级、检测里程碑
pub fn add_points(
    account: &mut LoyaltyAccount,
    rules: &LoyaltyRules,
    earn: &EarnPoints,
    now: DateTime<Utc>,
) -> Result<Vec<LoyaltyEvent>> {
    ensure_positive(earn.amount)?;
    let mut draft = account.clone();
    let mut events = Vec::new();
    accrue(
        &mut draft,
        rules,
        Accrual {
            amount: earn.amount,
            entry_type: HistoryType::Earned,
            source: &earn.source,
            related_booking_id: earn.related_booking_id.clone(),
            description: &earn.description,
        },
        now,
        &mut events,
    )?;
    *account = draft;
    Ok(events)
}

pub(crate) struct Accrual<'a> {
    pub amount: i64,
    pub entry_type: HistoryType,
    pub source: &'a str,
    pub related_booking_id: Option<String>,
    pub description: &'a str,
}

pub(crate) fn accrue(
    account: &mut LoyaltyAccount,
    rules: &LoyaltyRules,
    accrual: Accrual<'_>,
    now: DateTime<Utc>,
    events: &mut Vec<LoyaltyEvent>,
) -> Result<()> {
    accrue_once(account, rules, accrual, now, events)?;
    if rules.auto_award_milestones {
        award_pending(account, rules, now, events)?;
    }
    Ok(())
}

fn accrue_once(
    account: &mut LoyaltyAccount,
    rules: &LoyaltyRules,
    accrual: Accrual<'_>,
    now: DateTime<Utc>,
    events: &mut Vec<LoyaltyEvent>,
) -> Result<()> {
    let overflow = || LoyaltyError::PointsOverflow {
        owner_id: account.owner_id.clone(),
        amount: accrual.amount,
    };
    let points = account.points.checked_add(accrual.amount).ok_or_else(overflow)?;
    let lifetime_points = account
        .lifetime_points
        .checked_add(accrual.amount)
        .ok_or_else(overflow)?;
    account.points = points;
    account.lifetime_points = lifetime_points;
    account.points_history.push(PointsHistoryEntry {
        points: accrual.amount,
        entry_type: accrual.entry_type,
        source: accrual.source.to_string(),
        related_booking_id: accrual.related_booking_id,
        description: accrual.description.to_string(),
        date: now,
    });
    account.last_activity = now;
    events.push(LoyaltyEvent::PointsEarned {
        owner_id: account.owner_id.clone(),
        points: accrual.amount,
        balance: account.points,
        source: accrual.source.to_string(),
    });

    events.extend(tier::update_membership_tier(account, rules, now));
    events.extend(milestone::check_milestones(account, rules, now));
    Ok(())
}

/// 逐个发放待发放里程碑，直到没有新的待发放条目
pub(crate) fn award_pending(
    account: &mut LoyaltyAccount,
    rules: &LoyaltyRules,
    now: DateTime<Utc>,
    events: &mut Vec<LoyaltyEvent>,
) -> Result<()> {
    loop {
        let next = account.pending_milestones().next().map(|(i, _)| i);
        let Some(index) = next else { break };
        award_at(account, rules, index, now, events)?;
    }
    Ok(())
}

fn award_at(
    account: &mut LoyaltyAccount,
    rules: &LoyaltyRules,
    index: usize,
    now: DateTime<Utc>,
    events: &mut Vec<LoyaltyEvent>,
) -> Result<()> {
    let milestone = &mut account.milestones[index];
    milestone.status = MilestoneStatus::Awarded;
    milestone.awarded_at = Some(now);
    let reward_points = milestone.reward_points;
    let description = format!("Milestone reward: {}", milestone.description);

    events.push(LoyaltyEvent::MilestoneAwarded {
        owner_id: account.owner_id.clone(),
        description: account.milestones[index].description.clone(),
        reward_points,
    });

    if reward_points > 0 {
        accrue_once(
            account,
            rules,
            Accrual {
                amount: reward_points,
                entry_type: HistoryType::Earned,
                source: sources::MILESTONE,
                related_booking_id: None,
                description: &description,
            },
            now,
            events,
        )?;
    } else {
        account.last_activity = now;
    }
    Ok(())
}

/// 发放指定里程碑的奖励积分
pub fn award_milestone(
    account: &mut LoyaltyAccount,
    rules: &LoyaltyRules,
    index: usize,
    now: DateTime<Utc>,
) -> Result<Vec<LoyaltyEvent>> {
    let Some(milestone) = account.milestones.get(index) else {
        return Err(LoyaltyError::MilestoneNotFound {
            owner_id: account.owner_id.clone(),
            index,
        });
    };
    if !milestone.is_pending() {
        return Err(LoyaltyError::MilestoneAlreadyAwarded {
            owner_id: account.owner_id.clone(),
            index,
        });
    }

    let mut draft = account.clone();
    let mut events = Vec::new();
    award_at(&mut draft, rules, index, now, &mut events)?;
    if rules.auto_award_milestones {
        award_pending(&mut draft, rules, now, &mut events)?;
    }
    *account = draft;
    Ok(events)
}

/// 积分兑换
///
/// 只扣减余额，不影响累计积分，也不触发等级重算。成功后生成一条可用奖励
pub fn redeem_points(
    account: &mut LoyaltyAccount,
    rules: &LoyaltyRules,
    redeem: &RedeemPoints,
    now: DateTime<Utc>,
) -> Result<(Reward, Vec<LoyaltyEvent>)> {
    ensure_positive(redeem.amount)?;
    if account.points < redeem.amount {
        return Err(LoyaltyError::InsufficientPoints {
            required: redeem.amount,
            available: account.points,
        });
    }

    account.points -= redeem.amount;
    account.points_history.push(PointsHistoryEntry {
        points: -redeem.amount,
        entry_type: HistoryType::Redeemed,
        source: redeem.reward_type.clone(),
        related_booking_id: redeem.related_booking_id.clone(),
        description: redeem.description.clone(),
        date: now,
    });

    let name = if redeem.description.is_empty() {
        redeem.reward_type.clone()
    } else {
        redeem.description.clone()
    };
    let reward = Reward {
        id: Uuid::now_v7().to_string(),
        name,
        reward_type: redeem.reward_type.clone(),
        points_cost: redeem.amount,
        expiry_date: now + Duration::days(rules.reward_validity_days),
        status: RewardStatus::Available,
        used_at: None,
    };
    account.rewards.push(reward.clone());
    account.last_activity = now;

    let events = vec![
        LoyaltyEvent::PointsRedeemed {
            owner_id: account.owner_id.clone(),
            points: redeem.amount,
            balance: account.points,
            reward_type: redeem.reward_type.clone(),
        },
        LoyaltyEvent::RewardIssued {
            owner_id: account.owner_id.clone(),
            reward: reward.clone(),
        },
    ];
    Ok((reward, events))
}

/// 人工调整积分
///
/// 正数按入账处理（含等级和里程碑），负数只扣减余额且不得低于 0
pub fn adjust_points(
    account: &mut LoyaltyAccount,
    rules: &LoyaltyRules,
    delta: i64,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<Vec<LoyaltyEvent>> {
    let Some(debit) = delta.checked_neg() else {
        return Err(LoyaltyError::InvalidAmount(delta));
    };
    if delta == 0 || delta.abs() > MAX_POINTS_PER_OPERATION {
        return Err(LoyaltyError::InvalidAmount(delta));
    }

    let mut events = Vec::new();
    if delta > 0 {
        let mut draft = account.clone();
        accrue(
            &mut draft,
            rules,
            Accrual {
                amount: delta,
                entry_type: HistoryType::Adjusted,
                source: sources::ADJUSTMENT,
                related_booking_id: None,
                description: reason,
            },
            now,
            &mut events,
        )?;
        *account = draft;
        return Ok(events);
    }

    if account.points < debit {
        return Err(LoyaltyError::InsufficientPoints {
            required: debit,
            available: account.points,
        });
    }
    account.points -= debit;
    account.points_history.push(PointsHistoryEntry {
        points: delta,
        entry_type: HistoryType::Adjusted,
        source: sources::ADJUSTMENT.to_string(),
        related_booking_id: None,
        description: reason.to_string(),
        date: now,
    });
    account.last_activity = now;
    Ok(events)
}

/// 积分过期，只扣减余额
pub fn expire_points(
    account: &mut LoyaltyAccount,
    amount: i64,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    ensure_positive(amount)?;
    if account.points < amount {
        return Err(LoyaltyError::InsufficientPoints {
            required: amount,
            available: account.points,
        });
    }
    account.points -= amount;
    account.points_history.push(PointsHistoryEntry {
        points: -amount,
        entry_type: HistoryType::Expired,
        source: sources::EXPIRATION.to_string(),
        related_booking_id: None,
        description: reason.to_string(),
        date: now,
    });
    account.last_activity = now;
    Ok(())
}

/// 计算住宿消费可得积分: floor(消费额 × 每单位积分 × 等级倍率)
pub fn stay_points(rules: &LoyaltyRules, tier: Tier, amount_spent: f64) -> Result<i64> {
    if !amount_spent.is_finite() || amount_spent < 0.0 {
        return Err(LoyaltyError::Validation(format!(
            "消费金额无效: {amount_spent}"
        )));
    }
    let raw = (amount_spent * rules.points_per_currency_unit * rules.tiers.earn_multiplier(tier))
        .floor();
    if raw > MAX_POINTS_PER_OPERATION as f64 {
        return Err(LoyaltyError::Validation(format!(
            "消费金额过大: {amount_spent}"
        )));
    }
    let points = raw as i64;
    ensure_positive(points)?;
    Ok(points)
}

/// 使用奖励
pub fn use_reward(
    account: &mut LoyaltyAccount,
    reward_id: &str,
    now: DateTime<Utc>,
) -> Result<Reward> {
    let owner_id = account.owner_id.clone();
    let reward = account
        .reward_mut(reward_id)
        .ok_or_else(|| LoyaltyError::RewardNotFound {
            owner_id,
            reward_id: reward_id.to_string(),
        })?;

    if !reward.is_usable(now) {
        let status = if reward.status == RewardStatus::Available {
            RewardStatus::Expired
        } else {
            reward.status
        };
        return Err(LoyaltyError::RewardUnavailable {
            reward_id: reward_id.to_string(),
            status: status.to_string(),
        });
    }

    reward.status = RewardStatus::Redeemed;
    reward.used_at = Some(now);
    let used = reward.clone();
    account.last_activity = now;
    Ok(used)
}

/// 将已过期但仍为可用状态的奖励标记为过期，返回处理数量
pub fn expire_rewards(account: &mut LoyaltyAccount, now: DateTime<Utc>) -> usize {
    let mut expired = 0;
    for reward in &mut account.rewards {
        if reward.status == RewardStatus::Available && reward.is_past_expiry(now) {
            reward.status = RewardStatus::Expired;
            expired += 1;
        }
    }
    if expired > 0 {
        account.last_activity = now;
    }
    expired
}
