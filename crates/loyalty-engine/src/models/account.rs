//! 会员账户相关实体定义
//!
//! 包含会员账户、积分流水、奖励和里程碑

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{HistoryType, MilestoneStatus, MilestoneType, RewardStatus, Tier};

/// 积分流水条目
///
/// 只追加，不修改、不删除
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsHistoryEntry {
    /// 积分变动量，兑换/过期为负数
    pub points: i64,
    #[serde(rename = "type")]
    pub entry_type: HistoryType,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_booking_id: Option<String>,
    pub description: String,
    pub date: DateTime<Utc>,
}

/// 可兑换奖励
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub reward_type: String,
    pub points_cost: i64,
    pub expiry_date: DateTime<Utc>,
    pub status: RewardStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_at: Option<DateTime<Utc>>,
}

impl Reward {
    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry_date
    }

    /// 可用 = 状态为可用且未过期
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.status == RewardStatus::Available && !self.is_past_expiry(now)
    }
}

/// 里程碑
///
/// 同一账户内按描述去重
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    #[serde(rename = "type")]
    pub milestone_type: MilestoneType,
    pub description: String,
    pub reward_points: i64,
    pub status: MilestoneStatus,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub awarded_at: Option<DateTime<Utc>>,
}

impl Milestone {
    pub fn pending(
        milestone_type: MilestoneType,
        description: impl Into<String>,
        reward_points: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            milestone_type,
            description: description.into(),
            reward_points,
            status: MilestoneStatus::Pending,
            date: now,
            awarded_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == MilestoneStatus::Pending
    }
}

/// 会员账户
///
/// 每个 owner 仅有一个账户。`version` 用于乐观并发控制，
/// 每次成功保存后由存储层递增
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyAccount {
    pub owner_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub tier: Tier,
    /// 当前可用积分，不小于 0
    pub points: i64,
    /// 累计获得积分，只增不减
    pub lifetime_points: i64,
    #[serde(default)]
    pub points_history: Vec<PointsHistoryEntry>,
    #[serde(default)]
    pub rewards: Vec<Reward>,
    pub referral_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referred_by: Option<String>,
    pub referral_count: i64,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    pub member_since: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    #[serde(default)]
    pub version: i64,
}

impl LoyaltyAccount {
    /// 创建新入会账户
    pub fn new(
        owner_id: impl Into<String>,
        email: Option<String>,
        referral_code: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            email,
            tier: Tier::Bronze,
            points: 0,
            lifetime_points: 0,
            points_history: Vec::new(),
            rewards: Vec::new(),
            referral_code: referral_code.into(),
            referred_by: None,
            referral_count: 0,
            milestones: Vec::new(),
            member_since: now,
            last_activity: now,
            version: 0,
        }
    }

    pub fn has_milestone(&self, description: &str) -> bool {
        self.milestones.iter().any(|m| m.description == description)
    }

    pub fn pending_milestones(&self) -> impl Iterator<Item = (usize, &Milestone)> {
        self.milestones
            .iter()
            .enumerate()
            .filter(|(_, m)| m.is_pending())
    }

    /// 入会整年数，按 365 天一年向下取整
    pub fn tenure_years(&self, now: DateTime<Utc>) -> i64 {
        let days = (now - self.member_since).num_days();
        if days <= 0 { 0 } else { days / 365 }
    }

    pub fn has_history_entry(&self, source: &str, description: &str) -> bool {
        self.points_history
            .iter()
            .any(|e| e.source == source && e.description == description)
    }

    pub fn reward_mut(&mut self, reward_id: &str) -> Option<&mut Reward> {
        self.rewards.iter_mut().find(|r| r.id == reward_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(days: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(days)
    }

    #[test]
    fn test_new_account_defaults() {
        let account = LoyaltyAccount::new("guest-1", None, "AB12CD34", at(0));
        assert_eq!(account.tier, Tier::Bronze);
        assert_eq!(account.points, 0);
        assert_eq!(account.lifetime_points, 0);
        assert_eq!(account.member_since, account.last_activity);
        assert!(account.points_history.is_empty());
    }

    #[test]
    fn test_tenure_years_floors_by_365_days() {
        let account = LoyaltyAccount::new("guest-1", None, "AB12CD34", at(0));
        assert_eq!(account.tenure_years(at(0)), 0);
        assert_eq!(account.tenure_years(at(364)), 0);
        assert_eq!(account.tenure_years(at(365)), 1);
        assert_eq!(account.tenure_years(at(365 * 3 + 10)), 3);
        assert_eq!(account.tenure_years(at(-5)), 0);
    }

    #[test]
    fn test_reward_usable() {
        let reward = Reward {
            id: "r1".to_string(),
            name: "free_night".to_string(),
            reward_type: "free_night".to_string(),
            points_cost: 5000,
            expiry_date: at(90),
            status: RewardStatus::Available,
            used_at: None,
        };
        assert!(reward.is_usable(at(10)));
        assert!(!reward.is_usable(at(90)));
    }

    #[test]
    fn test_account_json_shape() {
        let account = LoyaltyAccount::new("guest-1", Some("a@b.com".into()), "AB12CD34", at(0));
        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(json["ownerId"], "guest-1");
        assert_eq!(json["lifetimePoints"], 0);
        assert_eq!(json["tier"], "BRONZE");
        assert!(json.get("referredBy").is_none());
    }
}
