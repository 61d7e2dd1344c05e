//! 会员积分枚举类型定义
//!
//! 所有枚举都支持 JSON（serde）序列化，持久化时随文档一同存储

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LoyaltyError;

/// 会员等级
///
/// 声明顺序即等级高低，派生的 `Ord` 依赖此顺序
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    #[default]
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Bronze, Tier::Silver, Tier::Gold, Tier::Platinum];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bronze => "BRONZE",
            Self::Silver => "SILVER",
            Self::Gold => "GOLD",
            Self::Platinum => "PLATINUM",
        }
    }

    /// 展示名称，用于里程碑描述和邮件
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Bronze => "Bronze",
            Self::Silver => "Silver",
            Self::Gold => "Gold",
            Self::Platinum => "Platinum",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = LoyaltyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tier::ALL
            .into_iter()
            .find(|tier| tier.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| LoyaltyError::Validation(format!("未知的会员等级: {s}")))
    }
}

/// 积分流水类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryType {
    /// 获得积分
    Earned,
    /// 兑换消耗
    Redeemed,
    /// 积分过期
    Expired,
    /// 人工调整
    Adjusted,
}

/// 奖励状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RewardStatus {
    /// 可使用
    #[default]
    Available,
    /// 已使用
    Redeemed,
    /// 已过期
    Expired,
}

impl fmt::Display for RewardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Available => "AVAILABLE",
            Self::Redeemed => "REDEEMED",
            Self::Expired => "EXPIRED",
        };
        f.write_str(s)
    }
}

/// 里程碑类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MilestoneType {
    /// 累计积分达标
    PointsEarned,
    /// 推荐人数达标
    Referrals,
    /// 会员年限达标
    Tenure,
    /// 等级升级
    TierUpgrade,
}

impl MilestoneType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PointsEarned => "points_earned",
            Self::Referrals => "referrals",
            Self::Tenure => "tenure",
            Self::TierUpgrade => "tier_upgrade",
        }
    }
}

/// 里程碑状态
///
/// 新达成的里程碑为待发放，奖励积分入账后变为已发放
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MilestoneStatus {
    #[default]
    Pending,
    Awarded,
}

/// 推荐状态
///
/// 状态机: Pending -> Completed | Expired，终态不可再变
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferralStatus {
    #[default]
    Pending,
    Completed,
    Expired,
}

impl ReferralStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for ReferralStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_ordering() {
        assert!(Tier::Bronze < Tier::Silver);
        assert!(Tier::Silver < Tier::Gold);
        assert!(Tier::Gold < Tier::Platinum);
        assert_eq!(Tier::default(), Tier::Bronze);
    }

    #[test]
    fn test_tier_from_str() {
        assert_eq!("gold".parse::<Tier>().unwrap(), Tier::Gold);
        assert_eq!("PLATINUM".parse::<Tier>().unwrap(), Tier::Platinum);
        assert!("diamond".parse::<Tier>().is_err());
    }

    #[test]
    fn test_enum_serialization() {
        assert_eq!(serde_json::to_string(&Tier::Silver).unwrap(), "\"SILVER\"");
        assert_eq!(
            serde_json::to_string(&MilestoneType::TierUpgrade).unwrap(),
            "\"TIER_UPGRADE\""
        );
        let status: ReferralStatus = serde_json::from_str("\"COMPLETED\"").unwrap();
        assert_eq!(status, ReferralStatus::Completed);
    }
}
