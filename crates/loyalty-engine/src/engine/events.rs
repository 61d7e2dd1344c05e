use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Milestone, Reward, Tier};

/// 状态转换产生的领域事件
///
/// 事件在账户保存成功后才被派发，用于发送通知和记录指标
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LoyaltyEvent {
    Enrolled {
        owner_id: String,
        referral_code: String,
    },
    PointsEarned {
        owner_id: String,
        points: i64,
        balance: i64,
        source: String,
    },
    PointsRedeemed {
        owner_id: String,
        points: i64,
        balance: i64,
        reward_type: String,
    },
    TierUpgraded {
        owner_id: String,
        from: Tier,
        to: Tier,
    },
    MilestoneReached {
        owner_id: String,
        milestone: Milestone,
    },
    MilestoneAwarded {
        owner_id: String,
        description: String,
        reward_points: i64,
    },
    RewardIssued {
        owner_id: String,
        reward: Reward,
    },
    ReferralCompleted {
        owner_id: String,
        code: String,
        referee_id: String,
        bonus_points: i64,
        completed_at: DateTime<Utc>,
    },
}

impl LoyaltyEvent {
    /// 事件所属账户（通知收件人）
    pub fn owner_id(&self) -> &str {
        match self {
            Self::Enrolled { owner_id, .. }
            | Self::PointsEarned { owner_id, .. }
            | Self::PointsRedeemed { owner_id, .. }
            | Self::TierUpgraded { owner_id, .. }
            | Self::MilestoneReached { owner_id, .. }
            | Self::MilestoneAwarded { owner_id, .. }
            | Self::RewardIssued { owner_id, .. }
            | Self::ReferralCompleted { owner_id, .. } => owner_id,
        }
    }
}
