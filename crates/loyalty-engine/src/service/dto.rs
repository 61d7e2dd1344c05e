//! 服务层输入输出结构

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{LoyaltyAccount, Reward, Tier};

/// 入会参数
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollAccount {
    pub owner_id: String,
    #[serde(default)]
    pub email: Option<String>,
    /// 入会时同时使用的推荐码
    #[serde(default)]
    pub referral_code: Option<String>,
}

/// 住宿积分参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StayAccrual {
    pub amount_spent: f64,
    pub booking_id: String,
}

/// 兑换结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Redemption {
    pub account: LoyaltyAccount,
    pub reward: Reward,
}

/// 单账户积分汇总，由积分流水折叠得到
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsSummary {
    pub owner_id: String,
    pub tier: Tier,
    pub balance: i64,
    pub lifetime_points: i64,
    pub total_earned: i64,
    pub total_redeemed: i64,
    pub total_expired: i64,
    pub total_adjusted: i64,
    pub earned_by_source: BTreeMap<String, i64>,
    pub transaction_count: usize,
    pub pending_milestones: usize,
    pub available_rewards: usize,
}

/// 全体会员统计
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramStats {
    pub member_count: usize,
    pub tier_distribution: BTreeMap<Tier, usize>,
    pub outstanding_points: i64,
    pub lifetime_points: i64,
    pub pending_milestones: usize,
    pub completed_referrals: i64,
    pub referred_members: usize,
}

/// 到期清理结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub referrals_expired: usize,
    pub rewards_expired: usize,
}
