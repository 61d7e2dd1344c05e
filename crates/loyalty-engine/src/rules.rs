//! 会员积分规则配置
//!
//! 等级门槛、积分倍率、里程碑表和推荐奖励集中在一张配置表中，
//! 通过 `loyalty` 配置段加载并注入引擎

use serde::{Deserialize, Serialize};

use crate::error::{LoyaltyError, Result};
use crate::models::Tier;

/// 单个等级的规则
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierRule {
    pub tier: Tier,
    /// 达到该等级所需的累计积分
    pub threshold: i64,
    /// 住宿积分倍率
    pub earn_multiplier: f64,
    /// 房费折扣百分比
    pub discount_percent: u8,
}

/// 等级表，按门槛升序排列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TierTable {
    rules: Vec<TierRule>,
}

impl Default for TierTable {
    fn default() -> Self {
        Self {
            rules: vec![
                TierRule {
                    tier: Tier::Bronze,
                    threshold: 0,
                    earn_multiplier: 1.0,
                    discount_percent: 0,
                },
                TierRule {
                    tier: Tier::Silver,
                    threshold: 10_000,
                    earn_multiplier: 1.2,
                    discount_percent: 5,
                },
                TierRule {
                    tier: Tier::Gold,
                    threshold: 25_000,
                    earn_multiplier: 1.5,
                    discount_percent: 10,
                },
                TierRule {
                    tier: Tier::Platinum,
                    threshold: 50_000,
                    earn_multiplier: 2.0,
                    discount_percent: 15,
                },
            ],
        }
    }
}

impl TierTable {
    pub fn new(rules: Vec<TierRule>) -> Result<Self> {
        let table = Self { rules };
        table.validate()?;
        Ok(table)
    }

    /// 按升序检查门槛，最后一个满足的等级胜出
    pub fn tier_for(&self, lifetime_points: i64) -> Tier {
        let mut tier = Tier::Bronze;
        for rule in &self.rules {
            if lifetime_points >= rule.threshold {
                tier = rule.tier;
            }
        }
        tier
    }

    pub fn rule(&self, tier: Tier) -> Option<&TierRule> {
        self.rules.iter().find(|r| r.tier == tier)
    }

    pub fn earn_multiplier(&self, tier: Tier) -> f64 {
        self.rule(tier).map(|r| r.earn_multiplier).unwrap_or(1.0)
    }

    pub fn rules(&self) -> &[TierRule] {
        &self.rules
    }

    pub fn validate(&self) -> Result<()> {
        let Some(first) = self.rules.first() else {
            return Err(LoyaltyError::Validation("等级表不能为空".to_string()));
        };
        if first.threshold != 0 {
            return Err(LoyaltyError::Validation(
                "最低等级门槛必须为 0".to_string(),
            ));
        }
        for pair in self.rules.windows(2) {
            if pair[1].threshold <= pair[0].threshold || pair[1].tier <= pair[0].tier {
                return Err(LoyaltyError::Validation(format!(
                    "等级表必须按等级和门槛严格升序: {} -> {}",
                    pair[0].tier, pair[1].tier
                )));
            }
        }
        if self.rules.iter().any(|r| r.earn_multiplier <= 0.0) {
            return Err(LoyaltyError::Validation("积分倍率必须大于 0".to_string()));
        }
        Ok(())
    }
}

/// 里程碑规则
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MilestoneRules {
    pub points_thresholds: Vec<i64>,
    /// 积分里程碑奖励比例，奖励 = floor(门槛 × 比例)
    pub points_reward_rate: f64,
    pub referral_thresholds: Vec<i64>,
    pub referral_reward_per_referral: i64,
    pub tenure_years: Vec<i64>,
    pub tenure_reward_per_year: i64,
    /// 等级升级里程碑的固定奖励
    pub tier_upgrade_bonus: i64,
}

impl Default for MilestoneRules {
    fn default() -> Self {
        Self {
            points_thresholds: vec![10_000, 25_000, 50_000, 100_000],
            points_reward_rate: 0.01,
            referral_thresholds: vec![5, 10, 25, 50],
            referral_reward_per_referral: 500,
            tenure_years: vec![1, 3, 5, 10],
            tenure_reward_per_year: 1000,
            tier_upgrade_bonus: 1000,
        }
    }
}

/// 推荐规则
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferralRules {
    pub referrer_points: i64,
    pub referee_points: i64,
    pub bonus_multiplier: f64,
    pub validity_days: i64,
    pub code_length: usize,
    pub max_code_attempts: u32,
}

impl Default for ReferralRules {
    fn default() -> Self {
        Self {
            referrer_points: 1000,
            referee_points: 500,
            bonus_multiplier: 1.0,
            validity_days: 30,
            code_length: 8,
            max_code_attempts: 32,
        }
    }
}

/// 会员积分规则总表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoyaltyRules {
    pub tiers: TierTable,
    /// 每消费 1 个货币单位获得的基础积分
    pub points_per_currency_unit: f64,
    pub milestones: MilestoneRules,
    pub referral: ReferralRules,
    pub reward_validity_days: i64,
    /// 为 true 时，新达成的里程碑奖励在同一次写入中自动入账
    pub auto_award_milestones: bool,
    /// 乐观锁冲突时的最大重试次数
    pub max_write_retries: u32,
}

impl Default for LoyaltyRules {
    fn default() -> Self {
        Self {
            tiers: TierTable::default(),
            points_per_currency_unit: 10.0,
            milestones: MilestoneRules::default(),
            referral: ReferralRules::default(),
            reward_validity_days: 90,
            auto_award_milestones: false,
            max_write_retries: 5,
        }
    }
}

impl LoyaltyRules {
    pub fn validate(&self) -> Result<()> {
        self.tiers.validate()?;
        if self.points_per_currency_unit <= 0.0 {
            return Err(LoyaltyError::Validation(
                "points_per_currency_unit 必须大于 0".to_string(),
            ));
        }
        if self.referral.code_length == 0 || self.referral.max_code_attempts == 0 {
            return Err(LoyaltyError::Validation(
                "推荐码长度和生成次数必须大于 0".to_string(),
            ));
        }
        if self.referral.bonus_multiplier < 0.0 || self.referral.validity_days <= 0 {
            return Err(LoyaltyError::Validation("推荐奖励配置无效".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_for_boundaries() {
        let table = TierTable::default();
        let cases = [
            (0, Tier::Bronze),
            (9_999, Tier::Bronze),
            (10_000, Tier::Silver),
            (24_999, Tier::Silver),
            (25_000, Tier::Gold),
            (49_999, Tier::Gold),
            (50_000, Tier::Platinum),
            (100_000, Tier::Platinum),
        ];
        for (lifetime, expected) in cases {
            assert_eq!(table.tier_for(lifetime), expected, "lifetime={lifetime}");
        }
    }

    #[test]
    fn test_tier_table_rejects_unsorted() {
        let mut rules = TierTable::default().rules().to_vec();
        rules.swap(1, 2);
        tokio_test::assert_err!(TierTable::new(rules));
    }

    #[test]
    fn test_tier_table_requires_zero_floor() {
        let mut rules = TierTable::default().rules().to_vec();
        rules[0].threshold = 100;
        tokio_test::assert_err!(TierTable::new(rules));
    }

    #[test]
    fn test_default_rules_valid() {
        let rules = LoyaltyRules::default();
        tokio_test::assert_ok!(rules.validate());
        assert_eq!(rules.tiers.earn_multiplier(Tier::Gold), 1.5);
        assert_eq!(rules.tiers.rule(Tier::Platinum).unwrap().discount_percent, 15);
    }

    #[test]
    fn test_rules_deserialize_partial() {
        let json = r#"{"auto_award_milestones": true, "referral": {"referrer_points": 2000}}"#;
        let rules: LoyaltyRules = serde_json::from_str(json).unwrap();
        assert!(rules.auto_award_milestones);
        assert_eq!(rules.referral.referrer_points, 2000);
        assert_eq!(rules.referral.referee_points, 500);
        assert_eq!(rules.tiers, TierTable::default());
    }
}
