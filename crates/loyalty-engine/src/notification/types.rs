//! 通知类型定义

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::engine::LoyaltyEvent;

/// 邮件模板名称
pub mod templates {
    pub const WELCOME: &str = "loyalty_welcome";
    pub const POINTS_REDEEMED: &str = "loyalty_points_redeemed";
    pub const TIER_UPGRADED: &str = "loyalty_tier_upgraded";
    pub const MILESTONE_REACHED: &str = "loyalty_milestone_reached";
    pub const REFERRAL_COMPLETED: &str = "loyalty_referral_completed";
}

/// 邮件消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub template: String,
    pub context: HashMap<String, Value>,
}

impl EmailMessage {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, template: &str) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            template: template.to_string(),
            context: HashMap::new(),
        }
    }

    pub fn with_context(mut self, key: &str, value: Value) -> Self {
        self.context.insert(key.to_string(), value);
        self
    }
}

/// 根据领域事件构建邮件
pub struct NotificationBuilder;

impl NotificationBuilder {
    /// 不需要邮件的事件返回 None
    pub fn from_event(event: &LoyaltyEvent, to: &str) -> Option<EmailMessage> {
        match event {
            LoyaltyEvent::Enrolled {
                owner_id,
                referral_code,
            } => Some(Self::welcome(to, owner_id, referral_code)),
            LoyaltyEvent::PointsRedeemed {
                points,
                balance,
                reward_type,
                ..
            } => Some(Self::points_redeemed(to, *points, *balance, reward_type)),
            LoyaltyEvent::TierUpgraded { from, to: tier, .. } => Some(
                EmailMessage::new(
                    to,
                    format!("Congratulations! You are now a {} member", tier.display_name()),
                    templates::TIER_UPGRADED,
                )
                .with_context("previousTier", json!(from))
                .with_context("tier", json!(tier)),
            ),
            LoyaltyEvent::MilestoneReached { milestone, .. } => Some(
                EmailMessage::new(
                    to,
                    format!("Milestone reached: {}", milestone.description),
                    templates::MILESTONE_REACHED,
                )
                .with_context("milestone", json!(milestone.description))
                .with_context("rewardPoints", json!(milestone.reward_points)),
            ),
            LoyaltyEvent::ReferralCompleted {
                code,
                referee_id,
                bonus_points,
                ..
            } => Some(
                EmailMessage::new(
                    to,
                    "Your referral bonus has arrived",
                    templates::REFERRAL_COMPLETED,
                )
                .with_context("code", json!(code))
                .with_context("refereeId", json!(referee_id))
                .with_context("bonusPoints", json!(bonus_points)),
            ),
            LoyaltyEvent::PointsEarned { .. }
            | LoyaltyEvent::MilestoneAwarded { .. }
            | LoyaltyEvent::RewardIssued { .. } => None,
        }
    }

    pub fn welcome(to: &str, owner_id: &str, referral_code: &str) -> EmailMessage {
        EmailMessage::new(to, "Welcome to our loyalty program", templates::WELCOME)
            .with_context("ownerId", json!(owner_id))
            .with_context("referralCode", json!(referral_code))
    }

    pub fn points_redeemed(to: &str, points: i64, balance: i64, reward_type: &str) -> EmailMessage {
        EmailMessage::new(to, "Points redemption confirmed", templates::POINTS_REDEEMED)
            .with_context("points", json!(points))
            .with_context("balance", json!(balance))
            .with_context("rewardType", json!(reward_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Tier;

    #[test]
    fn test_tier_upgrade_email() {
        let event = LoyaltyEvent::TierUpgraded {
            owner_id: "guest-1".to_string(),
            from: Tier::Bronze,
            to: Tier::Silver,
        };
        let message = NotificationBuilder::from_event(&event, "guest@example.com").unwrap();
        assert_eq!(message.to, "guest@example.com");
        assert_eq!(message.template, templates::TIER_UPGRADED);
        assert!(message.subject.contains("Silver"));
        assert_eq!(message.context["tier"], json!("SILVER"));
    }

    #[test]
    fn test_points_earned_has_no_email() {
        let event = LoyaltyEvent::PointsEarned {
            owner_id: "guest-1".to_string(),
            points: 100,
            balance: 100,
            source: "stay".to_string(),
        };
        assert!(NotificationBuilder::from_event(&event, "guest@example.com").is_none());
    }
}
