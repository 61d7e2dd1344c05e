//! 里程碑检测
//!
//! 三类里程碑相互独立：累计积分、推荐人数、会员年限。
//! 同一描述在一个账户内只记录一次，重复扫描不会产生新条目

use chrono::{DateTime, Utc};

use super::LoyaltyEvent;
use crate::models::{LoyaltyAccount, Milestone, MilestoneType};
use crate::rules::LoyaltyRules;

/// 扫描并记录所有新达成的里程碑，返回新增事件
pub fn check_milestones(
    account: &mut LoyaltyAccount,
    rules: &LoyaltyRules,
    now: DateTime<Utc>,
) -> Vec<LoyaltyEvent> {
    let table = &rules.milestones;
    let mut reached = Vec::new();

    for &threshold in &table.points_thresholds {
        if account.lifetime_points >= threshold {
            let reward = (threshold as f64 * table.points_reward_rate).floor() as i64;
            reached.push((MilestoneType::PointsEarned, points_description(threshold), reward));
        }
    }

    for &threshold in &table.referral_thresholds {
        if account.referral_count >= threshold {
            reached.push((
                MilestoneType::Referrals,
                referral_description(threshold),
                threshold * table.referral_reward_per_referral,
            ));
        }
    }

    let years = account.tenure_years(now);
    for &threshold in &table.tenure_years {
        if years >= threshold {
            reached.push((
                MilestoneType::Tenure,
                tenure_description(threshold),
                threshold * table.tenure_reward_per_year,
            ));
        }
    }

    let mut events = Vec::new();
    for (milestone_type, description, reward_points) in reached {
        if account.has_milestone(&description) {
            continue;
        }
        let milestone = Milestone::pending(milestone_type, description, reward_points, now);
        account.milestones.push(milestone.clone());
        events.push(LoyaltyEvent::MilestoneReached {
            owner_id: account.owner_id.clone(),
            milestone,
        });
    }
    events
}

pub fn points_description(threshold: i64) -> String {
    format!("Earned {threshold} lifetime points")
}

pub fn referral_description(threshold: i64) -> String {
    format!("Referred {threshold} members")
}

pub fn tenure_description(years: i64) -> String {
    if years == 1 {
        "1 year of membership".to_string()
    } else {
        format!("{years} years of membership")
    }
}
