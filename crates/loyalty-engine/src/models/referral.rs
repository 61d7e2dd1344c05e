//! 推荐记录实体定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::ReferralStatus;

/// 推荐记录
///
/// 奖励积分在创建时固定。`referrer_awarded` / `referee_awarded` 分别记录
/// 双方积分是否已入账，`bonus_points_awarded` 仅在双方都入账后置为 true
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Referral {
    pub code: String,
    pub referrer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referee_id: Option<String>,
    pub status: ReferralStatus,
    pub referrer_points: i64,
    pub referee_points: i64,
    pub bonus_multiplier: f64,
    pub expiry_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_booking: Option<String>,
    #[serde(default)]
    pub referrer_awarded: bool,
    #[serde(default)]
    pub referee_awarded: bool,
    #[serde(default)]
    pub bonus_points_awarded: bool,
    #[serde(default)]
    pub version: i64,
}

impl Referral {
    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry_date
    }

    /// 仅在待使用且未到期时可用
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.status == ReferralStatus::Pending && !self.is_past_expiry(now)
    }

    pub fn referrer_bonus(&self) -> i64 {
        apply_multiplier(self.referrer_points, self.bonus_multiplier)
    }

    pub fn referee_bonus(&self) -> i64 {
        apply_multiplier(self.referee_points, self.bonus_multiplier)
    }
}

fn apply_multiplier(points: i64, multiplier: f64) -> i64 {
    (points as f64 * multiplier).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn sample(now: DateTime<Utc>) -> Referral {
        Referral {
            code: "ABCD1234".to_string(),
            referrer_id: "guest-1".to_string(),
            referee_id: None,
            status: ReferralStatus::Pending,
            referrer_points: 1000,
            referee_points: 500,
            bonus_multiplier: 1.0,
            expiry_date: now + Duration::days(30),
            created_at: now,
            applied_at: None,
            completed_date: None,
            first_booking: None,
            referrer_awarded: false,
            referee_awarded: false,
            bonus_points_awarded: false,
            version: 0,
        }
    }

    #[test]
    fn test_usable_window() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let referral = sample(now);
        assert!(referral.is_usable(now));
        assert!(referral.is_usable(now + Duration::days(29)));
        assert!(!referral.is_usable(now + Duration::days(30)));

        let mut completed = sample(now);
        completed.status = ReferralStatus::Completed;
        assert!(!completed.is_usable(now));
    }

    #[test]
    fn test_bonus_multiplier_floors() {
        let now = Utc::now();
        let mut referral = sample(now);
        assert_eq!(referral.referrer_bonus(), 1000);
        assert_eq!(referral.referee_bonus(), 500);

        referral.bonus_multiplier = 1.5;
        assert_eq!(referral.referrer_bonus(), 1500);
        assert_eq!(referral.referee_bonus(), 750);

        referral.referee_points = 333;
        assert_eq!(referral.referee_bonus(), 499);
    }
}
