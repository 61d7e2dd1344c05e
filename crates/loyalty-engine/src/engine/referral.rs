//! 推荐状态机
//!
//! Pending -> Completed | Expired，两个终态之间不可互转。
//! 双方积分分别入账，各自由推荐记录上的标记保证只发放一次

use chrono::{DateTime, Duration, Utc};

use super::LoyaltyEvent;
use super::milestone;
use super::points::{Accrual, accrue};
use crate::error::{LoyaltyError, Result};
use crate::models::{HistoryType, LoyaltyAccount, Referral, ReferralStatus, sources};
use crate::rules::LoyaltyRules;

/// 创建推荐记录，奖励积分和倍率在此时固定
pub fn new_referral(
    code: impl Into<String>,
    referrer_id: impl Into<String>,
    rules: &LoyaltyRules,
    now: DateTime<Utc>,
) -> Referral {
    let referral_rules = &rules.referral;
    Referral {
        code: code.into(),
        referrer_id: referrer_id.into(),
        referee_id: None,
        status: ReferralStatus::Pending,
        referrer_points: referral_rules.referrer_points,
        referee_points: referral_rules.referee_points,
        bonus_multiplier: referral_rules.bonus_multiplier,
        expiry_date: now + Duration::days(referral_rules.validity_days),
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

/// 被推荐人使用推荐码
///
/// 不发放积分，积分在完成时发放。同一被推荐人重复使用视为成功
pub fn apply_referral(referral: &mut Referral, referee_id: &str, now: DateTime<Utc>) -> Result<()> {
    if !referral.is_usable(now) {
        return Err(LoyaltyError::ReferralExpired(referral.code.clone()));
    }
    if referral.referrer_id == referee_id {
        return Err(LoyaltyError::SelfReferral(referral.code.clone()));
    }
    match referral.referee_id.as_deref() {
        Some(existing) if existing == referee_id => Ok(()),
        Some(_) => Err(LoyaltyError::ReferralAlreadyClaimed(referral.code.clone())),
        None => {
            referral.referee_id = Some(referee_id.to_string());
            referral.applied_at = Some(now);
            Ok(())
        }
    }
}

/// 标记推荐完成
///
/// 重复调用仍会刷新完成时间和首单号，积分发放由各方标记控制
pub fn complete_referral(
    referral: &mut Referral,
    booking_id: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    match referral.status {
        ReferralStatus::Expired => {
            return Err(LoyaltyError::ReferralExpired(referral.code.clone()));
        }
        ReferralStatus::Pending => {
            if referral.referee_id.is_none() {
                return Err(LoyaltyError::ReferralNotApplied(referral.code.clone()));
            }
            if referral.is_past_expiry(now) {
                return Err(LoyaltyError::ReferralExpired(referral.code.clone()));
            }
        }
        ReferralStatus::Completed => {}
    }

    referral.status = ReferralStatus::Completed;
    referral.completed_date = Some(now);
    referral.first_booking = Some(booking_id.to_string());
    Ok(())
}

/// 推荐过期，仅允许从 Pending 转入
pub fn expire_referral(referral: &mut Referral) -> Result<()> {
    if referral.status != ReferralStatus::Pending {
        return Err(LoyaltyError::InvalidReferralTransition {
            code: referral.code.clone(),
            status: referral.status.to_string(),
        });
    }
    referral.status = ReferralStatus::Expired;
    Ok(())
}

/// 推荐人奖励: 入账、推荐数加一、重新检测里程碑
///
/// 账户流水中已有同一推荐码的奖励时直接跳过
pub fn award_referrer(
    account: &mut LoyaltyAccount,
    rules: &LoyaltyRules,
    referral: &Referral,
    now: DateTime<Utc>,
) -> Result<Vec<LoyaltyEvent>> {
    let description = bonus_description(&referral.code, "referrer");
    if account.has_history_entry(sources::REFERRAL, &description) {
        return Ok(Vec::new());
    }

    let mut draft = account.clone();
    let mut events = Vec::new();
    post_bonus(&mut draft, rules, referral, referral.referrer_bonus(), &description, now, &mut events)?;
    draft.referral_count += 1;
    draft.last_activity = now;
    events.extend(milestone::check_milestones(&mut draft, rules, now));
    *account = draft;
    Ok(events)
}

/// 被推荐人奖励
pub fn award_referee(
    account: &mut LoyaltyAccount,
    rules: &LoyaltyRules,
    referral: &Referral,
    now: DateTime<Utc>,
) -> Result<Vec<LoyaltyEvent>> {
    let description = bonus_description(&referral.code, "referee");
    if account.has_history_entry(sources::REFERRAL, &description) {
        return Ok(Vec::new());
    }

    let mut draft = account.clone();
    let mut events = Vec::new();
    post_bonus(&mut draft, rules, referral, referral.referee_bonus(), &description, now, &mut events)?;
    draft.last_activity = now;
    *account = draft;
    Ok(events)
}

fn post_bonus(
    account: &mut LoyaltyAccount,
    rules: &LoyaltyRules,
    referral: &Referral,
    amount: i64,
    description: &str,
    now: DateTime<Utc>,
    events: &mut Vec<LoyaltyEvent>,
) -> Result<()> {
    // 倍率为 0 或积分为 0 时不产生流水
    if amount <= 0 {
        return Ok(());
    }
    accrue(
        account,
        rules,
        Accrual {
            amount,
            entry_type: HistoryType::Earned,
            source: sources::REFERRAL,
            related_booking_id: referral.first_booking.clone(),
            description,
        },
        now,
        events,
    )
}

pub fn bonus_description(code: &str, role: &str) -> String {
    format!("Referral bonus ({role}) for code {code}")
}

/// 双方都已入账时置位总标记，返回是否发生变化
pub fn settle_bonus_flag(referral: &mut Referral) -> bool {
    if referral.bonus_points_awarded || !(referral.referrer_awarded && referral.referee_awarded) {
        return false;
    }
    referral.bonus_points_awarded = true;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 9, 0, 0).unwrap()
    }

    fn referral() -> Referral {
        new_referral("REF12345", "referrer-1", &LoyaltyRules::default(), now())
    }

    #[test]
    fn test_new_referral_defaults() {
        let referral = referral();
        assert_eq!(referral.status, ReferralStatus::Pending);
        assert_eq!(referral.referrer_points, 1000);
        assert_eq!(referral.referee_points, 500);
        assert_eq!(referral.expiry_date, now() + Duration::days(30));
        assert!(!referral.bonus_points_awarded);
    }

    #[test]
    fn test_apply_attaches_referee() {
        let mut referral = referral();
        apply_referral(&mut referral, "referee-1", now()).unwrap();
        assert_eq!(referral.referee_id.as_deref(), Some("referee-1"));
        assert_eq!(referral.applied_at, Some(now()));

        apply_referral(&mut referral, "referee-1", now()).unwrap();
        let err = apply_referral(&mut referral, "referee-2", now()).unwrap_err();
        assert!(matches!(err, LoyaltyError::ReferralAlreadyClaimed(_)));
    }

    #[test]
    fn test_apply_after_expiry_fails_regardless_of_status() {
        for status in [
            ReferralStatus::Pending,
            ReferralStatus::Completed,
            ReferralStatus::Expired,
        ] {
            let mut referral = referral();
            referral.status = status;
            let expiry_date = referral.expiry_date;
            let err = apply_referral(&mut referral, "referee-1", expiry_date).unwrap_err();
            assert!(matches!(err, LoyaltyError::ReferralExpired(_)));
        }
    }

    #[test]
    fn test_apply_non_pending_fails() {
        let mut referral = referral();
        referral.status = ReferralStatus::Completed;
        let err = apply_referral(&mut referral, "referee-1", now()).unwrap_err();
        assert!(matches!(err, LoyaltyError::ReferralExpired(_)));
    }

    #[test]
    fn test_self_referral_rejected() {
        let mut referral = referral();
        let err = apply_referral(&mut referral, "referrer-1", now()).unwrap_err();
        assert!(matches!(err, LoyaltyError::SelfReferral(_)));
        assert!(referral.referee_id.is_none());
    }

    #[test]
    fn test_complete_transitions() {
        let mut referral = referral();
        let err = complete_referral(&mut referral, "bk-1", now()).unwrap_err();
        assert!(matches!(err, LoyaltyError::ReferralNotApplied(_)));

        apply_referral(&mut referral, "referee-1", now()).unwrap();
        complete_referral(&mut referral, "bk-1", now()).unwrap();
        assert_eq!(referral.status, ReferralStatus::Completed);
        assert_eq!(referral.first_booking.as_deref(), Some("bk-1"));

        let later = now() + Duration::hours(2);
        complete_referral(&mut referral, "bk-2", later).unwrap();
        assert_eq!(referral.completed_date, Some(later));
        assert_eq!(referral.first_booking.as_deref(), Some("bk-2"));

        assert!(matches!(
            expire_referral(&mut referral),
            Err(LoyaltyError::InvalidReferralTransition { .. })
        ));
    }

    #[test]
    fn test_expire_only_from_pending() {
        let mut referral = referral();
        expire_referral(&mut referral).unwrap();
        assert_eq!(referral.status, ReferralStatus::Expired);
        assert!(expire_referral(&mut referral).is_err());
        assert!(matches!(
            complete_referral(&mut referral, "bk-1", now()),
            Err(LoyaltyError::ReferralExpired(_))
        ));
    }

    #[test]
    fn test_award_sides_are_idempotent() {
        let rules = LoyaltyRules::default();
        let mut referral = referral();
        apply_referral(&mut referral, "referee-1", now()).unwrap();
        complete_referral(&mut referral, "bk-1", now()).unwrap();

        let mut referrer = LoyaltyAccount::new("referrer-1", None, "AAAA0001", now());
        let mut referee = LoyaltyAccount::new("referee-1", None, "AAAA0002", now());

        award_referrer(&mut referrer, &rules, &referral, now()).unwrap();
        award_referrer(&mut referrer, &rules, &referral, now()).unwrap();
        award_referee(&mut referee, &rules, &referral, now()).unwrap();
        award_referee(&mut referee, &rules, &referral, now()).unwrap();

        assert_eq!(referrer.points, 1000);
        assert_eq!(referrer.referral_count, 1);
        assert_eq!(referee.points, 500);
        assert_eq!(referee.referral_count, 0);
        assert_eq!(referrer.points_history[0].related_booking_id.as_deref(), Some("bk-1"));
    }

    #[test]
    fn test_referrer_award_triggers_referral_milestone() {
        let rules = LoyaltyRules::default();
        let mut referral = referral();
        apply_referral(&mut referral, "referee-1", now()).unwrap();
        complete_referral(&mut referral, "bk-1", now()).unwrap();

        let mut referrer = LoyaltyAccount::new("referrer-1", None, "AAAA0001", now());
        referrer.referral_count = 4;
        award_referrer(&mut referrer, &rules, &referral, now()).unwrap();

        assert_eq!(referrer.referral_count, 5);
        assert!(referrer.has_milestone("Referred 5 members"));
    }

    #[test]
    fn test_settle_bonus_flag() {
        let mut referral = referral();
        referral.referrer_awarded = true;
        assert!(!settle_bonus_flag(&mut referral));
        referral.referee_awarded = true;
        assert!(settle_bonus_flag(&mut referral));
        assert!(referral.bonus_points_awarded);
        assert!(!settle_bonus_flag(&mut referral));
    }
}
