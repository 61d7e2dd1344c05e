//! 推荐流程

use tracing::{debug, info, instrument, warn};

use super::LoyaltyService;
use crate::engine::{LoyaltyEvent, referral};
use crate::error::{LoyaltyError, Result};
use crate::models::{Referral, ReferralStatus};

impl LoyaltyService {
    /// 推荐人申请推荐码
    #[instrument(skip(self))]
    pub async fn create_referral(&self, referrer_id: &str) -> Result<Referral> {
        self.load_account(referrer_id).await?;

        let rules = &self.rules.referral;
        for attempt in 1..=rules.max_code_attempts {
            let code = self.codes.generate(rules.code_length);
            if self.code_taken(&code).await? {
                debug!(attempt, "推荐码冲突，重新生成");
                continue;
            }
            let referral = referral::new_referral(code, referrer_id, &self.rules, self.clock.now());
            match self.referrals.insert(&referral).await {
                Ok(()) => {
                    info!(code = %referral.code, expiry_date = %referral.expiry_date, "推荐码已创建");
                    return Ok(referral);
                }
                // 并发插入了同一个码
                Err(LoyaltyError::ConcurrencyConflict) => {
                    debug!(attempt, "推荐码写入冲突，重新生成");
                }
                Err(e) => return Err(e),
            }
        }
        Err(LoyaltyError::CodeGenerationExhausted(rules.max_code_attempts))
    }

    #[instrument(skip(self))]
    pub async fn get_referral(&self, code: &str) -> Result<Referral> {
        let code = self.normalize_code(code)?;
        self.load_referral(&code).await
    }

    #[instrument(skip(self))]
    pub async fn list_referrals(&self, referrer_id: &str) -> Result<Vec<Referral>> {
        self.referrals.list_by_referrer(referrer_id).await
    }

    /// 被推荐人使用推荐码
    ///
    /// 校验顺序: 推荐码存在 -> 未失效 -> 非本人 -> 未被他人占用 -> 被推荐人账户存在且尚无推荐人。
    /// 每个被推荐人只能绑定一个推荐码，同一推荐人的其他推荐码同样拒绝。此步不发放积分
    #[instrument(skip(self))]
    pub async fn apply_referral(&self, code: &str, referee_id: &str) -> Result<Referral> {
        let code = self.normalize_code(code)?;
        let mut candidate = self.load_referral(&code).await?;
        let already_attached = candidate.referee_id.as_deref() == Some(referee_id);
        referral::apply_referral(&mut candidate, referee_id, self.clock.now())?;

        let referee = self.load_account(referee_id).await?;
        if referee.referred_by.is_some() && !already_attached {
            return Err(LoyaltyError::AlreadyReferred(referee_id.to_string()));
        }

        let (saved, ()) = self
            .mutate_referral(&code, "apply_referral", |referral, now| {
                referral::apply_referral(referral, referee_id, now)
            })
            .await?;

        let referrer_id = saved.referrer_id.clone();
        let bound = self
            .mutate_account(referee_id, "apply_referral", |account, now| {
                match account.referred_by.as_deref() {
                    Some(existing) if existing != referrer_id || !already_attached => {
                        Err(LoyaltyError::AlreadyReferred(account.owner_id.clone()))
                    }
                    _ => {
                        account.referred_by = Some(referrer_id.clone());
                        account.last_activity = now;
                        Ok(())
                    }
                }
            })
            .await;

        if let Err(e) = bound {
            // 并发绑定失败时解除本推荐码上的被推荐人，避免其后续被结算
            if matches!(e, LoyaltyError::AlreadyReferred(_)) && !already_attached {
                self.detach_referee(&code, referee_id).await?;
            }
            return Err(e);
        }

        info!(referrer_id = %saved.referrer_id, "推荐码使用成功");
        Ok(saved)
    }

    async fn detach_referee(&self, code: &str, referee_id: &str) -> Result<()> {
        self.mutate_referral(code, "detach_referee", |referral, _| {
            if referral.status == ReferralStatus::Pending
                && referral.referee_id.as_deref() == Some(referee_id)
            {
                referral.referee_id = None;
                referral.applied_at = None;
            }
            Ok(())
        })
        .await?;
        warn!(code = %code, referee_id = %referee_id, "被推荐人已绑定其他推荐码，已解除本次绑定");
        Ok(())
    }

    /// 被推荐人首单完成后结算推荐奖励
    ///
    /// 推荐人、被推荐人两侧分别入账并各自记录标记，任一侧失败后重试只会补发未入账的一侧。
    /// 双方都入账后才置位 `bonus_points_awarded`
    #[instrument(skip(self))]
    pub async fn complete_referral(&self, code: &str, booking_id: &str) -> Result<Referral> {
        let code = self.normalize_code(code)?;
        let (mut current, ()) = self
            .mutate_referral(&code, "complete_referral", |referral, now| {
                referral::complete_referral(referral, booking_id, now)
            })
            .await?;

        if current.bonus_points_awarded {
            debug!("推荐奖励已发放，跳过入账");
            return Ok(current);
        }

        let referee_id = current
            .referee_id
            .clone()
            .ok_or_else(|| LoyaltyError::ReferralNotApplied(code.clone()))?;

        if !current.referrer_awarded {
            let snapshot = current.clone();
            let rules = self.rules.clone();
            let (account, mut events) = self
                .mutate_account(&snapshot.referrer_id, "referral_referrer_bonus", |account, now| {
                    referral::award_referrer(account, &rules, &snapshot, now)
                })
                .await?;
            if !events.is_empty() {
                events.push(LoyaltyEvent::ReferralCompleted {
                    owner_id: account.owner_id.clone(),
                    code: code.clone(),
                    referee_id: referee_id.clone(),
                    bonus_points: snapshot.referrer_bonus(),
                    completed_at: snapshot.completed_date.unwrap_or_else(|| self.clock.now()),
                });
            }
            self.publish(&account, &events).await;

            current = self
                .mutate_referral(&code, "complete_referral", |referral, _| {
                    referral.referrer_awarded = true;
                    Ok(())
                })
                .await?
                .0;
        }

        if !current.referee_awarded {
            let snapshot = current.clone();
            let rules = self.rules.clone();
            let outcome = self
                .mutate_account(&referee_id, "referral_referee_bonus", |account, now| {
                    referral::award_referee(account, &rules, &snapshot, now)
                })
                .await;
            let (account, events) = match outcome {
                Ok(result) => result,
                Err(e) => {
                    warn!(referee_id = %referee_id, error = %e, "被推荐人奖励入账失败，推荐人奖励已保留");
                    return Err(e);
                }
            };
            self.publish(&account, &events).await;
        }

        let (settled, ()) = self
            .mutate_referral(&code, "complete_referral", |referral, _| {
                referral.referee_awarded = true;
                referral::settle_bonus_flag(referral);
                Ok(())
            })
            .await?;

        info!(
            referrer_id = %settled.referrer_id,
            referee_id = %referee_id,
            referrer_bonus = settled.referrer_bonus(),
            referee_bonus = settled.referee_bonus(),
            "推荐奖励发放完成"
        );
        Ok(settled)
    }

    /// 手动使推荐过期，仅限 Pending 状态
    #[instrument(skip(self))]
    pub async fn expire_referral(&self, code: &str) -> Result<Referral> {
        let code = self.normalize_code(code)?;
        let (referral, ()) = self
            .mutate_referral(&code, "expire_referral", |referral, _| {
                referral::expire_referral(referral)
            })
            .await?;
        info!("推荐码已过期");
        Ok(referral)
    }
}
