//! 积分、里程碑与奖励操作

use tracing::{info, instrument};

use super::{LoyaltyService, Redemption, StayAccrual};
use crate::engine::{self, EarnPoints, RedeemPoints, points::award_pending};
use crate::error::Result;
use crate::models::{LoyaltyAccount, Milestone, Reward, sources};

impl LoyaltyService {
    /// 积分入账
    #[instrument(skip(self, earn), fields(amount = earn.amount, source = %earn.source))]
    pub async fn add_points(&self, owner_id: &str, earn: EarnPoints) -> Result<LoyaltyAccount> {
        let rules = self.rules.clone();
        let (account, events) = self
            .mutate_account(owner_id, "add_points", |account, now| {
                engine::add_points(account, &rules, &earn, now)
            })
            .await?;

        info!(
            balance = account.points,
            lifetime_points = account.lifetime_points,
            tier = %account.tier,
            "积分入账成功"
        );
        self.publish(&account, &events).await;
        Ok(account)
    }

    /// 按住宿消费入账，倍率取入账时的会员等级
    #[instrument(skip(self, stay), fields(booking_id = %stay.booking_id))]
    pub async fn earn_for_stay(&self, owner_id: &str, stay: StayAccrual) -> Result<LoyaltyAccount> {
        let rules = self.rules.clone();
        let description = format!("Stay {}", stay.booking_id);
        let (account, events) = self
            .mutate_account(owner_id, "earn_for_stay", |account, now| {
                let amount = engine::stay_points(&rules, account.tier, stay.amount_spent)?;
                let earn = EarnPoints {
                    amount,
                    source: sources::STAY.to_string(),
                    related_booking_id: Some(stay.booking_id.clone()),
                    description: description.clone(),
                };
                engine::add_points(account, &rules, &earn, now)
            })
            .await?;

        info!(balance = account.points, tier = %account.tier, "住宿积分入账成功");
        self.publish(&account, &events).await;
        Ok(account)
    }

    /// 积分兑换
    #[instrument(skip(self, redeem), fields(amount = redeem.amount, reward_type = %redeem.reward_type))]
    pub async fn redeem_points(&self, owner_id: &str, redeem: RedeemPoints) -> Result<Redemption> {
        let rules = self.rules.clone();
        let (account, (reward, events)) = self
            .mutate_account(owner_id, "redeem_points", |account, now| {
                engine::redeem_points(account, &rules, &redeem, now)
            })
            .await?;

        info!(balance = account.points, reward_id = %reward.id, "积分兑换成功");
        self.publish(&account, &events).await;
        Ok(Redemption { account, reward })
    }

    /// 人工调整积分
    #[instrument(skip(self))]
    pub async fn adjust_points(
        &self,
        owner_id: &str,
        delta: i64,
        reason: &str,
    ) -> Result<LoyaltyAccount> {
        let rules = self.rules.clone();
        let (account, events) = self
            .mutate_account(owner_id, "adjust_points", |account, now| {
                engine::adjust_points(account, &rules, delta, reason, now)
            })
            .await?;

        info!(balance = account.points, "积分调整成功");
        self.publish(&account, &events).await;
        Ok(account)
    }

    /// 积分过期扣减
    #[instrument(skip(self))]
    pub async fn expire_points(
        &self,
        owner_id: &str,
        amount: i64,
        reason: &str,
    ) -> Result<LoyaltyAccount> {
        let (account, ()) = self
            .mutate_account(owner_id, "expire_points", |account, now| {
                engine::expire_points(account, amount, reason, now)
            })
            .await?;

        info!(balance = account.points, "积分过期扣减成功");
        Ok(account)
    }

    /// 重新检测里程碑，返回本次新增的里程碑
    ///
    /// 会员年限类里程碑不依赖入账，需要定期或按需触发
    #[instrument(skip(self))]
    pub async fn check_milestones(&self, owner_id: &str) -> Result<Vec<Milestone>> {
        let before = self.load_account(owner_id).await?;
        let mut preview = before.clone();
        if engine::check_milestones(&mut preview, &self.rules, self.clock.now()).is_empty() {
            return Ok(Vec::new());
        }

        let rules = self.rules.clone();
        let (account, events) = self
            .mutate_account(owner_id, "check_milestones", |account, now| {
                let mut events = engine::check_milestones(account, &rules, now);
                if rules.auto_award_milestones {
                    award_pending(account, &rules, now, &mut events)?;
                }
                Ok(events)
            })
            .await?;

        let recorded: Vec<Milestone> = events
            .iter()
            .filter_map(|event| match event {
                engine::LoyaltyEvent::MilestoneReached { milestone, .. } => Some(milestone.clone()),
                _ => None,
            })
            .collect();
        info!(count = recorded.len(), "检测到新里程碑");
        self.publish(&account, &events).await;
        Ok(recorded)
    }

    /// 发放待发放里程碑的奖励积分
    #[instrument(skip(self))]
    pub async fn award_milestone(&self, owner_id: &str, index: usize) -> Result<LoyaltyAccount> {
        let rules = self.rules.clone();
        let (account, events) = self
            .mutate_account(owner_id, "award_milestone", |account, now| {
                engine::award_milestone(account, &rules, index, now)
            })
            .await?;

        info!(balance = account.points, "里程碑奖励已发放");
        self.publish(&account, &events).await;
        Ok(account)
    }

    /// 使用奖励
    #[instrument(skip(self))]
    pub async fn use_reward(&self, owner_id: &str, reward_id: &str) -> Result<Reward> {
        let (_, reward) = self
            .mutate_account(owner_id, "use_reward", |account, now| {
                engine::use_reward(account, reward_id, now)
            })
            .await?;

        info!("奖励已使用");
        Ok(reward)
    }
}
