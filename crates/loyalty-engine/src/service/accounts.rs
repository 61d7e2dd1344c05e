//! 入会与账户管理

use tracing::{debug, info, instrument};

use super::{EnrollAccount, LoyaltyService};
use crate::code_generator::is_well_formed;
use crate::engine::{LoyaltyEvent, referral};
use crate::error::{LoyaltyError, Result};
use crate::models::LoyaltyAccount;

impl LoyaltyService {
    /// 入会
    ///
    /// 带推荐码时先校验推荐码可用，再创建账户并绑定推荐关系
    #[instrument(skip(self, request), fields(owner_id = %request.owner_id))]
    pub async fn enroll(&self, request: EnrollAccount) -> Result<LoyaltyAccount> {
        let owner_id = request.owner_id.trim();
        if owner_id.is_empty() {
            return Err(LoyaltyError::Validation("owner_id 不能为空".to_string()));
        }

        let referral_code = match request.referral_code.as_deref() {
            Some(code) => {
                let code = self.normalize_code(code)?;
                let mut candidate = self.load_referral(&code).await?;
                referral::apply_referral(&mut candidate, owner_id, self.clock.now())?;
                Some(code)
            }
            None => None,
        };

        let account = self.insert_with_member_code(owner_id, request.email).await?;

        info!(referral_code = %account.referral_code, "会员入会成功");
        let events = [LoyaltyEvent::Enrolled {
            owner_id: account.owner_id.clone(),
            referral_code: account.referral_code.clone(),
        }];
        self.publish(&account, &events).await;

        match referral_code {
            Some(code) => {
                self.apply_referral(&code, owner_id).await?;
                self.load_account(owner_id).await
            }
            None => Ok(account),
        }
    }

    #[instrument(skip(self))]
    pub async fn get_account(&self, owner_id: &str) -> Result<LoyaltyAccount> {
        self.load_account(owner_id).await
    }

    /// 管理员删除账户，同时删除该会员创建的推荐记录
    ///
    /// 返回被删除的推荐记录数量
    #[instrument(skip(self))]
    pub async fn delete_account(&self, owner_id: &str) -> Result<u64> {
        if !self.accounts.delete(owner_id).await? {
            return Err(LoyaltyError::AccountNotFound(owner_id.to_string()));
        }
        let referrals = self.referrals.delete_by_referrer(owner_id).await?;
        info!(referrals, "会员账户已删除");
        Ok(referrals)
    }

    /// 生成会员推荐码并写入新账户，需同时避开已有的会员码和推荐记录码。
    /// 写入时会员码被并发入会抢占也会重新生成
    async fn insert_with_member_code(
        &self,
        owner_id: &str,
        email: Option<String>,
    ) -> Result<LoyaltyAccount> {
        let rules = &self.rules.referral;
        for attempt in 1..=rules.max_code_attempts {
            let code = self.codes.generate(rules.code_length);
            if self.code_taken(&code).await? {
                debug!(attempt, "会员码冲突，重新生成");
                continue;
            }
            let account = LoyaltyAccount::new(owner_id, email.clone(), code, self.clock.now());
            match self.accounts.insert(&account).await {
                Ok(()) => return Ok(account),
                Err(LoyaltyError::ReferralCodeTaken(code)) => {
                    debug!(attempt, code = %code, "会员码写入冲突，重新生成");
                }
                Err(e) => return Err(e),
            }
        }
        Err(LoyaltyError::CodeGenerationExhausted(rules.max_code_attempts))
    }

    pub(super) async fn code_taken(&self, code: &str) -> Result<bool> {
        Ok(self.referrals.code_exists(code).await?
            || self.accounts.referral_code_exists(code).await?)
    }

    /// 去除空白并转大写，格式不合法时返回 `InvalidReferralCode`
    pub(super) fn normalize_code(&self, code: &str) -> Result<String> {
        let normalized = code.trim().to_ascii_uppercase();
        if !is_well_formed(&normalized, self.rules.referral.code_length) {
            return Err(LoyaltyError::InvalidReferralCode(code.to_string()));
        }
        Ok(normalized)
    }
}
