//! PostgreSQL 存储
//!
//! 文档整体存为 JSONB，检索用到的字段冗余为普通列。
//! 版本号以 `version` 列为准，保存使用 `UPDATE ... WHERE version = $n`

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::types::Json;

use super::traits::{AccountRepository, ReferralRepository};
use crate::error::{LoyaltyError, Result};
use crate::models::{LoyaltyAccount, Referral, ReferralStatus};

/// 会员积分表结构迁移
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// PostgreSQL 会员账户仓储
#[derive(Clone)]
pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn account_from_row((Json(mut account), version): (Json<LoyaltyAccount>, i64)) -> LoyaltyAccount {
    account.version = version;
    account
}

fn referral_from_row((Json(mut referral), version): (Json<Referral>, i64)) -> Referral {
    referral.version = version;
    referral
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn find(&self, owner_id: &str) -> Result<Option<LoyaltyAccount>> {
        let row = sqlx::query_as::<_, (Json<LoyaltyAccount>, i64)>(
            "SELECT document, version FROM loyalty_accounts WHERE owner_id = $1",
        )
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(account_from_row))
    }

    async fn insert(&self, account: &LoyaltyAccount) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO loyalty_accounts (owner_id, referral_code, tier, document, version)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(&account.owner_id)
        .bind(&account.referral_code)
        .bind(account.tier.as_str())
        .bind(Json(account))
        .bind(account.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        // 未插入：区分 owner 已存在和会员码被占用
        let owner_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM loyalty_accounts WHERE owner_id = $1)")
                .bind(&account.owner_id)
                .fetch_one(&self.pool)
                .await?;
        if owner_exists {
            Err(LoyaltyError::DuplicateEnrollment(account.owner_id.clone()))
        } else {
            Err(LoyaltyError::ReferralCodeTaken(account.referral_code.clone()))
        }
    }

    async fn save(&self, account: &LoyaltyAccount) -> Result<LoyaltyAccount> {
        let mut next = account.clone();
        next.version = account.version + 1;

        let result = sqlx::query(
            r#"
            UPDATE loyalty_accounts
            SET document = $2, tier = $3, version = $4, updated_at = NOW()
            WHERE owner_id = $1 AND version = $5
            "#,
        )
        .bind(&next.owner_id)
        .bind(Json(&next))
        .bind(next.tier.as_str())
        .bind(next.version)
        .bind(account.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(next);
        }

        // 未更新：区分记录不存在和版本冲突
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM loyalty_accounts WHERE owner_id = $1)")
                .bind(&account.owner_id)
                .fetch_one(&self.pool)
                .await?;
        if exists {
            Err(LoyaltyError::ConcurrencyConflict)
        } else {
            Err(LoyaltyError::AccountNotFound(account.owner_id.clone()))
        }
    }

    async fn delete(&self, owner_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM loyalty_accounts WHERE owner_id = $1")
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> Result<Vec<LoyaltyAccount>> {
        let rows = sqlx::query_as::<_, (Json<LoyaltyAccount>, i64)>(
            "SELECT document, version FROM loyalty_accounts ORDER BY owner_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(account_from_row).collect())
    }

    async fn list_with_expired_rewards(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<LoyaltyAccount>> {
        let rows = sqlx::query_as::<_, (Json<LoyaltyAccount>, i64)>(
            r#"
            SELECT document, version FROM loyalty_accounts
            WHERE EXISTS (
                SELECT 1 FROM jsonb_array_elements(document->'rewards') AS r
                WHERE r->>'status' = 'AVAILABLE'
                  AND (r->>'expiryDate')::timestamptz <= $1
            )
            ORDER BY owner_id
            LIMIT $2
            "#,
        )
        .bind(now)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(account_from_row).collect())
    }

    async fn referral_code_exists(&self, code: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM loyalty_accounts WHERE referral_code = $1)",
        )
        .bind(code)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

/// PostgreSQL 推荐记录仓储
#[derive(Clone)]
pub struct PgReferralRepository {
    pool: PgPool,
}

impl PgReferralRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReferralRepository for PgReferralRepository {
    async fn find(&self, code: &str) -> Result<Option<Referral>> {
        let row = sqlx::query_as::<_, (Json<Referral>, i64)>(
            "SELECT document, version FROM loyalty_referrals WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(referral_from_row))
    }

    async fn insert(&self, referral: &Referral) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO loyalty_referrals (code, referrer_id, status, expiry_date, document, version)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (code) DO NOTHING
            "#,
        )
        .bind(&referral.code)
        .bind(&referral.referrer_id)
        .bind(referral.status.as_str())
        .bind(referral.expiry_date)
        .bind(Json(referral))
        .bind(referral.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LoyaltyError::ConcurrencyConflict);
        }
        Ok(())
    }

    async fn save(&self, referral: &Referral) -> Result<Referral> {
        let mut next = referral.clone();
        next.version = referral.version + 1;

        let result = sqlx::query(
            r#"
            UPDATE loyalty_referrals
            SET document = $2, status = $3, version = $4, updated_at = NOW()
            WHERE code = $1 AND version = $5
            "#,
        )
        .bind(&next.code)
        .bind(Json(&next))
        .bind(next.status.as_str())
        .bind(next.version)
        .bind(referral.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(next);
        }

        if self.code_exists(&referral.code).await? {
            Err(LoyaltyError::ConcurrencyConflict)
        } else {
            Err(LoyaltyError::ReferralNotFound(referral.code.clone()))
        }
    }

    async fn list_by_referrer(&self, referrer_id: &str) -> Result<Vec<Referral>> {
        let rows = sqlx::query_as::<_, (Json<Referral>, i64)>(
            r#"
            SELECT document, version FROM loyalty_referrals
            WHERE referrer_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(referrer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(referral_from_row).collect())
    }

    async fn list_expirable(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<Referral>> {
        let rows = sqlx::query_as::<_, (Json<Referral>, i64)>(
            r#"
            SELECT document, version FROM loyalty_referrals
            WHERE status = $1 AND expiry_date <= $2
            ORDER BY expiry_date
            LIMIT $3
            "#,
        )
        .bind(ReferralStatus::Pending.as_str())
        .bind(now)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(referral_from_row).collect())
    }

    async fn delete_by_referrer(&self, referrer_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM loyalty_referrals WHERE referrer_id = $1")
            .bind(referrer_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn code_exists(&self, code: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM loyalty_referrals WHERE code = $1)")
                .bind(code)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }
}
