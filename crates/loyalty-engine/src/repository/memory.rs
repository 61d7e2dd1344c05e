//! 内存存储
//!
//! 使用 DashMap 实现，版本校验在分片写锁内完成

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::traits::{AccountRepository, ReferralRepository};
use crate::error::{LoyaltyError, Result};
use crate::models::{LoyaltyAccount, Referral, ReferralStatus, RewardStatus};

/// 带版本号的文档
pub trait Versioned: Clone {
    fn version(&self) -> i64;
    fn set_version(&mut self, version: i64);
}

impl Versioned for LoyaltyAccount {
    fn version(&self) -> i64 {
        self.version
    }
    fn set_version(&mut self, version: i64) {
        self.version = version;
    }
}

impl Versioned for Referral {
    fn version(&self) -> i64 {
        self.version
    }
    fn set_version(&mut self, version: i64) {
        self.version = version;
    }
}

/// 通用版本化内存存储
#[derive(Debug)]
pub struct VersionedStore<T> {
    data: Arc<DashMap<String, T>>,
}

impl<T> Clone for VersionedStore<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: Versioned> Default for VersionedStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Versioned> VersionedStore<T> {
    pub fn new() -> Self {
        Self {
            data: Arc::new(DashMap::new()),
        }
    }

    /// 获取数据的克隆，不持有锁
    pub fn get(&self, id: &str) -> Option<T> {
        self.data.get(id).map(|v| v.clone())
    }

    /// 仅在 key 不存在时插入，返回是否插入成功
    pub fn insert_new(&self, id: &str, value: T) -> bool {
        match self.data.entry(id.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
        }
    }

    /// 比较版本后替换，返回写入后的值
    pub fn compare_and_swap(&self, id: &str, value: &T) -> CasOutcome<T> {
        match self.data.get_mut(id) {
            None => CasOutcome::Missing,
            Some(mut current) => {
                if current.version() != value.version() {
                    return CasOutcome::Conflict;
                }
                let mut next = value.clone();
                next.set_version(value.version() + 1);
                *current = next.clone();
                CasOutcome::Stored(next)
            }
        }
    }

    pub fn remove(&self, id: &str) -> Option<T> {
        self.data.remove(id).map(|(_, v)| v)
    }

    /// 按条件删除，返回删除数量
    pub fn remove_where<F>(&self, predicate: F) -> u64
    where
        F: Fn(&T) -> bool,
    {
        let before = self.data.len();
        self.data.retain(|_, v| !predicate(v));
        (before - self.data.len()) as u64
    }

    pub fn list(&self) -> Vec<T> {
        self.data.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn list_by<F>(&self, predicate: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        self.data
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn any<F>(&self, predicate: F) -> bool
    where
        F: Fn(&T) -> bool,
    {
        self.data.iter().any(|entry| predicate(entry.value()))
    }

    pub fn count(&self) -> usize {
        self.data.len()
    }
}

/// CAS 结果
#[derive(Debug)]
pub enum CasOutcome<T> {
    Stored(T),
    Conflict,
    Missing,
}

/// 内存会员账户仓储
#[derive(Debug, Clone, Default)]
pub struct MemoryAccountRepository {
    store: VersionedStore<LoyaltyAccount>,
}

impl MemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountRepository for MemoryAccountRepository {
    async fn find(&self, owner_id: &str) -> Result<Option<LoyaltyAccount>> {
        Ok(self.store.get(owner_id))
    }

    async fn insert(&self, account: &LoyaltyAccount) -> Result<()> {
        if self.store.get(&account.owner_id).is_some() {
            return Err(LoyaltyError::DuplicateEnrollment(account.owner_id.clone()));
        }
        if self.store.any(|a| a.referral_code == account.referral_code) {
            return Err(LoyaltyError::ReferralCodeTaken(account.referral_code.clone()));
        }
        if self.store.insert_new(&account.owner_id, account.clone()) {
            Ok(())
        } else {
            Err(LoyaltyError::DuplicateEnrollment(account.owner_id.clone()))
        }
    }

    async fn save(&self, account: &LoyaltyAccount) -> Result<LoyaltyAccount> {
        match self.store.compare_and_swap(&account.owner_id, account) {
            CasOutcome::Stored(saved) => Ok(saved),
            CasOutcome::Conflict => Err(LoyaltyError::ConcurrencyConflict),
            CasOutcome::Missing => Err(LoyaltyError::AccountNotFound(account.owner_id.clone())),
        }
    }

    async fn delete(&self, owner_id: &str) -> Result<bool> {
        Ok(self.store.remove(owner_id).is_some())
    }

    async fn list(&self) -> Result<Vec<LoyaltyAccount>> {
        let mut accounts = self.store.list();
        accounts.sort_by(|a, b| a.owner_id.cmp(&b.owner_id));
        Ok(accounts)
    }

    async fn list_with_expired_rewards(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<LoyaltyAccount>> {
        let mut accounts = self.store.list_by(|a| {
            a.rewards
                .iter()
                .any(|r| r.status == RewardStatus::Available && r.is_past_expiry(now))
        });
        accounts.sort_by(|a, b| a.owner_id.cmp(&b.owner_id));
        accounts.truncate(limit);
        Ok(accounts)
    }

    async fn referral_code_exists(&self, code: &str) -> Result<bool> {
        Ok(self.store.any(|a| a.referral_code == code))
    }
}

/// 内存推荐记录仓储
#[derive(Debug, Clone, Default)]
pub struct MemoryReferralRepository {
    store: VersionedStore<Referral>,
}

impl MemoryReferralRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReferralRepository for MemoryReferralRepository {
    async fn find(&self, code: &str) -> Result<Option<Referral>> {
        Ok(self.store.get(code))
    }

    async fn insert(&self, referral: &Referral) -> Result<()> {
        if self.store.insert_new(&referral.code, referral.clone()) {
            Ok(())
        } else {
            Err(LoyaltyError::ConcurrencyConflict)
        }
    }

    async fn save(&self, referral: &Referral) -> Result<Referral> {
        match self.store.compare_and_swap(&referral.code, referral) {
            CasOutcome::Stored(saved) => Ok(saved),
            CasOutcome::Conflict => Err(LoyaltyError::ConcurrencyConflict),
            CasOutcome::Missing => Err(LoyaltyError::ReferralNotFound(referral.code.clone())),
        }
    }

    async fn list_by_referrer(&self, referrer_id: &str) -> Result<Vec<Referral>> {
        let mut referrals = self.store.list_by(|r| r.referrer_id == referrer_id);
        referrals.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(referrals)
    }

    async fn list_expirable(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<Referral>> {
        let mut referrals = self
            .store
            .list_by(|r| r.status == ReferralStatus::Pending && r.is_past_expiry(now));
        referrals.sort_by(|a, b| a.expiry_date.cmp(&b.expiry_date));
        referrals.truncate(limit);
        Ok(referrals)
    }

    async fn delete_by_referrer(&self, referrer_id: &str) -> Result<u64> {
        Ok(self.store.remove_where(|r| r.referrer_id == referrer_id))
    }

    async fn code_exists(&self, code: &str) -> Result<bool> {
        Ok(self.store.get(code).is_some())
    }
}
