//! 集成测试公共工具

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;

use loyalty_engine::clock::ManualClock;
use loyalty_engine::code_generator::SequenceCodeGenerator;
use loyalty_engine::engine::{EarnPoints, RedeemPoints};
use loyalty_engine::notification::{EmailMessage, NotificationSender};
use loyalty_engine::repository::{MemoryAccountRepository, MemoryReferralRepository};
use loyalty_engine::service::EnrollAccount;
use loyalty_engine::{LoyaltyRules, LoyaltyService, Result};
use loyalty_shared::observability::tracing::init_for_test;

/// 记录所有发出的邮件
#[derive(Default)]
pub struct RecordingSender {
    pub sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingSender {
    pub fn templates(&self) -> Vec<String> {
        self.sent.lock().iter().map(|m| m.template.clone()).collect()
    }
}

#[async_trait]
impl NotificationSender for RecordingSender {
    async fn send_email(&self, message: &EmailMessage) -> Result<()> {
        self.sent.lock().push(message.clone());
        Ok(())
    }
}

pub struct Harness {
    pub service: Arc<LoyaltyService>,
    pub clock: ManualClock,
    pub sender: Arc<RecordingSender>,
    pub accounts: MemoryAccountRepository,
    pub referrals: MemoryReferralRepository,
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
}

impl Harness {
    pub fn new() -> Self {
        Self::build(LoyaltyRules::default(), SequenceCodeGenerator::default())
    }

    pub fn with_rules(rules: LoyaltyRules) -> Self {
        Self::build(rules, SequenceCodeGenerator::default())
    }

    pub fn with_codes<I>(codes: I) -> Self
    where
        I: IntoIterator<Item = &'static str>,
    {
        Self::build(LoyaltyRules::default(), SequenceCodeGenerator::new(codes))
    }

    pub fn build(rules: LoyaltyRules, codes: SequenceCodeGenerator) -> Self {
        init_for_test();
        let clock = ManualClock::new(start_time());
        let sender = Arc::new(RecordingSender::default());
        let accounts = MemoryAccountRepository::new();
        let referrals = MemoryReferralRepository::new();
        let service = LoyaltyService::new(
            Arc::new(accounts.clone()),
            Arc::new(referrals.clone()),
            rules,
        )
        .unwrap()
        .with_clock(Arc::new(clock.clone()))
        .with_code_generator(Arc::new(codes))
        .with_notification_sender(sender.clone());

        Self {
            service: Arc::new(service),
            clock,
            sender,
            accounts,
            referrals,
        }
    }

    pub async fn enroll(&self, owner_id: &str) -> loyalty_engine::models::LoyaltyAccount {
        self.service
            .enroll(EnrollAccount {
                owner_id: owner_id.to_string(),
                email: Some(format!("{owner_id}@example.com")),
                referral_code: None,
            })
            .await
            .unwrap()
    }
}

pub fn earn(amount: i64, source: &str) -> EarnPoints {
    EarnPoints {
        amount,
        source: source.to_string(),
        related_booking_id: None,
        description: format!("{source} credit"),
    }
}

pub fn redeem(amount: i64, reward_type: &str) -> RedeemPoints {
    RedeemPoints {
        amount,
        reward_type: reward_type.to_string(),
        related_booking_id: None,
        description: String::new(),
    }
}
