//! PostgreSQL 存储集成测试
//!
//! 需要可用的数据库，运行方式:
//! DATABASE_URL=postgres://... cargo test -p loyalty-engine --test pg_repository_test -- --ignored

use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use loyalty_engine::LoyaltyError;
use loyalty_engine::LoyaltyRules;
use loyalty_engine::engine::referral::new_referral;
use loyalty_engine::engine::{RedeemPoints, redeem_points};
use loyalty_engine::models::LoyaltyAccount;
use loyalty_engine::repository::{
    AccountRepository, MIGRATOR, PgAccountRepository, PgReferralRepository, ReferralRepository,
};

async fn pool() -> sqlx::PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("connect");
    MIGRATOR.run(&pool).await.expect("migrate");
    pool
}

fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}

fn unique_code() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_ascii_uppercase()
}

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_account_round_trip_and_cas() {
    let repo = PgAccountRepository::new(pool().await);
    let owner_id = unique("guest");
    let account = LoyaltyAccount::new(&owner_id, None, unique_code(), Utc::now());

    repo.insert(&account).await.unwrap();
    assert!(matches!(
        repo.insert(&account).await,
        Err(LoyaltyError::DuplicateEnrollment(_))
    ));

    let mut loaded = repo.find(&owner_id).await.unwrap().unwrap();
    let stale = loaded.clone();
    loaded.points = 250;
    let saved = repo.save(&loaded).await.unwrap();
    assert_eq!(saved.version, 1);

    assert!(matches!(
        repo.save(&stale).await,
        Err(LoyaltyError::ConcurrencyConflict)
    ));
    assert_eq!(repo.find(&owner_id).await.unwrap().unwrap().points, 250);
    assert!(repo.referral_code_exists(&account.referral_code).await.unwrap());

    assert!(repo.delete(&owner_id).await.unwrap());
    assert!(repo.find(&owner_id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_referral_queries() {
    let repo = PgReferralRepository::new(pool().await);
    let rules = LoyaltyRules::default();
    let referrer_id = unique("referrer");
    let now = Utc::now();

    let stale = new_referral(unique_code(), &referrer_id, &rules, now - chrono::Duration::days(31));
    let fresh = new_referral(unique_code(), &referrer_id, &rules, now);
    repo.insert(&stale).await.unwrap();
    repo.insert(&fresh).await.unwrap();

    assert_eq!(repo.list_by_referrer(&referrer_id).await.unwrap().len(), 2);
    let expirable = repo.list_expirable(now, 1000).await.unwrap();
    assert!(expirable.iter().any(|r| r.code == stale.code));
    assert!(!expirable.iter().any(|r| r.code == fresh.code));

    assert_eq!(repo.delete_by_referrer(&referrer_id).await.unwrap(), 2);
}

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_member_code_collision_is_reported() {
    let repo = PgAccountRepository::new(pool().await);
    let code = unique_code();
    let first = LoyaltyAccount::new(unique("guest"), None, code.clone(), Utc::now());
    let second = LoyaltyAccount::new(unique("guest"), None, code.clone(), Utc::now());

    repo.insert(&first).await.unwrap();
    let err = repo.insert(&second).await.unwrap_err();

    assert!(matches!(err, LoyaltyError::ReferralCodeTaken(ref taken) if *taken == code));
    assert!(repo.find(&second.owner_id).await.unwrap().is_none());
    repo.delete(&first.owner_id).await.unwrap();
}

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_list_with_expired_rewards_filters_in_database() {
    let repo = PgAccountRepository::new(pool().await);
    let now = Utc::now();
    let rules = LoyaltyRules::default();

    let mut stale = LoyaltyAccount::new(unique("guest"), None, unique_code(), now);
    stale.points = 1_000;
    let redeem = RedeemPoints {
        amount: 500,
        reward_type: "free_night".to_string(),
        related_booking_id: None,
        description: String::new(),
    };
    redeem_points(&mut stale, &rules, &redeem, now - chrono::Duration::days(100)).unwrap();
    let clean = LoyaltyAccount::new(unique("guest"), None, unique_code(), now);
    repo.insert(&stale).await.unwrap();
    repo.insert(&clean).await.unwrap();

    let due = repo.list_with_expired_rewards(now, 1_000).await.unwrap();

    assert!(due.iter().any(|a| a.owner_id == stale.owner_id));
    assert!(due.iter().all(|a| a.owner_id != clean.owner_id));
    repo.delete(&stale.owner_id).await.unwrap();
    repo.delete(&clean.owner_id).await.unwrap();
}
