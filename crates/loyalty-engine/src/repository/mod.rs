//! 数据访问层
//!
//! 账户和推荐记录都按文档存储，保存时基于 `version` 做乐观并发校验。
//! 提供内存实现（开发/测试）和 PostgreSQL 实现

mod memory;
mod postgres;
mod traits;

pub use memory::{
    CasOutcome, MemoryAccountRepository, MemoryReferralRepository, Versioned, VersionedStore,
};
pub use postgres::{MIGRATOR, PgAccountRepository, PgReferralRepository};
pub use traits::{AccountRepository, ReferralRepository};

#[cfg(test)]
pub use traits::{MockAccountRepository, MockReferralRepository};
