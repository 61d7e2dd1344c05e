//! HTTP 请求处理器

pub mod account;
pub mod points;
pub mod referral;
pub mod stats;
