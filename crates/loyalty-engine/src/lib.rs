//! 会员积分引擎
//!
//! 酒店会员体系的积分、等级、里程碑和推荐核心逻辑。
//!
//! ## 模块结构
//!
//! - `models`: 会员账户与推荐记录
//! - `rules`: 等级表、倍率、里程碑和推荐奖励配置
//! - `engine`: 纯状态转换，返回领域事件
//! - `repository`: 带版本校验的存储（内存 / PostgreSQL）
//! - `notification`: 事件到邮件的转换与发送
//! - `service`: 读取-转换-保存-通知的业务编排
//! - `worker`: 到期处理后台任务

pub mod clock;
pub mod code_generator;
pub mod engine;
pub mod error;
pub mod models;
pub mod notification;
pub mod repository;
pub mod rules;
pub mod service;
pub mod worker;

pub use error::{LoyaltyError, Result};
pub use rules::LoyaltyRules;
pub use service::LoyaltyService;
