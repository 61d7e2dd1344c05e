//! 会员积分领域模型
//!
//! 会员账户以单文档形式持有积分流水、奖励和里程碑，推荐记录独立存储

mod account;
mod enums;
mod referral;

pub use account::*;
pub use enums::*;
pub use referral::*;

/// 积分来源常量
///
/// 来源是自由文本，这里只收录引擎自身写入的取值
pub mod sources {
    pub const STAY: &str = "stay";
    pub const REFERRAL: &str = "referral";
    pub const MILESTONE: &str = "milestone";
    pub const WELCOME_BONUS: &str = "welcome_bonus";
    pub const ADJUSTMENT: &str = "adjustment";
    pub const EXPIRATION: &str = "expiration";
}
