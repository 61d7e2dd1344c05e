//! 会员积分状态转换
//!
//! 本模块只做纯计算：接收账户当前值和操作参数，原地修改账户副本并返回
//! 需要后续处理的事件。持久化和通知由 service 层完成

mod events;
pub mod milestone;
pub mod points;
pub mod referral;
pub mod tier;

pub use events::LoyaltyEvent;
pub use milestone::check_milestones;
pub use points::{
    EarnPoints, RedeemPoints, add_points, adjust_points, award_milestone, expire_points,
    expire_rewards, redeem_points, stay_points, use_reward,
};
pub use tier::{TierBenefits, tier_benefits, update_membership_tier};
