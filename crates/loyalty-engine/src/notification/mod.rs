//! 会员通知
//!
//! 状态保存成功后，把领域事件转换为邮件并发送。
//! 发送失败只记录日志，不影响已完成的积分/等级/推荐变更

mod sender;
mod types;

pub use sender::{LoggingNotificationSender, NotificationSender, Notifier};
pub use types::{EmailMessage, NotificationBuilder, templates};

#[cfg(test)]
pub use sender::MockNotificationSender;
