//! 通知发送器

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use loyalty_shared::observability::metrics;
use tracing::{debug, info, warn};

use super::types::{EmailMessage, NotificationBuilder};
use crate::engine::LoyaltyEvent;
use crate::error::Result;

/// 邮件发送通道
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send_email(&self, message: &EmailMessage) -> Result<()>;
}

/// 仅记录日志的发送通道，未接入邮件服务时使用
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotificationSender;

#[async_trait]
impl NotificationSender for LoggingNotificationSender {
    async fn send_email(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to = %message.to,
            template = %message.template,
            subject = %message.subject,
            "发送邮件通知"
        );
        Ok(())
    }
}

/// 事件通知分发
///
/// 同一批事件的邮件并行发送，全部完成后汇总结果；失败只记录日志
#[derive(Clone)]
pub struct Notifier {
    sender: Arc<dyn NotificationSender>,
}

impl Notifier {
    pub fn new(sender: Arc<dyn NotificationSender>) -> Self {
        Self { sender }
    }

    /// 返回成功发送的邮件数量
    pub async fn dispatch(&self, email: Option<&str>, events: &[LoyaltyEvent]) -> usize {
        let Some(to) = email.filter(|e| !e.is_empty()) else {
            if !events.is_empty() {
                debug!(event_count = events.len(), "账户未设置邮箱，跳过通知");
            }
            return 0;
        };

        let messages: Vec<_> = events
            .iter()
            .filter_map(|event| {
                NotificationBuilder::from_event(event, to).map(|message| (event, message))
            })
            .collect();

        // 各邮件相互独立，并行发送
        let results = join_all(
            messages
                .iter()
                .map(|(_, message)| self.sender.send_email(message)),
        )
        .await;

        let mut sent = 0;
        for ((event, message), result) in messages.iter().zip(results) {
            match result {
                Ok(()) => {
                    sent += 1;
                    metrics::record_notification(&message.template, "sent");
                }
                Err(e) => {
                    metrics::record_notification(&message.template, "failed");
                    warn!(
                        owner_id = %event.owner_id(),
                        template = %message.template,
                        error = %e,
                        "邮件通知发送失败"
                    );
                }
            }
        }
        sent
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(Arc::new(LoggingNotificationSender))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoyaltyError;
    use crate::models::Tier;
    use crate::notification::templates;

    fn events() -> Vec<LoyaltyEvent> {
        vec![
            LoyaltyEvent::PointsEarned {
                owner_id: "guest-1".to_string(),
                points: 10_000,
                balance: 10_000,
                source: "stay".to_string(),
            },
            LoyaltyEvent::TierUpgraded {
                owner_id: "guest-1".to_string(),
                from: Tier::Bronze,
                to: Tier::Silver,
            },
        ]
    }

    #[tokio::test]
    async fn test_dispatch_sends_mapped_events() {
        let mut sender = MockNotificationSender::new();
        sender
            .expect_send_email()
            .withf(|m| m.template == templates::TIER_UPGRADED)
            .times(1)
            .returning(|_| Ok(()));

        let notifier = Notifier::new(Arc::new(sender));
        assert_eq!(notifier.dispatch(Some("guest@example.com"), &events()).await, 1);
    }

    #[tokio::test]
    async fn test_dispatch_swallows_failures() {
        let mut sender = MockNotificationSender::new();
        sender
            .expect_send_email()
            .times(1)
            .returning(|_| Err(LoyaltyError::Internal("smtp down".to_string())));

        let notifier = Notifier::new(Arc::new(sender));
        assert_eq!(notifier.dispatch(Some("guest@example.com"), &events()).await, 0);
    }

    #[tokio::test]
    async fn test_dispatch_skips_without_email() {
        let mut sender = MockNotificationSender::new();
        sender.expect_send_email().never();

        let notifier = Notifier::new(Arc::new(sender));
        assert_eq!(notifier.dispatch(None, &events()).await, 0);
        assert_eq!(notifier.dispatch(Some(""), &events()).await, 0);
    }
}
