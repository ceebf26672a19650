//! Customer notifications.
//!
//! Notification delivery is best-effort: the dispatcher spawns each send on
//! its own task with a timeout, logs the outcome, and never reports failure
//! to the request that triggered it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kleen_core::{Order, OrderStatus};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Sms,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub channel: Channel,
    pub recipient: String,
    pub template: &'static str,
    pub data: serde_json::Value,
}

impl Notification {
    /// The message a status change sends, if any. SMS is preferred; orders
    /// without a phone fall back to email, and anonymous orders send nothing.
    pub fn order_status(order: &Order) -> Option<Notification> {
        let template = match order.status {
            OrderStatus::Ready => "order_ready",
            OrderStatus::Delivered => "order_delivered",
            _ => return None,
        };
        let (channel, recipient) = match (&order.customer_phone, &order.customer_email) {
            (Some(phone), _) => (Channel::Sms, phone.clone()),
            (None, Some(email)) => (Channel::Email, email.clone()),
            (None, None) => return None,
        };
        Some(Notification {
            channel,
            recipient,
            template,
            data: json!({
                "order_number": order.order_number,
                "customer_name": order.customer_name,
                "total_cents": order.total_cents,
                "order_type": order.order_type,
            }),
        })
    }

    pub fn reset_code(channel: Channel, recipient: String, code: &str, ttl_secs: u64) -> Notification {
        Notification {
            channel,
            recipient,
            template: "password_reset",
            data: json!({ "code": code, "expires_in_minutes": ttl_secs / 60 }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// The notifier chose not to send (e.g. channel not configured).
    Skipped,
}

#[derive(Debug, thiserror::Error)]
#[error("Notification failed: {0}")]
pub struct NotifyError(pub String);

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<Delivery, NotifyError>;
}

/// Writes notifications to the log instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<Delivery, NotifyError> {
        // Reset codes are secrets; everything else is logged in full.
        if notification.template == "password_reset" {
            info!(channel = ?notification.channel, template = notification.template, "Notification");
        } else {
            info!(
                channel = ?notification.channel,
                template = notification.template,
                data = %notification.data,
                "Notification"
            );
        }
        Ok(Delivery::Delivered)
    }
}

/// Fire-and-forget sender around a [`Notifier`].
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, timeout: Duration) -> Self {
        NotificationDispatcher { notifier, timeout }
    }

    /// Sends in the background. Failures and timeouts are logged only.
    pub fn dispatch(&self, notification: Notification) {
        let notifier = Arc::clone(&self.notifier);
        let timeout = self.timeout;

        tokio::spawn(async move {
            match tokio::time::timeout(timeout, notifier.notify(&notification)).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    warn!(template = notification.template, error = %e, "Notification failed")
                }
                Err(_) => {
                    warn!(template = notification.template, "Notification timed out")
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Failing(Arc<AtomicUsize>);

    #[async_trait]
    impl Notifier for Failing {
        async fn notify(&self, _: &Notification) -> Result<Delivery, NotifyError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(NotifyError("smtp down".to_string()))
        }
    }

    fn reset() -> Notification {
        Notification::reset_code(Channel::Sms, "2125550101".to_string(), "123456", 900)
    }

    #[tokio::test]
    async fn test_dispatch_swallows_failures() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher =
            NotificationDispatcher::new(Arc::new(Failing(calls.clone())), Duration::from_secs(1));

        dispatcher.dispatch(reset());
        for _ in 0..50 {
            if calls.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_log_notifier_delivers() {
        assert_eq!(LogNotifier.notify(&reset()).await.unwrap(), Delivery::Delivered);
        assert_eq!(reset().data["expires_in_minutes"], 15);
    }
}
