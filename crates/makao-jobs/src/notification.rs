use std::sync::Arc;

use tracing::{info, warn};

use makao_core::models::{Notification, NotificationStatus};
use makao_core::storage::{NotificationDispatcher, NotificationStore};
use makao_core::Result;

/// Drains pending notifications through the delivery collaborator, in
/// creation order. The dispatcher's verdict lands on the notification's own
/// status and nowhere else; the financial events that raised these records
/// are already final.
pub struct NotificationJob {
    notifications: Arc<dyn NotificationStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
}

impl NotificationJob {
    pub fn new(
        notifications: Arc<dyn NotificationStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            notifications,
            dispatcher,
        }
    }

    pub async fn send_pending(&self) -> Result<Vec<Notification>> {
        let pending = self.notifications.find_pending().await?;
        info!("notification run over {} pending notifications", pending.len());

        let mut touched = Vec::with_capacity(pending.len());
        for mut notification in pending {
            let delivered = match self.dispatcher.dispatch(&notification).await {
                Ok(delivered) => delivered,
                Err(err) => {
                    warn!("dispatch of notification {} failed: {err}", notification.id);
                    false
                }
            };
            notification.status = if delivered {
                NotificationStatus::Sent
            } else {
                NotificationStatus::Failed
            };
            touched.push(self.notifications.save(notification).await?);
        }
        Ok(touched)
    }
}
