//! User notifications.
//!
//! [`Notifier`] is the outbound seam: every business flow that tells a user
//! something goes through it. [`NotificationCenter`] is the production
//! implementation; it records the rendered message in the
//! [`NotificationStore`] so users can read it back from the API. Mail
//! delivery is out of scope and would plug in as another [`Notifier`].
//!
//! Notification failures never undo business state. Flows call
//! [`deliver`], which logs the failure and moves on.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{Clock, Notification, NotificationId, NotificationPayload, UserId};
use crate::error::BoxOfficeError;
use crate::persistence::NotificationStore;

/// Outbound notification channel.
#[async_trait]
pub trait Notifier: Send + Sync + fmt::Debug {
    /// Notifies `user_id`. The notification kind is taken from `payload`.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::NotificationFailure`] when delivery fails.
    async fn notify(
        &self,
        user_id: UserId,
        payload: &NotificationPayload,
    ) -> Result<Notification, BoxOfficeError>;
}

/// Sends a notification and swallows the failure after logging it.
///
/// Returns `true` when the notification was delivered.
pub async fn deliver(notifier: &dyn Notifier, user_id: UserId, payload: &NotificationPayload) -> bool {
    match notifier.notify(user_id, payload).await {
        Ok(notification) => {
            tracing::debug!(
                %user_id,
                notification_id = %notification.id,
                kind = notification.kind.as_str(),
                "notification delivered"
            );
            true
        }
        Err(e) => {
            tracing::warn!(
                %user_id,
                kind = payload.kind().as_str(),
                error = %e,
                "notification failed"
            );
            false
        }
    }
}

/// Stores notifications and serves them back to their recipients.
#[derive(Debug, Clone)]
pub struct NotificationCenter {
    store: Arc<dyn NotificationStore>,
    clock: Arc<dyn Clock>,
}

impl NotificationCenter {
    /// Creates a notification center over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn NotificationStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// A user's notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::PersistenceFailure`] on storage failure.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Notification>, BoxOfficeError> {
        self.store.list_for_user(user_id).await
    }

    /// Marks one of the caller's notifications as read.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::NotificationNotFound`] if it does not exist
    /// or belongs to someone else.
    pub async fn mark_read(
        &self,
        id: NotificationId,
        user_id: UserId,
    ) -> Result<Notification, BoxOfficeError> {
        self.store
            .mark_read(id, user_id, self.clock.now())
            .await?
            .ok_or(BoxOfficeError::NotificationNotFound(id))
    }
}

#[async_trait]
impl Notifier for NotificationCenter {
    async fn notify(
        &self,
        user_id: UserId,
        payload: &NotificationPayload,
    ) -> Result<Notification, BoxOfficeError> {
        let notification = Notification::from_payload(user_id, payload, self.clock.now());
        self.store
            .record(&notification)
            .await
            .map_err(|e| BoxOfficeError::NotificationFailure(e.to_string()))?;
        tracing::info!(
            %user_id,
            kind = notification.kind.as_str(),
            "notification recorded"
        );
        Ok(notification)
    }
}
