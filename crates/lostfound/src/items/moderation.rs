use std::sync::Arc;

use tracing::info;

use super::auth::AuthenticatedModerator;
use super::domain::{Item, ItemId, ItemStatus};
use super::lifecycle::DEFAULT_REJECTION_REASON;
use super::notifications::{NotificationLog, Severity};
use super::repository::ItemRepository;
use super::store::{ItemError, ItemStore};

/// Approve/reject on behalf of a signed-in moderator.
pub struct ModerationService<R> {
    store: Arc<ItemStore<R>>,
    notifications: Arc<NotificationLog>,
}

impl<R> ModerationService<R>
where
    R: ItemRepository + 'static,
{
    pub fn new(store: Arc<ItemStore<R>>, notifications: Arc<NotificationLog>) -> Self {
        Self {
            store,
            notifications,
        }
    }

    /// `approved_by` falls back to the moderator's username when blank.
    pub fn approve(
        &self,
        moderator: &AuthenticatedModerator,
        id: &ItemId,
        approved_by: Option<&str>,
    ) -> Result<Item, ItemError> {
        let approver = approved_by
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| moderator.username());

        let item = self.store.approve(id, approver)?;
        info!(item_id = %id, moderator = moderator.username(), "item approved");
        self.notifications.record(
            format!("Item approved: \"{}\" is now public", item.title),
            Severity::Success,
        );
        Ok(item)
    }

    pub fn reject(
        &self,
        moderator: &AuthenticatedModerator,
        id: &ItemId,
        reason: Option<&str>,
    ) -> Result<Item, ItemError> {
        let item = self.store.reject(id, reason.unwrap_or_default())?;
        let reason = item
            .rejection_reason
            .as_deref()
            .unwrap_or(DEFAULT_REJECTION_REASON);
        info!(item_id = %id, moderator = moderator.username(), "item rejected");
        self.notifications.record(
            format!("Item rejected: \"{}\" - Reason: {}", item.title, reason),
            Severity::Warning,
        );
        Ok(item)
    }

    pub fn list(
        &self,
        _moderator: &AuthenticatedModerator,
        status: Option<ItemStatus>,
    ) -> Result<Vec<Item>, ItemError> {
        self.store.list_by_status(status)
    }

    pub fn get(&self, _moderator: &AuthenticatedModerator, id: &ItemId) -> Result<Item, ItemError> {
        self.store.get(id)
    }
}
