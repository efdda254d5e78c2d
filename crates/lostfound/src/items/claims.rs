use std::sync::Arc;

use tracing::info;

use super::auth::AuthenticatedModerator;
use super::domain::{Item, ItemId};
use super::notifications::{NotificationLog, Severity};
use super::repository::ItemRepository;
use super::store::{ItemError, ItemStore};

/// Claim is open to anyone; reversing one needs a moderator.
pub struct ClaimService<R> {
    store: Arc<ItemStore<R>>,
    notifications: Arc<NotificationLog>,
}

impl<R> ClaimService<R>
where
    R: ItemRepository + 'static,
{
    pub fn new(store: Arc<ItemStore<R>>, notifications: Arc<NotificationLog>) -> Self {
        Self {
            store,
            notifications,
        }
    }

    /// Not idempotent. A retry after [`ItemError::Conflict`] must re-read the item.
    pub fn claim(
        &self,
        id: &ItemId,
        claimant_name: &str,
        claimant_contact: &str,
    ) -> Result<Item, ItemError> {
        let (item, claim) = self.store.claim(id, claimant_name, claimant_contact)?;

        info!(item_id = %id, "item claimed");
        self.notifications.record(
            format!("Item claimed: \"{}\" by {}", item.title, claim.claimed_by),
            Severity::Success,
        );
        self.notifications.record(
            format!(
                "Contact claimant: {} | Original reporter: {}",
                claim.claimant_contact, item.contact_info
            ),
            Severity::Info,
        );
        Ok(item)
    }

    pub fn unclaim(
        &self,
        moderator: &AuthenticatedModerator,
        id: &ItemId,
    ) -> Result<Item, ItemError> {
        let item = self.store.unclaim(id)?;
        info!(item_id = %id, moderator = moderator.username(), "item unclaimed");
        self.notifications.record(
            format!(
                "Item unclaimed: \"{}\" is now available for claiming again",
                item.title
            ),
            Severity::Info,
        );
        Ok(item)
    }
}
