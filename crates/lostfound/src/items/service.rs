use std::sync::Arc;

use chrono::Duration;

use super::auth::{AuthenticatedModerator, ModeratorGate, SessionStore};
use super::claims::ClaimService;
use super::domain::{Item, ItemId, ItemStatus};
use super::images::{ImagePolicy, ImageStore};
use super::moderation::ModerationService;
use super::notifications::{Notification, NotificationLog};
use super::repository::{ItemRepository, ModeratorRepository};
use super::store::{ItemError, ItemStore};
use super::submission::SubmissionService;
use crate::config::{AppConfig, NotificationConfig};

/// Tunables the facade needs from [`AppConfig`].
#[derive(Debug, Clone, Copy)]
pub struct ServiceSettings {
    pub image_policy: ImagePolicy,
    pub notifications: NotificationConfig,
    pub session_ttl: Duration,
}

impl ServiceSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            image_policy: ImagePolicy {
                max_bytes: config.storage.max_image_bytes,
            },
            notifications: config.notifications,
            session_ttl: Duration::hours(config.moderator.session_ttl_hours),
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            image_policy: ImagePolicy::default(),
            notifications: NotificationConfig::default(),
            session_ttl: Duration::hours(24),
        }
    }
}

/// Wires the item store, the three services, the moderator gate and the
/// notification log around one shared repository.
pub struct LostFoundService<R> {
    store: Arc<ItemStore<R>>,
    submissions: SubmissionService<R>,
    moderation: ModerationService<R>,
    claims: ClaimService<R>,
    gate: ModeratorGate,
    images: Arc<dyn ImageStore>,
    notifications: Arc<NotificationLog>,
    feed_limit: usize,
}

impl<R> LostFoundService<R>
where
    R: ItemRepository + 'static,
{
    pub fn new(
        repository: Arc<R>,
        moderators: Arc<dyn ModeratorRepository>,
        images: Arc<dyn ImageStore>,
        settings: ServiceSettings,
    ) -> Self {
        let store = Arc::new(ItemStore::new(repository));
        let notifications = Arc::new(NotificationLog::with_capacity(
            settings.notifications.capacity,
        ));

        Self {
            submissions: SubmissionService::new(
                store.clone(),
                images.clone(),
                settings.image_policy,
                notifications.clone(),
            ),
            moderation: ModerationService::new(store.clone(), notifications.clone()),
            claims: ClaimService::new(store.clone(), notifications.clone()),
            gate: ModeratorGate::new(moderators, SessionStore::new(settings.session_ttl)),
            store,
            images,
            notifications,
            feed_limit: settings.notifications.feed_limit.max(1),
        }
    }

    pub fn store(&self) -> &ItemStore<R> {
        &self.store
    }

    pub fn submissions(&self) -> &SubmissionService<R> {
        &self.submissions
    }

    pub fn moderation(&self) -> &ModerationService<R> {
        &self.moderation
    }

    pub fn claims(&self) -> &ClaimService<R> {
        &self.claims
    }

    pub fn gate(&self) -> &ModeratorGate {
        &self.gate
    }

    pub fn images(&self) -> &Arc<dyn ImageStore> {
        &self.images
    }

    pub fn notifications(&self) -> &NotificationLog {
        &self.notifications
    }

    pub fn list_approved(&self) -> Result<Vec<Item>, ItemError> {
        self.store.list_approved()
    }

    /// Anonymous lookup. Items that never went public read as missing.
    pub fn get_public(&self, id: &ItemId) -> Result<Item, ItemError> {
        let item = self.store.get(id)?;
        match item.status {
            ItemStatus::Approved | ItemStatus::Claimed => Ok(item),
            ItemStatus::PendingApproval | ItemStatus::Rejected => {
                Err(ItemError::NotFound(id.clone()))
            }
        }
    }

    /// Newest first, never more than the configured feed limit.
    pub fn recent_notifications(
        &self,
        _moderator: &AuthenticatedModerator,
        limit: Option<usize>,
    ) -> Vec<Notification> {
        let limit = limit.unwrap_or(self.feed_limit).min(self.feed_limit);
        self.notifications.recent(limit)
    }
}
