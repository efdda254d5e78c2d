use std::sync::Arc;

use tracing::{info, warn};

use super::domain::{Item, ItemSubmission};
use super::images::{ImagePolicy, ImageStore, ImageUpload};
use super::lifecycle::validate_submission;
use super::notifications::{NotificationLog, Severity};
use super::repository::ItemRepository;
use super::store::{ItemError, ItemStore};

/// Public intake: field checks, optional image, then a pending item.
pub struct SubmissionService<R> {
    store: Arc<ItemStore<R>>,
    images: Arc<dyn ImageStore>,
    policy: ImagePolicy,
    notifications: Arc<NotificationLog>,
}

impl<R> SubmissionService<R>
where
    R: ItemRepository + 'static,
{
    pub fn new(
        store: Arc<ItemStore<R>>,
        images: Arc<dyn ImageStore>,
        policy: ImagePolicy,
        notifications: Arc<NotificationLog>,
    ) -> Self {
        Self {
            store,
            images,
            policy,
            notifications,
        }
    }

    pub fn policy(&self) -> ImagePolicy {
        self.policy
    }

    /// Validates everything before touching storage, so a rejected image
    /// never leaves an item or a file behind.
    pub fn submit(
        &self,
        submission: ItemSubmission,
        image: Option<ImageUpload>,
    ) -> Result<Item, ItemError> {
        let fields = validate_submission(&submission);
        let image_check = image.as_ref().map(|upload| self.policy.validate(upload));

        let validated = match (fields, image_check) {
            (Ok(validated), None | Some(Ok(()))) => validated,
            (fields, image_check) => {
                let mut errors = fields.err().unwrap_or_default();
                if let Some(Err(image_errors)) = image_check {
                    errors.merge(image_errors);
                }
                return Err(ItemError::Validation(errors));
            }
        };

        let image_url = match image.as_ref() {
            Some(upload) => Some(self.images.store(upload)?),
            None => None,
        };

        let item = match self.store.create(validated, image_url.clone()) {
            Ok(item) => item,
            Err(err) => {
                if let Some(reference) = image_url.as_deref() {
                    if let Err(discard) = self.images.discard(reference) {
                        warn!(reference, error = %discard, "failed to discard orphaned image");
                    }
                }
                return Err(err);
            }
        };

        info!(item_id = %item.id, has_image = item.image_url.is_some(), "item submitted");
        self.notifications.record(
            format!("New item submitted: \"{}\" - awaiting approval", item.title),
            Severity::Info,
        );
        Ok(item)
    }
}
