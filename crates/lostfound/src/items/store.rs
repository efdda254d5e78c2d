use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error};

use super::domain::{
    is_recommended_category, ApprovalRecord, ClaimRecord, Item, ItemId, ItemStatus,
};
use super::images::ImageStoreError;
use super::lifecycle::{
    validate_claimant, Transition, ValidatedSubmission, ValidationErrors, DEFAULT_REJECTION_REASON,
};
use super::repository::{ItemRepository, RepositoryError};

/// Error raised by the item store and the services layered on it.
#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("item {0} not found")]
    NotFound(ItemId),
    #[error("item {id} is {from}; cannot move to {to}")]
    InvalidTransition {
        id: ItemId,
        from: ItemStatus,
        to: ItemStatus,
    },
    #[error("item {id} is {current}, expected {required}")]
    Conflict {
        id: ItemId,
        current: ItemStatus,
        required: ItemStatus,
    },
    #[error("moderator session required")]
    Unauthorized,
    #[error(transparent)]
    Storage(#[from] RepositoryError),
    #[error(transparent)]
    ImageStorage(#[from] ImageStoreError),
}

impl From<ValidationErrors> for ItemError {
    fn from(value: ValidationErrors) -> Self {
        Self::Validation(value)
    }
}

/// Enforces lifecycle legality on top of an [`ItemRepository`].
pub struct ItemStore<R> {
    repository: Arc<R>,
}

impl<R> ItemStore<R>
where
    R: ItemRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub fn create(
        &self,
        submission: ValidatedSubmission,
        image_url: Option<String>,
    ) -> Result<Item, ItemError> {
        if !is_recommended_category(&submission.category) {
            debug!(category = %submission.category, "submission uses an unlisted category");
        }
        let item = submission.into_item(image_url, Utc::now());
        let stored = self.repository.insert(item).map_err(storage_failure)?;
        debug!(item_id = %stored.id, "item created pending approval");
        Ok(stored)
    }

    pub fn approve(&self, id: &ItemId, approved_by: &str) -> Result<Item, ItemError> {
        let approved_by = approved_by.trim();
        if approved_by.is_empty() {
            return Err(ValidationErrors::single("approved_by", "is required").into());
        }
        self.apply(
            id,
            Transition::Approve(ApprovalRecord {
                approved_by: approved_by.to_string(),
                approved_at: Utc::now(),
            }),
        )
    }

    /// A blank reason is stored as [`DEFAULT_REJECTION_REASON`].
    pub fn reject(&self, id: &ItemId, reason: &str) -> Result<Item, ItemError> {
        let reason = match reason.trim() {
            "" => DEFAULT_REJECTION_REASON,
            given => given,
        };
        self.apply(
            id,
            Transition::Reject {
                reason: reason.to_string(),
            },
        )
    }

    pub fn claim(
        &self,
        id: &ItemId,
        claimant_name: &str,
        claimant_contact: &str,
    ) -> Result<(Item, ClaimRecord), ItemError> {
        let (claimed_by, claimant_contact) = validate_claimant(claimant_name, claimant_contact)?;
        let record = ClaimRecord {
            claimed_by,
            claimant_contact,
            claimed_date: Utc::now(),
        };
        let item = self.apply(id, Transition::Claim(record.clone()))?;
        Ok((item, record))
    }

    pub fn unclaim(&self, id: &ItemId) -> Result<Item, ItemError> {
        self.apply(id, Transition::Unclaim)
    }

    pub fn get(&self, id: &ItemId) -> Result<Item, ItemError> {
        self.repository
            .fetch(id)
            .map_err(storage_failure)?
            .ok_or_else(|| ItemError::NotFound(id.clone()))
    }

    /// The only listing exposed to anonymous callers.
    pub fn list_approved(&self) -> Result<Vec<Item>, ItemError> {
        self.repository
            .list(Some(ItemStatus::Approved))
            .map_err(storage_failure)
    }

    pub fn list_all(&self) -> Result<Vec<Item>, ItemError> {
        self.list_by_status(None)
    }

    pub fn list_by_status(&self, status: Option<ItemStatus>) -> Result<Vec<Item>, ItemError> {
        self.repository.list(status).map_err(storage_failure)
    }

    fn apply(&self, id: &ItemId, transition: Transition) -> Result<Item, ItemError> {
        match self.repository.transition(id, &transition) {
            Ok(item) => {
                debug!(
                    item_id = %id,
                    transition = transition.name(),
                    status = %item.status,
                    "item transitioned"
                );
                Ok(item)
            }
            Err(RepositoryError::NotFound) => Err(ItemError::NotFound(id.clone())),
            Err(RepositoryError::StatusMismatch { current }) => Err(match transition {
                Transition::Approve(_) | Transition::Reject { .. } => {
                    ItemError::InvalidTransition {
                        id: id.clone(),
                        from: current,
                        to: transition.target_status(),
                    }
                }
                Transition::Claim(_) | Transition::Unclaim => ItemError::Conflict {
                    id: id.clone(),
                    current,
                    required: transition.required_status(),
                },
            }),
            Err(other) => Err(storage_failure(other)),
        }
    }
}

fn storage_failure(err: RepositoryError) -> ItemError {
    error!(error = %err, "item repository failure");
    ItemError::Storage(err)
}
