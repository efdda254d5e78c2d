//! Found-item intake, moderation, and claiming.
//!
//! Items enter as `pending_approval` through [`SubmissionService`], are approved or
//! rejected by a moderator through [`ModerationService`], and move between
//! `approved` and `claimed` through [`ClaimService`]. Every status change is a
//! compare-and-swap in the backing [`ItemRepository`], so two racing claims on the
//! same item cannot both win. Each successful transition is appended to the
//! [`NotificationLog`].

pub mod auth;
pub mod claims;
pub mod domain;
pub mod images;
pub mod lifecycle;
pub mod memory;
pub mod moderation;
pub mod notifications;
pub mod repository;
pub mod router;
pub mod service;
pub mod sqlite;
pub mod store;
pub mod submission;

#[cfg(test)]
mod tests;

pub use auth::{
    AuthenticatedModerator, LoginGrant, ModeratorAccount, ModeratorCredentials, ModeratorGate,
    ModeratorProfile, SessionStore,
};
pub use claims::ClaimService;
pub use domain::{
    ApprovalRecord, ClaimRecord, Item, ItemId, ItemRecordView, ItemStatus, ItemSubmission,
    PublicItemView, UnknownStatus, RECOMMENDED_CATEGORIES,
};
pub use images::{DiskImageStore, ImagePolicy, ImageStore, ImageStoreError, ImageUpload};
pub use lifecycle::{FieldError, Transition, ValidationErrors, DEFAULT_REJECTION_REASON};
pub use memory::{InMemoryImageStore, InMemoryItemRepository, InMemoryModeratorRepository};
pub use moderation::ModerationService;
pub use notifications::{Notification, NotificationLog, Severity};
pub use repository::{ItemRepository, ModeratorRepository, RepositoryError};
pub use router::item_router;
pub use service::{LostFoundService, ServiceSettings};
pub use sqlite::{SqliteDatabase, SqliteItemRepository, SqliteModeratorRepository};
pub use store::{ItemError, ItemStore};
pub use submission::SubmissionService;
