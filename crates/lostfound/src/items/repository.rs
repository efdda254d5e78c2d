use super::auth::ModeratorAccount;
use super::domain::{Item, ItemId, ItemStatus};
use super::lifecycle::Transition;

/// Storage abstraction for item records.
///
/// `transition` is the only mutation after insert. Implementations must apply it
/// as a single compare-and-swap on the stored status, so two concurrent
/// transitions from the same status cannot both succeed.
pub trait ItemRepository: Send + Sync {
    fn insert(&self, item: Item) -> Result<Item, RepositoryError>;
    fn fetch(&self, id: &ItemId) -> Result<Option<Item>, RepositoryError>;
    /// Items newest first, optionally restricted to one status.
    fn list(&self, status: Option<ItemStatus>) -> Result<Vec<Item>, RepositoryError>;
    fn transition(&self, id: &ItemId, transition: &Transition) -> Result<Item, RepositoryError>;
}

/// Storage abstraction for the moderator credential rows.
pub trait ModeratorRepository: Send + Sync {
    fn find_by_username(&self, username: &str)
        -> Result<Option<ModeratorAccount>, RepositoryError>;
    fn insert(&self, account: ModeratorAccount) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Duplicate,
    #[error("record not found")]
    NotFound,
    #[error("record is {current}, transition not applied")]
    StatusMismatch { current: ItemStatus },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
