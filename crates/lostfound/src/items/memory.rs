use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::auth::ModeratorAccount;
use super::domain::{Item, ItemId, ItemStatus};
use super::images::{ImageStore, ImageStoreError, ImageUpload};
use super::lifecycle::Transition;
use super::repository::{ItemRepository, ModeratorRepository, RepositoryError};

/// Process-local item store used by the demo and tests.
#[derive(Default, Clone)]
pub struct InMemoryItemRepository {
    records: Arc<Mutex<HashMap<ItemId, Item>>>,
}

impl InMemoryItemRepository {
    fn records(&self) -> Result<MutexGuard<'_, HashMap<ItemId, Item>>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("item map poisoned".to_string()))
    }
}

impl ItemRepository for InMemoryItemRepository {
    fn insert(&self, item: Item) -> Result<Item, RepositoryError> {
        let mut guard = self.records()?;
        if guard.contains_key(&item.id) {
            return Err(RepositoryError::Duplicate);
        }
        guard.insert(item.id.clone(), item.clone());
        Ok(item)
    }

    fn fetch(&self, id: &ItemId) -> Result<Option<Item>, RepositoryError> {
        let guard = self.records()?;
        Ok(guard.get(id).cloned())
    }

    fn list(&self, status: Option<ItemStatus>) -> Result<Vec<Item>, RepositoryError> {
        let guard = self.records()?;
        let mut items: Vec<Item> = guard
            .values()
            .filter(|item| status.map_or(true, |wanted| item.status == wanted))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    fn transition(&self, id: &ItemId, transition: &Transition) -> Result<Item, RepositoryError> {
        let mut guard = self.records()?;
        let item = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if item.status != transition.required_status() {
            return Err(RepositoryError::StatusMismatch {
                current: item.status,
            });
        }
        transition.apply(item);
        Ok(item.clone())
    }
}

/// Moderator rows kept in memory, keyed by username.
#[derive(Default, Clone)]
pub struct InMemoryModeratorRepository {
    accounts: Arc<Mutex<HashMap<String, ModeratorAccount>>>,
}

impl ModeratorRepository for InMemoryModeratorRepository {
    fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<ModeratorAccount>, RepositoryError> {
        let guard = self
            .accounts
            .lock()
            .map_err(|_| RepositoryError::Unavailable("moderator map poisoned".to_string()))?;
        Ok(guard.get(username).cloned())
    }

    fn insert(&self, account: ModeratorAccount) -> Result<(), RepositoryError> {
        let mut guard = self
            .accounts
            .lock()
            .map_err(|_| RepositoryError::Unavailable("moderator map poisoned".to_string()))?;
        if guard.contains_key(&account.username) {
            return Err(RepositoryError::Duplicate);
        }
        guard.insert(account.username.clone(), account);
        Ok(())
    }
}

/// Keeps uploaded images in a map under `memory://` references.
#[derive(Default, Clone)]
pub struct InMemoryImageStore {
    images: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl InMemoryImageStore {
    pub fn len(&self) -> usize {
        self.images.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn images(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<u8>>>, ImageStoreError> {
        self.images.lock().map_err(|_| {
            ImageStoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "image map poisoned",
            ))
        })
    }
}

impl ImageStore for InMemoryImageStore {
    fn store(&self, upload: &ImageUpload) -> Result<String, ImageStoreError> {
        let reference = format!("memory://{}/{}", uuid::Uuid::new_v4(), upload.file_name);
        self.images()?.insert(reference.clone(), upload.bytes.clone());
        Ok(reference)
    }

    fn discard(&self, reference: &str) -> Result<(), ImageStoreError> {
        self.images()?.remove(reference);
        Ok(())
    }

    fn load(&self, reference: &str) -> Result<Option<Vec<u8>>, ImageStoreError> {
        Ok(self.images()?.get(reference).cloned())
    }
}
