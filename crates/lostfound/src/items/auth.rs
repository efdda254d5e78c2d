//! Moderator credentials and session tokens.
//!
//! Moderator-only operations take an [`AuthenticatedModerator`], which can only be
//! obtained from [`ModeratorGate::authorize`] with a live session token.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use super::repository::{ModeratorRepository, RepositoryError};
use super::ItemError;
use crate::config::ModeratorSeed;

/// Stored moderator row. The secret is kept only as a salted digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeratorAccount {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub salt: String,
    pub created_at: DateTime<Utc>,
}

impl ModeratorAccount {
    pub fn new(username: &str, email: &str, password: &str) -> Self {
        let salt = uuid::Uuid::new_v4().simple().to_string();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.trim().to_string(),
            email: email.trim().to_string(),
            password_hash: hash_secret(&salt, password),
            salt,
            created_at: Utc::now(),
        }
    }

    pub fn verify(&self, password: &str) -> bool {
        constant_time_eq(
            hash_secret(&self.salt, password).as_bytes(),
            self.password_hash.as_bytes(),
        )
    }

    pub fn profile(&self) -> ModeratorProfile {
        ModeratorProfile {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}

pub fn hash_secret(salt: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .zip(right)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

/// Login payload.
#[derive(Clone, Deserialize)]
pub struct ModeratorCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for ModeratorCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeratorCredentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeratorProfile {
    pub id: String,
    pub username: String,
    pub email: String,
}

/// Result of a successful login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginGrant {
    pub token: String,
    pub user: ModeratorProfile,
    pub expires_at: DateTime<Utc>,
}

/// Capability proving the caller presented a live moderator session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedModerator {
    profile: ModeratorProfile,
}

impl AuthenticatedModerator {
    pub fn username(&self) -> &str {
        &self.profile.username
    }
}

#[derive(Debug, Clone)]
struct Session {
    profile: ModeratorProfile,
    expires_at: DateTime<Utc>,
}

/// In-memory session table. Sessions do not survive a restart.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    fn create(&self, profile: ModeratorProfile) -> (String, DateTime<Utc>) {
        let token = uuid::Uuid::new_v4().to_string();
        let expires_at = Utc::now() + self.ttl;
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.retain(|_, session| session.expires_at > Utc::now());
        sessions.insert(
            token.clone(),
            Session {
                profile,
                expires_at,
            },
        );
        (token, expires_at)
    }

    fn lookup(&self, token: &str) -> Option<ModeratorProfile> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        let session = sessions.get(token)?;
        if session.expires_at <= Utc::now() {
            return None;
        }
        Some(session.profile.clone())
    }

    fn revoke(&self, token: &str) -> bool {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.remove(token).is_some()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Duration::hours(24))
    }
}

/// Checks credentials and mints [`AuthenticatedModerator`] capabilities.
pub struct ModeratorGate {
    accounts: Arc<dyn ModeratorRepository>,
    sessions: SessionStore,
}

impl ModeratorGate {
    pub fn new(accounts: Arc<dyn ModeratorRepository>, sessions: SessionStore) -> Self {
        Self { accounts, sessions }
    }

    /// Creates the configured moderator when no row with that username exists.
    /// Returns `true` when a row was written.
    pub fn ensure_seeded(&self, seed: &ModeratorSeed) -> Result<bool, RepositoryError> {
        if self.accounts.find_by_username(&seed.username)?.is_some() {
            return Ok(false);
        }
        let account = ModeratorAccount::new(&seed.username, &seed.email, &seed.password);
        match self.accounts.insert(account) {
            Ok(()) => {
                info!(username = %seed.username, "default moderator created");
                Ok(true)
            }
            Err(RepositoryError::Duplicate) => Ok(false),
            Err(err) => Err(err),
        }
    }

    pub fn login(&self, credentials: &ModeratorCredentials) -> Result<LoginGrant, ItemError> {
        let account = self
            .accounts
            .find_by_username(credentials.username.trim())?
            .filter(|account| account.verify(&credentials.password));

        let Some(account) = account else {
            warn!(username = %credentials.username, "moderator login rejected");
            return Err(ItemError::Unauthorized);
        };

        let user = account.profile();
        let (token, expires_at) = self.sessions.create(user.clone());
        info!(username = %user.username, "moderator session opened");
        Ok(LoginGrant {
            token,
            user,
            expires_at,
        })
    }

    pub fn authorize(&self, token: &str) -> Result<AuthenticatedModerator, ItemError> {
        self.sessions
            .lookup(token.trim())
            .map(|profile| AuthenticatedModerator { profile })
            .ok_or(ItemError::Unauthorized)
    }

    /// Accepts an `Authorization` header value with or without the `Bearer ` prefix.
    pub fn authorize_header(
        &self,
        header: Option<&str>,
    ) -> Result<AuthenticatedModerator, ItemError> {
        let raw = header.ok_or(ItemError::Unauthorized)?;
        let token = raw.strip_prefix("Bearer ").unwrap_or(raw);
        self.authorize(token)
    }

    pub fn logout(&self, token: &str) -> bool {
        self.sessions.revoke(token.trim())
    }
}
