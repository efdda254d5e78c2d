//! SQLite persistence for items and moderator credentials.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::auth::ModeratorAccount;
use super::domain::{ApprovalRecord, ClaimRecord, Item, ItemId, ItemStatus};
use super::lifecycle::Transition;
use super::repository::{ItemRepository, ModeratorRepository, RepositoryError};

const ITEM_COLUMNS: &str = "id, title, description, category, location_found, date_found, \
     contact_info, image_url, status, claimed_by, claimant_contact, claimed_date, created_at, \
     approved_at, approved_by, rejection_reason";

/// Shared handle to the service database.
#[derive(Clone)]
pub struct SqliteDatabase {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDatabase {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let conn = Connection::open(path).map_err(unavailable)?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(unavailable)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, RepositoryError> {
        Self::from_connection(Connection::open_in_memory().map_err(unavailable)?)
    }

    fn from_connection(conn: Connection) -> Result<Self, RepositoryError> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_schema(conn: &Connection) -> Result<(), RepositoryError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS items (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                category TEXT NOT NULL,
                location_found TEXT NOT NULL,
                date_found TEXT NOT NULL,
                contact_info TEXT NOT NULL,
                image_url TEXT,
                status TEXT NOT NULL DEFAULT 'pending_approval',
                claimed_by TEXT,
                claimant_contact TEXT,
                claimed_date TEXT,
                created_at TEXT NOT NULL,
                approved_at TEXT,
                approved_by TEXT,
                rejection_reason TEXT
            );
            CREATE INDEX IF NOT EXISTS items_status_created
                ON items (status, created_at);
            CREATE TABLE IF NOT EXISTS moderators (
                id TEXT PRIMARY KEY,
                username TEXT UNIQUE NOT NULL,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                salt TEXT NOT NULL,
                created_at TEXT NOT NULL
            );",
        )
        .map_err(unavailable)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, RepositoryError> {
        self.conn
            .lock()
            .map_err(|_| RepositoryError::Unavailable("connection mutex poisoned".to_string()))
    }
}

fn unavailable(err: rusqlite::Error) -> RepositoryError {
    RepositoryError::Unavailable(err.to_string())
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(code, _)
            if code.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

// Fixed-width text so lexical order in SQL matches chronological order.
fn timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(index: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(
                index,
                rusqlite::types::Type::Text,
                err.into(),
            )
        })
}

fn parse_optional_timestamp(
    index: usize,
    raw: Option<String>,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    raw.map(|value| parse_timestamp(index, value)).transpose()
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    let date_found: String = row.get(5)?;
    let date_found = NaiveDate::parse_from_str(&date_found, "%Y-%m-%d").map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, err.into())
    })?;
    let status: String = row.get(8)?;
    let status = status.parse::<ItemStatus>().map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, err.into())
    })?;

    let claimed_by: Option<String> = row.get(9)?;
    let claimant_contact: Option<String> = row.get(10)?;
    let claimed_date = parse_optional_timestamp(11, row.get(11)?)?;
    let claim = match (claimed_by, claimant_contact, claimed_date) {
        (Some(claimed_by), Some(claimant_contact), Some(claimed_date)) => Some(ClaimRecord {
            claimed_by,
            claimant_contact,
            claimed_date,
        }),
        _ => None,
    };

    let approved_at = parse_optional_timestamp(13, row.get(13)?)?;
    let approved_by: Option<String> = row.get(14)?;
    let approval = match (approved_by, approved_at) {
        (Some(approved_by), Some(approved_at)) => Some(ApprovalRecord {
            approved_by,
            approved_at,
        }),
        _ => None,
    };

    Ok(Item {
        id: ItemId(row.get(0)?),
        title: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        location_found: row.get(4)?,
        date_found,
        contact_info: row.get(6)?,
        image_url: row.get(7)?,
        status,
        claim,
        approval,
        rejection_reason: row.get(15)?,
        created_at: parse_timestamp(12, row.get(12)?)?,
    })
}

/// Item repository backed by the `items` table.
#[derive(Clone)]
pub struct SqliteItemRepository {
    db: SqliteDatabase,
}

impl SqliteItemRepository {
    pub fn new(db: SqliteDatabase) -> Self {
        Self { db }
    }

    fn fetch_with(conn: &Connection, id: &ItemId) -> Result<Option<Item>, RepositoryError> {
        conn.query_row(
            &format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1"),
            params![id.as_str()],
            item_from_row,
        )
        .optional()
        .map_err(unavailable)
    }
}

impl ItemRepository for SqliteItemRepository {
    fn insert(&self, item: Item) -> Result<Item, RepositoryError> {
        let conn = self.db.conn()?;
        conn.execute(
            "INSERT INTO items (id, title, description, category, location_found, date_found,
                                contact_info, image_url, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                item.id.as_str(),
                item.title,
                item.description,
                item.category,
                item.location_found,
                item.date_found.format("%Y-%m-%d").to_string(),
                item.contact_info,
                item.image_url,
                item.status.label(),
                timestamp(&item.created_at),
            ],
        )
        .map_err(|err| {
            if is_unique_violation(&err) {
                RepositoryError::Duplicate
            } else {
                unavailable(err)
            }
        })?;
        Ok(item)
    }

    fn fetch(&self, id: &ItemId) -> Result<Option<Item>, RepositoryError> {
        let conn = self.db.conn()?;
        Self::fetch_with(&conn, id)
    }

    fn list(&self, status: Option<ItemStatus>) -> Result<Vec<Item>, RepositoryError> {
        let conn = self.db.conn()?;
        let mut statement = conn
            .prepare(&format!(
                "SELECT {ITEM_COLUMNS} FROM items
                 WHERE (?1 IS NULL OR status = ?1)
                 ORDER BY created_at DESC"
            ))
            .map_err(unavailable)?;
        let rows = statement
            .query_map(params![status.map(ItemStatus::label)], item_from_row)
            .map_err(unavailable)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(unavailable)
    }

    fn transition(&self, id: &ItemId, transition: &Transition) -> Result<Item, RepositoryError> {
        let conn = self.db.conn()?;
        let required = transition.required_status().label();
        let target = transition.target_status().label();

        let changed = match transition {
            Transition::Approve(approval) => conn.execute(
                "UPDATE items SET status = ?3, approved_at = ?4, approved_by = ?5
                 WHERE id = ?1 AND status = ?2",
                params![
                    id.as_str(),
                    required,
                    target,
                    timestamp(&approval.approved_at),
                    approval.approved_by,
                ],
            ),
            Transition::Reject { reason } => conn.execute(
                "UPDATE items SET status = ?3, rejection_reason = ?4
                 WHERE id = ?1 AND status = ?2",
                params![id.as_str(), required, target, reason],
            ),
            Transition::Claim(claim) => conn.execute(
                "UPDATE items SET status = ?3, claimed_by = ?4, claimant_contact = ?5,
                                  claimed_date = ?6
                 WHERE id = ?1 AND status = ?2",
                params![
                    id.as_str(),
                    required,
                    target,
                    claim.claimed_by,
                    claim.claimant_contact,
                    timestamp(&claim.claimed_date),
                ],
            ),
            Transition::Unclaim => conn.execute(
                "UPDATE items SET status = ?3, claimed_by = NULL, claimant_contact = NULL,
                                  claimed_date = NULL
                 WHERE id = ?1 AND status = ?2",
                params![id.as_str(), required, target],
            ),
        }
        .map_err(unavailable)?;

        let current = Self::fetch_with(&conn, id)?.ok_or(RepositoryError::NotFound)?;
        if changed == 0 {
            return Err(RepositoryError::StatusMismatch {
                current: current.status,
            });
        }
        Ok(current)
    }
}

/// Moderator credential rows in the `moderators` table.
#[derive(Clone)]
pub struct SqliteModeratorRepository {
    db: SqliteDatabase,
}

impl SqliteModeratorRepository {
    pub fn new(db: SqliteDatabase) -> Self {
        Self { db }
    }
}

impl ModeratorRepository for SqliteModeratorRepository {
    fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<ModeratorAccount>, RepositoryError> {
        let conn = self.db.conn()?;
        conn.query_row(
            "SELECT id, username, email, password_hash, salt, created_at
             FROM moderators WHERE username = ?1",
            params![username],
            |row| {
                Ok(ModeratorAccount {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    email: row.get(2)?,
                    password_hash: row.get(3)?,
                    salt: row.get(4)?,
                    created_at: parse_timestamp(5, row.get(5)?)?,
                })
            },
        )
        .optional()
        .map_err(unavailable)
    }

    fn insert(&self, account: ModeratorAccount) -> Result<(), RepositoryError> {
        let conn = self.db.conn()?;
        conn.execute(
            "INSERT INTO moderators (id, username, email, password_hash, salt, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                account.id,
                account.username,
                account.email,
                account.password_hash,
                account.salt,
                timestamp(&account.created_at),
            ],
        )
        .map(|_| ())
        .map_err(|err| {
            if is_unique_violation(&err) {
                RepositoryError::Duplicate
            } else {
                unavailable(err)
            }
        })
    }
}
