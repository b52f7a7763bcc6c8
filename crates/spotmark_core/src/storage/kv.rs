//! Key-value storage contract and backends.
//!
//! # Responsibility
//! - Offer the `getItem`/`setItem` surface the marker store is written against.
//! - Keep SQL details inside the storage boundary.
//!
//! # Invariants
//! - `set_item` replaces the stored value in one statement; readers never
//!   observe a partially written value.
//! - Keys are non-blank.

use crate::db::DbError;
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::RefCell;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type KvResult<T> = Result<T, KvError>;

/// Key-value storage failure.
#[derive(Debug)]
pub enum KvError {
    InvalidKey(String),
    Db(DbError),
}

impl Display for KvError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidKey(key) => write!(f, "invalid storage key `{key}`"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for KvError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidKey(_) => None,
            Self::Db(err) => Some(err),
        }
    }
}

impl From<DbError> for KvError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for KvError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// String key-value storage, modelled on the host platform's async storage.
pub trait KeyValueStorage {
    /// Returns the stored value, or `None` when the key was never written.
    fn get_item(&self, key: &str) -> KvResult<Option<String>>;
    /// Stores `value` under `key`, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> KvResult<()>;
}

impl<S: KeyValueStorage + ?Sized> KeyValueStorage for &S {
    fn get_item(&self, key: &str) -> KvResult<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> KvResult<()> {
        (**self).set_item(key, value)
    }
}

/// SQLite-backed storage over the `kv_items` table.
///
/// Owns its connection so long-lived sessions can hold it.
pub struct SqliteKeyValueStorage {
    conn: Connection,
}

impl SqliteKeyValueStorage {
    /// Wraps a connection returned by `open_db`/`open_db_in_memory`.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn into_connection(self) -> Connection {
        self.conn
    }
}

impl KeyValueStorage for SqliteKeyValueStorage {
    fn get_item(&self, key: &str) -> KvResult<Option<String>> {
        ensure_valid_key(key)?;
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_items WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_item(&self, key: &str, value: &str) -> KvResult<()> {
        ensure_valid_key(key)?;
        self.conn.execute(
            "INSERT INTO kv_items (key, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, value],
        )?;
        Ok(())
    }
}

/// In-process storage for hosts without SQLite and for tests.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStorage {
    items: RefCell<HashMap<String, String>>,
}

impl MemoryKeyValueStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }
}

impl KeyValueStorage for MemoryKeyValueStorage {
    fn get_item(&self, key: &str) -> KvResult<Option<String>> {
        ensure_valid_key(key)?;
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> KvResult<()> {
        ensure_valid_key(key)?;
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

fn ensure_valid_key(key: &str) -> KvResult<()> {
    if key.trim().is_empty() {
        return Err(KvError::InvalidKey(key.to_string()));
    }
    Ok(())
}
