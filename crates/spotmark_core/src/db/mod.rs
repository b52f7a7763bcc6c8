//! SQLite backing store for the key-value layer.
//!
//! `open_db` and `open_db_in_memory` hand out connections whose schema is
//! already at `migrations::latest_version()`; nothing touches `kv_items`
//! on a connection that did not get through migration.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failure while opening or migrating the marker database.
#[derive(Debug)]
pub enum DbError {
    /// Error reported by SQLite itself.
    Sqlite(rusqlite::Error),
    /// File was written by a newer app build; it is left untouched.
    SchemaTooNew { found: u32, supported: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite: {err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "marker database uses schema v{found}, this build understands up to v{supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        if let Self::Sqlite(err) = self {
            Some(err)
        } else {
            None
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
