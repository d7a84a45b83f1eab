mod action;
mod category;
mod link;
mod loops;
mod migrations;
mod note;
mod path;
mod spark;

pub use action::{ActionUpdate, NewAction};
pub use category::{CategoryUpdate, CategoryUsage, CleanupReport, NewCategory, UsageBreakdown};
pub use loops::{LoopUpdate, NewLoop, NewLoopItem};
pub use note::{NewNote, NoteUpdate};
pub use path::{MilestoneUpdate, NewMilestone, NewPath, PathUpdate};
pub use spark::{NewSpark, SparkUpdate};

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, TrellisError};

const TRELLIS_DIR: &str = ".trellis";
const DB_FILE: &str = "trellis.db";

/// Common filter for top-level entity listings
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub include_hidden: bool,
    pub starred_only: bool,
    pub category_id: Option<uuid::Uuid>,
}

/// SQLite-backed store for all entities.
///
/// Owns the single connection; callers construct one per data directory
/// (or per test) rather than sharing a process-wide instance.
pub struct Store {
    conn: Connection,
    #[allow(dead_code)]
    path: PathBuf,
}

impl Store {
    /// Initialize a new trellis data directory
    pub fn init(root: &Path) -> Result<Self> {
        let trellis_dir = root.join(TRELLIS_DIR);

        if trellis_dir.exists() {
            return Err(TrellisError::AlreadyInitialized);
        }

        fs::create_dir_all(&trellis_dir)?;
        Self::open_db(trellis_dir.join(DB_FILE))
    }

    /// Open an existing trellis data directory
    pub fn open(root: &Path) -> Result<Self> {
        let path = root.join(TRELLIS_DIR).join(DB_FILE);

        if !path.exists() {
            return Err(TrellisError::NotInitialized);
        }

        Self::open_db(path)
    }

    /// In-memory store, used by tests
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migrations::apply_all(&mut conn)?;
        Ok(Self {
            conn,
            path: PathBuf::new(),
        })
    }

    fn open_db(path: PathBuf) -> Result<Self> {
        let mut conn = Connection::open(&path)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::apply_all(&mut conn)?;
        Ok(Self { conn, path })
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Read a value from the meta table
    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = self
            .conn
            .query_row("SELECT value FROM meta WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Write a value to the meta table
    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
            [key, value],
        )?;
        Ok(())
    }
}

// Row <-> value helpers shared by the per-entity modules.

pub(crate) fn parse_ts(s: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

pub(crate) fn parse_uuid(s: String) -> rusqlite::Result<uuid::Uuid> {
    uuid::Uuid::parse_str(&s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn parse_opt_uuid(s: Option<String>) -> Option<uuid::Uuid> {
    s.and_then(|s| uuid::Uuid::parse_str(&s).ok())
}

pub(crate) fn parse_opt_date(s: Option<String>) -> Option<NaiveDate> {
    s.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
}

/// NULL and empty list columns read back as an empty Vec; corrupt JSON is an
/// error, not silent data loss.
pub(crate) fn vec_from_json<T: DeserializeOwned>(s: Option<String>) -> rusqlite::Result<Vec<T>> {
    match s.filter(|s| !s.is_empty()) {
        Some(s) => serde_json::from_str(&s).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        }),
        None => Ok(Vec::new()),
    }
}

/// Strict Display/FromStr enum column decode
pub(crate) fn parse_enum<T>(s: String) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    s.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, e.into())
    })
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// WHERE-clause suffix and bind values for a [`ListFilter`]
pub(crate) fn filter_sql(filter: &ListFilter) -> (String, Vec<String>) {
    let mut clause = String::new();
    let mut binds = Vec::new();

    if !filter.include_hidden {
        clause.push_str(" AND hidden = 0");
    }
    if filter.starred_only {
        clause.push_str(" AND starred = 1");
    }
    if let Some(id) = filter.category_id {
        clause.push_str(" AND category_id = ?");
        binds.push(id.to_string());
    }

    (clause, binds)
}

pub(crate) fn flag(i: i64) -> bool {
    i != 0
}

pub(crate) fn as_flag(b: bool) -> i64 {
    if b {
        1
    } else {
        0
    }
}
