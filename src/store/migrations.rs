//! Ordered, versioned schema migrations.
//!
//! Each migration runs exactly once, inside its own transaction, and the
//! applied version is recorded in the meta table. Any failure propagates;
//! the store never starts on a partially migrated schema.

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;

const SCHEMA_VERSION_KEY: &str = "schema_version";

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "baseline",
        sql: "
            CREATE TABLE IF NOT EXISTS categories (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                color TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS notes (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                body TEXT,
                tags TEXT,
                category_id TEXT,
                starred INTEGER NOT NULL DEFAULT 0,
                hidden INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sparks (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                body TEXT,
                tags TEXT,
                category_id TEXT,
                starred INTEGER NOT NULL DEFAULT 0,
                hidden INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS actions (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                body TEXT,
                description TEXT,
                tags TEXT,
                done INTEGER NOT NULL DEFAULT 0,
                completed INTEGER NOT NULL DEFAULT 0,
                priority TEXT NOT NULL DEFAULT 'normal',
                due_date TEXT,
                sub_tasks TEXT,
                sub_actions TEXT,
                parent_id TEXT,
                parent_type TEXT,
                category_id TEXT,
                starred INTEGER NOT NULL DEFAULT 0,
                hidden INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS paths (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                start_date TEXT,
                target_date TEXT,
                tags TEXT,
                category_id TEXT,
                starred INTEGER NOT NULL DEFAULT 0,
                hidden INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS milestones (
                id TEXT PRIMARY KEY,
                path_id TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                milestone_order INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS loops (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                frequency TEXT NOT NULL DEFAULT 'daily',
                tags TEXT,
                category_id TEXT,
                starred INTEGER NOT NULL DEFAULT 0,
                hidden INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS loop_items (
                id TEXT PRIMARY KEY,
                loop_id TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                duration_minutes INTEGER,
                quantity INTEGER,
                item_order INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_actions_parent ON actions(parent_type, parent_id);
            CREATE INDEX IF NOT EXISTS idx_milestones_path ON milestones(path_id);
            CREATE INDEX IF NOT EXISTS idx_loop_items_loop ON loop_items(loop_id);
            CREATE INDEX IF NOT EXISTS idx_notes_category ON notes(category_id);
            CREATE INDEX IF NOT EXISTS idx_actions_category ON actions(category_id);
        ",
    },
    Migration {
        version: 2,
        name: "milestone collapse state and spark links",
        sql: "
            ALTER TABLE milestones ADD COLUMN collapsed INTEGER NOT NULL DEFAULT 0;
            ALTER TABLE sparks ADD COLUMN linked_entry_ids TEXT;
        ",
    },
    Migration {
        version: 3,
        name: "action ordering within a parent",
        sql: "
            ALTER TABLE actions ADD COLUMN action_order INTEGER NOT NULL DEFAULT 0;
        ",
    },
];

/// Bring the database up to the latest schema version
pub(crate) fn apply_all(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;

    let current = current_version(conn)?;

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql)?;
        tx.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
            params![SCHEMA_VERSION_KEY, migration.version.to_string()],
        )?;
        tx.commit()?;
        tracing::info!(
            version = migration.version,
            name = migration.name,
            "applied schema migration"
        );
    }

    Ok(())
}

fn current_version(conn: &Connection) -> Result<i64> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM meta WHERE key = ?1",
            [SCHEMA_VERSION_KEY],
            |row| row.get(0),
        )
        .optional()?;

    Ok(value.and_then(|v| v.parse().ok()).unwrap_or(0))
}
