//! Versioned schema migrations.
//!
//! Applied versions are recorded in `_migrations`, so each migration runs
//! once per database.

use rusqlite::Connection;
use tracing::info;

use crate::error::{StoreError, StoreResult};

struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

/// All migrations in order.  Append only.
static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "per-user files",
    sql: r#"
        CREATE TABLE user_files (
            user_id    TEXT NOT NULL,
            name       TEXT NOT NULL,
            content    TEXT NOT NULL,
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (user_id, name)
        );
    "#,
}];

/// Apply every migration newer than the recorded version.
pub fn run_all(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version    INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        );",
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |row| row.get(0),
    )?;

    for m in MIGRATIONS.iter().filter(|m| m.version > current) {
        conn.execute_batch(&format!("BEGIN;\n{}\nCOMMIT;", m.sql))
            .map_err(|e| StoreError::Migration {
                version: m.version,
                message: e.to_string(),
            })?;
        conn.execute(
            "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
            rusqlite::params![m.version, chrono::Utc::now().timestamp()],
        )?;
        info!(version = m.version, description = m.description, "migration applied");
    }

    Ok(())
}
