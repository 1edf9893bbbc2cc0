//! Per-user storage for voice abilities.
//!
//! Abilities get a [`FileStorage`] scoped to the current user with four
//! primitives (exists, read, append-write, delete) plus an explicit
//! [`FileStorage::replace`].  Three backends are provided:
//!
//! - [`LocalFileStorage`]: one directory per user, atomic rename on replace.
//! - [`SqliteStorage`]: rows in a WAL-mode SQLite [`Database`].
//! - [`MemoryStorage`]: process-local, for tests and throwaway sessions.
//!
//! Structured state goes through [`save_json`] / [`load_json`], which
//! keep a backup copy so a crash mid-save never loses the list.

pub mod db;
pub mod document;
pub mod error;
pub mod local;
pub mod migration;
pub mod sqlite;
pub mod storage;

pub use db::Database;
pub use document::{LineLog, load_json, save_json};
pub use error::{StoreError, StoreResult};
pub use local::LocalFileStorage;
pub use sqlite::SqliteStorage;
pub use storage::{FileStorage, MemoryStorage, validate_name};
