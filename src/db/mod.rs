//! Database module: models, schema and first-run bootstrap.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `sqlite.rs`: pool setup and row access
//! - `bootstrap.rs`: idempotent schema/admin/secret initialization

pub mod bootstrap;
pub mod models;
pub mod schema;
pub mod sqlite;

pub use bootstrap::{ADMIN_USERNAME, ensure_initialized, initialize};
pub use models::{DbLesion, DbQuestion, DbSound, DbUser};
pub use schema::SQLITE_INIT;
pub use sqlite::{SqlitePool, TrainerStorage, connect};
