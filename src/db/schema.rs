//! SQL DDL for initializing the trainer database.
//! Every statement is `IF NOT EXISTS`, so running it on an existing schema is a no-op.

/// SQLite schema with:
/// - `users`: `username` UNIQUE, `password` holds a PHC hash string
/// - `app_config`: singleton row (`id` pinned to 1) carrying the session secret
/// - `sounds`, `questions`, `lesions`: reference data; id lists stored as JSON text
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS app_config (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    secret BLOB NOT NULL UNIQUE CHECK (length(secret) = 24)
);

CREATE TABLE IF NOT EXISTS sounds (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    path TEXT NOT NULL UNIQUE,
    picture TEXT NULL
);

CREATE TABLE IF NOT EXISTS questions (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL DEFAULT '',
    sound_ids TEXT NOT NULL DEFAULT '[]', -- JSON array of sounds.id
    difficulty INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS lesions (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    question_ids TEXT NOT NULL DEFAULT '[]', -- JSON array of questions.id
    difficulty INTEGER NOT NULL DEFAULT 0
);
"#;

/// Primary key of the only `app_config` row.
pub const APP_CONFIG_ID: i64 = 1;
