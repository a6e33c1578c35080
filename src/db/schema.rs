//! Versioned schema for the local database.
//!
//! Each entry in [`MIGRATIONS`] moves the database from version `index` to
//! `index + 1`. The applied version lives in `PRAGMA user_version`.

/// Inventory items, the local source of truth.
const ITEMS_V1: &str = r#"
CREATE TABLE IF NOT EXISTS items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    weight REAL,
    price REAL NOT NULL DEFAULT 0,
    expiry TEXT,
    qty INTEGER NOT NULL DEFAULT 0
);
"#;

/// Application shell cache generations and their stored responses.
const SHELL_CACHE_V2: &str = r#"
CREATE TABLE IF NOT EXISTS shell_caches (
    name TEXT PRIMARY KEY,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS shell_entries (
    cache_name TEXT NOT NULL,
    url_hash TEXT NOT NULL,
    url TEXT NOT NULL,
    status INTEGER NOT NULL,
    content_type TEXT,
    body BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (cache_name, url_hash),
    FOREIGN KEY (cache_name) REFERENCES shell_caches(name) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_shell_entries_hash ON shell_entries(url_hash);
"#;

pub const MIGRATIONS: &[&str] = &[ITEMS_V1, SHELL_CACHE_V2];

/// Schema version a fully migrated database reports.
pub fn latest_version() -> u32 {
  MIGRATIONS.len() as u32
}
