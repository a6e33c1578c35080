use thiserror::Error;

/// Failures of the local persistent store.
///
/// There is nothing beneath the local store to fall back on, so these are
/// surfaced to the caller instead of being swallowed.
#[derive(Error, Debug)]
pub enum StoreError {
  #[error("SQLite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("Failed to create database directory: {0}")]
  Io(#[from] std::io::Error),

  #[error("Database lock poisoned: {0}")]
  Poisoned(String),

  #[error("Store task failed: {0}")]
  Task(#[from] tokio::task::JoinError),

  #[error("Invalid item: {0}")]
  InvalidItem(String),

  #[error("Item {0} not found")]
  NotFound(i64),
}
