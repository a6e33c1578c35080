mod error;
pub mod schema;

pub use error::StoreError;

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Shared handle to the local SQLite database.
///
/// Opened once at startup and cloned into every consumer. Cloning is cheap;
/// all clones share one connection.
#[derive(Clone)]
pub struct Database {
  conn: Arc<Mutex<Connection>>,
}

impl Database {
  /// Open or create the database at `path`, running pending migrations.
  pub fn open(path: &Path) -> Result<Self, StoreError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(path)?;
    debug!(path = %path.display(), "opened database");
    Self::from_connection(conn)
  }

  /// Open a private in-memory database. Used by tests.
  pub fn open_in_memory() -> Result<Self, StoreError> {
    Self::from_connection(Connection::open_in_memory()?)
  }

  fn from_connection(mut conn: Connection) -> Result<Self, StoreError> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    run_migrations(&mut conn)?;
    Ok(Self {
      conn: Arc::new(Mutex::new(conn)),
    })
  }

  /// Get the default database path
  pub fn default_path() -> Option<PathBuf> {
    let data_dir = dirs::data_dir().or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))?;
    Some(data_dir.join("stockroom").join("stockroom.db"))
  }

  /// Run `f` against the connection on the blocking pool.
  ///
  /// Each call is one unit of work: callers open and finish any transaction
  /// inside `f`, nothing is carried across calls.
  pub async fn call<T, F>(&self, f: F) -> Result<T, StoreError>
  where
    T: Send + 'static,
    F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
  {
    let conn = Arc::clone(&self.conn);
    tokio::task::spawn_blocking(move || {
      let mut conn = conn
        .lock()
        .map_err(|e| StoreError::Poisoned(e.to_string()))?;
      f(&mut conn)
    })
    .await?
  }

  /// Current schema version as recorded in the database.
  pub async fn schema_version(&self) -> Result<u32, StoreError> {
    self.call(|conn| user_version(conn)).await
  }

  /// Release the connection.
  ///
  /// The connection is only closed here when this is the last handle; other
  /// clones keep it alive until they are dropped.
  pub fn close(self) -> Result<(), StoreError> {
    match Arc::try_unwrap(self.conn) {
      Ok(mutex) => {
        let conn = mutex
          .into_inner()
          .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        conn.close().map_err(|(_, e)| StoreError::Sqlite(e))?;
        debug!("closed database");
        Ok(())
      }
      Err(_) => Ok(()),
    }
  }
}

fn user_version(conn: &Connection) -> Result<u32, StoreError> {
  Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

/// Apply every migration above the stored version, one transaction each.
fn run_migrations(conn: &mut Connection) -> Result<(), StoreError> {
  let current = user_version(conn)? as usize;

  for (index, sql) in schema::MIGRATIONS.iter().enumerate().skip(current) {
    let version = index + 1;
    let tx = conn.transaction()?;
    tx.execute_batch(sql)?;
    tx.execute_batch(&format!("PRAGMA user_version = {}", version))?;
    tx.commit()?;
    info!(version, "applied database migration");
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_fresh_database_is_fully_migrated() {
    let db = Database::open_in_memory().unwrap();
    assert_eq!(db.schema_version().await.unwrap(), schema::latest_version());
  }

  #[test]
  fn test_migrations_run_once() {
    let dir = std::env::temp_dir().join(format!("stockroom-db-test-{}", std::process::id()));
    let path = dir.join("reopen.db");
    let _ = std::fs::remove_file(&path);

    {
      let db = Database::open(&path).unwrap();
      let conn = db.conn.lock().unwrap();
      conn
        .execute("INSERT INTO items (name, price, qty) VALUES ('Rice', 50, 2)", [])
        .unwrap();
    }

    // Reopening must not re-run the schema step or lose rows
    let db = Database::open(&path).unwrap();
    let conn = db.conn.lock().unwrap();
    let count: i64 = conn
      .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))
      .unwrap();
    assert_eq!(count, 1);
    assert_eq!(user_version(&conn).unwrap(), schema::latest_version());
    drop(conn);
    drop(db);

    let _ = std::fs::remove_dir_all(&dir);
  }

  #[test]
  fn test_partial_version_applies_remaining_migrations() {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(schema::MIGRATIONS[0]).unwrap();
    conn.execute_batch("PRAGMA user_version = 1").unwrap();

    run_migrations(&mut conn).unwrap();

    assert_eq!(user_version(&conn).unwrap(), 2);
    let tables: i64 = conn
      .query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'shell_caches'",
        [],
        |row| row.get(0),
      )
      .unwrap();
    assert_eq!(tables, 1);
  }
}
