//! SQLite storage for shell cache generations.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use url::Url;

use super::network::ShellResponse;
use crate::db::{Database, StoreError};

/// A cache generation and how much it holds.
#[derive(Debug, Clone)]
pub struct Generation {
  pub name: String,
  pub created_at: DateTime<Utc>,
  pub entries: usize,
}

/// Named cache generations of response snapshots, keyed by request URL.
#[derive(Clone)]
pub struct ShellStorage {
  db: Database,
}

/// Stable, fixed-length key for a request URL. Fragments never reach the
/// server, so they do not take part in the key.
pub fn url_key(url: &Url) -> String {
  let mut url = url.clone();
  url.set_fragment(None);

  let mut hasher = Sha256::new();
  hasher.update(url.as_str().as_bytes());
  hex::encode(hasher.finalize())
}

fn insert_entry(
  conn: &Connection,
  cache_name: &str,
  url: &Url,
  response: &ShellResponse,
) -> Result<(), StoreError> {
  conn.execute(
    "INSERT OR REPLACE INTO shell_entries (cache_name, url_hash, url, status, content_type, body, cached_at)
     VALUES (?, ?, ?, ?, ?, ?, datetime('now'))",
    params![
      cache_name,
      url_key(url),
      url.as_str(),
      response.status,
      response.content_type,
      response.body
    ],
  )?;
  Ok(())
}

fn ensure_cache(conn: &Connection, name: &str) -> Result<(), StoreError> {
  conn.execute(
    "INSERT OR IGNORE INTO shell_caches (name) VALUES (?)",
    params![name],
  )?;
  Ok(())
}

impl ShellStorage {
  pub fn new(db: Database) -> Self {
    Self { db }
  }

  /// Store a whole generation at once: either every entry lands or none do.
  pub async fn put_all(
    &self,
    cache_name: &str,
    entries: Vec<(Url, ShellResponse)>,
  ) -> Result<(), StoreError> {
    let cache_name = cache_name.to_string();
    self
      .db
      .call(move |conn| {
        let tx = conn.transaction()?;
        ensure_cache(&tx, &cache_name)?;
        for (url, response) in &entries {
          insert_entry(&tx, &cache_name, url, response)?;
        }
        tx.commit()?;
        Ok(())
      })
      .await
  }

  pub async fn put(
    &self,
    cache_name: &str,
    url: &Url,
    response: &ShellResponse,
  ) -> Result<(), StoreError> {
    self.put_all(cache_name, vec![(url.clone(), response.clone())]).await
  }

  /// Look `url` up in every generation, oldest generation first.
  pub async fn match_url(&self, url: &Url) -> Result<Option<ShellResponse>, StoreError> {
    let key = url_key(url);
    self
      .db
      .call(move |conn| {
        let found = conn
          .query_row(
            "SELECT e.status, e.content_type, e.body FROM shell_entries e
             INNER JOIN shell_caches c ON c.name = e.cache_name
             WHERE e.url_hash = ?
             ORDER BY c.created_at, c.rowid
             LIMIT 1",
            params![key],
            |row| {
              Ok(ShellResponse {
                status: row.get(0)?,
                content_type: row.get(1)?,
                body: row.get(2)?,
              })
            },
          )
          .optional()?;
        Ok(found)
      })
      .await
  }

  pub async fn has_cache(&self, name: &str) -> Result<bool, StoreError> {
    let name = name.to_string();
    self
      .db
      .call(move |conn| {
        let found: Option<i64> = conn
          .query_row(
            "SELECT 1 FROM shell_caches WHERE name = ?",
            params![name],
            |row| row.get(0),
          )
          .optional()?;
        Ok(found.is_some())
      })
      .await
  }

  pub async fn generations(&self) -> Result<Vec<Generation>, StoreError> {
    self
      .db
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT c.name, c.created_at, COUNT(e.url_hash) FROM shell_caches c
           LEFT JOIN shell_entries e ON e.cache_name = c.name
           GROUP BY c.name
           ORDER BY c.created_at, c.rowid",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok((
              row.get::<_, String>(0)?,
              row.get::<_, String>(1)?,
              row.get::<_, i64>(2)?,
            ))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        rows
          .into_iter()
          .map(|(name, created_at, entries)| -> Result<Generation, StoreError> {
            Ok(Generation {
              name,
              created_at: parse_datetime(&created_at)?,
              entries: entries as usize,
            })
          })
          .collect()
      })
      .await
  }

  pub async fn cache_names(&self) -> Result<Vec<String>, StoreError> {
    Ok(self.generations().await?.into_iter().map(|g| g.name).collect())
  }

  /// Drop a generation and everything stored in it.
  pub async fn delete_cache(&self, name: &str) -> Result<bool, StoreError> {
    let name = name.to_string();
    self
      .db
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM shell_entries WHERE cache_name = ?", params![name])?;
        let removed = tx.execute("DELETE FROM shell_caches WHERE name = ?", params![name])?;
        tx.commit()?;
        Ok(removed > 0)
      })
      .await
  }
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| {
      StoreError::Sqlite(rusqlite::Error::FromSqlConversionFailure(
        1,
        rusqlite::types::Type::Text,
        Box::new(e),
      ))
    })
}
