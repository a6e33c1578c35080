//! SQLite implementation of the item store.

use rusqlite::{params, Connection, Row};
use tracing::debug;

use super::ItemStore;
use crate::db::{Database, StoreError};
use crate::inventory::{Item, NewItem};

/// Item store backed by the shared local database.
#[derive(Clone)]
pub struct SqliteItemStore {
  db: Database,
}

impl SqliteItemStore {
  pub fn new(db: Database) -> Self {
    Self { db }
  }
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
  Ok(Item {
    id: row.get(0)?,
    name: row.get(1)?,
    weight: row.get(2)?,
    price: row.get(3)?,
    expiry: row.get(4)?,
    qty: row.get(5)?,
  })
}

fn upsert(conn: &Connection, item: &Item) -> Result<(), StoreError> {
  conn.execute(
    "INSERT OR REPLACE INTO items (id, name, weight, price, expiry, qty)
     VALUES (?, ?, ?, ?, ?, ?)",
    params![item.id, item.name, item.weight, item.price, item.expiry, item.qty],
  )?;
  Ok(())
}

impl ItemStore for SqliteItemStore {
  async fn add(&self, item: &NewItem) -> Result<i64, StoreError> {
    item.validate()?;
    let item = item.clone();

    let id = self
      .db
      .call(move |conn| {
        conn.execute(
          "INSERT INTO items (name, weight, price, expiry, qty) VALUES (?, ?, ?, ?, ?)",
          params![item.name, item.weight, item.price, item.expiry, item.qty],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    debug!(id, "added item locally");
    Ok(id)
  }

  async fn put(&self, item: &Item) -> Result<(), StoreError> {
    item.validate()?;
    let item = item.clone();
    self.db.call(move |conn| upsert(conn, &item)).await
  }

  async fn get_all(&self) -> Result<Vec<Item>, StoreError> {
    self
      .db
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT id, name, weight, price, expiry, qty FROM items ORDER BY id")?;
        let items = stmt
          .query_map([], item_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
      })
      .await
  }

  async fn delete(&self, id: i64) -> Result<(), StoreError> {
    self
      .db
      .call(move |conn| {
        conn.execute("DELETE FROM items WHERE id = ?", params![id])?;
        Ok(())
      })
      .await
  }

  async fn clear(&self) -> Result<(), StoreError> {
    self
      .db
      .call(|conn| {
        conn.execute("DELETE FROM items", [])?;
        Ok(())
      })
      .await
  }

  async fn replace_all(&self, items: Vec<Item>) -> Result<(), StoreError> {
    for item in &items {
      item.validate()?;
    }

    let count = items.len();
    self
      .db
      .call(move |conn| {
        // Dropping the transaction on error rolls back, keeping the old rows
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM items", [])?;
        for item in &items {
          upsert(&tx, item)?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    debug!(count, "replaced local items");
    Ok(())
  }
}
