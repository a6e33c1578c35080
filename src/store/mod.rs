//! Local item store: the source of truth every read is served from.
//!
//! The store works whether or not the server is reachable. Writes from the
//! server are mirrored into it before their ids are trusted.

mod sqlite;

pub use sqlite::SqliteItemStore;

use std::future::Future;

use crate::db::StoreError;
use crate::inventory::{Item, NewItem};

/// Asynchronous CRUD over the single table of items.
pub trait ItemStore: Send + Sync {
  /// Insert an item, assigning it a new unique id.
  fn add(&self, item: &NewItem) -> impl Future<Output = Result<i64, StoreError>> + Send;

  /// Insert or overwrite the record with `item.id`.
  fn put(&self, item: &Item) -> impl Future<Output = Result<(), StoreError>> + Send;

  /// Every stored item, in no particular order.
  fn get_all(&self) -> impl Future<Output = Result<Vec<Item>, StoreError>> + Send;

  /// Remove an item. Absent ids are not an error.
  fn delete(&self, id: i64) -> impl Future<Output = Result<(), StoreError>> + Send;

  /// Remove every item.
  fn clear(&self) -> impl Future<Output = Result<(), StoreError>> + Send;

  /// Replace the whole table with `items`.
  ///
  /// Implementations backed by a transactional store should override this so
  /// a failure part-way leaves the previous contents in place.
  fn replace_all(&self, items: Vec<Item>) -> impl Future<Output = Result<(), StoreError>> + Send {
    async move {
      self.clear().await?;
      for item in &items {
        self.put(item).await?;
      }
      Ok(())
    }
  }
}
