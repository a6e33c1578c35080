//! Optional inventory server, treated as authoritative whenever reachable.

mod client;
mod error;
#[cfg(test)]
pub mod fake;

pub use client::HttpGateway;
pub use error::RemoteError;

use std::future::Future;

use crate::inventory::{Item, NewItem};

/// Stateless CRUD client for the server.
///
/// Reachability is never remembered between calls: the server may come and go
/// between two user actions.
pub trait RemoteGateway: Send + Sync {
  /// True only if the liveness probe succeeds. Never fails.
  fn ping(&self) -> impl Future<Output = bool> + Send;

  fn list_items(&self) -> impl Future<Output = Result<Vec<Item>, RemoteError>> + Send;

  /// Create an item; the server assigns its id.
  fn create_item(&self, item: &NewItem) -> impl Future<Output = Result<Item, RemoteError>> + Send;

  fn update_item(&self, item: &Item) -> impl Future<Output = Result<Item, RemoteError>> + Send;

  fn delete_item(&self, id: i64) -> impl Future<Output = Result<bool, RemoteError>> + Send;
}
