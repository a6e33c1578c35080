//! Remote-first writes that always land in the local store.

use tracing::{debug, warn};

use super::locks::ItemLocks;
use super::Peer;
use crate::db::StoreError;
use crate::inventory::{Item, NewItem};
use crate::remote::{RemoteError, RemoteGateway};
use crate::store::ItemStore;

/// How a write reached the local store.
#[derive(Debug)]
pub enum Route {
  /// Server accepted the write; its result was mirrored locally.
  Remote,
  /// Server was reachable but failed the write; written locally only.
  LocalFallback(RemoteError),
  /// Server not configured or unreachable; written locally only.
  LocalOnly,
}

impl Route {
  pub fn is_remote(&self) -> bool {
    matches!(self, Route::Remote)
  }
}

/// Result of a routed write.
#[derive(Debug)]
pub struct WriteOutcome<T> {
  pub value: T,
  pub route: Route,
}

/// Routes every mutation: server first when reachable, then the local store.
///
/// Only local store failures are returned as errors; server failures are
/// absorbed by falling back to a local-only write.
pub struct WriteRouter<S, G> {
  store: S,
  peer: Peer<G>,
  locks: ItemLocks,
}

impl<S, G> WriteRouter<S, G>
where
  S: ItemStore,
  G: RemoteGateway,
{
  pub fn new(store: S, peer: Peer<G>) -> Self {
    Self {
      store,
      peer,
      locks: ItemLocks::default(),
    }
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  pub fn peer(&self) -> &Peer<G> {
    &self.peer
  }

  /// Create an item. The id comes from the server when it accepts the
  /// create, otherwise from the local store.
  pub async fn create(&self, draft: NewItem) -> Result<WriteOutcome<Item>, StoreError> {
    draft.validate()?;

    let route = match self.peer.reachable().await {
      Some(gateway) => match gateway.create_item(&draft).await {
        Ok(created) => {
          let created = mirror_copy(draft.with_id(created.id), created);
          self.store.put(&created).await?;
          debug!(id = created.id, "created item on server");
          return Ok(WriteOutcome {
            value: created,
            route: Route::Remote,
          });
        }
        Err(e) => {
          warn!(error = %e, "server create failed, saving locally");
          Route::LocalFallback(e)
        }
      },
      None => Route::LocalOnly,
    };

    let id = self.store.add(&draft).await?;
    Ok(WriteOutcome {
      value: draft.with_id(id),
      route,
    })
  }

  /// Update an item by id.
  ///
  /// An item created while offline is unknown to the server, which fails the
  /// update; that is handled like any other server failure.
  pub async fn update(&self, item: Item) -> Result<WriteOutcome<Item>, StoreError> {
    item.validate()?;
    let _guard = self.locks.acquire(item.id).await;

    let route = match self.peer.reachable().await {
      Some(gateway) => match gateway.update_item(&item).await {
        Ok(updated) => {
          let updated = mirror_copy(item, updated);
          self.store.put(&updated).await?;
          debug!(id = updated.id, "updated item on server");
          return Ok(WriteOutcome {
            value: updated,
            route: Route::Remote,
          });
        }
        Err(e) => {
          warn!(id = item.id, error = %e, "server update failed, saving locally");
          Route::LocalFallback(e)
        }
      },
      None => Route::LocalOnly,
    };

    self.store.put(&item).await?;
    Ok(WriteOutcome { value: item, route })
  }

  /// Delete an item by id. The local copy is removed whatever the server says.
  pub async fn delete(&self, id: i64) -> Result<WriteOutcome<()>, StoreError> {
    let _guard = self.locks.acquire(id).await;

    let route = match self.peer.reachable().await {
      Some(gateway) => match gateway.delete_item(id).await {
        Ok(true) => Route::Remote,
        Ok(false) => {
          warn!(id, "server refused delete, deleting locally");
          Route::LocalFallback(RemoteError::InvalidResponse(
            "delete not acknowledged".to_string(),
          ))
        }
        Err(e) => {
          warn!(id, error = %e, "server delete failed, deleting locally");
          Route::LocalFallback(e)
        }
      },
      None => Route::LocalOnly,
    };

    self.store.delete(id).await?;
    Ok(WriteOutcome { value: (), route })
  }
}

/// The server's copy of an accepted write, or the submitted one when the
/// server's copy would not pass local validation.
fn mirror_copy(submitted: Item, returned: Item) -> Item {
  match returned.validate() {
    Ok(()) => returned,
    Err(e) => {
      warn!(id = returned.id, error = %e, "server returned an invalid item, mirroring the submitted one");
      Item {
        id: returned.id,
        ..submitted
      }
    }
  }
}
