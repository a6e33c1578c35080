//! Startup pull from the server into the local store.

use tracing::{info, warn};

use super::Peer;
use crate::db::StoreError;
use crate::remote::{RemoteError, RemoteGateway};
use crate::store::ItemStore;

/// What the startup pull did.
#[derive(Debug)]
pub enum ReconcileOutcome {
  /// Server not configured or not reachable; local items untouched.
  Offline,
  /// Local items replaced by the server's list.
  Replaced { count: usize },
  /// Server answered the probe but its list could not be fetched or was
  /// rejected; local items untouched.
  Aborted(RemoteError),
}

/// Replace the local items with the server's list, if the server is reachable.
///
/// The server wins outright. Items created or edited locally while it was
/// unreachable and never pushed are discarded by the replace.
pub async fn reconcile<S, G>(store: &S, peer: &Peer<G>) -> Result<ReconcileOutcome, StoreError>
where
  S: ItemStore,
  G: RemoteGateway,
{
  let Some(gateway) = peer.reachable().await else {
    return Ok(ReconcileOutcome::Offline);
  };

  // Fetch fully before touching the store
  let items = match gateway.list_items().await {
    Ok(items) => items,
    Err(e) => {
      warn!(error = %e, "startup sync aborted, keeping local items");
      return Ok(ReconcileOutcome::Aborted(e));
    }
  };

  // A row the local store would refuse is a bad reply, not a local failure
  if let Some(rejected) = items.iter().find_map(|item| {
    item
      .validate()
      .err()
      .map(|e| RemoteError::InvalidResponse(format!("item {}: {}", item.id, e)))
  }) {
    warn!(error = %rejected, "startup sync aborted, keeping local items");
    return Ok(ReconcileOutcome::Aborted(rejected));
  }

  let count = items.len();
  store.replace_all(items).await?;
  info!(count, "replaced local items from server");

  Ok(ReconcileOutcome::Replaced { count })
}
