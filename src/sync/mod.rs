//! Keeping the local store in step with the optional server.
//!
//! - [`reconcile`] runs once at startup and, when the server answers, replaces
//!   the local items with the server's list.
//! - [`WriteRouter`] sends every create/update/delete to the server first when
//!   it is reachable and always mirrors the outcome into the local store.

mod locks;
mod reconciler;
mod router;

pub use reconciler::{reconcile, ReconcileOutcome};
pub use router::{Route, WriteOutcome, WriteRouter};

use tracing::debug;

use crate::remote::RemoteGateway;

/// The server, if one is configured, plus the one reachability check every
/// sync path goes through.
#[derive(Clone)]
pub struct Peer<G> {
  gateway: Option<G>,
}

impl<G: RemoteGateway> Peer<G> {
  pub fn new(gateway: G) -> Self {
    Self {
      gateway: Some(gateway),
    }
  }

  /// No server: every write goes straight to the local store.
  pub fn local_only() -> Self {
    Self { gateway: None }
  }

  /// Probe the server and hand it out only if it answered.
  ///
  /// Called afresh for each operation; the result is never cached.
  pub async fn reachable(&self) -> Option<&G> {
    let gateway = self.gateway.as_ref()?;
    if gateway.ping().await {
      Some(gateway)
    } else {
      debug!("server not reachable, working locally");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::remote::fake::FakeGateway;

  #[tokio::test]
  async fn test_local_only_never_pings() {
    let peer: Peer<FakeGateway> = Peer::local_only();
    assert!(peer.reachable().await.is_none());
  }

  #[tokio::test]
  async fn test_reachability_is_rechecked_each_time() {
    let gw = FakeGateway::online();
    let peer = Peer::new(gw.clone());

    assert!(peer.reachable().await.is_some());
    gw.set_reachable(false);
    assert!(peer.reachable().await.is_none());
    gw.set_reachable(true);
    assert!(peer.reachable().await.is_some());

    assert_eq!(gw.ping_count(), 3);
  }
}
