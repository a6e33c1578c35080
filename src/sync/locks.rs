//! Per-item write serialization.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async mutex per item id.
///
/// Two writes to the same id run one after the other, so a slower first write
/// cannot land its local mirror after a faster second one. Writes to different
/// ids do not wait on each other.
#[derive(Clone, Default)]
pub struct ItemLocks {
  inner: Arc<Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>>,
}

impl ItemLocks {
  /// Wait until no other write holds `id`, then hold it until the guard drops.
  pub async fn acquire(&self, id: i64) -> OwnedMutexGuard<()> {
    let lock = {
      let mut map = match self.inner.lock() {
        Ok(map) => map,
        Err(poisoned) => poisoned.into_inner(),
      };
      // Drop entries nobody holds or waits on
      map.retain(|_, lock| Arc::strong_count(lock) > 1);
      Arc::clone(map.entry(id).or_default())
    };
    lock.lock_owned().await
  }

  #[cfg(test)]
  fn tracked(&self) -> usize {
    self.inner.lock().unwrap().len()
  }
}
