//! In-process stand-in for the inventory server.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{RemoteError, RemoteGateway};
use crate::inventory::{Item, NewItem};

#[derive(Default)]
struct State {
  items: Vec<Item>,
  next_id: i64,
}

/// Behaves like the server: assigns ids, 404s on unknown ids.
/// Clones share state so a test can inspect what the code under test did.
#[derive(Clone, Default)]
pub struct FakeGateway {
  state: Arc<Mutex<State>>,
  reachable: Arc<AtomicBool>,
  fail_writes: Arc<AtomicBool>,
  fail_list: Arc<AtomicBool>,
  blank_replies: Arc<AtomicBool>,
  pings: Arc<AtomicUsize>,
  calls: Arc<AtomicUsize>,
}

impl FakeGateway {
  pub fn online() -> Self {
    let gw = Self::default();
    gw.set_reachable(true);
    gw.state.lock().unwrap().next_id = 1000;
    gw
  }

  pub fn offline() -> Self {
    let gw = Self::online();
    gw.set_reachable(false);
    gw
  }

  pub fn with_items(self, items: Vec<Item>) -> Self {
    self.state.lock().unwrap().items = items;
    self
  }

  pub fn set_reachable(&self, reachable: bool) {
    self.reachable.store(reachable, Ordering::SeqCst);
  }

  /// Make every mutating call answer with a 500.
  pub fn fail_writes(&self) {
    self.fail_writes.store(true, Ordering::SeqCst);
  }

  pub fn fail_list(&self) {
    self.fail_list.store(true, Ordering::SeqCst);
  }

  /// Accept writes but answer with a copy whose name is blank.
  pub fn blank_replies(&self) {
    self.blank_replies.store(true, Ordering::SeqCst);
  }

  pub fn items(&self) -> Vec<Item> {
    self.state.lock().unwrap().items.clone()
  }

  pub fn ping_count(&self) -> usize {
    self.pings.load(Ordering::SeqCst)
  }

  /// Number of non-ping requests received.
  pub fn call_count(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  fn request(&self) -> Result<(), RemoteError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if self.reachable.load(Ordering::SeqCst) {
      Ok(())
    } else {
      Err(RemoteError::Unreachable)
    }
  }

  fn writes_fail(&self) -> bool {
    self.fail_writes.load(Ordering::SeqCst)
  }

  fn reply(&self, item: Item) -> Item {
    if self.blank_replies.load(Ordering::SeqCst) {
      Item {
        name: String::new(),
        ..item
      }
    } else {
      item
    }
  }
}

impl RemoteGateway for FakeGateway {
  async fn ping(&self) -> bool {
    self.pings.fetch_add(1, Ordering::SeqCst);
    self.reachable.load(Ordering::SeqCst)
  }

  async fn list_items(&self) -> Result<Vec<Item>, RemoteError> {
    self.request()?;
    if self.fail_list.load(Ordering::SeqCst) {
      return Err(RemoteError::Fetch {
        status: 500,
        body: "boom".to_string(),
      });
    }
    Ok(self.items())
  }

  async fn create_item(&self, item: &NewItem) -> Result<Item, RemoteError> {
    self.request()?;
    if self.writes_fail() {
      return Err(RemoteError::Create {
        status: 500,
        body: "boom".to_string(),
      });
    }
    let mut state = self.state.lock().unwrap();
    state.next_id += 1;
    let created = item.clone().with_id(state.next_id);
    state.items.push(created.clone());
    Ok(self.reply(created))
  }

  async fn update_item(&self, item: &Item) -> Result<Item, RemoteError> {
    self.request()?;
    let id = item.id;
    if self.writes_fail() {
      return Err(RemoteError::Update {
        id,
        status: 500,
        body: "boom".to_string(),
      });
    }
    let mut state = self.state.lock().unwrap();
    match state.items.iter_mut().find(|i| i.id == id) {
      Some(existing) => {
        *existing = item.clone();
        Ok(self.reply(item.clone()))
      }
      None => Err(RemoteError::Update {
        id,
        status: 404,
        body: "not found".to_string(),
      }),
    }
  }

  async fn delete_item(&self, id: i64) -> Result<bool, RemoteError> {
    self.request()?;
    if self.writes_fail() {
      return Err(RemoteError::Delete {
        id,
        status: 500,
        body: "boom".to_string(),
      });
    }
    self.state.lock().unwrap().items.retain(|i| i.id != id);
    Ok(true)
  }
}
