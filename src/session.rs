//! One user's working session: the cart plus every store and sync handle.

use tracing::info;

use crate::billing::{Cart, InventoryReport, Totals};
use crate::db::StoreError;
use crate::inventory::{Item, NewItem};
use crate::remote::RemoteGateway;
use crate::store::ItemStore;
use crate::sync::{reconcile, Peer, ReconcileOutcome, Route, WriteRouter};

/// Result of a mutation: how it was routed and the store contents afterwards.
#[derive(Debug)]
pub struct Applied<T> {
  pub value: T,
  pub route: Route,
  pub items: Vec<Item>,
}

/// Owns the cart and routes every action through the sync layer.
///
/// The local store is the only thing read back for display; each mutation is
/// followed by a full read.
pub struct Session<S, G> {
  router: WriteRouter<S, G>,
  cart: Cart,
  tax_rate: f64,
}

impl<S, G> Session<S, G>
where
  S: ItemStore,
  G: RemoteGateway,
{
  /// Start a session, pulling from the server once if it is reachable.
  pub async fn start(
    store: S,
    peer: Peer<G>,
    tax_rate: f64,
  ) -> Result<(Self, ReconcileOutcome), StoreError> {
    let outcome = reconcile(&store, &peer).await?;
    info!(?outcome, "session started");

    Ok((
      Self {
        router: WriteRouter::new(store, peer),
        cart: Cart::new(),
        tax_rate,
      },
      outcome,
    ))
  }

  pub async fn items(&self) -> Result<Vec<Item>, StoreError> {
    self.router.store().get_all().await
  }

  pub async fn item(&self, id: i64) -> Result<Item, StoreError> {
    self
      .items()
      .await?
      .into_iter()
      .find(|i| i.id == id)
      .ok_or(StoreError::NotFound(id))
  }

  pub async fn create(&self, draft: NewItem) -> Result<Applied<Item>, StoreError> {
    let outcome = self.router.create(draft).await?;
    self.applied(outcome.value, outcome.route).await
  }

  pub async fn update(&self, item: Item) -> Result<Applied<Item>, StoreError> {
    let outcome = self.router.update(item).await?;
    self.applied(outcome.value, outcome.route).await
  }

  pub async fn delete(&self, id: i64) -> Result<Applied<()>, StoreError> {
    let outcome = self.router.delete(id).await?;
    self.applied(outcome.value, outcome.route).await
  }

  /// Create a placeholder item named after the current item count.
  pub async fn add_sample(&self) -> Result<Applied<Item>, StoreError> {
    let count = self.items().await?.len();
    let draft = NewItem::new(format!("Sample Item {}", count + 1), 10.0, 1).with_weight(0.5);
    self.create(draft).await
  }

  async fn applied<T>(&self, value: T, route: Route) -> Result<Applied<T>, StoreError> {
    Ok(Applied {
      value,
      route,
      items: self.items().await?,
    })
  }

  /// Put one unit of a stored item in the cart.
  pub async fn add_to_cart(&mut self, id: i64) -> Result<(), StoreError> {
    let item = self.item(id).await?;
    self.cart.add(&item);
    Ok(())
  }

  pub fn cart(&self) -> &Cart {
    &self.cart
  }

  pub fn cart_mut(&mut self) -> &mut Cart {
    &mut self.cart
  }

  pub fn totals(&self) -> Totals {
    self.cart.totals(self.tax_rate)
  }

  pub async fn report(&self) -> Result<InventoryReport, StoreError> {
    Ok(InventoryReport::from_items(&self.items().await?))
  }
}
