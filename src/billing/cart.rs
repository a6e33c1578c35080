use crate::inventory::Item;

use super::Totals;

/// One line of the cart. Always has a quantity of at least one.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
  pub id: i64,
  pub name: String,
  pub price: f64,
  pub qty: u32,
}

impl CartLine {
  pub fn total(&self) -> f64 {
    self.price * f64::from(self.qty)
  }
}

/// In-memory cart, one line per item id. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct Cart {
  lines: Vec<CartLine>,
}

impl Cart {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add one unit of `item`, starting a new line on first add.
  pub fn add(&mut self, item: &Item) {
    if self.increment(item.id) {
      return;
    }
    self.lines.push(CartLine {
      id: item.id,
      name: item.name.clone(),
      price: item.price,
      qty: 1,
    });
  }

  /// Returns false if there is no line for `id`.
  pub fn increment(&mut self, id: i64) -> bool {
    match self.lines.iter_mut().find(|l| l.id == id) {
      Some(line) => {
        line.qty += 1;
        true
      }
      None => false,
    }
  }

  /// Take one unit off the line for `id`, dropping the line at zero.
  /// Returns false if there is no line for `id`.
  pub fn decrement(&mut self, id: i64) -> bool {
    let Some(pos) = self.lines.iter().position(|l| l.id == id) else {
      return false;
    };
    if self.lines[pos].qty <= 1 {
      self.lines.remove(pos);
    } else {
      self.lines[pos].qty -= 1;
    }
    true
  }

  pub fn remove(&mut self, id: i64) -> bool {
    let before = self.lines.len();
    self.lines.retain(|l| l.id != id);
    self.lines.len() != before
  }

  pub fn clear(&mut self) {
    self.lines.clear();
  }

  pub fn lines(&self) -> &[CartLine] {
    &self.lines
  }

  pub fn is_empty(&self) -> bool {
    self.lines.is_empty()
  }

  pub fn subtotal(&self) -> f64 {
    self.lines.iter().map(CartLine::total).sum()
  }

  pub fn totals(&self, tax_rate: f64) -> Totals {
    Totals::new(self.subtotal(), tax_rate)
  }
}
