//! Cart totals and inventory reporting.

mod cart;

pub use cart::{Cart, CartLine};

use crate::inventory::Item;

/// GST applied to cart totals unless configured otherwise.
pub const DEFAULT_TAX_RATE: f64 = 0.18;

/// Cart totals before and after tax.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals {
  pub subtotal: f64,
  pub tax: f64,
  pub grand_total: f64,
}

impl Totals {
  pub fn new(subtotal: f64, tax_rate: f64) -> Self {
    let tax = subtotal * tax_rate;
    Self {
      subtotal,
      tax,
      grand_total: subtotal + tax,
    }
  }
}

/// Stock summary over every item in the local store.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InventoryReport {
  pub total_qty: u64,
  /// Sum of price × quantity
  pub total_value: f64,
}

impl InventoryReport {
  pub fn from_items(items: &[Item]) -> Self {
    items.iter().fold(Self::default(), |acc, item| Self {
      total_qty: acc.total_qty + u64::from(item.qty),
      total_value: acc.total_value + item.value(),
    })
  }
}
