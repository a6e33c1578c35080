use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::db::StoreError;

/// An inventory record as stored locally and exchanged with the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
  pub id: i64,
  pub name: String,
  /// Weight in kg
  #[serde(default)]
  pub weight: Option<f64>,
  #[serde(default)]
  pub price: f64,
  #[serde(default, deserialize_with = "deserialize_expiry")]
  pub expiry: Option<NaiveDate>,
  #[serde(default)]
  pub qty: u32,
}

/// An item that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
  pub name: String,
  pub weight: Option<f64>,
  pub price: f64,
  pub expiry: Option<NaiveDate>,
  pub qty: u32,
}

impl NewItem {
  pub fn new(name: impl Into<String>, price: f64, qty: u32) -> Self {
    Self {
      name: name.into(),
      weight: None,
      price,
      expiry: None,
      qty,
    }
  }

  pub fn with_weight(mut self, weight: f64) -> Self {
    self.weight = Some(weight);
    self
  }

  pub fn with_expiry(mut self, expiry: NaiveDate) -> Self {
    self.expiry = Some(expiry);
    self
  }

  /// Attach an id, producing a full record.
  pub fn with_id(self, id: i64) -> Item {
    Item {
      id,
      name: self.name,
      weight: self.weight,
      price: self.price,
      expiry: self.expiry,
      qty: self.qty,
    }
  }

  pub fn validate(&self) -> Result<(), StoreError> {
    validate_fields(&self.name, self.price, self.weight)
  }
}

impl Item {
  pub fn validate(&self) -> Result<(), StoreError> {
    validate_fields(&self.name, self.price, self.weight)
  }

  /// The item without its id, as sent on create.
  pub fn to_new(&self) -> NewItem {
    NewItem {
      name: self.name.clone(),
      weight: self.weight,
      price: self.price,
      expiry: self.expiry,
      qty: self.qty,
    }
  }

  /// Stock value of this line (price × quantity).
  pub fn value(&self) -> f64 {
    self.price * f64::from(self.qty)
  }
}

fn validate_fields(name: &str, price: f64, weight: Option<f64>) -> Result<(), StoreError> {
  if name.trim().is_empty() {
    return Err(StoreError::InvalidItem("name must not be empty".to_string()));
  }
  if !price.is_finite() || price < 0.0 {
    return Err(StoreError::InvalidItem(format!(
      "price must be a non-negative number, got {}",
      price
    )));
  }
  if let Some(w) = weight {
    if !w.is_finite() || w < 0.0 {
      return Err(StoreError::InvalidItem(format!(
        "weight must be a non-negative number, got {}",
        w
      )));
    }
  }
  Ok(())
}

/// Form posts send `""` for a blank date; treat it like null.
fn deserialize_expiry<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
  D: Deserializer<'de>,
{
  let raw: Option<String> = Option::deserialize(deserializer)?;
  match raw.as_deref().map(str::trim) {
    None | Some("") => Ok(None),
    Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
      .map(Some)
      .map_err(serde::de::Error::custom),
  }
}
