use thiserror::Error;

use crate::db::StoreError;

#[derive(Error, Debug)]
pub enum ShellError {
  #[error("Request for {url} failed: {reason}")]
  Network { url: String, reason: String },

  #[error("Asset {url} returned status {status}")]
  AssetStatus { url: String, status: u16 },

  #[error("Failed to install cache {cache}: {source}")]
  Install {
    cache: String,
    #[source]
    source: Box<ShellError>,
  },

  #[error("Cache {0} must be installed before it can be activated")]
  NotInstalled(String),

  #[error("Offline and no cached fallback for {0}")]
  Offline(String),

  #[error("Invalid URL: {0}")]
  Url(#[from] url::ParseError),

  #[error(transparent)]
  Store(#[from] StoreError),
}
