use serde::Deserialize;

/// Name of the current cache generation. Changing it evicts older generations
/// on the next activation.
pub const DEFAULT_CACHE_NAME: &str = "inventory-pwa-v1";

/// Document served when a request can neither be answered from cache nor
/// fetched.
pub const DEFAULT_OFFLINE_FALLBACK: &str = "/index.html";

/// Application shell assets stored at install time.
pub const DEFAULT_ASSETS: &[&str] = &[
  "/",
  "/index.html",
  "/styles.css",
  "/scripts/app.js",
  "/manifest.json",
  "/icons/icon-192.png",
  "/icons/icon-512.png",
];

/// The fixed set of assets a cache generation is built from.
#[derive(Debug, Clone, Deserialize)]
pub struct ShellManifest {
  #[serde(default = "default_cache_name")]
  pub cache_name: String,
  #[serde(default = "default_assets")]
  pub assets: Vec<String>,
  #[serde(default = "default_offline_fallback")]
  pub offline_fallback: String,
}

fn default_cache_name() -> String {
  DEFAULT_CACHE_NAME.to_string()
}

fn default_assets() -> Vec<String> {
  DEFAULT_ASSETS.iter().map(|s| s.to_string()).collect()
}

fn default_offline_fallback() -> String {
  DEFAULT_OFFLINE_FALLBACK.to_string()
}

impl Default for ShellManifest {
  fn default() -> Self {
    Self {
      cache_name: default_cache_name(),
      assets: default_assets(),
      offline_fallback: default_offline_fallback(),
    }
  }
}
