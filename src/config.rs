use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::billing::DEFAULT_TAX_RATE;
use crate::db::Database;
use crate::shell::ShellManifest;

/// Environment variable that sets or overrides `remote.url`.
const API_URL_ENV: &str = "STOCKROOM_API_URL";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  /// Inventory server. Without one, everything stays local.
  pub remote: Option<RemoteConfig>,
  /// Database file (default: $XDG_DATA_HOME/stockroom/stockroom.db)
  pub database: Option<PathBuf>,
  #[serde(default)]
  pub billing: BillingConfig,
  #[serde(default)]
  pub shell: ShellConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
  pub url: Url,
  /// Request timeout; unset means the HTTP client's default
  pub timeout_secs: Option<u64>,
}

impl RemoteConfig {
  pub fn timeout(&self) -> Option<Duration> {
    self.timeout_secs.map(Duration::from_secs)
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
  #[serde(default = "default_tax_rate")]
  pub tax_rate: f64,
}

fn default_tax_rate() -> f64 {
  DEFAULT_TAX_RATE
}

impl Default for BillingConfig {
  fn default() -> Self {
    Self {
      tax_rate: DEFAULT_TAX_RATE,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShellConfig {
  /// Origin the shell is served from; only its requests are intercepted
  #[serde(default = "default_origin")]
  pub origin: String,
  #[serde(flatten)]
  pub manifest: ShellManifest,
}

fn default_origin() -> String {
  "http://localhost:8000".to_string()
}

impl Default for ShellConfig {
  fn default() -> Self {
    Self {
      origin: default_origin(),
      manifest: ShellManifest::default(),
    }
  }
}

impl ShellConfig {
  pub fn origin_url(&self) -> Result<Url> {
    Url::parse(&self.origin).map_err(|e| eyre!("Invalid shell.origin '{}': {}", self.origin, e))
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./stockroom.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/stockroom/config.yaml
  ///
  /// With no file found the defaults apply: local-only, 18% tax.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Self::default(),
    };

    config.with_env_overrides()
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("stockroom.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("stockroom").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    config.validate()?;
    config.shell.origin_url()?;
    Ok(config)
  }

  fn validate(&self) -> Result<()> {
    let rate = self.billing.tax_rate;
    if !rate.is_finite() || rate < 0.0 {
      return Err(eyre!("billing.tax_rate must be a non-negative number, got {}", rate));
    }
    Ok(())
  }

  fn with_env_overrides(self) -> Result<Self> {
    match std::env::var(API_URL_ENV) {
      Ok(raw) if !raw.trim().is_empty() => self.with_api_url(&raw),
      _ => Ok(self),
    }
  }

  fn with_api_url(mut self, raw: &str) -> Result<Self> {
    let url = Url::parse(raw.trim()).map_err(|e| eyre!("Invalid {} '{}': {}", API_URL_ENV, raw, e))?;
    let timeout_secs = self.remote.as_ref().and_then(|r| r.timeout_secs);
    self.remote = Some(RemoteConfig { url, timeout_secs });
    Ok(self)
  }

  /// Database location: configured path, else the platform data directory.
  pub fn database_path(&self) -> Result<PathBuf> {
    match &self.database {
      Some(path) => Ok(path.clone()),
      None => Database::default_path().ok_or_else(|| eyre!("Could not determine data directory")),
    }
  }
}
