//! Install/activate lifecycle and the request interception policy.

use futures::future::try_join_all;
use reqwest::Method;
use tracing::{debug, info, warn};
use url::{Origin, Url};

use super::error::ShellError;
use super::manifest::ShellManifest;
use super::network::{Network, ShellRequest, ShellResponse};
use super::storage::ShellStorage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
  /// Manifest not (yet) stored. Requests are not intercepted.
  Installing,
  /// Manifest stored; waiting for activation.
  Installed,
  /// Older generations evicted; every request is intercepted.
  Active,
}

/// Where an intercepted response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
  Cache,
  Network,
  /// Live fetch failed; this is the cached offline document.
  OfflineFallback,
}

#[derive(Debug)]
pub enum Interception {
  /// Not handled here; the caller should send the request itself.
  Passthrough,
  Respond { response: ShellResponse, source: Source },
}

/// Versioned cache for the application shell.
///
/// Cache-first for every same-origin GET once active. Entries are never
/// refreshed while present: a stale asset stays until the cache name changes.
pub struct ShellCache<N> {
  manifest: ShellManifest,
  origin: Url,
  storage: ShellStorage,
  network: N,
  state: Lifecycle,
}

impl<N: Network> ShellCache<N> {
  pub fn new(manifest: ShellManifest, origin: Url, storage: ShellStorage, network: N) -> Self {
    Self {
      manifest,
      origin,
      storage,
      network,
      state: Lifecycle::Installing,
    }
  }

  /// Pick up a generation stored by an earlier run, activating it.
  /// Returns false when the current generation has never been installed.
  pub async fn resume(&mut self) -> Result<bool, ShellError> {
    if !self.storage.has_cache(&self.manifest.cache_name).await? {
      return Ok(false);
    }
    self.state = Lifecycle::Installed;
    self.activate().await?;
    Ok(true)
  }

  pub fn state(&self) -> Lifecycle {
    self.state
  }

  pub fn cache_name(&self) -> &str {
    &self.manifest.cache_name
  }

  pub fn storage(&self) -> &ShellStorage {
    &self.storage
  }

  /// Resolve a path (or absolute URL) against the shell origin.
  pub fn resolve(&self, path: &str) -> Result<Url, ShellError> {
    Ok(self.origin.join(path)?)
  }

  /// Fetch every manifest asset and store them as the current generation.
  ///
  /// All or nothing: if any asset fails or answers with a non-2xx status,
  /// nothing is stored and the lifecycle stays at `Installing`.
  pub async fn install(&mut self) -> Result<usize, ShellError> {
    let cache = self.manifest.cache_name.clone();
    info!(cache = %cache, assets = self.manifest.assets.len(), "installing shell cache");

    let fetched = self.fetch_manifest().await.map_err(|e| {
      warn!(cache = %cache, error = %e, "shell cache install failed");
      ShellError::Install {
        cache: cache.clone(),
        source: Box::new(e),
      }
    })?;

    let count = fetched.len();
    self.storage.put_all(&cache, fetched).await?;
    self.state = Lifecycle::Installed;

    info!(cache = %cache, count, "shell cache installed");
    Ok(count)
  }

  async fn fetch_manifest(&self) -> Result<Vec<(Url, ShellResponse)>, ShellError> {
    let urls = self
      .manifest
      .assets
      .iter()
      .map(|asset| self.resolve(asset))
      .collect::<Result<Vec<_>, _>>()?;

    try_join_all(urls.into_iter().map(|url| async move {
      let response = self.network.fetch(&ShellRequest::get(url.clone())).await?;
      if !response.is_success() {
        return Err(ShellError::AssetStatus {
          url: url.to_string(),
          status: response.status,
        });
      }
      Ok((url, response))
    }))
    .await
  }

  /// Evict every generation but the current one and start intercepting.
  ///
  /// Returns the names of the evicted generations.
  pub async fn activate(&mut self) -> Result<Vec<String>, ShellError> {
    if self.state == Lifecycle::Installing {
      return Err(ShellError::NotInstalled(self.manifest.cache_name.clone()));
    }

    let mut evicted = Vec::new();
    for name in self.storage.cache_names().await? {
      if name != self.manifest.cache_name && self.storage.delete_cache(&name).await? {
        info!(cache = %name, "evicted old shell cache");
        evicted.push(name);
      }
    }

    // Claim: from here on every request goes through `handle`
    self.state = Lifecycle::Active;
    info!(cache = %self.manifest.cache_name, "shell cache active");
    Ok(evicted)
  }

  fn same_origin(&self, url: &Url) -> bool {
    let origin: Origin = url.origin();
    origin == self.origin.origin()
  }

  /// Answer a request according to the interception policy.
  pub async fn handle(&self, request: &ShellRequest) -> Result<Interception, ShellError> {
    if self.state != Lifecycle::Active
      || request.method != Method::GET
      || !self.same_origin(&request.url)
    {
      return Ok(Interception::Passthrough);
    }

    if let Some(cached) = self.storage.match_url(&request.url).await? {
      debug!(url = %request.url, "served from shell cache");
      return Ok(Interception::Respond {
        response: cached,
        source: Source::Cache,
      });
    }

    match self.network.fetch(request).await {
      Ok(response) => {
        if response.is_success() {
          // A failed write only costs a future cache miss
          if let Err(e) = self
            .storage
            .put(&self.manifest.cache_name, &request.url, &response)
            .await
          {
            warn!(url = %request.url, error = %e, "failed to cache response");
          }
        }
        Ok(Interception::Respond {
          response,
          source: Source::Network,
        })
      }
      Err(e) => {
        debug!(url = %request.url, error = %e, "live fetch failed, trying offline document");
        let fallback = self.resolve(&self.manifest.offline_fallback)?;
        match self.storage.match_url(&fallback).await? {
          Some(response) => Ok(Interception::Respond {
            response,
            source: Source::OfflineFallback,
          }),
          None => Err(ShellError::Offline(request.url.to_string())),
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::Database;
  use std::collections::HashMap;
  use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
  use std::sync::{Arc, Mutex};

  const ORIGIN: &str = "http://localhost:8000";

  /// Serves a fixed set of paths; can be switched offline.
  #[derive(Clone, Default)]
  struct FakeNetwork {
    pages: Arc<Mutex<HashMap<String, ShellResponse>>>,
    offline: Arc<AtomicBool>,
    fetches: Arc<AtomicUsize>,
  }

  impl FakeNetwork {
    fn serving(paths: &[&str]) -> Self {
      let net = Self::default();
      for path in paths {
        net.serve(path, 200, &format!("v1 {}", path));
      }
      net
    }

    fn serve(&self, path: &str, status: u16, body: &str) {
      self.pages.lock().unwrap().insert(
        path.to_string(),
        ShellResponse {
          status,
          content_type: Some("text/plain".to_string()),
          body: body.as_bytes().to_vec(),
        },
      );
    }

    fn go_offline(&self) {
      self.offline.store(true, Ordering::SeqCst);
    }

    fn fetch_count(&self) -> usize {
      self.fetches.load(Ordering::SeqCst)
    }
  }

  impl Network for FakeNetwork {
    async fn fetch(&self, request: &ShellRequest) -> Result<ShellResponse, ShellError> {
      self.fetches.fetch_add(1, Ordering::SeqCst);
      if self.offline.load(Ordering::SeqCst) {
        return Err(ShellError::Network {
          url: request.url.to_string(),
          reason: "offline".to_string(),
        });
      }
      let page = self.pages.lock().unwrap().get(request.url.path()).cloned();
      Ok(page.unwrap_or(ShellResponse {
        status: 404,
        content_type: None,
        body: Vec::new(),
      }))
    }
  }

  fn manifest(name: &str) -> ShellManifest {
    ShellManifest {
      cache_name: name.to_string(),
      ..ShellManifest::default()
    }
  }

  fn all_assets() -> FakeNetwork {
    let assets: Vec<&str> = crate::shell::manifest::DEFAULT_ASSETS.to_vec();
    FakeNetwork::serving(&assets)
  }

  fn shell(db: &Database, name: &str, net: &FakeNetwork) -> ShellCache<FakeNetwork> {
    ShellCache::new(
      manifest(name),
      Url::parse(ORIGIN).unwrap(),
      ShellStorage::new(db.clone()),
      net.clone(),
    )
  }

  async fn active_shell(db: &Database, net: &FakeNetwork) -> ShellCache<FakeNetwork> {
    let mut cache = shell(db, "v1", net);
    cache.install().await.unwrap();
    cache.activate().await.unwrap();
    cache
  }

  fn get(cache: &ShellCache<FakeNetwork>, path: &str) -> ShellRequest {
    ShellRequest::get(cache.resolve(path).unwrap())
  }

  #[tokio::test]
  async fn test_install_stores_every_asset() {
    let db = Database::open_in_memory().unwrap();
    let net = all_assets();
    let mut cache = shell(&db, "v1", &net);

    let count = cache.install().await.unwrap();

    assert_eq!(count, crate::shell::manifest::DEFAULT_ASSETS.len());
    assert_eq!(cache.state(), Lifecycle::Installed);
    let generations = cache.storage().generations().await.unwrap();
    assert_eq!(generations.len(), 1);
    assert_eq!(generations[0].entries, count);
  }

  #[tokio::test]
  async fn test_install_is_all_or_nothing() {
    let db = Database::open_in_memory().unwrap();
    let net = FakeNetwork::serving(&["/", "/index.html", "/styles.css"]);
    let mut cache = shell(&db, "v1", &net);

    let err = cache.install().await.unwrap_err();

    assert!(matches!(err, ShellError::Install { .. }));
    assert_eq!(cache.state(), Lifecycle::Installing);
    assert!(cache.storage().cache_names().await.unwrap().is_empty());
    assert!(matches!(
      cache.activate().await,
      Err(ShellError::NotInstalled(_))
    ));
  }

  #[tokio::test]
  async fn test_failed_install_keeps_previous_generation() {
    let db = Database::open_in_memory().unwrap();
    let net = all_assets();
    active_shell(&db, &net).await;

    net.serve("/styles.css", 500, "broken");
    let mut next = shell(&db, "v2", &net);
    assert!(next.install().await.is_err());

    let storage = next.storage();
    assert_eq!(storage.cache_names().await.unwrap(), vec!["v1".to_string()]);
    let url = next.resolve("/styles.css").unwrap();
    assert!(storage.match_url(&url).await.unwrap().is_some());
  }

  #[tokio::test]
  async fn test_activation_evicts_old_generations() {
    let db = Database::open_in_memory().unwrap();
    let net = all_assets();
    active_shell(&db, &net).await;

    let mut next = shell(&db, "v2", &net);
    next.install().await.unwrap();
    let evicted = next.activate().await.unwrap();

    assert_eq!(evicted, vec!["v1".to_string()]);
    assert_eq!(next.state(), Lifecycle::Active);
    assert_eq!(
      next.storage().cache_names().await.unwrap(),
      vec!["v2".to_string()]
    );
  }

  #[tokio::test]
  async fn test_cached_asset_never_hits_network() {
    let db = Database::open_in_memory().unwrap();
    let net = all_assets();
    let cache = active_shell(&db, &net).await;
    let before = net.fetch_count();

    let outcome = cache.handle(&get(&cache, "/styles.css")).await.unwrap();

    match outcome {
      Interception::Respond { response, source } => {
        assert_eq!(source, Source::Cache);
        assert_eq!(response.body, b"v1 /styles.css");
      }
      other => panic!("unexpected {:?}", other),
    }
    assert_eq!(net.fetch_count(), before);
  }

  #[tokio::test]
  async fn test_cached_entry_is_not_refreshed() {
    let db = Database::open_in_memory().unwrap();
    let net = all_assets();
    let cache = active_shell(&db, &net).await;

    net.serve("/scripts/app.js", 200, "v2 script");
    let outcome = cache.handle(&get(&cache, "/scripts/app.js")).await.unwrap();

    assert!(matches!(
      outcome,
      Interception::Respond { ref response, source: Source::Cache } if response.body == b"v1 /scripts/app.js"
    ));
  }

  #[tokio::test]
  async fn test_miss_is_fetched_and_cached() {
    let db = Database::open_in_memory().unwrap();
    let net = all_assets();
    net.serve("/icons/extra.png", 200, "png");
    let cache = active_shell(&db, &net).await;

    let first = cache.handle(&get(&cache, "/icons/extra.png")).await.unwrap();
    assert!(matches!(first, Interception::Respond { source: Source::Network, .. }));

    let fetches = net.fetch_count();
    let second = cache.handle(&get(&cache, "/icons/extra.png")).await.unwrap();
    assert!(matches!(second, Interception::Respond { source: Source::Cache, .. }));
    assert_eq!(net.fetch_count(), fetches);
  }

  #[tokio::test]
  async fn test_error_responses_are_not_cached() {
    let db = Database::open_in_memory().unwrap();
    let net = all_assets();
    let cache = active_shell(&db, &net).await;

    let outcome = cache.handle(&get(&cache, "/nope")).await.unwrap();
    assert!(matches!(
      outcome,
      Interception::Respond { ref response, source: Source::Network } if response.status == 404
    ));

    let url = cache.resolve("/nope").unwrap();
    assert!(cache.storage().match_url(&url).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn test_offline_falls_back_to_root_document() {
    let db = Database::open_in_memory().unwrap();
    let net = all_assets();
    let cache = active_shell(&db, &net).await;
    net.go_offline();

    let outcome = cache.handle(&get(&cache, "/reports/today")).await.unwrap();

    match outcome {
      Interception::Respond { response, source } => {
        assert_eq!(source, Source::OfflineFallback);
        assert_eq!(response.body, b"v1 /index.html");
      }
      other => panic!("unexpected {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_offline_without_fallback_fails() {
    let db = Database::open_in_memory().unwrap();
    let net = all_assets();
    let cache = active_shell(&db, &net).await;
    cache.storage().delete_cache("v1").await.unwrap();
    cache.storage().put_all("v1", Vec::new()).await.unwrap();
    net.go_offline();

    let result = cache.handle(&get(&cache, "/anything")).await;
    assert!(matches!(result, Err(ShellError::Offline(_))));
  }

  #[tokio::test]
  async fn test_non_get_and_cross_origin_pass_through() {
    let db = Database::open_in_memory().unwrap();
    let net = all_assets();
    let cache = active_shell(&db, &net).await;
    let before = net.fetch_count();

    let post = ShellRequest {
      method: Method::POST,
      url: cache.resolve("/index.html").unwrap(),
    };
    let foreign = ShellRequest::get(Url::parse("https://api.qrserver.com/v1/create-qr-code/").unwrap());

    assert!(matches!(cache.handle(&post).await.unwrap(), Interception::Passthrough));
    assert!(matches!(cache.handle(&foreign).await.unwrap(), Interception::Passthrough));
    assert_eq!(net.fetch_count(), before);
  }

  #[tokio::test]
  async fn test_activate_before_install_fails() {
    let db = Database::open_in_memory().unwrap();
    let net = all_assets();
    active_shell(&db, &net).await;

    let mut next = shell(&db, "v2", &net);
    let err = next.activate().await.unwrap_err();

    assert!(matches!(err, ShellError::NotInstalled(_)));
    assert_eq!(next.state(), Lifecycle::Installing);
    assert_eq!(next.storage().cache_names().await.unwrap(), vec!["v1".to_string()]);
  }

  #[tokio::test]
  async fn test_not_intercepting_before_activation() {
    let db = Database::open_in_memory().unwrap();
    let net = all_assets();
    let mut cache = shell(&db, "v1", &net);
    cache.install().await.unwrap();

    let outcome = cache.handle(&get(&cache, "/index.html")).await.unwrap();
    assert!(matches!(outcome, Interception::Passthrough));
  }

  #[tokio::test]
  async fn test_resume_activates_stored_generation() {
    let db = Database::open_in_memory().unwrap();
    let net = all_assets();
    active_shell(&db, &net).await;

    let mut again = shell(&db, "v1", &net);
    assert!(again.resume().await.unwrap());
    assert_eq!(again.state(), Lifecycle::Active);

    let mut fresh = shell(&db, "v9", &net);
    assert!(!fresh.resume().await.unwrap());
    assert_eq!(fresh.state(), Lifecycle::Installing);
  }
}
