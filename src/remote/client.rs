//! HTTP client for the inventory server.

use reqwest::{header, Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::error::{truncate_body, RemoteError};
use super::RemoteGateway;
use crate::inventory::{Item, NewItem};

/// Client for the server's `/api` endpoints.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpGateway {
  client: Client,
  base: Url,
}

impl HttpGateway {
  /// Create a client rooted at `base`. Any path on `base` is kept as a prefix.
  pub fn new(base: &Url, timeout: Option<Duration>) -> Result<Self, RemoteError> {
    let mut builder = Client::builder();
    if let Some(timeout) = timeout {
      builder = builder.timeout(timeout);
    }

    Ok(Self {
      client: builder.build()?,
      base: normalize_base(base),
    })
  }

  /// Resolve an API path (without leading slash) against the base URL.
  fn endpoint(&self, path: &str) -> Result<Url, RemoteError> {
    Ok(self.base.join(path)?)
  }

  fn item_endpoint(&self, id: i64) -> Result<Url, RemoteError> {
    self.endpoint(&format!("api/items/{}", id))
  }
}

/// Make sure the base path ends in `/` so joins append rather than replace.
fn normalize_base(base: &Url) -> Url {
  let mut base = base.clone();
  if !base.path().ends_with('/') {
    let path = format!("{}/", base.path());
    base.set_path(&path);
  }
  base
}

/// Pass successful responses through; turn anything else into `err`.
async fn ensure_success<F>(response: Response, err: F) -> Result<Response, RemoteError>
where
  F: FnOnce(u16, String) -> RemoteError,
{
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }

  let body = response.text().await.unwrap_or_default();
  Err(err(status.as_u16(), truncate_body(&body)))
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
  response
    .json::<T>()
    .await
    .map_err(|e| RemoteError::InvalidResponse(e.to_string()))
}

impl RemoteGateway for HttpGateway {
  async fn ping(&self) -> bool {
    let url = match self.endpoint("api/ping") {
      Ok(url) => url,
      Err(_) => return false,
    };

    match self
      .client
      .get(url)
      .header(header::CACHE_CONTROL, "no-store")
      .send()
      .await
    {
      Ok(response) => {
        let ok = response.status().is_success();
        debug!(status = %response.status(), ok, "ping");
        ok
      }
      Err(e) => {
        debug!(error = %e, "ping failed");
        false
      }
    }
  }

  async fn list_items(&self) -> Result<Vec<Item>, RemoteError> {
    let response = self.client.get(self.endpoint("api/items")?).send().await?;
    let response = ensure_success(response, |status, body| RemoteError::Fetch { status, body }).await?;
    decode(response).await
  }

  async fn create_item(&self, item: &NewItem) -> Result<Item, RemoteError> {
    let response = self
      .client
      .post(self.endpoint("api/items")?)
      .json(item)
      .send()
      .await?;
    let response =
      ensure_success(response, |status, body| RemoteError::Create { status, body }).await?;
    decode(response).await
  }

  async fn update_item(&self, item: &Item) -> Result<Item, RemoteError> {
    let id = item.id;
    let response = self
      .client
      .put(self.item_endpoint(id)?)
      .json(item)
      .send()
      .await?;
    let response =
      ensure_success(response, |status, body| RemoteError::Update { id, status, body }).await?;
    decode(response).await
  }

  async fn delete_item(&self, id: i64) -> Result<bool, RemoteError> {
    let response = self.client.delete(self.item_endpoint(id)?).send().await?;
    ensure_success(response, |status, body| RemoteError::Delete { id, status, body }).await?;
    Ok(true)
  }
}
