//! Requests, response snapshots and the live network behind the shell cache.

use reqwest::{header, Client, Method};
use std::future::Future;
use url::Url;

use super::error::ShellError;

#[derive(Debug, Clone)]
pub struct ShellRequest {
  pub method: Method,
  pub url: Url,
}

impl ShellRequest {
  pub fn get(url: Url) -> Self {
    Self {
      method: Method::GET,
      url,
    }
  }
}

/// A stored or live response, fully buffered.
#[derive(Debug, Clone, PartialEq)]
pub struct ShellResponse {
  pub status: u16,
  pub content_type: Option<String>,
  pub body: Vec<u8>,
}

impl ShellResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

/// Where live requests go when the cache cannot answer.
pub trait Network: Send + Sync {
  fn fetch(
    &self,
    request: &ShellRequest,
  ) -> impl Future<Output = Result<ShellResponse, ShellError>> + Send;
}

/// Live network over reqwest.
#[derive(Clone, Default)]
pub struct HttpNetwork {
  client: Client,
}

impl HttpNetwork {
  pub fn new() -> Self {
    Self::default()
  }
}

impl Network for HttpNetwork {
  async fn fetch(&self, request: &ShellRequest) -> Result<ShellResponse, ShellError> {
    let failed = |e: reqwest::Error| ShellError::Network {
      url: request.url.to_string(),
      reason: e.to_string(),
    };

    let response = self
      .client
      .request(request.method.clone(), request.url.clone())
      .send()
      .await
      .map_err(failed)?;

    let status = response.status().as_u16();
    let content_type = response
      .headers()
      .get(header::CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .map(String::from);
    let body = response.bytes().await.map_err(failed)?.to_vec();

    Ok(ShellResponse {
      status,
      content_type,
      body,
    })
  }
}
