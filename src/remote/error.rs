use thiserror::Error;

/// Failures talking to the inventory server.
///
/// None of these are fatal: the sync layer recovers from every variant by
/// falling back to the local store.
#[derive(Error, Debug)]
pub enum RemoteError {
  #[error("Server unreachable")]
  Unreachable,

  #[error("Failed to fetch items (status {status}): {body}")]
  Fetch { status: u16, body: String },

  #[error("Failed to create item (status {status}): {body}")]
  Create { status: u16, body: String },

  #[error("Failed to update item {id} (status {status}): {body}")]
  Update { id: i64, status: u16, body: String },

  #[error("Failed to delete item {id} (status {status}): {body}")]
  Delete { id: i64, status: u16, body: String },

  #[error("Network error: {0}")]
  Network(#[from] reqwest::Error),

  #[error("Invalid response: {0}")]
  InvalidResponse(String),

  #[error("Invalid server URL: {0}")]
  InvalidUrl(#[from] url::ParseError),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Truncate a response body to avoid logging excessive data
pub(crate) fn truncate_body(body: &str) -> String {
  if body.len() <= MAX_ERROR_BODY_LENGTH {
    return body.to_string();
  }

  let mut end = MAX_ERROR_BODY_LENGTH;
  while !body.is_char_boundary(end) {
    end -= 1;
  }
  format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}
