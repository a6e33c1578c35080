//! Offline cache for the application shell.
//!
//! A named generation of the shell's static assets is fetched in one go at
//! install time and served cache-first afterwards:
//! - hit: answered from the cache, no network
//! - miss: fetched live and, if successful, stored for next time
//! - network down: the cached root document is served instead
//!
//! Bumping the cache name and activating evicts every older generation.

mod error;
mod manifest;
mod network;
mod storage;
mod worker;

pub use error::ShellError;
pub use manifest::ShellManifest;
pub use network::{HttpNetwork, Network, ShellRequest, ShellResponse};
pub use storage::ShellStorage;
pub use worker::{Interception, Lifecycle, ShellCache, Source};
