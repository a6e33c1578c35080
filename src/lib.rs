//! Offline-first inventory and billing.
//!
//! The local SQLite store is the source of truth. An optional inventory server
//! is pulled from once at startup and written to first whenever it answers;
//! every write is mirrored locally so nothing is lost when it does not.

pub mod billing;
pub mod config;
pub mod db;
pub mod inventory;
pub mod remote;
pub mod session;
pub mod shell;
pub mod store;
pub mod sync;
