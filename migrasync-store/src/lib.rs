//! # migrasync-store
//!
//! The artifact log: one SQLite table keyed by `(namespace, name)`.
//!
//! Open a [`LogStore`], call [`LogStore::ensure_table`] once per invocation,
//! then use [`LogStore::get_or_create`] / [`LogStore::publish_with`] to
//! publish and [`LogStore::list_by_namespace`] to read back.

pub mod error;
pub mod schema;
pub mod store;

pub use error::StoreError;
pub use store::{BootstrapOutcome, LogStore};
