//! subfox-core
//!
//! Synchronization and aggregation logic for SubFox.
//! Depends on subfox-domain. No CLI, no terminal I/O, no concrete storage or HTTP.

pub mod error;
pub mod form;
pub mod reconcile;
pub mod remote;
pub mod session;
pub mod storage;
pub mod summary_service;
pub mod sync_engine;

pub use error::{CoreError, RemoteError};
pub use form::*;
pub use reconcile::ReconciliationMap;
pub use remote::*;
pub use session::*;
pub use storage::*;
pub use summary_service::*;
pub use sync_engine::*;

#[cfg(test)]
mod tests;
