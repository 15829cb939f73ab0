//! subfox-remote
//!
//! HTTP adapter for the hosted subscription table.

pub mod live;
pub mod row;

pub use live::{LiveAdapter, LiveFactory};
pub use row::{patch_body, RemoteRow};
