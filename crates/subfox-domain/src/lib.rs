//! subfox-domain
//!
//! Pure domain models (Subscription, drafts, patches, recurrence, currency).
//! No I/O, no CLI, no storage. Only data types, parsing and validation.

pub mod common;
pub mod currency;
pub mod error;
pub mod subscription;

pub use common::*;
pub use currency::*;
pub use error::ValidationError;
pub use subscription::*;
