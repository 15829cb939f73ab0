#![doc(test(attr(deny(warnings))))]

//! SubFox tracks recurring subscription spend. This crate wires the sync
//! layer from the workspace crates into the `subfox_cli` shell.

pub mod cli;
pub mod errors;
pub mod utils;

pub use errors::CliError;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("SubFox tracing initialized.");
    });
}
