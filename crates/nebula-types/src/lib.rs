//! Nebula Types - Pure type definitions for the preview sandbox contract
//!
//! This crate contains only data types with no async runtime dependencies,
//! so the same definitions can be shared by any host that embeds the preview.

pub mod event;
pub mod repair;

pub use event::*;
pub use repair::*;

use thiserror::Error;

/// Errors raised while decoding wire messages
#[derive(Error, Debug)]
pub enum WireError {
    #[error("Malformed sandbox message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Message is not a JSON object")]
    NotAnObject,
}
