//! Nebula - Core Library
//!
//! Extracts fenced code blocks from assistant responses into a project file
//! table, composes a self-contained preview document from that table, and
//! bridges runtime events from the preview sandbox back to the host.

pub mod bridge;
pub mod config;
pub mod error;
pub mod extractor;
pub mod fence;
pub mod preview;
pub mod project;
pub mod render;
pub mod resolve;
pub mod session;
pub mod types;
pub mod watcher;

pub use bridge::*;
pub use config::*;
pub use error::*;
pub use extractor::*;
pub use preview::{is_full_document, PreviewComposer, PreviewDocument, PreviewSources};
pub use render::render_message;
pub use resolve::*;
pub use session::*;
pub use types::*;
