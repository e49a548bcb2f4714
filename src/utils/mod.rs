//! Shared utilities.

mod mime;

pub use mime::{ensure_extension, is_supported_mime};
