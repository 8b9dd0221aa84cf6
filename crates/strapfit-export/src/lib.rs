//! strapfit-export: Pure PNG serialization (sans-IO)
//!
//! Encodes a rendered composite into PNG bytes for download. Writing the
//! bytes anywhere is the caller's job.

pub mod png;

pub use png::{DEFAULT_FILENAME, ExportError, to_png};
