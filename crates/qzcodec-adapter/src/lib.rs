#![forbid(unsafe_code)]
//! qzcodec-adapter: drives a native compression backend on behalf of a
//! storage engine's codec framework.
//!
//! The adapter probes (once) whether the backend's direct-decompression path is
//! linked, runs single-shot compress/decompress calls through per-call
//! sessions, and spills compressed output into a caller-supplied overflow
//! region when the primary output region fills up.

pub mod adapter;
pub mod error;
pub mod guard;
pub mod metrics;

pub use adapter::CompressionAdapter;
pub use error::{Error, Result};
