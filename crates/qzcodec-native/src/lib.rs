//! qzcodec-native: the backend side of the codec adapter.
//!
//! A backend is an opaque engine that hands out short-lived compressor and
//! decompressor sessions (`session`), plus an optional direct-decompression
//! capability discovered through a lookup keyed by compression kind
//! (`capability`).
//!
//! Two backends ship here: libzstd (feature `zstd`) and a deterministic
//! in-memory run-length engine with counters and fault injection (`memory`).

pub mod capability;
pub mod error;
pub mod memory;
pub mod session;
#[cfg(feature = "zstd")]
pub mod libzstd;

pub use capability::{CapabilityLookup, DirectDecompressor, LinkError, ShimRegistry};
pub use error::{Error, Result};
pub use memory::{CountingLookup, MemoryBackend, MemoryDirect};
pub use session::{CompressorSession, DecompressorSession, NativeBackend};
#[cfg(feature = "zstd")]
pub use libzstd::{ZstdBackend, ZstdDirect};
