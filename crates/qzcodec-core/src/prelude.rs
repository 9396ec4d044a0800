//! Convenient re-exports for downstream crates.

pub use crate::buffer::BufferRegion;
pub use crate::codec::{CompressionCodec, DirectDecompressionCodec, Modifier};
pub use crate::config::{AllocHints, CodecConfig};
pub use crate::error::{Error, Result};
pub use crate::kind::CompressionKind;
