#![forbid(unsafe_code)]
//! qzcodec-core: the vocabulary shared by the codec adapter and its backends.
//!
//! Nothing here talks to a native library. Backends live in `qzcodec-native`,
//! the buffer orchestration lives in `qzcodec-adapter`.

pub mod buffer;
pub mod codec;
pub mod config;
pub mod error;
pub mod kind;
pub mod prelude;

pub use buffer::BufferRegion;
pub use codec::{CompressionCodec, DirectDecompressionCodec, Modifier};
pub use config::CodecConfig;
pub use error::{Error, Result};
pub use kind::CompressionKind;
