//! qzcodec: a compression codec adapter for columnar storage engines.
//!
//! The workspace splits into three library crates, re-exported here:
//! - `qzcodec_core`: buffer regions, the codec contract, compression kinds, config
//! - `qzcodec_native`: backend sessions, capability lookup, zstd and in-memory engines
//! - `qzcodec_adapter`: the `CompressionAdapter` a storage engine plugs in

pub use qzcodec_adapter as adapter;
pub use qzcodec_core as codec_core;
pub use qzcodec_native as native;

pub use qzcodec_adapter::{CompressionAdapter, Error, Result};
pub use qzcodec_core::prelude::{
    AllocHints, BufferRegion, CodecConfig, CompressionCodec, CompressionKind,
    DirectDecompressionCodec, Modifier,
};
