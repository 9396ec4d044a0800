//! Codec contract a storage engine expects from a compression codec.
//!
//! The engine hands the codec whole blocks as [`BufferRegion`]s. Failures are
//! reported in the I/O category, which is what the engine's block readers and
//! writers already propagate.

use std::io;

use serde::{Deserialize, Serialize};

use crate::buffer::BufferRegion;

/// Strategy hints an engine may request when cloning a codec for a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modifier {
    /// Favor speed over ratio.
    Fast,
    /// Payload is mostly text.
    Text,
    /// Payload is mostly binary.
    Binary,
}

pub trait CompressionCodec: Send + Sync {
    /// Compress `input[position..limit)` into `output`, spilling into `overflow`
    /// once `output` is full.
    ///
    /// Returns `true` when the compressed form must not be used (it did not fit or
    /// is not smaller than the input), `false` when it is complete and smaller.
    fn compress(
        &self,
        input: &mut BufferRegion,
        output: &mut BufferRegion,
        overflow: Option<&mut BufferRegion>,
    ) -> io::Result<bool>;

    /// Decompress all of `input[position..limit)` into `output`, leaving
    /// `output` flipped for reading and `input` fully consumed.
    fn decompress(&self, input: &mut BufferRegion, output: &mut BufferRegion) -> io::Result<()>;

    /// Return a codec configured with `modifiers`.
    fn modify(self, modifiers: &[Modifier]) -> Self
    where
        Self: Sized;
}

/// Codecs that can decompress straight between native-addressable regions.
pub trait DirectDecompressionCodec: CompressionCodec {
    /// Whether the direct path can be used in this process.
    fn is_available(&self) -> bool;

    /// Decompress between two direct regions without staging copies.
    fn direct_decompress(
        &self,
        input: &mut BufferRegion,
        output: &mut BufferRegion,
    ) -> io::Result<()>;
}
