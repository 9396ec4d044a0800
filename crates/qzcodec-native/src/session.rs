//! Session and backend interfaces.
//!
//! A session is a single-use handle to the native engine: the adapter creates
//! one per call, feeds it the whole input, drains output through the session's
//! fixed working region, and releases it with `end()`. Sessions are never shared
//! across calls or threads.

use qzcodec_core::buffer::BufferRegion;
use qzcodec_core::config::AllocHints;
use qzcodec_core::kind::CompressionKind;

use crate::error::Result;

/// Compressor half of the native engine.
pub trait CompressorSession: Send {
    /// Hand the session the complete input. Replaces any previous input.
    fn set_input(&mut self, input: &[u8]);

    /// No more input will follow; the session should emit the end of stream.
    fn finish(&mut self);

    /// True once the end of stream has been produced and fully drained.
    fn finished(&self) -> bool;

    /// True when the session cannot produce output until it gets more input.
    fn needs_input(&self) -> bool;

    /// Write compressed bytes into `out`. Returns the number of bytes produced,
    /// which may be less than `out.len()` even when more output is pending.
    fn compress(&mut self, out: &mut [u8]) -> Result<usize>;

    /// Release native state. Further calls to `compress` fail.
    fn end(&mut self);
}

/// Decompressor half of the native engine.
///
/// A decompressor fed empty input reports `finished()`.
pub trait DecompressorSession: Send {
    /// Hand the session the complete compressed input.
    fn set_input(&mut self, input: &[u8]);

    /// True once the stream end has been decoded and fully drained.
    fn finished(&self) -> bool;

    /// True when decoding stalled because the input ended mid-stream.
    fn needs_input(&self) -> bool;

    /// True when the stream cannot be decoded without a preset dictionary.
    fn needs_dictionary(&self) -> bool;

    /// Write decompressed bytes into `out`. Returns the number of bytes produced.
    fn decompress(&mut self, out: &mut [u8]) -> Result<usize>;

    /// Release native state. Further calls to `decompress` fail.
    fn end(&mut self);
}

/// Factory for sessions of one native engine.
pub trait NativeBackend: Send + Sync {
    /// Compression kind this engine produces.
    fn kind(&self) -> CompressionKind;

    /// Name (and version, when known) of the library behind this engine.
    fn library_name(&self) -> String;

    /// New compressor whose working region holds `buffer_size` bytes.
    fn new_compressor(&self, buffer_size: usize) -> Result<Box<dyn CompressorSession>>;

    /// New decompressor whose working region holds `buffer_size` bytes.
    fn new_decompressor(&self, buffer_size: usize) -> Result<Box<dyn DecompressorSession>>;

    /// Allocate a region the engine can address without copies.
    ///
    /// Engines without a pinned allocator hand out ordinary heap memory
    /// flagged as direct; the hints are advisory.
    fn allocate_direct(&self, capacity: usize, hints: AllocHints) -> Result<BufferRegion> {
        let _ = hints;
        Ok(BufferRegion::allocate_direct(capacity))
    }
}
