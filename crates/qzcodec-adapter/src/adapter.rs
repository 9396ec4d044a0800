//! `CompressionAdapter`: the codec a storage engine talks to.
//!
//! - `is_available` probes the capability lookup once per adapter and memoizes
//!   the answer; a link failure is a negative answer, not an error.
//! - `compress` drives one compressor session per call and spills into the
//!   overflow region when the primary output fills up.
//! - `decompress` takes the direct path when both regions are direct, and
//!   otherwise drives one decompressor session per call.

use std::io;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use qzcodec_core::buffer::BufferRegion;
use qzcodec_core::codec::{CompressionCodec, DirectDecompressionCodec, Modifier};
use qzcodec_core::config::{AllocHints, CodecConfig};
use qzcodec_core::kind::CompressionKind;
use qzcodec_native::capability::{CapabilityLookup, DirectDecompressor};
use qzcodec_native::session::{CompressorSession, DecompressorSession, NativeBackend};

use crate::error::{Error, Result};
use crate::guard::SessionGuard;
use crate::metrics::{emit_span, Outcome};

pub struct CompressionAdapter {
    buffer_size: usize,
    kind: CompressionKind,
    hints: AllocHints,
    backend: Arc<dyn NativeBackend>,
    lookup: Arc<dyn CapabilityLookup>,
    available: OnceCell<bool>,
}

impl CompressionAdapter {
    pub fn new(
        buffer_size: usize,
        kind: CompressionKind,
        backend: Arc<dyn NativeBackend>,
        lookup: Arc<dyn CapabilityLookup>,
    ) -> Self {
        Self {
            buffer_size,
            kind,
            hints: AllocHints::default(),
            backend,
            lookup,
            available: OnceCell::new(),
        }
    }

    /// Build from a validated config.
    pub fn from_config(
        cfg: &CodecConfig,
        backend: Arc<dyn NativeBackend>,
        lookup: Arc<dyn CapabilityLookup>,
    ) -> Result<Self> {
        cfg.validate()?;
        let mut adapter = Self::new(cfg.buffer_size, cfg.kind, backend, lookup);
        adapter.hints = cfg.alloc_hints();
        Ok(adapter)
    }

    /// zstd backend at `cfg.level`, probing the process-wide registry.
    #[cfg(feature = "zstd")]
    pub fn with_zstd(cfg: &CodecConfig) -> Result<Self> {
        use qzcodec_native::capability::ShimRegistry;
        use qzcodec_native::libzstd::ZstdBackend;

        Self::from_config(
            cfg,
            Arc::new(ZstdBackend::new(cfg.level)),
            ShimRegistry::global(),
        )
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn kind(&self) -> CompressionKind {
        self.kind
    }

    pub fn library_name(&self) -> String {
        self.backend.library_name()
    }

    /// Allocate a region the backend can address directly, honoring the
    /// configured allocation hints.
    pub fn allocate_direct(&self, capacity: usize) -> Result<BufferRegion> {
        Ok(self.backend.allocate_direct(capacity, self.hints)?)
    }

    /// Whether the direct decompression path can be used. Probes at most once.
    pub fn is_available(&self) -> bool {
        *self.available.get_or_init(|| self.probe())
    }

    fn probe(&self) -> bool {
        let available = match self.lookup.direct_decompressor(self.kind) {
            Ok(Some(_)) => true,
            Ok(None) => false,
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(kind = %self.kind, error = %_err, "direct decompressor unavailable");
                false
            }
        };
        #[cfg(feature = "tracing")]
        tracing::debug!(kind = %self.kind, available, "probed direct decompressor");
        available
    }

    fn direct(&self) -> Result<Arc<dyn DirectDecompressor>> {
        match self.lookup.direct_decompressor(self.kind) {
            Ok(Some(d)) => Ok(d),
            Ok(None) | Err(_) => Err(Error::DirectUnavailable(self.kind)),
        }
    }

    /// Decompress between two direct regions in one native call, then flip
    /// `output` for reading.
    pub fn direct_decompress(
        &self,
        input: &mut BufferRegion,
        output: &mut BufferRegion,
    ) -> Result<()> {
        if !input.is_direct() || !output.is_direct() {
            return Err(Error::NotDirect);
        }
        let decompressor = self.direct()?;
        let consumed = input.remaining();
        decompressor.decompress(input, output)?;
        output.flip();
        emit_span(self.kind, Outcome::Direct, consumed, output.limit());
        Ok(())
    }

    /// Compress `input[position..limit)` into `output`, then `overflow`.
    ///
    /// Returns `true` when the compressed bytes must not be used: the available
    /// space ran out, or the result is not smaller than the input. Empty input
    /// returns `false` and writes nothing. `input` is not advanced.
    pub fn compress(
        &self,
        input: &mut BufferRegion,
        output: &mut BufferRegion,
        overflow: Option<&mut BufferRegion>,
    ) -> Result<bool> {
        let length = input.remaining();
        if length == 0 {
            return Ok(false);
        }

        let session: Box<dyn CompressorSession> = self.backend.new_compressor(self.buffer_size)?;
        let mut session = SessionGuard::new(session, "compress");
        session.set_input(input.remaining_slice());
        session.finish();

        let mut overflow = overflow;
        let mut target = output;
        let mut produced = 0usize;

        // A target with no room left ends the call unless overflow still has room.
        if !target.has_remaining() {
            match overflow.take() {
                Some(next) if next.has_remaining() => target = next,
                _ => return Ok(true),
            }
        }

        while !session.finished() && produced < length {
            let n = session.compress(target.remaining_mut())?;
            if n == 0 {
                return Err(Error::Stalled);
            }
            target.advance(n)?;
            produced += n;

            if !target.has_remaining() {
                match overflow.take() {
                    Some(next) if next.has_remaining() => {
                        #[cfg(feature = "tracing")]
                        tracing::trace!(produced, "output full, continuing into overflow");
                        target = next;
                    }
                    _ => {
                        emit_span(self.kind, Outcome::Exhausted, length, produced);
                        return Ok(true);
                    }
                }
            }
        }

        let not_beneficial = produced >= length;
        let outcome = if not_beneficial {
            Outcome::NotBeneficial
        } else {
            Outcome::Compressed
        };
        emit_span(self.kind, outcome, length, produced);
        Ok(not_beneficial)
    }

    /// Decompress all of `input[position..limit)` into `output`.
    ///
    /// On success `output` is flipped for reading and `input` is fully consumed.
    /// The managed path has no overflow: an `output` too small for the stream is
    /// an error.
    pub fn decompress(&self, input: &mut BufferRegion, output: &mut BufferRegion) -> Result<()> {
        if input.is_direct() && output.is_direct() && self.is_available() {
            return self.direct_decompress(input, output);
        }

        let session: Box<dyn DecompressorSession> =
            self.backend.new_decompressor(self.buffer_size)?;
        let mut session = SessionGuard::new(session, "decompress");
        session.set_input(input.remaining_slice());

        let consumed = input.remaining();
        let start = output.position();
        loop {
            if session.finished() {
                break;
            }
            let produced = output.position() - start;
            if session.needs_dictionary() {
                return Err(Error::DictionaryRequired);
            }
            if session.needs_input() {
                return Err(Error::TruncatedInput { produced });
            }
            if !output.has_remaining() {
                // An empty output is only exhausted if the stream still has bytes to give.
                session.decompress(&mut [])?;
                if session.finished() {
                    break;
                }
                return Err(Error::OutputExhausted { produced });
            }
            let n = session.decompress(output.remaining_mut())?;
            if n == 0 && !(session.finished() || session.needs_input()) {
                return Err(Error::Stalled);
            }
            output.advance(n)?;
        }

        output.flip();
        drop(session);
        input.set_position(input.limit())?;
        emit_span(self.kind, Outcome::Decompressed, consumed, output.limit() - start);
        Ok(())
    }

    /// Modifiers are accepted and ignored.
    pub fn modify(self, _modifiers: &[Modifier]) -> Self {
        self
    }
}

impl std::fmt::Debug for CompressionAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressionAdapter")
            .field("buffer_size", &self.buffer_size)
            .field("kind", &self.kind)
            .field("library", &self.backend.library_name())
            .field("available", &self.available.get())
            .finish()
    }
}

impl CompressionCodec for CompressionAdapter {
    fn compress(
        &self,
        input: &mut BufferRegion,
        output: &mut BufferRegion,
        overflow: Option<&mut BufferRegion>,
    ) -> io::Result<bool> {
        Ok(CompressionAdapter::compress(self, input, output, overflow)?)
    }

    fn decompress(&self, input: &mut BufferRegion, output: &mut BufferRegion) -> io::Result<()> {
        Ok(CompressionAdapter::decompress(self, input, output)?)
    }

    fn modify(self, modifiers: &[Modifier]) -> Self {
        CompressionAdapter::modify(self, modifiers)
    }
}

impl DirectDecompressionCodec for CompressionAdapter {
    fn is_available(&self) -> bool {
        CompressionAdapter::is_available(self)
    }

    fn direct_decompress(
        &self,
        input: &mut BufferRegion,
        output: &mut BufferRegion,
    ) -> io::Result<()> {
        Ok(CompressionAdapter::direct_decompress(self, input, output)?)
    }
}
