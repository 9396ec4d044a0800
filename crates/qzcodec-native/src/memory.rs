//! In-memory backend for tests and hosts without a native library.
//!
//! Encodes bytes as `(run_len, byte)` pairs with `run_len` in `1..=255`. A
//! stream whose first byte is `0x00` declares a preset dictionary, which this
//! engine never has. Sessions hand out at most `buffer_size` bytes per call so
//! callers see the same chunking they would against the hardware engine.
//!
//! Every session creation, release, direct call and probe is counted so tests
//! can assert the adapter's resource discipline.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use qzcodec_core::buffer::BufferRegion;
use qzcodec_core::kind::CompressionKind;

use crate::capability::{CapabilityLookup, DirectDecompressor, LinkError};
use crate::error::{Error, Result};
use crate::session::{CompressorSession, DecompressorSession, NativeBackend};

/// Leading byte of a stream that needs a preset dictionary.
pub const DICTIONARY_MARKER: u8 = 0x00;

/// Run-length encode `input`.
pub fn encode_runs(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len() / 2 + 2);
    let mut iter = input.iter().copied().peekable();
    while let Some(byte) = iter.next() {
        let mut run: u8 = 1;
        while run < u8::MAX && iter.peek() == Some(&byte) {
            iter.next();
            run += 1;
        }
        out.push(run);
        out.push(byte);
    }
    out
}

/// Decode a complete run-length stream.
pub fn decode_runs(input: &[u8]) -> Result<Vec<u8>> {
    if input.len() % 2 != 0 {
        return Err(Error::Codec("rle: truncated stream".into()));
    }
    let mut out = Vec::new();
    for pair in input.chunks_exact(2) {
        if pair[0] == 0 {
            return Err(Error::Codec("rle: zero-length run".into()));
        }
        out.extend(std::iter::repeat(pair[1]).take(pair[0] as usize));
    }
    Ok(out)
}

#[derive(Default)]
struct Counters {
    compressors_created: AtomicUsize,
    decompressors_created: AtomicUsize,
    sessions_ended: AtomicUsize,
    fail_compress: AtomicBool,
    fail_decompress: AtomicBool,
}

/// Cloneable handle; clones share counters and fault switches.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    counters: Arc<Counters>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compressors_created(&self) -> usize {
        self.counters.compressors_created.load(Ordering::SeqCst)
    }

    pub fn decompressors_created(&self) -> usize {
        self.counters.decompressors_created.load(Ordering::SeqCst)
    }

    pub fn sessions_created(&self) -> usize {
        self.compressors_created() + self.decompressors_created()
    }

    /// Number of `end()` calls across all sessions.
    pub fn sessions_ended(&self) -> usize {
        self.counters.sessions_ended.load(Ordering::SeqCst)
    }

    /// Make every subsequent `compress` call fail.
    pub fn fail_compress(&self, fail: bool) {
        self.counters.fail_compress.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `decompress` call fail.
    pub fn fail_decompress(&self, fail: bool) {
        self.counters.fail_decompress.store(fail, Ordering::SeqCst);
    }
}

impl NativeBackend for MemoryBackend {
    fn kind(&self) -> CompressionKind {
        CompressionKind::None
    }

    fn library_name(&self) -> String {
        "memory-rle".to_string()
    }

    fn new_compressor(&self, buffer_size: usize) -> Result<Box<dyn CompressorSession>> {
        if buffer_size == 0 {
            return Err(Error::Codec("rle: working buffer size must be non-zero".into()));
        }
        self.counters.compressors_created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryCompressor {
            counters: Arc::clone(&self.counters),
            buffer_size,
            input: Vec::new(),
            encoded: None,
            drained: 0,
            finish_requested: false,
            ended: false,
        }))
    }

    fn new_decompressor(&self, buffer_size: usize) -> Result<Box<dyn DecompressorSession>> {
        if buffer_size == 0 {
            return Err(Error::Codec("rle: working buffer size must be non-zero".into()));
        }
        self.counters.decompressors_created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryDecompressor {
            counters: Arc::clone(&self.counters),
            buffer_size,
            input: Vec::new(),
            pair: 0,
            run_left: 0,
            ended: false,
        }))
    }
}

struct MemoryCompressor {
    counters: Arc<Counters>,
    buffer_size: usize,
    input: Vec<u8>,
    encoded: Option<Vec<u8>>,
    drained: usize,
    finish_requested: bool,
    ended: bool,
}

impl CompressorSession for MemoryCompressor {
    fn set_input(&mut self, input: &[u8]) {
        self.input = input.to_vec();
        self.encoded = None;
        self.drained = 0;
    }

    fn finish(&mut self) {
        self.finish_requested = true;
    }

    fn finished(&self) -> bool {
        matches!(&self.encoded, Some(enc) if self.drained == enc.len())
    }

    fn needs_input(&self) -> bool {
        !self.finish_requested
    }

    fn compress(&mut self, out: &mut [u8]) -> Result<usize> {
        if self.ended {
            return Err(Error::Unsupported("rle compressor used after end"));
        }
        if self.counters.fail_compress.load(Ordering::SeqCst) {
            return Err(Error::InjectedFault("compress"));
        }
        if !self.finish_requested {
            return Ok(0);
        }
        let encoded = self.encoded.get_or_insert_with(|| encode_runs(&self.input));
        let n = out
            .len()
            .min(self.buffer_size)
            .min(encoded.len() - self.drained);
        out[..n].copy_from_slice(&encoded[self.drained..self.drained + n]);
        self.drained += n;
        Ok(n)
    }

    fn end(&mut self) {
        self.ended = true;
        self.counters.sessions_ended.fetch_add(1, Ordering::SeqCst);
    }
}

struct MemoryDecompressor {
    counters: Arc<Counters>,
    buffer_size: usize,
    input: Vec<u8>,
    // Index of the next unread pair.
    pair: usize,
    // Bytes still owed from the current run.
    run_left: usize,
    ended: bool,
}

impl MemoryDecompressor {
    fn pairs(&self) -> usize {
        self.input.len() / 2
    }

    fn current_byte(&self) -> u8 {
        self.input[(self.pair - 1) * 2 + 1]
    }
}

impl DecompressorSession for MemoryDecompressor {
    fn set_input(&mut self, input: &[u8]) {
        self.input = input.to_vec();
        self.pair = 0;
        self.run_left = 0;
    }

    fn finished(&self) -> bool {
        self.run_left == 0 && self.pair == self.pairs() && self.input.len() % 2 == 0
    }

    fn needs_input(&self) -> bool {
        self.run_left == 0 && self.pair == self.pairs() && self.input.len() % 2 != 0
    }

    fn needs_dictionary(&self) -> bool {
        self.input.first() == Some(&DICTIONARY_MARKER)
    }

    fn decompress(&mut self, out: &mut [u8]) -> Result<usize> {
        if self.ended {
            return Err(Error::Unsupported("rle decompressor used after end"));
        }
        if self.counters.fail_decompress.load(Ordering::SeqCst) {
            return Err(Error::InjectedFault("decompress"));
        }
        let budget = out.len().min(self.buffer_size);
        let mut written = 0;
        while written < budget {
            if self.run_left == 0 {
                if self.pair == self.pairs() {
                    break;
                }
                let run = self.input[self.pair * 2];
                if run == 0 {
                    return Err(Error::Codec(format!("rle: zero-length run at pair {}", self.pair)));
                }
                self.run_left = run as usize;
                self.pair += 1;
            }
            let n = self.run_left.min(budget - written);
            out[written..written + n].fill(self.current_byte());
            self.run_left -= n;
            written += n;
        }
        Ok(written)
    }

    fn end(&mut self) {
        self.ended = true;
        self.counters.sessions_ended.fetch_add(1, Ordering::SeqCst);
    }
}

/// Direct decompressor for run-length streams; counts its calls.
#[derive(Default)]
pub struct MemoryDirect {
    calls: AtomicUsize,
}

impl MemoryDirect {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DirectDecompressor for MemoryDirect {
    fn decompress(&self, input: &mut BufferRegion, output: &mut BufferRegion) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !input.is_direct() || !output.is_direct() {
            return Err(Error::Unsupported("direct decompression needs direct regions"));
        }
        let decoded = decode_runs(input.remaining_slice())?;
        output.put_slice(&decoded)?;
        let consumed = input.remaining();
        input.advance(consumed)?;
        Ok(())
    }
}

/// Wraps a lookup and counts probes.
pub struct CountingLookup<L> {
    inner: L,
    probes: AtomicUsize,
}

impl<L: CapabilityLookup> CountingLookup<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            probes: AtomicUsize::new(0),
        }
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }
}

impl<L: CapabilityLookup> CapabilityLookup for CountingLookup<L> {
    fn direct_decompressor(
        &self,
        kind: CompressionKind,
    ) -> std::result::Result<Option<Arc<dyn DirectDecompressor>>, LinkError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.inner.direct_decompressor(kind)
    }
}
