//! libzstd-backed sessions (feature `zstd`).
//!
//! Sessions stream through a staging region of exactly `buffer_size` bytes, the
//! same shape as the hardware engine's fixed working buffer: input is pushed
//! into the native context, output lands in staging, and callers drain staging.

use ::zstd::zstd_safe::{self, CCtx, DCtx, InBuffer, OutBuffer};

use qzcodec_core::buffer::BufferRegion;
use qzcodec_core::kind::CompressionKind;

use crate::capability::DirectDecompressor;
use crate::error::{Error, Result};
use crate::session::{CompressorSession, DecompressorSession, NativeBackend};

pub const DEFAULT_LEVEL: i32 = 3;

fn zstd_error(code: usize) -> Error {
    Error::Codec(format!("zstd: {}", zstd_safe::get_error_name(code)))
}

fn check_buffer_size(buffer_size: usize) -> Result<()> {
    if buffer_size == 0 {
        return Err(Error::Codec("zstd: working buffer size must be non-zero".into()));
    }
    Ok(())
}

/// Staged output waiting to be drained by the caller.
struct Staging {
    buf: Box<[u8]>,
    pos: usize,
    len: usize,
}

impl Staging {
    fn new(size: usize) -> Self {
        Self {
            buf: vec![0u8; size].into_boxed_slice(),
            pos: 0,
            len: 0,
        }
    }

    fn is_drained(&self) -> bool {
        self.pos == self.len
    }

    /// Copy staged bytes into `out`; returns bytes copied.
    fn drain_into(&mut self, out: &mut [u8]) -> usize {
        let n = out.len().min(self.len - self.pos);
        out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        n
    }

    fn reset(&mut self) {
        self.pos = 0;
        self.len = 0;
    }
}

pub struct ZstdBackend {
    level: i32,
}

impl ZstdBackend {
    pub fn new(level: i32) -> Self {
        Self { level }
    }

    pub fn level(&self) -> i32 {
        self.level
    }
}

impl Default for ZstdBackend {
    fn default() -> Self {
        Self::new(DEFAULT_LEVEL)
    }
}

impl NativeBackend for ZstdBackend {
    fn kind(&self) -> CompressionKind {
        CompressionKind::Zstd
    }

    fn library_name(&self) -> String {
        format!("libzstd {}", zstd_safe::version_string())
    }

    fn new_compressor(&self, buffer_size: usize) -> Result<Box<dyn CompressorSession>> {
        Ok(Box::new(ZstdCompressor::new(self.level, buffer_size)?))
    }

    fn new_decompressor(&self, buffer_size: usize) -> Result<Box<dyn DecompressorSession>> {
        Ok(Box::new(ZstdDecompressor::new(buffer_size)?))
    }
}

pub struct ZstdCompressor {
    ctx: Option<CCtx<'static>>,
    input: Vec<u8>,
    input_pos: usize,
    staging: Staging,
    finish_requested: bool,
    stream_done: bool,
}

impl ZstdCompressor {
    pub fn new(level: i32, buffer_size: usize) -> Result<Self> {
        check_buffer_size(buffer_size)?;
        let mut ctx = CCtx::create();
        ctx.init(level).map_err(zstd_error)?;
        Ok(Self {
            ctx: Some(ctx),
            input: Vec::new(),
            input_pos: 0,
            staging: Staging::new(buffer_size),
            finish_requested: false,
            stream_done: false,
        })
    }
}

impl CompressorSession for ZstdCompressor {
    fn set_input(&mut self, input: &[u8]) {
        self.input.clear();
        self.input.extend_from_slice(input);
        self.input_pos = 0;
    }

    fn finish(&mut self) {
        self.finish_requested = true;
    }

    fn finished(&self) -> bool {
        self.stream_done && self.staging.is_drained()
    }

    fn needs_input(&self) -> bool {
        !self.finish_requested && self.input_pos >= self.input.len() && self.staging.is_drained()
    }

    fn compress(&mut self, out: &mut [u8]) -> Result<usize> {
        let ctx = self
            .ctx
            .as_mut()
            .ok_or(Error::Unsupported("zstd compressor used after end"))?;

        // Staging is refilled as soon as it drains, even when `out` is full, so
        // `finished()` turns true on the call that hands out the last byte.
        let mut written = 0;
        loop {
            if !self.staging.is_drained() {
                if written == out.len() {
                    break;
                }
                written += self.staging.drain_into(&mut out[written..]);
                continue;
            }
            if self.stream_done {
                break;
            }

            self.staging.reset();
            if self.input_pos < self.input.len() {
                let mut src = InBuffer::around(&self.input[self.input_pos..]);
                let mut dst = OutBuffer::around(&mut self.staging.buf[..]);
                ctx.compress_stream(&mut dst, &mut src).map_err(zstd_error)?;
                self.input_pos += src.pos();
                self.staging.len = dst.pos();
            } else if self.finish_requested {
                let mut dst = OutBuffer::around(&mut self.staging.buf[..]);
                let pending = ctx.end_stream(&mut dst).map_err(zstd_error)?;
                self.staging.len = dst.pos();
                if pending == 0 {
                    self.stream_done = true;
                }
            } else {
                break;
            }
        }
        Ok(written)
    }

    fn end(&mut self) {
        self.ctx = None;
        self.input = Vec::new();
    }
}

pub struct ZstdDecompressor {
    ctx: Option<DCtx<'static>>,
    input: Vec<u8>,
    input_pos: usize,
    staging: Staging,
    frame_done: bool,
    starved: bool,
    dictionary: bool,
}

impl ZstdDecompressor {
    pub fn new(buffer_size: usize) -> Result<Self> {
        check_buffer_size(buffer_size)?;
        let mut ctx = DCtx::create();
        ctx.init().map_err(zstd_error)?;
        Ok(Self {
            ctx: Some(ctx),
            input: Vec::new(),
            input_pos: 0,
            staging: Staging::new(buffer_size),
            frame_done: true,
            starved: false,
            dictionary: false,
        })
    }
}

impl DecompressorSession for ZstdDecompressor {
    fn set_input(&mut self, input: &[u8]) {
        self.input.clear();
        self.input.extend_from_slice(input);
        self.input_pos = 0;
        self.frame_done = input.is_empty();
        self.starved = false;
        self.dictionary = zstd_safe::get_dict_id_from_frame(input).is_some();
    }

    fn finished(&self) -> bool {
        self.frame_done && self.staging.is_drained()
    }

    fn needs_input(&self) -> bool {
        !self.frame_done && self.starved && self.staging.is_drained()
    }

    fn needs_dictionary(&self) -> bool {
        self.dictionary
    }

    fn decompress(&mut self, out: &mut [u8]) -> Result<usize> {
        if self.dictionary {
            return Err(Error::Unsupported("zstd frame requires a dictionary"));
        }
        let ctx = self
            .ctx
            .as_mut()
            .ok_or(Error::Unsupported("zstd decompressor used after end"))?;

        let mut written = 0;
        loop {
            if !self.staging.is_drained() {
                if written == out.len() {
                    break;
                }
                written += self.staging.drain_into(&mut out[written..]);
                continue;
            }
            if self.frame_done {
                break;
            }

            self.staging.reset();
            let mut src = InBuffer::around(&self.input[self.input_pos..]);
            let mut dst = OutBuffer::around(&mut self.staging.buf[..]);
            let hint = ctx.decompress_stream(&mut dst, &mut src).map_err(zstd_error)?;
            let consumed = src.pos();
            self.input_pos += consumed;
            self.staging.len = dst.pos();

            if hint == 0 {
                self.frame_done = true;
            } else if consumed == 0 && self.staging.len == 0 {
                // Input ran out mid-frame.
                self.starved = true;
                break;
            }
        }
        Ok(written)
    }

    fn end(&mut self) {
        self.ctx = None;
        self.input = Vec::new();
    }
}

/// Direct decompressor for whole zstd frames.
pub struct ZstdDirect;

impl DirectDecompressor for ZstdDirect {
    fn decompress(&self, input: &mut BufferRegion, output: &mut BufferRegion) -> Result<()> {
        let produced =
            ::zstd::bulk::decompress_to_buffer(input.remaining_slice(), output.remaining_mut())?;
        let consumed = input.remaining();
        input.advance(consumed)?;
        output.advance(produced)?;
        Ok(())
    }
}
