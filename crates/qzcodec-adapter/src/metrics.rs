//! Tracing hooks for adapter calls.
//!
//! Every finished compress/decompress call reports the compression kind it ran
//! under, how it ended, and its byte counts. The library only emits events;
//! subscribers are installed by the binary.

use qzcodec_core::kind::CompressionKind;

/// How an adapter call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Compressed form is complete and smaller than the input.
    Compressed,
    /// Compressed form reached the input length.
    NotBeneficial,
    /// Output and overflow filled up before the stream ended.
    Exhausted,
    /// Managed decompression finished.
    Decompressed,
    /// Direct decompression finished.
    Direct,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Compressed => "compressed",
            Outcome::NotBeneficial => "not_beneficial",
            Outcome::Exhausted => "exhausted",
            Outcome::Decompressed => "decompressed",
            Outcome::Direct => "direct",
        }
    }
}

#[cfg(feature = "tracing")]
pub fn emit_span(kind: CompressionKind, outcome: Outcome, bytes_in: usize, bytes_out: usize) {
    let span = tracing::trace_span!("qzcodec", %kind);
    let _entered = span.enter();
    tracing::trace!(outcome = outcome.as_str(), bytes_in, bytes_out, "codec call");
}

#[cfg(not(feature = "tracing"))]
pub fn emit_span(_kind: CompressionKind, _outcome: Outcome, _bytes_in: usize, _bytes_out: usize) {
}
