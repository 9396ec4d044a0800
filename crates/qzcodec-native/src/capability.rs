//! Capability lookup for direct (native-buffer) decompression.
//!
//! The adapter never loads libraries itself. It asks a [`CapabilityLookup`] for
//! the direct decompressor registered under a compression kind. A lookup answers
//! with the capability, with `None` when nothing is registered, or with a
//! [`LinkError`] when the library behind the kind could not be linked.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use qzcodec_core::buffer::BufferRegion;
use qzcodec_core::kind::CompressionKind;
use thiserror::Error;

use crate::error::Result;

/// Library name the hardware engine is loaded from.
pub const QAT_LIBRARY: &str = "libqatzip.so";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("cannot load native library {0}")]
    LibraryNotFound(String),

    #[error("symbol '{symbol}' missing from {library}")]
    MissingSymbol { library: String, symbol: String },

    #[error("incompatible native library {library}: {reason}")]
    Incompatible { library: String, reason: String },
}

/// One-shot decompression between two native-addressable regions.
///
/// Implementations consume `input[position..limit)` completely and advance
/// `output.position` past the bytes they produced. They do their own internal
/// buffering; callers never chunk.
pub trait DirectDecompressor: Send + Sync {
    fn decompress(&self, input: &mut BufferRegion, output: &mut BufferRegion) -> Result<()>;
}

pub trait CapabilityLookup: Send + Sync {
    fn direct_decompressor(
        &self,
        kind: CompressionKind,
    ) -> std::result::Result<Option<Arc<dyn DirectDecompressor>>, LinkError>;
}

enum Shim {
    Linked(Arc<dyn DirectDecompressor>),
    Unlinked(LinkError),
}

/// Thread-safe registry of direct decompressors keyed by compression kind.
pub struct ShimRegistry {
    shims: RwLock<HashMap<CompressionKind, Shim>>,
}

static GLOBAL: Lazy<Arc<ShimRegistry>> = Lazy::new(|| Arc::new(ShimRegistry::with_defaults()));

impl ShimRegistry {
    /// Empty registry: every lookup answers `None`.
    pub fn new() -> Self {
        Self {
            shims: RwLock::new(HashMap::new()),
        }
    }

    /// Registry with the capabilities compiled into this build.
    ///
    /// The hardware kind starts out unlinked; a loader that finds the hardware
    /// library registers its decompressor over it.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register_unlinked(
            CompressionKind::Qat,
            LinkError::LibraryNotFound(QAT_LIBRARY.to_string()),
        );
        #[cfg(feature = "zstd")]
        registry.register(CompressionKind::Zstd, Arc::new(crate::libzstd::ZstdDirect));
        registry
    }

    /// Process-wide registry, built with [`ShimRegistry::with_defaults`] on first use.
    pub fn global() -> Arc<ShimRegistry> {
        Arc::clone(&GLOBAL)
    }

    pub fn register(&self, kind: CompressionKind, decompressor: Arc<dyn DirectDecompressor>) {
        #[cfg(feature = "tracing")]
        tracing::debug!(%kind, "registered direct decompressor");
        self.write().insert(kind, Shim::Linked(decompressor));
    }

    /// Record that the library behind `kind` failed to link.
    pub fn register_unlinked(&self, kind: CompressionKind, err: LinkError) {
        #[cfg(feature = "tracing")]
        tracing::debug!(%kind, error = %err, "direct decompressor unlinked");
        self.write().insert(kind, Shim::Unlinked(err));
    }

    pub fn unregister(&self, kind: CompressionKind) {
        self.write().remove(&kind);
    }

    /// Kinds with a linked decompressor.
    pub fn linked_kinds(&self) -> Vec<CompressionKind> {
        let shims = self.read();
        let mut kinds: Vec<CompressionKind> = shims
            .iter()
            .filter(|(_, shim)| matches!(shim, Shim::Linked(_)))
            .map(|(kind, _)| *kind)
            .collect();
        kinds.sort_by_key(|k| *k as u8);
        kinds
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<CompressionKind, Shim>> {
        self.shims.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<CompressionKind, Shim>> {
        self.shims.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ShimRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityLookup for ShimRegistry {
    fn direct_decompressor(
        &self,
        kind: CompressionKind,
    ) -> std::result::Result<Option<Arc<dyn DirectDecompressor>>, LinkError> {
        match self.read().get(&kind) {
            Some(Shim::Linked(d)) => Ok(Some(Arc::clone(d))),
            Some(Shim::Unlinked(err)) => Err(err.clone()),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl DirectDecompressor for Noop {
        fn decompress(&self, input: &mut BufferRegion, _output: &mut BufferRegion) -> Result<()> {
            let n = input.remaining();
            input.advance(n)?;
            Ok(())
        }
    }

    #[test]
    fn test_empty_registry_answers_none() {
        let registry = ShimRegistry::new();
        assert!(registry
            .direct_decompressor(CompressionKind::Qat)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_defaults_mark_hardware_unlinked() {
        let registry = ShimRegistry::with_defaults();
        let err = registry
            .direct_decompressor(CompressionKind::Qat)
            .err()
            .expect("hardware library is not linked by default");
        assert_eq!(err, LinkError::LibraryNotFound(QAT_LIBRARY.to_string()));
    }

    #[test]
    fn test_register_overrides_unlinked() {
        let registry = ShimRegistry::with_defaults();
        registry.register(CompressionKind::Qat, Arc::new(Noop));
        assert!(registry
            .direct_decompressor(CompressionKind::Qat)
            .unwrap()
            .is_some());
        assert!(registry.linked_kinds().contains(&CompressionKind::Qat));

        registry.unregister(CompressionKind::Qat);
        assert!(registry
            .direct_decompressor(CompressionKind::Qat)
            .unwrap()
            .is_none());
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn test_defaults_link_zstd() {
        let registry = ShimRegistry::global();
        assert!(registry
            .direct_decompressor(CompressionKind::Zstd)
            .unwrap()
            .is_some());
    }
}
