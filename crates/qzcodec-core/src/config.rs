//! Codec configuration that downstream crates can serialize/deserialize.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::kind::CompressionKind;

pub const DEFAULT_BUFFER_SIZE: usize = 256 * 1024;
pub const DEFAULT_LEVEL: i32 = 1;
pub const MIN_LEVEL: i32 = 1;
pub const MAX_LEVEL: i32 = 22;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Size of the backend's fixed working region. Forwarded unchanged to every session.
    pub buffer_size: usize,

    /// Compression level handed to the backend when it is constructed.
    pub level: i32,

    /// Tag used to look up the direct-decompression capability.
    pub kind: CompressionKind,

    /// Prefer NUMA-local memory for native-addressable regions.
    pub numa: bool,

    /// Require pinned memory for native-addressable regions.
    pub force_pinned: bool,
}

/// Allocation hints for native-addressable regions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocHints {
    pub numa: bool,
    pub force_pinned: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            level: DEFAULT_LEVEL,
            kind: CompressionKind::Qat,
            numa: false,
            force_pinned: false,
        }
    }
}

impl CodecConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `QZCODEC_BUFFER_SIZE`: working-region size in bytes
    /// - `QZCODEC_LEVEL`: compression level
    /// - `QZCODEC_KIND`: compression-type tag (`qat`, `zstd`, ...)
    /// - `QZCODEC_NUMA`: `1`/`true` to prefer NUMA-local direct memory
    /// - `QZCODEC_FORCE_PINNED`: `1`/`true` to require pinned direct memory
    ///
    /// Unparsable values are ignored.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("QZCODEC_BUFFER_SIZE") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.buffer_size = v;
            }
        }

        if let Ok(s) = std::env::var("QZCODEC_LEVEL") {
            if let Ok(v) = s.parse::<i32>() {
                cfg.level = v;
            }
        }

        if let Ok(s) = std::env::var("QZCODEC_KIND") {
            if let Ok(v) = s.parse::<CompressionKind>() {
                cfg.kind = v;
            }
        }

        if let Ok(s) = std::env::var("QZCODEC_NUMA") {
            if let Some(v) = parse_flag(&s) {
                cfg.numa = v;
            }
        }

        if let Ok(s) = std::env::var("QZCODEC_FORCE_PINNED") {
            if let Some(v) = parse_flag(&s) {
                cfg.force_pinned = v;
            }
        }

        cfg
    }

    /// Load a JSON config file. Missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        let cfg: Self = serde_json::from_slice(&bytes)?;
        Ok(cfg)
    }

    /// Overlay the fields present in a JSON config file onto `self`.
    pub fn merge_json_file<P: AsRef<Path>>(self, path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        let overlay: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(&bytes)?;
        let mut base = match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => map,
            _ => return Err(Error::Config("config did not serialize to an object".into())),
        };
        base.extend(overlay);
        Ok(serde_json::from_value(serde_json::Value::Object(base))?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(Error::Config("buffer_size must be greater than zero".into()));
        }
        if !(MIN_LEVEL..=MAX_LEVEL).contains(&self.level) {
            return Err(Error::Config(format!(
                "level {} outside {MIN_LEVEL}..={MAX_LEVEL}",
                self.level
            )));
        }
        Ok(())
    }

    pub fn alloc_hints(&self) -> AllocHints {
        AllocHints {
            numa: self.numa,
            force_pinned: self.force_pinned,
        }
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let cfg = CodecConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.kind, CompressionKind::Qat);
        assert_eq!(cfg.alloc_hints(), AllocHints::default());
    }

    #[test]
    fn test_validate_rejects_zero_buffer() {
        let cfg = CodecConfig {
            buffer_size: 0,
            ..CodecConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("buffer_size"));
    }

    #[test]
    fn test_validate_rejects_level_out_of_range() {
        let cfg = CodecConfig {
            level: 23,
            ..CodecConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let cfg: CodecConfig = serde_json::from_str(r#"{"buffer_size": 4096, "kind": "zstd"}"#).unwrap();
        assert_eq!(cfg.buffer_size, 4096);
        assert_eq!(cfg.kind, CompressionKind::Zstd);
        assert_eq!(cfg.level, DEFAULT_LEVEL);
    }

    #[test]
    fn test_from_json_file_missing_path() {
        let err = CodecConfig::from_json_file("/nonexistent/qzcodec.json").unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }

    #[test]
    fn test_merge_json_file_keeps_unset_fields() {
        let path = std::env::temp_dir().join(format!("qzcodec-merge-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"level": 9}"#).unwrap();
        let base = CodecConfig {
            buffer_size: 8192,
            ..CodecConfig::default()
        };
        let merged = base.merge_json_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(merged.level, 9);
        assert_eq!(merged.buffer_size, 8192);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
