//! Compression-type tags used to key capability lookups.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum CompressionKind {
    None = 0,
    #[serde(rename = "zlib_noheader")]
    ZlibNoHeader = 1,
    Zlib = 2,
    Snappy = 3,
    Zstd = 4,
    Qat = 5,
}

impl CompressionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CompressionKind::None => "none",
            CompressionKind::ZlibNoHeader => "zlib_noheader",
            CompressionKind::Zlib => "zlib",
            CompressionKind::Snappy => "snappy",
            CompressionKind::Zstd => "zstd",
            CompressionKind::Qat => "qat",
        }
    }

    pub fn from_u8(v: u8) -> Result<Self> {
        match v {
            0 => Ok(CompressionKind::None),
            1 => Ok(CompressionKind::ZlibNoHeader),
            2 => Ok(CompressionKind::Zlib),
            3 => Ok(CompressionKind::Snappy),
            4 => Ok(CompressionKind::Zstd),
            5 => Ok(CompressionKind::Qat),
            _ => Err(Error::Config(format!("unknown compression kind id {v}"))),
        }
    }
}

impl fmt::Display for CompressionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompressionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(CompressionKind::None),
            "zlib_noheader" | "zlib-noheader" => Ok(CompressionKind::ZlibNoHeader),
            "zlib" => Ok(CompressionKind::Zlib),
            "snappy" => Ok(CompressionKind::Snappy),
            "zstd" => Ok(CompressionKind::Zstd),
            "qat" => Ok(CompressionKind::Qat),
            other => Err(Error::Config(format!("unknown compression kind '{other}'"))),
        }
    }
}
