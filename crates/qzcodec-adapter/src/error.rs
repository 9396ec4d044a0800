use std::io;

use qzcodec_core::kind::CompressionKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Every variant is an I/O-category failure from the host's point of view;
/// see the `From<Error> for io::Error` impl.
#[derive(Debug, Error)]
pub enum Error {
    #[error("native backend error: {0}")]
    Native(#[from] qzcodec_native::Error),

    #[error(transparent)]
    Core(#[from] qzcodec_core::Error),

    #[error("direct decompression is not available for {0}")]
    DirectUnavailable(CompressionKind),

    #[error("direct decompression requires native-addressable input and output regions")]
    NotDirect,

    #[error("compressed stream requires a preset dictionary, which this codec does not supply")]
    DictionaryRequired,

    #[error("compressed stream ended early ({produced} bytes produced)")]
    TruncatedInput { produced: usize },

    #[error("output region exhausted before the stream ended ({produced} bytes produced)")]
    OutputExhausted { produced: usize },

    #[error("native session stopped making progress")]
    Stalled,
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Native(qzcodec_native::Error::Io(inner)) => inner,
            Error::TruncatedInput { .. } => io::Error::new(io::ErrorKind::UnexpectedEof, e),
            Error::OutputExhausted { .. } => io::Error::new(io::ErrorKind::WriteZero, e),
            Error::DictionaryRequired | Error::NotDirect | Error::DirectUnavailable(_) => {
                io::Error::new(io::ErrorKind::Unsupported, e)
            }
            Error::Core(_) => io::Error::new(io::ErrorKind::InvalidInput, e),
            Error::Native(_) | Error::Stalled => io::Error::new(io::ErrorKind::InvalidData, e),
        }
    }
}
