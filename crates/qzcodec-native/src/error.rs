use thiserror::Error;

use crate::capability::LinkError;

/// Result type local to qzcodec-native.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("native I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(String),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Core(#[from] qzcodec_core::Error),

    #[error("unsupported: {0}")]
    Unsupported(&'static str),

    #[error("injected fault in {0}")]
    InjectedFault(&'static str),
}
