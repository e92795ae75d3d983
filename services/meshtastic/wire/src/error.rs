//! Wire layer error types.

use thiserror::Error;

/// Wire layer errors
#[derive(Error, Debug)]
pub enum WireError {
    /// Frame body exceeds the 512-byte protocol limit
    #[error("frame too large: {0} bytes")]
    FrameTooLarge(usize),

    /// String is not a recognizable node id
    #[error("invalid node id: {0:?}")]
    InvalidNodeId(String),

    /// Underlying stream error while decoding
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
