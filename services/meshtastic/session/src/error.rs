//! Session error types.

use meshtastic_crypto::CryptoError;
use meshtastic_wire::WireError;
use thiserror::Error;

/// Send path and connection errors
#[derive(Error, Debug)]
pub enum SessionError {
    /// `Data.payload` exceeds `DATA_PAYLOAD_LEN`
    #[error("payload too large: {len} bytes (max {max})")]
    PayloadTooLarge {
        /// Offending length
        len: usize,
        /// Protocol maximum
        max: usize,
    },

    /// Port number outside `1..MAX`
    #[error("invalid port number: {0}")]
    InvalidPortNumber(i32),

    /// Unknown transport selector, or a handle that does not match it
    #[error("unsupported transport: {0}")]
    UnsupportedTransport(String),

    /// Framing or node id error
    #[error(transparent)]
    Wire(#[from] WireError),

    /// Key or cipher error
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Malformed protobuf
    #[error("decode failure: {0}")]
    Decode(#[from] prost::DecodeError),

    /// Stream or socket fault
    #[error("transport i/o: {0}")]
    TransportIo(#[from] std::io::Error),

    /// MQTT broker client fault
    #[error("broker error: {0}")]
    Broker(String),

    /// Connection already torn down
    #[error("connection closed")]
    Closed,
}
