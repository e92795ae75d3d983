//! Serial framing, stream resynchronization, node ids and text chunking.
//!
//! This crate holds the pure, transport-agnostic pieces of the Meshtastic
//! link layer. Nothing here performs I/O; the session crate drives these
//! types over real byte streams.
//!
//! ## Features
//!
//! - **Frame Codec**: 4-byte `0x94 0xC3 len_hi len_lo` envelope, 512-byte cap
//! - **Wake Preamble**: 32 × `0xC3` to wake a sleeping radio and force resync
//! - **Self-Resynchronizing Reader**: byte-at-a-time state machine that
//!   never fails the stream and separates device console output from frames
//! - **Tokio Codec**: `FrameCodec` plugs the reader into `FramedRead`
//! - **Node Ids**: one normalized `NodeId` type for `!hex`, decimal and `0x` forms
//! - **Text Chunking**: UTF-8 safe splitting of long text messages
//!
//! ## Wire Format
//!
//! ```text
//! +------+------+--------+--------+-----------------------------+
//! | 0x94 | 0xC3 | len_hi | len_lo | len bytes (ToRadio/FromRadio)|
//! +------+------+--------+--------+-----------------------------+
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chunk;
pub mod codec;
pub mod error;
pub mod frame;
pub mod node_id;
pub mod reader;

// Re-export main types
pub use chunk::{TextChunker, DEFAULT_TEXT_CHUNK_SIZE};
pub use codec::FrameCodec;
pub use error::WireError;
pub use frame::{
    encode_frame, encode_frame_into, is_wake_preamble, wake_preamble, HEADER_LEN, MAX_FRAME_LEN,
    START1, START2, WAKE_PREAMBLE_LEN,
};
pub use node_id::NodeId;
pub use reader::{FrameReader, ReaderState, SerialItem, MAX_CONSOLE_LINE};
