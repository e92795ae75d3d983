//! Length-prefixed radio frame envelope.
//!
//! Every protobuf exchanged with a serially attached radio travels inside a
//! 4-byte header: two magic bytes followed by the big-endian body length.

use crate::error::WireError;
use bytes::{BufMut, Bytes, BytesMut};

/// First magic byte
pub const START1: u8 = 0x94;
/// Second magic byte, also the wake preamble filler
pub const START2: u8 = 0xC3;
/// Header size in bytes
pub const HEADER_LEN: usize = 4;
/// Largest body the radio accepts
pub const MAX_FRAME_LEN: usize = 512;
/// Number of `START2` bytes written when a link is opened
pub const WAKE_PREAMBLE_LEN: usize = 32;

/// Frame `body` into a freshly allocated buffer.
pub fn encode_frame(body: &[u8]) -> Result<Bytes, WireError> {
    let mut dst = BytesMut::with_capacity(HEADER_LEN + body.len());
    encode_frame_into(body, &mut dst)?;
    Ok(dst.freeze())
}

/// Append the framed `body` to `dst`.
///
/// Fails with [`WireError::FrameTooLarge`] before touching `dst` when the body
/// exceeds [`MAX_FRAME_LEN`].
pub fn encode_frame_into(body: &[u8], dst: &mut BytesMut) -> Result<(), WireError> {
    if body.len() > MAX_FRAME_LEN {
        return Err(WireError::FrameTooLarge(body.len()));
    }

    dst.reserve(HEADER_LEN + body.len());
    dst.put_u8(START1);
    dst.put_u8(START2);
    dst.put_u16(body.len() as u16);
    dst.put_slice(body);
    Ok(())
}

/// Bytes written before the first frame of a session.
///
/// Contains no `START1`, so a parser stuck mid-frame from an earlier session
/// drains back to waiting for one.
pub fn wake_preamble() -> [u8; WAKE_PREAMBLE_LEN] {
    [START2; WAKE_PREAMBLE_LEN]
}

/// True when `bytes` is non-empty and consists only of preamble filler.
pub fn is_wake_preamble(bytes: &[u8]) -> bool {
    !bytes.is_empty() && bytes.iter().all(|b| *b == START2)
}
