//! Self-resynchronizing frame reader.
//!
//! The radio multiplexes two things onto one serial line: framed protobuf
//! messages and free-form firmware console output. The reader consumes the
//! line one byte at a time, emits every complete frame, and collects the
//! bytes seen between frames into console lines. A corrupt or truncated
//! frame costs at most that frame; the reader never enters an error state.

use crate::frame::{MAX_FRAME_LEN, START1, START2};
use bytes::{Bytes, BytesMut};
use tracing::{debug, trace};

/// Console lines longer than this are emitted in pieces
pub const MAX_CONSOLE_LINE: usize = 1024;

/// Reader synchronization state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// Waiting for `START1`
    SeekStart1,
    /// Saw `START1`, waiting for `START2`
    SeekStart2,
    /// Waiting for the length high byte
    ReadLenHi,
    /// Waiting for the length low byte
    ReadLenLo,
    /// Accumulating the body
    ReadBody,
}

/// Item produced by the reader
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerialItem {
    /// Complete frame body (a serialized `FromRadio`)
    Frame(Bytes),
    /// One line of device console output
    Console(String),
}

/// Byte-at-a-time frame synchronizer
#[derive(Debug)]
pub struct FrameReader {
    state: ReaderState,
    len: usize,
    body: BytesMut,
    console: Vec<u8>,
}

impl FrameReader {
    /// Create a reader waiting for `START1`
    pub fn new() -> Self {
        Self {
            state: ReaderState::SeekStart1,
            len: 0,
            body: BytesMut::with_capacity(MAX_FRAME_LEN),
            console: Vec::new(),
        }
    }

    /// Current synchronization state
    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// Drop any partial frame and wait for `START1` again
    pub fn reset(&mut self) {
        self.state = ReaderState::SeekStart1;
        self.len = 0;
        self.body.clear();
    }

    /// Feed one byte, returning a frame or console line when one completes.
    pub fn push(&mut self, byte: u8) -> Option<SerialItem> {
        match self.state {
            ReaderState::SeekStart1 => {
                if byte == START1 {
                    self.state = ReaderState::SeekStart2;
                    None
                } else if byte == START2 {
                    // wake preamble filler
                    None
                } else {
                    self.push_console(byte)
                }
            }
            ReaderState::SeekStart2 => {
                if byte == START2 {
                    self.state = ReaderState::ReadLenHi;
                } else {
                    trace!("Lost sync after START1 (got {:#04x})", byte);
                    self.reset();
                }
                None
            }
            ReaderState::ReadLenHi => {
                self.len = (byte as usize) << 8;
                self.state = ReaderState::ReadLenLo;
                None
            }
            ReaderState::ReadLenLo => {
                self.len |= byte as usize;
                if self.len > MAX_FRAME_LEN {
                    debug!("Declared frame length {} over limit, resyncing", self.len);
                    self.reset();
                    None
                } else if self.len == 0 {
                    self.reset();
                    Some(SerialItem::Frame(Bytes::new()))
                } else {
                    self.body.clear();
                    self.state = ReaderState::ReadBody;
                    None
                }
            }
            ReaderState::ReadBody => {
                self.body.extend_from_slice(&[byte]);
                if self.body.len() == self.len {
                    let frame = self.body.split().freeze();
                    self.reset();
                    Some(SerialItem::Frame(frame))
                } else {
                    None
                }
            }
        }
    }

    /// Emit any buffered partial console line.
    pub fn flush_console(&mut self) -> Option<SerialItem> {
        if self.console.is_empty() {
            return None;
        }
        Some(self.take_console_line())
    }

    fn push_console(&mut self, byte: u8) -> Option<SerialItem> {
        if byte == b'\n' {
            return Some(self.take_console_line());
        }

        self.console.push(byte);
        if self.console.len() >= MAX_CONSOLE_LINE {
            Some(self.take_console_line())
        } else {
            None
        }
    }

    fn take_console_line(&mut self) -> SerialItem {
        if self.console.last() == Some(&b'\r') {
            self.console.pop();
        }
        let line = String::from_utf8_lossy(&self.console).into_owned();
        self.console.clear();
        SerialItem::Console(line)
    }
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::encode_frame;

    fn feed(reader: &mut FrameReader, bytes: &[u8]) -> Vec<SerialItem> {
        bytes.iter().filter_map(|b| reader.push(*b)).collect()
    }

    #[test]
    fn test_frame_roundtrip_returns_to_seek() {
        let body: Vec<u8> = (1..=10).collect();
        let mut reader = FrameReader::new();

        let items = feed(&mut reader, &encode_frame(&body).unwrap());

        assert_eq!(items, vec![SerialItem::Frame(Bytes::from(body))]);
        assert_eq!(reader.state(), ReaderState::SeekStart1);
    }

    #[test]
    fn test_state_progression() {
        let mut reader = FrameReader::new();
        reader.push(START1);
        assert_eq!(reader.state(), ReaderState::SeekStart2);
        reader.push(START2);
        assert_eq!(reader.state(), ReaderState::ReadLenHi);
        reader.push(0x00);
        assert_eq!(reader.state(), ReaderState::ReadLenLo);
        reader.push(0x02);
        assert_eq!(reader.state(), ReaderState::ReadBody);
        assert!(reader.push(0xAA).is_none());
        assert!(reader.push(0xBB).is_some());
        assert_eq!(reader.state(), ReaderState::SeekStart1);
    }

    #[test]
    fn test_bad_second_magic_resyncs() {
        let mut reader = FrameReader::new();
        let mut stream = vec![START1, 0x00];
        stream.extend_from_slice(&encode_frame(b"ok").unwrap());

        let items = feed(&mut reader, &stream);
        assert_eq!(items, vec![SerialItem::Frame(Bytes::from_static(b"ok"))]);
    }

    #[test]
    fn test_oversized_length_resyncs() {
        let mut reader = FrameReader::new();
        // declares 0x0300 = 768 bytes
        let mut stream = vec![START1, START2, 0x03, 0x00];
        stream.extend_from_slice(&encode_frame(b"next").unwrap());

        let items = feed(&mut reader, &stream);
        assert_eq!(items, vec![SerialItem::Frame(Bytes::from_static(b"next"))]);
    }

    #[test]
    fn test_zero_length_frame() {
        let mut reader = FrameReader::new();
        let items = feed(&mut reader, &[START1, START2, 0x00, 0x00]);
        assert_eq!(items, vec![SerialItem::Frame(Bytes::new())]);
        assert_eq!(reader.state(), ReaderState::SeekStart1);
    }

    #[test]
    fn test_console_lines_between_frames() {
        let mut reader = FrameReader::new();
        let mut stream = b"INFO boot\r\n".to_vec();
        stream.extend_from_slice(&encode_frame(&[START1, START2, b'\n']).unwrap());
        stream.extend_from_slice(b"DEBUG tx\n");

        let items = feed(&mut reader, &stream);
        assert_eq!(
            items,
            vec![
                SerialItem::Console("INFO boot".into()),
                SerialItem::Frame(Bytes::from_static(&[START1, START2, b'\n'])),
                SerialItem::Console("DEBUG tx".into()),
            ]
        );
    }

    #[test]
    fn test_preamble_is_not_console() {
        let mut reader = FrameReader::new();
        let items = feed(&mut reader, &crate::frame::wake_preamble());
        assert!(items.is_empty());
        assert!(reader.flush_console().is_none());
    }

    #[test]
    fn test_long_console_line_is_split() {
        let mut reader = FrameReader::new();
        let items = feed(&mut reader, &vec![b'x'; MAX_CONSOLE_LINE + 5]);
        assert_eq!(items.len(), 1);
        assert_eq!(
            reader.flush_console(),
            Some(SerialItem::Console("xxxxx".into()))
        );
    }
}
