//! `tokio_util` codec over the frame reader.

use crate::error::WireError;
use crate::frame::encode_frame_into;
use crate::reader::{FrameReader, ReaderState, SerialItem};
use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Frame codec for `FramedRead`/`FramedWrite` over a serial byte stream.
///
/// Decoding consumes every buffered byte, so the codec never asks the
/// transport to hold data back; partial frames live inside the reader.
#[derive(Debug, Default)]
pub struct FrameCodec {
    reader: FrameReader,
}

impl FrameCodec {
    /// Create a codec waiting for `START1`
    pub fn new() -> Self {
        Self::default()
    }

    /// Current reader state
    pub fn state(&self) -> ReaderState {
        self.reader.state()
    }
}

impl Decoder for FrameCodec {
    type Item = SerialItem;
    type Error = WireError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let mut found = None;
        for (i, byte) in src.iter().enumerate() {
            if let Some(item) = self.reader.push(*byte) {
                found = Some((i + 1, item));
                break;
            }
        }

        match found {
            Some((consumed, item)) => {
                src.advance(consumed);
                Ok(Some(item))
            }
            None => {
                src.clear();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(item) = self.decode(src)? {
            return Ok(Some(item));
        }
        Ok(self.reader.flush_console())
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = WireError;

    fn encode(&mut self, body: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame_into(&body, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{encode_frame, wake_preamble};
    use futures::StreamExt;
    use tokio::io::AsyncWriteExt;
    use tokio_util::codec::FramedRead;

    #[test]
    fn test_decode_across_partial_reads() {
        let mut codec = FrameCodec::new();
        let frame = encode_frame(b"hello").unwrap();

        let mut buf = BytesMut::from(&frame[..3]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert!(buf.is_empty());
        assert_eq!(codec.state(), ReaderState::ReadLenLo);

        buf.extend_from_slice(&frame[3..]);
        let item = codec.decode(&mut buf).unwrap();
        assert_eq!(item, Some(SerialItem::Frame(Bytes::from_static(b"hello"))));
    }

    #[test]
    fn test_leaves_following_bytes_buffered() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&encode_frame(b"a").unwrap());
        buf.extend_from_slice(&encode_frame(b"b").unwrap());

        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(SerialItem::Frame(Bytes::from_static(b"a")))
        );
        assert_eq!(buf.len(), 5);
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(SerialItem::Frame(Bytes::from_static(b"b")))
        );
    }

    #[tokio::test]
    async fn test_framed_read_over_duplex() {
        let (mut tx, rx) = tokio::io::duplex(64);
        let mut framed = FramedRead::new(rx, FrameCodec::new());

        tokio::spawn(async move {
            tx.write_all(&wake_preamble()).await.unwrap();
            tx.write_all(b"boot ok\n").await.unwrap();
            tx.write_all(&encode_frame(&[7u8; 200]).unwrap()).await.unwrap();
            tx.write_all(b"tail").await.unwrap();
        });

        assert_eq!(
            framed.next().await.unwrap().unwrap(),
            SerialItem::Console("boot ok".into())
        );
        assert_eq!(
            framed.next().await.unwrap().unwrap(),
            SerialItem::Frame(Bytes::from(vec![7u8; 200]))
        );
        assert_eq!(
            framed.next().await.unwrap().unwrap(),
            SerialItem::Console("tail".into())
        );
        assert!(framed.next().await.is_none());
    }
}
