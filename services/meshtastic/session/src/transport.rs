//! Byte streams carrying the radio framing.
//!
//! A locally attached radio is reached through a UART adapter opened by the
//! caller; a network-attached radio speaks the same framing over TCP.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::info;

/// Default TCP port of network-attached radios
pub const DEFAULT_TCP_PORT: u16 = 4403;

/// Any duplex byte stream usable as a radio link
pub trait RadioIo: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> RadioIo for T {}

/// Unified stream type for radio links
pub enum RadioStream {
    /// TCP connection to a network-attached radio
    Tcp(TcpStream),
    /// Caller-supplied stream, typically a UART adapter
    Device(Pin<Box<dyn RadioIo>>),
}

impl RadioStream {
    /// Wrap a caller-supplied stream
    pub fn device<S: RadioIo + 'static>(stream: S) -> Self {
        RadioStream::Device(Box::pin(stream))
    }

    /// Human readable peer description for logs
    pub fn describe(&self) -> String {
        match self {
            RadioStream::Tcp(stream) => stream
                .peer_addr()
                .map(|addr| addr.to_string())
                .unwrap_or_else(|_| "tcp".to_string()),
            RadioStream::Device(_) => "device".to_string(),
        }
    }
}

impl fmt::Debug for RadioStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RadioStream({})", self.describe())
    }
}

impl AsyncRead for RadioStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            RadioStream::Tcp(stream) => Pin::new(stream).poll_read(cx, buf),
            RadioStream::Device(stream) => stream.as_mut().poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for RadioStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<Result<usize, std::io::Error>> {
        match self.get_mut() {
            RadioStream::Tcp(stream) => Pin::new(stream).poll_write(cx, buf),
            RadioStream::Device(stream) => stream.as_mut().poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), std::io::Error>> {
        match self.get_mut() {
            RadioStream::Tcp(stream) => Pin::new(stream).poll_flush(cx),
            RadioStream::Device(stream) => stream.as_mut().poll_flush(cx),
        }
    }

    fn poll_shutdown(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<(), std::io::Error>> {
        match self.get_mut() {
            RadioStream::Tcp(stream) => Pin::new(stream).poll_shutdown(cx),
            RadioStream::Device(stream) => stream.as_mut().poll_shutdown(cx),
        }
    }
}

/// Connect to a network-attached radio
pub async fn connect_tcp<A: ToSocketAddrs>(addr: A) -> tokio::io::Result<RadioStream> {
    let stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(true)?;
    let stream = RadioStream::Tcp(stream);
    info!("Connected to radio at {}", stream.describe());
    Ok(stream)
}
