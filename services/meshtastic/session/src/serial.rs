//! Serial connection to a locally attached radio.
//!
//! Opening a connection wakes the radio with the preamble and spawns two
//! tasks. The reader drives [`FrameCodec`] over the stream and never drops
//! bytes: it awaits channel capacity instead. The decoder turns frames into
//! [`FromRadio`] messages. Both observe one cancellation token and are
//! joined by [`SerialConnection::close`].

use crate::error::SessionError;
use crate::state::SessionState;
use crate::transport::RadioStream;
use futures::StreamExt;
use meshtastic_proto::{FromRadio, Message, ToRadio};
use meshtastic_wire::{encode_frame, wake_preamble, FrameCodec, SerialItem, WireError};
use std::time::Duration;
use tokio::io::{AsyncWriteExt, WriteHalf};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Serial connection settings
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Capacity of the frame and event queues
    pub channel_capacity: usize,
    /// Pause after the wake preamble
    pub wake_delay: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            wake_delay: Duration::from_millis(100),
        }
    }
}

/// Item delivered to the owner of a connection
#[derive(Debug, Clone, PartialEq)]
pub enum SerialEvent {
    /// Decoded radio message
    FromRadio(Box<FromRadio>),
    /// Device console line
    Console(String),
    /// Frame that is not a valid `FromRadio`
    DecodeError(String),
}

/// Framed link to a radio with background reader tasks
pub struct SerialConnection {
    peer: String,
    writer: Mutex<WriteHalf<RadioStream>>,
    events: mpsc::Receiver<SerialEvent>,
    cancel: CancellationToken,
    reader_task: JoinHandle<Result<(), WireError>>,
    decode_task: JoinHandle<()>,
}

impl SerialConnection {
    /// Wake the radio and start the reader tasks
    pub async fn open(stream: RadioStream, config: SerialConfig) -> Result<Self, SessionError> {
        let peer = stream.describe();
        let (read_half, mut write_half) = tokio::io::split(stream);

        write_half.write_all(&wake_preamble()).await?;
        write_half.flush().await?;
        tokio::time::sleep(config.wake_delay).await;

        let cancel = CancellationToken::new();
        let (raw_tx, mut raw_rx) = mpsc::channel::<SerialItem>(config.channel_capacity);
        let (event_tx, events) = mpsc::channel::<SerialEvent>(config.channel_capacity);

        let reader_cancel = cancel.clone();
        let reader_task = tokio::spawn(async move {
            let mut frames = FramedRead::new(read_half, FrameCodec::new());
            loop {
                tokio::select! {
                    _ = reader_cancel.cancelled() => return Ok(()),
                    item = frames.next() => match item {
                        Some(Ok(item)) => {
                            if raw_tx.send(item).await.is_err() {
                                return Ok(());
                            }
                        }
                        Some(Err(e)) => {
                            error!("Serial read failed: {}", e);
                            reader_cancel.cancel();
                            return Err(e);
                        }
                        None => {
                            debug!("Radio stream reached end of file");
                            return Ok(());
                        }
                    }
                }
            }
        });

        let decode_cancel = cancel.clone();
        let decode_task = tokio::spawn(async move {
            while let Some(item) = raw_rx.recv().await {
                let event = match item {
                    SerialItem::Frame(body) => match FromRadio::decode(body) {
                        Ok(msg) => {
                            debug!("Received FromRadio id {}", msg.id);
                            SerialEvent::FromRadio(Box::new(msg))
                        }
                        Err(e) => {
                            warn!("Undecodable frame from radio: {}", e);
                            SerialEvent::DecodeError(e.to_string())
                        }
                    },
                    SerialItem::Console(line) => SerialEvent::Console(line),
                };
                tokio::select! {
                    _ = decode_cancel.cancelled() => break,
                    sent = event_tx.send(event) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        info!("Serial connection to {} open", peer);
        Ok(Self {
            peer,
            writer: Mutex::new(write_half),
            events,
            cancel,
            reader_task,
            decode_task,
        })
    }

    /// Peer description
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Frame and write one message
    pub async fn send_to_radio(&self, msg: &ToRadio) -> Result<(), SessionError> {
        if self.cancel.is_cancelled() {
            return Err(SessionError::Closed);
        }
        let frame = encode_frame(&msg.encode_to_vec())?;
        let mut writer = self.writer.lock().await;
        writer.write_all(&frame).await?;
        writer.flush().await?;
        debug!("Sent {} byte frame to {}", frame.len(), self.peer);
        Ok(())
    }

    /// Begin the want-config handshake
    pub async fn start_config(&self, state: &mut SessionState) -> Result<(), SessionError> {
        let request = state.start_config();
        self.send_to_radio(&request).await
    }

    /// Keep the radio from dropping this client
    pub async fn send_heartbeat(&self) -> Result<(), SessionError> {
        self.send_to_radio(&ToRadio::heartbeat()).await
    }

    /// Next event; `None` once the connection has ended
    pub async fn next_event(&mut self) -> Option<SerialEvent> {
        self.events.recv().await
    }

    /// Consume events until the connection ends, passing console lines that
    /// satisfy `filter` to `on_line`. Radio messages are applied to `state`.
    pub async fn monitor_console<F, H>(&mut self, state: &mut SessionState, filter: F, mut on_line: H)
    where
        F: Fn(&str) -> bool,
        H: FnMut(String),
    {
        while let Some(event) = self.next_event().await {
            match event {
                SerialEvent::Console(line) if filter(&line) => on_line(line),
                SerialEvent::FromRadio(msg) => {
                    state.apply_from_radio(&msg);
                }
                _ => {}
            }
        }
    }

    /// Stop the tasks, release the stream, and surface a reader failure
    pub async fn close(self) -> Result<(), SessionError> {
        self.cancel.cancel();
        let Self {
            peer,
            writer,
            reader_task,
            decode_task,
            ..
        } = self;

        let read_result = reader_task.await;
        if let Err(e) = decode_task.await {
            warn!("Decode task for {} ended abnormally: {}", peer, e);
        }

        let mut writer = writer.into_inner();
        if let Err(e) = writer.shutdown().await {
            debug!("Shutdown of {} failed: {}", peer, e);
        }
        info!("Serial connection to {} closed", peer);

        match read_result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(WireError::Io(e))) => Err(SessionError::TransportIo(e)),
            Ok(Err(e)) => Err(SessionError::Wire(e)),
            Err(e) => Err(SessionError::TransportIo(std::io::Error::other(e))),
        }
    }
}
