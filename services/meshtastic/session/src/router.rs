//! Send path: assembled packets onto the radio, serial or MQTT transport.

use crate::assembler::{PacketAssembler, SendOptions, DEFAULT_TEXT};
use crate::error::SessionError;
use crate::mqtt::{MqttClient, TopicConfig};
use crate::packet_id::generate;
use crate::serial::SerialConnection;
use crate::state::OutboundRecord;
use bytes::Bytes;
use meshtastic_proto::{Data, MeshPacket, Message, PortNum, ServiceEnvelope, ToRadio};
use meshtastic_wire::{encode_frame, NodeId, TextChunker};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

/// Default pause between the chunks of a long text
pub const DEFAULT_CHUNK_DELAY: Duration = Duration::from_millis(500);

/// Transport selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Via {
    /// Framed `ToRadio` over a raw radio stream
    Radio,
    /// Framed `ToRadio` over a serial connection
    Serial,
    /// `ServiceEnvelope` published to a broker
    Mqtt,
}

impl FromStr for Via {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "radio" => Ok(Via::Radio),
            "serial" => Ok(Via::Serial),
            "mqtt" => Ok(Via::Mqtt),
            _ => Err(SessionError::UnsupportedTransport(s.to_string())),
        }
    }
}

impl fmt::Display for Via {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Via::Radio => "radio",
            Via::Serial => "serial",
            Via::Mqtt => "mqtt",
        };
        f.write_str(name)
    }
}

/// Handle of the transport a packet is written to
pub enum Transport<'a> {
    /// Raw byte stream to a radio
    Stream(&'a mut (dyn AsyncWrite + Unpin + Send)),
    /// Serial connection with background reader
    Serial(&'a SerialConnection),
    /// Broker client
    Mqtt(&'a mut dyn MqttClient),
}

impl Transport<'_> {
    fn kind(&self) -> &'static str {
        match self {
            Transport::Stream(_) => "stream",
            Transport::Serial(_) => "serial connection",
            Transport::Mqtt(_) => "mqtt client",
        }
    }
}

/// Assembles packets and hands them to a transport
#[derive(Debug, Clone)]
pub struct TransportRouter {
    assembler: PacketAssembler,
    topics: TopicConfig,
    chunker: TextChunker,
    chunk_delay: Duration,
}

impl TransportRouter {
    /// Router with default chunking
    pub fn new(assembler: PacketAssembler, topics: TopicConfig) -> Self {
        Self {
            assembler,
            topics,
            chunker: TextChunker::new(),
            chunk_delay: DEFAULT_CHUNK_DELAY,
        }
    }

    /// Override the pause between chunks
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    /// Override the chunker
    pub fn with_chunker(mut self, chunker: TextChunker) -> Self {
        self.chunker = chunker;
        self
    }

    /// Packet assembler
    pub fn assembler(&self) -> &PacketAssembler {
        &self.assembler
    }

    /// MQTT topic layout
    pub fn topics(&self) -> &TopicConfig {
        &self.topics
    }

    /// Hand an assembled packet to the transport
    pub async fn send_packet(
        &self,
        packet: MeshPacket,
        opts: &SendOptions,
        via: Via,
        transport: &mut Transport<'_>,
    ) -> Result<OutboundRecord, SessionError> {
        let topic = self.topics.publish_topic(&opts.channel_name, NodeId(packet.from));
        self.send_on_topic(packet, opts, via, transport, topic).await
    }

    async fn send_on_topic(
        &self,
        packet: MeshPacket,
        opts: &SendOptions,
        via: Via,
        transport: &mut Transport<'_>,
        topic: String,
    ) -> Result<OutboundRecord, SessionError> {
        let record = OutboundRecord {
            packet_id: packet.id,
            to: NodeId(packet.to),
            want_ack: packet.want_ack,
            sent_at: Instant::now(),
        };

        match (via, transport) {
            (Via::Radio | Via::Serial, Transport::Stream(stream)) => {
                let frame = encode_frame(&ToRadio::packet(packet).encode_to_vec())?;
                stream.write_all(&frame).await?;
                stream.flush().await?;
            }
            (Via::Radio | Via::Serial, Transport::Serial(conn)) => {
                conn.send_to_radio(&ToRadio::packet(packet)).await?;
            }
            (Via::Mqtt, Transport::Mqtt(client)) => {
                let envelope = ServiceEnvelope {
                    gateway_id: NodeId(packet.from).to_string(),
                    channel_id: opts.channel_name.clone(),
                    packet: Some(packet),
                };
                client
                    .publish(&topic, Bytes::from(envelope.encode_to_vec()))
                    .await?;
                debug!("Published packet {:#010x} to {}", record.packet_id, topic);
            }
            (via, transport) => {
                return Err(SessionError::UnsupportedTransport(format!(
                    "{} over a {}",
                    via,
                    transport.kind()
                )));
            }
        }

        debug!("Packet {:#010x} handed to {}", record.packet_id, via);
        Ok(record)
    }

    /// Assemble `data` and send it
    pub async fn send_data(
        &self,
        mut data: Data,
        opts: &SendOptions,
        via: Via,
        transport: &mut Transport<'_>,
    ) -> Result<OutboundRecord, SessionError> {
        if opts.want_response {
            data.want_response = true;
        }
        let packet = self.assembler.build_data_packet(data, opts)?;
        self.send_packet(packet, opts, via, transport).await
    }

    /// Send a text message, split into sequential chunks when it exceeds
    /// the chunk size. `None` sends the default text.
    pub async fn send_text(
        &self,
        text: Option<&str>,
        opts: &SendOptions,
        via: Via,
        transport: &mut Transport<'_>,
    ) -> Result<Vec<OutboundRecord>, SessionError> {
        let chunks = self.chunker.split(text.unwrap_or(DEFAULT_TEXT));
        let from = opts.from;

        // assemble every chunk before sending so a bad chunk sends nothing
        let mut last_id = opts.last_packet_id;
        let mut packets = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let mut data = Data::new(PortNum::TextMessageApp, chunk.as_bytes());
            data.want_response = opts.want_response;
            let id = generate(last_id);
            packets.push(self.assembler.build_with_id(data, opts, id)?);
            last_id = id;
        }

        let total = packets.len();
        let mut records = Vec::with_capacity(total);
        for (index, packet) in packets.into_iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.chunk_delay).await;
            }
            let topic = if total > 1 {
                self.topics.chunk_topic(&opts.channel_name, from, index + 1)
            } else {
                self.topics.publish_topic(&opts.channel_name, from)
            };
            records.push(self.send_on_topic(packet, opts, via, transport, topic).await?);
        }

        if total > 1 {
            info!("Sent text to {} in {} chunks", opts.to, total);
        }
        Ok(records)
    }
}
