//! Meshtastic client: configuration, logging and the monitor/subscribe loops.
//!
//! [`MeshClient`] wires the key table, packet assembler, transport router
//! and receive pipeline together from one [`ClientConfig`]. Its long-running
//! loops end on Ctrl+C (or a caller supplied shutdown future) and always
//! release the transport before returning.
//!
//! ## Features
//!
//! - **Configuration**: YAML file with `MESHTASTIC_*` environment overrides
//! - **Logging**: `[timestamp] [component] [level] message` lines
//! - **Serial Monitor**: handshake, radio messages through the pipeline,
//!   console lines to the log
//! - **MQTT Subscribe**: one envelope at a time through the pipeline
//! - **Clean Shutdown**: interrupt closes the serial tasks or disconnects

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod logging;

// Re-export main types
pub use config::{ClientConfig, MqttConfig, ReceiveConfig, SerialSettings};
pub use logging::{env_filter, init_logging, MeshLogFormatter};

use anyhow::{Context, Result};
use meshtastic_crypto::CryptoEngine;
use meshtastic_proto::mesh::from_radio::PayloadVariant;
use meshtastic_receive::{EnrichedMessage, Geocoder, ReceivePipeline, Source};
use meshtastic_session::{
    MqttClient, OutboundRecord, PacketAssembler, RadioStream, SendOptions, SerialConfig,
    SerialConnection, SerialEvent, SessionState, Transport, TransportRouter, Via,
};
use meshtastic_wire::NodeId;
use std::future::Future;
use std::sync::Arc;

/// Resolves on Ctrl+C; never resolves if the handler cannot be installed
pub async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        component_warn!("client", "Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    component_info!("client", "CTRL+C detected, shutting down");
}

/// Send and receive facade over one configuration
#[derive(Clone)]
pub struct MeshClient {
    config: ClientConfig,
    router: TransportRouter,
    pipeline: ReceivePipeline,
}

impl MeshClient {
    /// Build the send and receive paths from `config`
    pub fn new(config: ClientConfig) -> Result<Self> {
        let crypto = Arc::new(CryptoEngine::new(config.key_table()?));
        let router = TransportRouter::new(
            PacketAssembler::new(crypto.clone()),
            config.mqtt.topics.clone(),
        )
        .with_chunk_delay(config.chunk_delay()?);
        let pipeline = ReceivePipeline::new(crypto, config.receive_options());

        Ok(Self {
            config,
            router,
            pipeline,
        })
    }

    /// Attach a geocoder for `gps_metadata`
    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.pipeline = self.pipeline.with_geocoder(geocoder);
        self
    }

    /// Configuration in use
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send path
    pub fn router(&self) -> &TransportRouter {
        &self.router
    }

    /// Receive path
    pub fn pipeline(&self) -> &ReceivePipeline {
        &self.pipeline
    }

    /// Text defaults from the configured node to `to` on `channel_name`
    pub fn text_options(&self, to: NodeId, channel_name: &str) -> SendOptions {
        SendOptions {
            from: self.config.node_id,
            to,
            channel_name: channel_name.to_string(),
            ..SendOptions::for_text()
        }
    }

    /// Send a text message from the configured node
    pub async fn send_text(
        &self,
        text: Option<&str>,
        opts: &SendOptions,
        via: Via,
        transport: &mut Transport<'_>,
    ) -> Result<Vec<OutboundRecord>> {
        self.router
            .send_text(text, opts, via, transport)
            .await
            .with_context(|| format!("Failed to send text to {} via {}", opts.to, via))
    }

    /// Open a serial connection and start the want-config handshake
    pub async fn connect_serial(&self, stream: RadioStream) -> Result<(SerialConnection, SessionState)> {
        let conn = SerialConnection::open(stream, SerialConfig::default())
            .await
            .context("Failed to open serial connection")?;
        let mut state = SessionState::new(self.config.config_mode());
        conn.start_config(&mut state)
            .await
            .context("Failed to start config handshake")?;
        component_info!("serial", "Connected to {}", conn.peer());
        Ok((conn, state))
    }

    /// Run the serial monitor until Ctrl+C or the end of the stream
    pub async fn monitor<F>(&self, conn: SerialConnection, state: &mut SessionState, on_message: F) -> Result<()>
    where
        F: FnMut(EnrichedMessage),
    {
        self.monitor_until(conn, state, interrupt(), on_message).await
    }

    /// Run the serial monitor until `shutdown` resolves or the stream ends,
    /// then close the connection.
    pub async fn monitor_until<S, F>(
        &self,
        mut conn: SerialConnection,
        state: &mut SessionState,
        shutdown: S,
        mut on_message: F,
    ) -> Result<()>
    where
        S: Future<Output = ()>,
        F: FnMut(EnrichedMessage),
    {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    component_info!("serial", "Closing {}", conn.peer());
                    break;
                }
                event = conn.next_event() => match event {
                    Some(SerialEvent::FromRadio(msg)) => {
                        state.apply_from_radio(&msg);
                        if let Some(PayloadVariant::Packet(packet)) = (*msg).payload_variant {
                            let enriched = self.pipeline.process_packet(Source::Serial, packet).await;
                            if self.pipeline.accept(&enriched) {
                                on_message(enriched);
                            }
                        }
                    }
                    Some(SerialEvent::Console(line)) => component_debug!("console", "{}", line),
                    Some(SerialEvent::DecodeError(e)) => {
                        component_warn!("serial", "Undecodable frame: {}", e)
                    }
                    None => {
                        component_info!("serial", "Connection to {} ended", conn.peer());
                        break;
                    }
                }
            }
        }
        conn.close().await.context("Serial connection failed")
    }

    /// Follow `channel` on the broker until Ctrl+C, then disconnect
    pub async fn subscribe<C, F>(&self, client: &mut C, channel: &str, on_message: F) -> Result<()>
    where
        C: MqttClient + ?Sized,
        F: FnMut(EnrichedMessage),
    {
        self.subscribe_until(client, channel, interrupt(), on_message)
            .await
    }

    /// Follow `channel` until `shutdown` resolves or the broker closes the
    /// feed, then disconnect.
    pub async fn subscribe_until<C, S, F>(
        &self,
        client: &mut C,
        channel: &str,
        shutdown: S,
        mut on_message: F,
    ) -> Result<()>
    where
        C: MqttClient + ?Sized,
        S: Future<Output = ()>,
        F: FnMut(EnrichedMessage),
    {
        let filter = self.config.mqtt.topics.subscribe_filter(channel);
        component_info!("mqtt", "Subscribing to: {}", filter);
        client
            .subscribe(&filter, self.config.mqtt.settings.qos)
            .await
            .with_context(|| format!("Failed to subscribe to {}", filter))?;

        tokio::pin!(shutdown);
        let result = loop {
            tokio::select! {
                _ = &mut shutdown => break Ok(()),
                packet = client.next_packet() => match packet {
                    Ok(Some(packet)) => {
                        let source = Source::Mqtt { topic: packet.topic };
                        let msg = self.pipeline.process(source, &packet.payload).await;
                        if self.pipeline.accept(&msg) {
                            on_message(msg);
                        }
                    }
                    Ok(None) => break Ok(()),
                    Err(e) => break Err(e),
                }
            }
        };

        client.disconnect().await.context("Failed to disconnect")?;
        component_info!("mqtt", "Disconnected from {}", self.config.mqtt.settings.endpoint());
        result.context("MQTT feed failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshtastic_proto::mesh::mesh_packet;
    use meshtastic_proto::{Data, FromRadio, MeshPacket, Message, PortNum, Position};
    use meshtastic_session::{MemoryBroker, QoS};
    use meshtastic_wire::{encode_frame, WAKE_PREAMBLE_LEN};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::sync::oneshot;

    fn client(include: Option<&str>) -> MeshClient {
        let mut config = ClientConfig::default();
        config.receive.include = include.map(str::to_string);
        MeshClient::new(config).unwrap()
    }

    fn position_frame(id: u32) -> Vec<u8> {
        let position = Position {
            latitude_i: Some(377_749_000),
            longitude_i: Some(-1_224_194_000),
            ..Default::default()
        };
        let packet = MeshPacket {
            from: 0xabcd,
            to: 0xffff_ffff,
            id,
            payload_variant: Some(mesh_packet::PayloadVariant::Decoded(Data::new(
                PortNum::PositionApp,
                position.encode_to_vec(),
            ))),
            ..Default::default()
        };
        let msg = FromRadio {
            id,
            payload_variant: Some(PayloadVariant::Packet(packet)),
        };
        encode_frame(&msg.encode_to_vec()).unwrap().to_vec()
    }

    #[tokio::test]
    async fn test_monitor_until_stream_end() {
        let client = client(None);
        let (local, mut radio) = tokio::io::duplex(4096);
        let (conn, mut state) = client
            .connect_serial(RadioStream::device(local))
            .await
            .unwrap();
        assert!(state.want_config_id().is_some());

        let mut preamble = [0u8; WAKE_PREAMBLE_LEN];
        radio.read_exact(&mut preamble).await.unwrap();

        let mut bytes = b"INFO  | GPS fix acquired\n".to_vec();
        bytes.extend(position_frame(1));
        bytes.extend(position_frame(2));
        radio.write_all(&bytes).await.unwrap();
        drop(radio);

        let mut seen = Vec::new();
        client
            .monitor_until(conn, &mut state, std::future::pending(), |msg| seen.push(msg))
            .await
            .unwrap();

        assert_eq!(seen.len(), 2);
        let payload = seen[0].payload.as_ref().unwrap();
        assert!((payload["latitude"].as_f64().unwrap() - 37.7749).abs() < 1e-6);
        assert_eq!(seen[1].id, 2);
    }

    #[tokio::test]
    async fn test_monitor_until_shutdown_closes() {
        let client = client(None);
        let (local, _radio) = tokio::io::duplex(4096);
        let (conn, mut state) = client
            .connect_serial(RadioStream::device(local))
            .await
            .unwrap();

        let mut seen = 0;
        client
            .monitor_until(conn, &mut state, std::future::ready(()), |_| seen += 1)
            .await
            .unwrap();
        assert_eq!(seen, 0);
    }

    #[tokio::test]
    async fn test_subscribe_until_processes_envelopes() {
        let client = client(Some("hello"));
        let broker = MemoryBroker::new();
        let mut subscriber = broker.client("subscriber");
        let mut publisher = broker.client("publisher");

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let mut stop_tx = Some(stop_tx);
        let mut seen = Vec::new();

        let opts = client.text_options(NodeId::BROADCAST, "LongFast");
        let publish = async {
            tokio::task::yield_now().await;
            client
                .send_text(Some("filtered out"), &opts, Via::Mqtt, &mut Transport::Mqtt(&mut publisher))
                .await
                .unwrap();
            client
                .send_text(Some("hello mesh"), &opts, Via::Mqtt, &mut Transport::Mqtt(&mut publisher))
                .await
                .unwrap();
        };
        let shutdown = async {
            let _ = stop_rx.await;
        };
        let (result, _) = tokio::join!(
            client.subscribe_until(&mut subscriber, "LongFast", shutdown, |msg| {
                seen.push(msg);
                if let Some(tx) = stop_tx.take() {
                    let _ = tx.send(());
                }
            }),
            publish
        );
        result.unwrap();

        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].payload, Some(serde_json::Value::String("hello mesh".into())));
        assert_eq!(seen[0].topic(), Some("msh/US/2/e/LongFast/!b0b"));
        assert!(matches!(
            subscriber.publish("msh/US", bytes::Bytes::new()).await,
            Err(meshtastic_session::SessionError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_subscribe_until_decrypts_chunks_on_keyed_channel() {
        let mut config = ClientConfig::default();
        config
            .psks
            .insert("Ops".into(), "AAECAwQFBgcICQoLDA0ODw==".into());
        config.chunk_delay = "0s".into();
        let client = MeshClient::new(config).unwrap();

        let broker = MemoryBroker::new();
        let mut subscriber = broker.client("subscriber");
        let mut publisher = broker.client("publisher");

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let mut stop_tx = Some(stop_tx);
        let mut seen = Vec::new();

        let text = "y".repeat(300);
        let opts = client.text_options(NodeId::BROADCAST, "Ops");
        let publish = async {
            tokio::task::yield_now().await;
            let records = client
                .send_text(Some(&text), &opts, Via::Mqtt, &mut Transport::Mqtt(&mut publisher))
                .await
                .unwrap();
            assert_eq!(records.len(), 2);
        };
        let shutdown = async {
            let _ = stop_rx.await;
        };
        let (result, _) = tokio::join!(
            client.subscribe_until(&mut subscriber, "Ops", shutdown, |msg| {
                seen.push(msg);
                if seen.len() == 2 {
                    if let Some(tx) = stop_tx.take() {
                        let _ = tx.send(());
                    }
                }
            }),
            publish
        );
        result.unwrap();

        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|msg| msg.decrypted && msg.error.is_none()));
        assert_eq!(seen[0].topic(), Some("msh/US/2/e/Ops/!b0b/1"));
        let joined: String = seen
            .iter()
            .map(|msg| msg.payload.as_ref().unwrap().as_str().unwrap())
            .collect();
        assert_eq!(joined, text);
    }

    #[tokio::test]
    async fn test_subscribe_all_regions_then_disconnect() {
        let mut config = ClientConfig::default();
        config.mqtt.settings.qos = QoS::AtLeastOnce;
        config.mqtt.topics.region = "#".into();
        let client = MeshClient::new(config).unwrap();

        let broker = MemoryBroker::new();
        let mut subscriber = broker.client("subscriber");
        client
            .subscribe_until(&mut subscriber, "LongFast", std::future::ready(()), |_| {})
            .await
            .unwrap();
    }
}
