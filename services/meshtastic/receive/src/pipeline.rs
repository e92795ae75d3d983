//! Inbound processing: envelope, decryption, dispatch, enrichment, filter.
//!
//! [`ReceivePipeline::process`] never fails. Decryption and decode problems
//! are recorded on the returned message and processing continues with the
//! fields that are available.

use crate::dispatch::{bytes_value, decode, dispatch, Certainty, SourceKind};
use crate::enrich::{coordinates, enrich_packet, enrich_payload};
use crate::error::ReceiveError;
use crate::filter::MessageFilter;
use crate::geocode::Geocoder;
use crate::message::{EnrichedMessage, Source};
use meshtastic_crypto::{CryptoEngine, DEFAULT_CHANNEL};
use meshtastic_proto::{Data, FromRadio, MeshPacket, Message, PortNum, ServiceEnvelope};
use meshtastic_session::TopicConfig;
use meshtastic_wire::NodeId;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Note attached when the channel key does not fit
pub const UNDECRYPTABLE: &str = "unable to decrypt - psk?";

/// Receive behaviour switches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveOptions {
    /// Treat payloads as JSON envelopes
    pub json: bool,
    /// Attach the raw envelope as hex
    pub include_raw: bool,
    /// Reverse geocode positions
    pub gps_metadata: bool,
    /// Channel used for key lookup when the source names none
    pub default_channel: String,
    /// Which messages reach the caller
    pub filter: MessageFilter,
}

impl Default for ReceiveOptions {
    fn default() -> Self {
        Self {
            json: false,
            include_raw: false,
            gps_metadata: false,
            default_channel: DEFAULT_CHANNEL.to_string(),
            filter: MessageFilter::default(),
        }
    }
}

/// Turns raw inbound bytes into [`EnrichedMessage`]s
#[derive(Clone)]
pub struct ReceivePipeline {
    crypto: Arc<CryptoEngine>,
    options: ReceiveOptions,
    geocoder: Option<Arc<dyn Geocoder>>,
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

impl ReceivePipeline {
    /// Pipeline sharing `crypto`
    pub fn new(crypto: Arc<CryptoEngine>, options: ReceiveOptions) -> Self {
        Self {
            crypto,
            options,
            geocoder: None,
        }
    }

    /// Attach a geocoder used when `gps_metadata` is set
    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    /// Options in use
    pub fn options(&self) -> &ReceiveOptions {
        &self.options
    }

    /// Process one raw envelope: `ServiceEnvelope` for MQTT, `FromRadio`
    /// for serial, JSON when configured or when the topic says so.
    pub async fn process(&self, source: Source, raw: &[u8]) -> EnrichedMessage {
        let json = self.options.json
            || source.topic().is_some_and(TopicConfig::is_json_topic);

        let mut msg = if json {
            self.process_json(source, raw)
        } else {
            match source.kind() {
                SourceKind::Mqtt => match ServiceEnvelope::decode(raw) {
                    Ok(envelope) => {
                        let channel_id = envelope.channel_id;
                        let gateway_id = envelope.gateway_id;
                        match envelope.packet {
                            Some(packet) => {
                                let channel = Some(channel_id.as_str()).filter(|c| !c.is_empty());
                                let mut msg = self.process_on_channel(source, packet, channel).await;
                                msg.channel_id = Some(channel_id);
                                msg.gateway_id = Some(gateway_id);
                                msg
                            }
                            None => undecodable(source, ReceiveError::Decode("envelope without packet".into())),
                        }
                    }
                    Err(e) => undecodable(source, e.into()),
                },
                SourceKind::Serial => match FromRadio::decode(raw) {
                    Ok(FromRadio {
                        payload_variant:
                            Some(meshtastic_proto::mesh::from_radio::PayloadVariant::Packet(packet)),
                        ..
                    }) => self.process_packet(source, packet).await,
                    Ok(_) => undecodable(source, ReceiveError::Decode("FromRadio carries no packet".into())),
                    Err(e) => undecodable(source, e.into()),
                },
            }
        };

        if self.options.include_raw {
            msg.raw_packet = Some(hex(raw));
        }
        msg
    }

    fn process_json(&self, source: Source, raw: &[u8]) -> EnrichedMessage {
        let mut object = match serde_json::from_slice::<Value>(raw) {
            Ok(Value::Object(object)) => object,
            Ok(_) => return undecodable(source, ReceiveError::Decode("JSON envelope is not an object".into())),
            Err(e) => return undecodable(source, e.into()),
        };

        let from = take_node(&mut object, "from");
        let to = take_node(&mut object, "to");
        let id = take_u32(&mut object, "id");
        let channel = take_u32(&mut object, "channel");

        let mut msg = EnrichedMessage::new(
            source,
            from.unwrap_or(NodeId(0)),
            to.unwrap_or(NodeId(0)),
            id,
        );
        for (key, node) in [("from", from), ("to", to)] {
            if node.is_none() {
                msg.notes.push(format!("unreadable {} node id", key));
            }
        }
        msg.channel = channel;
        let mut packet = Map::new();
        packet.insert("from".into(), msg.from.as_u32().into());
        packet.insert("to".into(), msg.to.as_u32().into());
        packet.insert("id".into(), id.into());
        packet.insert("channel".into(), channel.into());
        msg.packet = Value::Object(packet);

        let mut payload = Value::Object(object);
        enrich_payload(&mut payload);
        msg.payload = Some(payload);
        msg
    }

    /// Decrypt, dispatch and enrich an already decoded mesh packet
    pub async fn process_packet(&self, source: Source, packet: MeshPacket) -> EnrichedMessage {
        self.process_on_channel(source, packet, None).await
    }

    /// Key lookup prefers the envelope's channel, then the topic's, then
    /// the configured default.
    async fn process_on_channel(
        &self,
        source: Source,
        packet: MeshPacket,
        channel: Option<&str>,
    ) -> EnrichedMessage {
        let mut msg = EnrichedMessage::new(source, NodeId(packet.from), NodeId(packet.to), packet.id);
        msg.channel = packet.channel;

        let mut rendered = serde_json::to_value(&packet).unwrap_or(Value::Null);
        enrich_packet(&mut rendered);
        if let Some(obj) = rendered.as_object_mut() {
            obj.insert("node_id_from".into(), msg.node_id_from.clone().into());
            obj.insert("node_id_to".into(), msg.node_id_to.clone().into());
            if let Some(topic) = msg.topic() {
                obj.insert("topic".into(), topic.into());
            }
        }

        let data = match packet.encrypted() {
            Some(ciphertext) if !ciphertext.is_empty() => {
                let channel = channel
                    .or_else(|| msg.topic().and_then(TopicConfig::channel_from_topic))
                    .unwrap_or(&self.options.default_channel);
                match self.decrypt(channel, &packet, ciphertext) {
                    Ok(data) => {
                        msg.decrypted = true;
                        rendered["encrypted"] = Value::String("decrypted".into());
                        Some(data)
                    }
                    Err(e) => {
                        warn!("Packet {:#010x} from {}: {}", packet.id, msg.from, e);
                        rendered["decrypted"] = Value::String(UNDECRYPTABLE.into());
                        msg.record_error(e);
                        None
                    }
                }
            }
            _ => packet.decoded().cloned(),
        };

        if let Some(data) = data {
            let mut decoded = serde_json::to_value(&data).unwrap_or(Value::Null);
            let payload = self.decode_data(&mut msg, &data).await;
            decoded["payload"] = payload.clone();
            rendered["decoded"] = decoded;
            msg.payload = Some(payload);
        }

        msg.packet = rendered;
        msg
    }

    fn decrypt(&self, channel: &str, packet: &MeshPacket, ciphertext: &[u8]) -> Result<Data, ReceiveError> {
        let plaintext = self
            .crypto
            .decrypt_packet(channel, packet.id, packet.from, ciphertext)?;

        // CTR has no tag: a wrong key shows up as garbage that fails to parse
        match Data::decode(plaintext.as_slice()) {
            Ok(data) if data.portnum != PortNum::UnknownApp as i32 => {
                debug!("Decrypted packet {:#010x} with the {} key", packet.id, channel);
                Ok(data)
            }
            Ok(_) => Err(ReceiveError::Decryption(format!("no port number on channel {}", channel))),
            Err(e) => Err(ReceiveError::Decryption(e.to_string())),
        }
    }

    async fn decode_data(&self, msg: &mut EnrichedMessage, data: &Data) -> Value {
        let Ok(portnum) = PortNum::try_from(data.portnum) else {
            warn!("Can't decode payload with unknown portnum {}", data.portnum);
            msg.notes.push(format!("unknown portnum {}", data.portnum));
            return bytes_value(&data.payload);
        };
        msg.portnum = Some(portnum);

        let entry = dispatch(portnum, msg.source.kind());
        msg.certainty = Some(entry.certainty);
        if let Certainty::Unverified(note) = entry.certainty {
            msg.notes.push(format!("{}: {}", portnum, note));
        }

        let mut payload = match decode(entry.decoder, &data.payload) {
            Ok(value) => value,
            Err(e) if entry.text_fallback => {
                debug!("{} payload shown as text: {}", portnum, e);
                Value::String(String::from_utf8_lossy(&data.payload).into_owned())
            }
            Err(e) => {
                warn!("Undecodable {} payload from {}: {}", portnum, msg.from, e);
                msg.record_error(e);
                return bytes_value(&data.payload);
            }
        };
        enrich_payload(&mut payload);

        if self.options.gps_metadata {
            if let (Some(geocoder), Some((lat, lon))) = (&self.geocoder, coordinates(&payload)) {
                match geocoder.search(lat, lon).await {
                    Ok(place) => payload["gps_metadata"] = place,
                    Err(e) => msg.notes.push(e.to_string()),
                }
            }
        }
        payload
    }

    /// The message passes the configured filter
    pub fn accept(&self, msg: &EnrichedMessage) -> bool {
        self.options.filter.matches(&msg.flatten())
    }
}

fn take_u32(object: &mut Map<String, Value>, key: &str) -> u32 {
    object
        .remove(key)
        .and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or_default()
}

/// Node ids arrive as integers or in `!xxxxxxxx` form; absent means 0
fn take_node(object: &mut Map<String, Value>, key: &str) -> Option<NodeId> {
    match object.remove(key) {
        None | Some(Value::Null) => Some(NodeId(0)),
        Some(Value::String(text)) => NodeId::parse(&text).ok(),
        Some(value) => value.as_u64().and_then(|v| u32::try_from(v).ok()).map(NodeId),
    }
}

fn undecodable(source: Source, error: ReceiveError) -> EnrichedMessage {
    warn!("Dropping undecodable envelope: {}", error);
    let mut msg = EnrichedMessage::new(source, NodeId(0), NodeId(0), 0);
    msg.record_error(error);
    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use meshtastic_crypto::KeyTable;
    use meshtastic_proto::mesh::mesh_packet::PayloadVariant;
    use meshtastic_proto::{Position, User};
    use meshtastic_session::{MemoryBroker, PacketAssembler, SendOptions, Transport, TransportRouter, Via};
    use std::time::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TOPIC: &str = "msh/US/2/e/LongFast/!b0b";

    // under an all-zero key the first ciphertext byte of this id carries
    // wire type 6, so a wrong-key decode fails deterministically
    const PACKET_ID: u32 = 0x1005;

    fn pipeline() -> ReceivePipeline {
        ReceivePipeline::new(Arc::new(CryptoEngine::default()), ReceiveOptions::default())
    }

    fn mqtt() -> Source {
        Source::Mqtt {
            topic: TOPIC.to_string(),
        }
    }

    fn envelope(data: Data) -> Vec<u8> {
        let assembler = PacketAssembler::new(Arc::new(CryptoEngine::default()));
        let packet = assembler
            .build_with_id(data, &SendOptions::default(), PACKET_ID)
            .unwrap();
        ServiceEnvelope {
            packet: Some(packet),
            channel_id: "LongFast".into(),
            gateway_id: "!b0b".into(),
        }
        .encode_to_vec()
    }

    fn position() -> Data {
        let position = Position {
            latitude_i: Some(377_749_000),
            longitude_i: Some(-1_224_194_000),
            ..Default::default()
        };
        Data::new(PortNum::PositionApp, position.encode_to_vec())
    }

    struct CountingGeocoder(AtomicUsize);

    #[async_trait]
    impl Geocoder for CountingGeocoder {
        async fn search(&self, lat: f64, lon: f64) -> Result<Value, ReceiveError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(serde_json::json!({ "city": "San Francisco", "lat": lat, "lon": lon }))
        }
    }

    #[tokio::test]
    async fn test_mqtt_position_is_decrypted_and_scaled() {
        let msg = pipeline().process(mqtt(), &envelope(position())).await;

        assert!(msg.error.is_none());
        assert!(msg.decrypted);
        assert_eq!(msg.portnum, Some(PortNum::PositionApp));
        assert_eq!(msg.node_id_from, "!b0b");
        assert_eq!(msg.channel_id.as_deref(), Some("LongFast"));
        let payload = msg.payload.as_ref().unwrap();
        assert!((payload["latitude"].as_f64().unwrap() - 37.7749).abs() < 1e-6);
        assert_eq!(msg.packet["encrypted"], "decrypted");
        assert_eq!(msg.packet["topic"], TOPIC);
    }

    #[tokio::test]
    async fn test_wrong_key_surfaces_decryption_failure() {
        let mut keys = KeyTable::new();
        keys.insert("LongFast", "AAAAAAAAAAAAAAAAAAAAAA==").unwrap();
        let pipeline = ReceivePipeline::new(Arc::new(CryptoEngine::new(keys)), ReceiveOptions::default());

        let text = Data::new(PortNum::TextMessageApp, b"hello mesh".to_vec());
        let msg = pipeline.process(mqtt(), &envelope(text)).await;

        assert!(msg.is_undecryptable());
        assert!(!msg.decrypted);
        assert_eq!(msg.id, PACKET_ID);
        assert_eq!(msg.topic(), Some(TOPIC));
        assert_eq!(msg.from, NodeId(0x0b0b));
        assert_eq!(msg.to, NodeId::BROADCAST);
        assert_eq!(msg.packet["decrypted"], UNDECRYPTABLE);
        assert!(msg.payload.is_none());
    }

    #[tokio::test]
    async fn test_serial_plaintext_packet() {
        let user = User {
            id: "!0000abcd".into(),
            long_name: "Base Camp".into(),
            macaddr: vec![0xde, 0xad, 0xbe, 0xef, 0, 1],
            ..Default::default()
        };
        let packet = MeshPacket {
            from: 0xabcd,
            to: 0xffff_ffff,
            id: 9,
            rx_time: 86_400,
            payload_variant: Some(PayloadVariant::Decoded(Data::new(
                PortNum::NodeinfoApp,
                user.encode_to_vec(),
            ))),
            ..Default::default()
        };
        let raw = FromRadio {
            id: 1,
            payload_variant: Some(meshtastic_proto::mesh::from_radio::PayloadVariant::Packet(packet)),
        }
        .encode_to_vec();

        let msg = pipeline().process(Source::Serial, &raw).await;
        assert!(msg.error.is_none());
        assert!(!msg.decrypted);
        assert_eq!(msg.payload.as_ref().unwrap()["macaddr"], "de:ad:be:ef:00:01");
        assert_eq!(msg.packet["rx_time_utc"], "1970-01-02 00:00:00 UTC");
        assert_eq!(msg.packet["decoded"]["payload"]["long_name"], "Base Camp");
    }

    #[tokio::test]
    async fn test_mqtt_text_is_flagged() {
        let text = Data::new(PortNum::TextMessageApp, b"hello mesh".to_vec());
        let msg = pipeline().process(mqtt(), &envelope(text)).await;
        assert_eq!(msg.payload, Some(Value::String("hello mesh".into())));
        assert!(matches!(msg.certainty, Some(Certainty::Unverified(_))));
        assert_eq!(msg.notes.len(), 1);
    }

    #[tokio::test]
    async fn test_garbage_envelope_is_not_fatal() {
        let options = ReceiveOptions {
            include_raw: true,
            ..ReceiveOptions::default()
        };
        let pipeline = ReceivePipeline::new(Arc::new(CryptoEngine::default()), options);
        let msg = pipeline.process(mqtt(), &[0xff, 0xff, 0xff]).await;
        assert!(matches!(msg.error, Some(ReceiveError::Decode(_))));
        assert_eq!(msg.raw_packet.as_deref(), Some("ffffff"));
        assert_eq!(msg.topic(), Some(TOPIC));
    }

    #[tokio::test]
    async fn test_json_topic() {
        let raw = br#"{"from": 2827, "to": 4294967295, "id": 7, "channel": 0, "type": "text", "payload": {"text": "hi"}}"#;
        let source = Source::Mqtt {
            topic: "msh/US/2/json/LongFast/!b0b".into(),
        };
        let msg = pipeline().process(source, raw).await;
        assert!(msg.error.is_none());
        assert_eq!(msg.from, NodeId(0x0b0b));
        assert_eq!(msg.id, 7);
        let payload = msg.payload.unwrap();
        assert_eq!(payload["type"], "text");
        assert!(payload.get("from").is_none());
    }

    #[tokio::test]
    async fn test_geocoding_and_filter() {
        let geocoder = Arc::new(CountingGeocoder(AtomicUsize::new(0)));
        let options = ReceiveOptions {
            gps_metadata: true,
            filter: MessageFilter::parse(Some("San Francisco"), Some("TELEMETRY_APP")),
            ..ReceiveOptions::default()
        };
        let pipeline = ReceivePipeline::new(Arc::new(CryptoEngine::default()), options)
            .with_geocoder(geocoder.clone());

        let msg = pipeline.process(mqtt(), &envelope(position())).await;
        assert_eq!(geocoder.0.load(Ordering::SeqCst), 1);
        assert_eq!(msg.payload.as_ref().unwrap()["gps_metadata"]["city"], "San Francisco");
        assert!(pipeline.accept(&msg));

        let text = Data::new(PortNum::TextMessageApp, b"no place".to_vec());
        let msg = pipeline.process(mqtt(), &envelope(text)).await;
        assert!(!pipeline.accept(&msg));
    }

    #[tokio::test]
    async fn test_chunked_text_on_keyed_channel() {
        let mut keys = KeyTable::new();
        keys.insert("Ops", "AAECAwQFBgcICQoLDA0ODw==").unwrap();
        let crypto = Arc::new(CryptoEngine::new(keys));
        let router = TransportRouter::new(PacketAssembler::new(crypto.clone()), TopicConfig::default())
            .with_chunk_delay(Duration::ZERO);

        let broker = MemoryBroker::new();
        let mut sender = broker.client("sender");
        let opts = SendOptions {
            channel_name: "Ops".into(),
            ..SendOptions::for_text()
        };
        let text = "x".repeat(300);
        let records = router
            .send_text(Some(&text), &opts, Via::Mqtt, &mut Transport::Mqtt(&mut sender))
            .await
            .unwrap();
        assert_eq!(records.len(), 2);

        let pipeline = ReceivePipeline::new(crypto, ReceiveOptions::default());
        let mut received = String::new();
        for (index, packet) in broker.published().await.into_iter().enumerate() {
            assert_eq!(packet.topic, format!("msh/US/2/e/Ops/!b0b/{}", index + 1));
            let source = Source::Mqtt {
                topic: packet.topic.clone(),
            };
            let msg = pipeline.process(source, &packet.payload).await;
            assert!(msg.decrypted, "{}: {:?}", packet.topic, msg.error);
            assert_eq!(msg.channel_id.as_deref(), Some("Ops"));
            received.push_str(msg.payload.as_ref().unwrap().as_str().unwrap());
        }
        assert_eq!(received, text);
    }

    #[tokio::test]
    async fn test_chunk_topic_channel_without_envelope_channel() {
        let mut keys = KeyTable::new();
        keys.insert("Ops", "AAECAwQFBgcICQoLDA0ODw==").unwrap();
        let crypto = Arc::new(CryptoEngine::new(keys));
        let opts = SendOptions {
            channel_name: "Ops".into(),
            ..SendOptions::default()
        };
        let packet = PacketAssembler::new(crypto.clone())
            .build_with_id(position(), &opts, PACKET_ID)
            .unwrap();
        let raw = ServiceEnvelope {
            packet: Some(packet),
            channel_id: String::new(),
            gateway_id: "!b0b".into(),
        }
        .encode_to_vec();

        let pipeline = ReceivePipeline::new(crypto, ReceiveOptions::default());
        let source = Source::Mqtt {
            topic: "msh/US/2/e/Ops/!b0b/3".into(),
        };
        let msg = pipeline.process(source, &raw).await;
        assert!(msg.decrypted, "{:?}", msg.error);
        assert_eq!(msg.portnum, Some(PortNum::PositionApp));
    }

    #[tokio::test]
    async fn test_unknown_portnum_keeps_payload() {
        let payload = vec![0x01, 0x02, 0xfe];
        let packet = MeshPacket {
            from: 0xabcd,
            to: 0xffff_ffff,
            id: 11,
            payload_variant: Some(PayloadVariant::Decoded(Data {
                portnum: 300,
                payload: payload.clone(),
                ..Default::default()
            })),
            ..Default::default()
        };

        let msg = pipeline().process_packet(Source::Serial, packet).await;
        assert!(msg.error.is_none());
        assert_eq!(msg.portnum, None);
        assert_eq!(msg.payload, Some(bytes_value(&payload)));
        assert!(msg.notes.iter().any(|note| note == "unknown portnum 300"));
    }

    #[tokio::test]
    async fn test_json_node_id_strings() {
        let raw = br#"{"from": "!00000b0b", "to": "!ffffffff", "id": 8, "type": "text"}"#;
        let source = Source::Mqtt {
            topic: "msh/US/2/json/LongFast/!b0b".into(),
        };
        let msg = pipeline().process(source, raw).await;
        assert_eq!(msg.from, NodeId(0x0b0b));
        assert_eq!(msg.to, NodeId::BROADCAST);
        assert_eq!(msg.node_id_from, "!b0b");
        assert_eq!(msg.packet["from"], 0x0b0b);
        assert!(msg.notes.is_empty());

        let raw = br#"{"from": "nobody", "to": 4294967295, "id": 9}"#;
        let source = Source::Mqtt {
            topic: "msh/US/2/json/LongFast/!b0b".into(),
        };
        let msg = pipeline().process(source, raw).await;
        assert_eq!(msg.from, NodeId(0));
        assert_eq!(msg.to, NodeId::BROADCAST);
        assert_eq!(msg.notes, vec!["unreadable from node id".to_string()]);
    }
}
