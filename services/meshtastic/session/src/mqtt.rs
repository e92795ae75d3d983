//! MQTT broker collaborator and topic layout.
//!
//! The broker protocol itself lives outside this crate: callers plug a real
//! client in through [`MqttClient`]. [`MemoryBroker`] routes messages
//! in-process for tests and loopback setups.

use crate::error::SessionError;
use async_trait::async_trait;
use bytes::Bytes;
use meshtastic_wire::NodeId;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

/// MQTT delivery guarantee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QoS {
    /// Fire and forget
    #[default]
    AtMostOnce,
    /// Acknowledged delivery
    AtLeastOnce,
    /// Assured single delivery
    ExactlyOnce,
}

/// One message received from the broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttPacket {
    /// Topic the message was published on
    pub topic: String,
    /// Raw payload
    pub payload: Bytes,
}

/// Broker client operations used by the send and receive paths
#[async_trait]
pub trait MqttClient: Send {
    /// Subscribe to a topic filter
    async fn subscribe(&mut self, filter: &str, qos: QoS) -> Result<(), SessionError>;

    /// Publish a payload
    async fn publish(&mut self, topic: &str, payload: Bytes) -> Result<(), SessionError>;

    /// Next message on any subscription; `None` once disconnected
    async fn next_packet(&mut self) -> Result<Option<MqttPacket>, SessionError>;

    /// Leave the broker
    async fn disconnect(&mut self) -> Result<(), SessionError>;
}

/// Broker connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttSettings {
    /// Broker host
    pub host: String,
    /// Broker port
    pub port: u16,
    /// Username
    pub username: String,
    /// Password
    pub password: String,
    /// Client id
    pub client_id: String,
    /// Subscription QoS
    pub qos: QoS,
}

impl MqttSettings {
    /// Public Meshtastic broker defaults with a fresh client id
    pub fn new() -> Self {
        Self {
            host: "mqtt.meshtastic.org".to_string(),
            port: 1883,
            username: "meshdev".to_string(),
            password: "large4cats".to_string(),
            client_id: random_client_id(),
            qos: QoS::AtMostOnce,
        }
    }

    /// `host:port`
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self::new()
    }
}

/// 16 lowercase hex characters
pub fn random_client_id() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Topic layout `{root}/{region}/{path}/{channel}/{node}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    /// Root topic
    pub root_topic: String,
    /// Region segment, `#` to follow every region
    pub region: String,
    /// Envelope path, `2/e` for encrypted envelopes
    pub path: String,
}

impl TopicConfig {
    /// `msh/US/2/e`
    pub fn new() -> Self {
        Self {
            root_topic: "msh".to_string(),
            region: "US".to_string(),
            path: "2/e".to_string(),
        }
    }

    /// Topic for packets sent by `from` on `channel`
    pub fn publish_topic(&self, channel: &str, from: NodeId) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.root_topic, self.region, self.path, channel, from
        )
    }

    /// Topic for chunk `index` of a multi-part send
    pub fn chunk_topic(&self, channel: &str, from: NodeId, index: usize) -> String {
        format!("{}/{}", self.publish_topic(channel, from), index)
    }

    /// Filter matching every sender on `channel`
    pub fn subscribe_filter(&self, channel: &str) -> String {
        if self.region == "#" {
            format!("{}/{}", self.root_topic, self.region)
        } else {
            format!(
                "{}/{}/{}/{}/#",
                self.root_topic, self.region, self.path, channel
            )
        }
    }

    /// Channel segment of a received topic, with or without a trailing
    /// chunk index
    pub fn channel_from_topic(topic: &str) -> Option<&str> {
        let mut segments = topic.rsplit('/').peekable();
        if segments
            .peek()
            .is_some_and(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        {
            segments.next();
        }
        segments.next()?;
        segments.next().filter(|s| !s.is_empty())
    }

    /// The topic carries JSON envelopes
    pub fn is_json_topic(topic: &str) -> bool {
        topic.split('/').any(|s| s == "json")
    }
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// MQTT filter match with `+` and `#` wildcards
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');
    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(f), Some(t)) if f == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

struct Subscription {
    client_id: String,
    filter: String,
    tx: mpsc::UnboundedSender<MqttPacket>,
}

#[derive(Default)]
struct BrokerInner {
    subscriptions: Mutex<Vec<Subscription>>,
    published: Mutex<Vec<MqttPacket>>,
}

/// In-process broker
#[derive(Clone, Default)]
pub struct MemoryBroker {
    inner: Arc<BrokerInner>,
}

impl MemoryBroker {
    /// Empty broker
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect a client
    pub fn client(&self, client_id: impl Into<String>) -> MemoryClient {
        let (tx, rx) = mpsc::unbounded_channel();
        let client_id = client_id.into();
        debug!("Memory broker client {} connected", client_id);
        MemoryClient {
            broker: self.clone(),
            client_id,
            tx: Some(tx),
            rx,
        }
    }

    /// Every message published so far
    pub async fn published(&self) -> Vec<MqttPacket> {
        self.inner.published.lock().await.clone()
    }

    async fn route(&self, packet: MqttPacket) {
        let mut subscriptions = self.inner.subscriptions.lock().await;
        subscriptions.retain(|sub| {
            if topic_matches(&sub.filter, &packet.topic) {
                sub.tx.send(packet.clone()).is_ok()
            } else {
                !sub.tx.is_closed()
            }
        });
        self.inner.published.lock().await.push(packet);
    }
}

/// Client handle of a [`MemoryBroker`]
pub struct MemoryClient {
    broker: MemoryBroker,
    client_id: String,
    tx: Option<mpsc::UnboundedSender<MqttPacket>>,
    rx: mpsc::UnboundedReceiver<MqttPacket>,
}

#[async_trait]
impl MqttClient for MemoryClient {
    async fn subscribe(&mut self, filter: &str, _qos: QoS) -> Result<(), SessionError> {
        let tx = self.tx.clone().ok_or(SessionError::Closed)?;
        self.broker.inner.subscriptions.lock().await.push(Subscription {
            client_id: self.client_id.clone(),
            filter: filter.to_string(),
            tx,
        });
        debug!("Client {} subscribed to {}", self.client_id, filter);
        Ok(())
    }

    async fn publish(&mut self, topic: &str, payload: Bytes) -> Result<(), SessionError> {
        if self.tx.is_none() {
            return Err(SessionError::Closed);
        }
        self.broker
            .route(MqttPacket {
                topic: topic.to_string(),
                payload,
            })
            .await;
        Ok(())
    }

    async fn next_packet(&mut self) -> Result<Option<MqttPacket>, SessionError> {
        Ok(self.rx.recv().await)
    }

    async fn disconnect(&mut self) -> Result<(), SessionError> {
        if self.tx.take().is_some() {
            let client_id = &self.client_id;
            self.broker
                .inner
                .subscriptions
                .lock()
                .await
                .retain(|sub| &sub.client_id != client_id);
            info!("Client {} disconnected", client_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_layout() {
        let topics = TopicConfig::default();
        assert_eq!(
            topics.publish_topic("LongFast", NodeId(0x0b0b)),
            "msh/US/2/e/LongFast/!b0b"
        );
        assert_eq!(
            topics.chunk_topic("LongFast", NodeId(0x0b0b), 2),
            "msh/US/2/e/LongFast/!b0b/2"
        );
        assert_eq!(topics.subscribe_filter("LongFast"), "msh/US/2/e/LongFast/#");

        let everywhere = TopicConfig {
            region: "#".into(),
            ..TopicConfig::default()
        };
        assert_eq!(everywhere.subscribe_filter("LongFast"), "msh/#");
    }

    #[test]
    fn test_channel_from_topic() {
        assert_eq!(
            TopicConfig::channel_from_topic("msh/US/2/e/LongFast/!abcd1234"),
            Some("LongFast")
        );
        assert_eq!(
            TopicConfig::channel_from_topic("msh/US/2/e/Ops/!b0b/2"),
            Some("Ops")
        );
        let topics = TopicConfig::default();
        assert_eq!(
            TopicConfig::channel_from_topic(&topics.chunk_topic("Ops", NodeId(0x0b0b), 1)),
            Some("Ops")
        );
        assert_eq!(TopicConfig::channel_from_topic("single"), None);
        assert!(TopicConfig::is_json_topic("msh/US/2/json/LongFast/!1"));
        assert!(!TopicConfig::is_json_topic("msh/US/2/e/LongFast/!1"));
    }

    #[test]
    fn test_topic_matches() {
        assert!(topic_matches("msh/#", "msh/US/2/e/LongFast/!1"));
        assert!(topic_matches("msh/+/2/e/+/#", "msh/EU_868/2/e/Ops/!2"));
        assert!(topic_matches("msh/US", "msh/US"));
        assert!(!topic_matches("msh/US", "msh/US/2"));
        assert!(!topic_matches("msh/EU/#", "msh/US/2"));
    }

    #[test]
    fn test_settings_defaults() {
        let settings = MqttSettings::default();
        assert_eq!(settings.endpoint(), "mqtt.meshtastic.org:1883");
        assert_eq!(settings.username, "meshdev");
        assert_eq!(settings.client_id.len(), 16);
        assert!(settings.client_id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[tokio::test]
    async fn test_memory_broker_routing() {
        let broker = MemoryBroker::new();
        let mut listener = broker.client("listener");
        let mut sender = broker.client("sender");

        listener.subscribe("msh/US/#", QoS::AtMostOnce).await.unwrap();
        sender
            .publish("msh/US/2/e/LongFast/!1", Bytes::from_static(b"one"))
            .await
            .unwrap();
        sender
            .publish("msh/EU/2/e/LongFast/!1", Bytes::from_static(b"two"))
            .await
            .unwrap();

        let packet = listener.next_packet().await.unwrap().unwrap();
        assert_eq!(packet.payload, Bytes::from_static(b"one"));
        assert_eq!(broker.published().await.len(), 2);

        listener.disconnect().await.unwrap();
        assert_eq!(listener.next_packet().await.unwrap(), None);
        assert!(matches!(
            listener.publish("msh/US", Bytes::new()).await,
            Err(SessionError::Closed)
        ));
    }
}
