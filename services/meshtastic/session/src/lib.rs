//! Packet assembly, transport routing, serial connections and the config
//! handshake for Meshtastic clients.
//!
//! This crate turns application data into mesh packets and hands them to a
//! radio stream, a serial connection or an MQTT broker. It also keeps the
//! per-connection state learned from the radio during the want-config
//! handshake and correlates replies with outstanding requests.
//!
//! ## Features
//!
//! - **Packet Ids**: random first id, sequential afterwards, safe across tasks
//! - **Packet Assembly**: size and port checks, channel PSK encryption
//! - **Transport Routing**: framed `ToRadio` or MQTT `ServiceEnvelope`
//! - **Text Chunking**: long texts sent as sequential packets with a pause
//! - **Serial Connection**: wake preamble, background reader and decoder tasks
//! - **Config Handshake**: `want_config_id` with nodeless sentinel handling
//! - **Reply Correlation**: ack, nak, implicit ack and response flags
//!
//! ## Example
//!
//! ```rust,no_run
//! use meshtastic_crypto::CryptoEngine;
//! use meshtastic_session::{
//!     connect_tcp, ConfigMode, PacketAssembler, SendOptions, SerialConfig, SerialConnection,
//!     SerialEvent, SessionState, TopicConfig, Transport, TransportRouter, Via,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), meshtastic_session::SessionError> {
//! let stream = connect_tcp("192.168.1.20:4403").await?;
//! let mut conn = SerialConnection::open(stream, SerialConfig::default()).await?;
//! let mut state = SessionState::new(ConfigMode::Full);
//! conn.start_config(&mut state).await?;
//!
//! let router = TransportRouter::new(
//!     PacketAssembler::new(Arc::new(CryptoEngine::default())),
//!     TopicConfig::default(),
//! );
//! let opts = SendOptions::for_text();
//! for record in router
//!     .send_text(Some("hello mesh"), &opts, Via::Serial, &mut Transport::Serial(&conn))
//!     .await?
//! {
//!     state.register_pending(record);
//! }
//!
//! while let Some(event) = conn.next_event().await {
//!     if let SerialEvent::FromRadio(msg) = event {
//!         state.apply_from_radio(&msg);
//!     }
//! }
//! conn.close().await
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod assembler;
pub mod error;
pub mod mqtt;
pub mod packet_id;
pub mod router;
pub mod serial;
pub mod state;
pub mod transport;

// Re-export main types
pub use assembler::{
    validate, PacketAssembler, SendOptions, DEFAULT_HOP_LIMIT, DEFAULT_TEXT, DEFAULT_TEXT_CHANNEL,
};
pub use error::SessionError;
pub use mqtt::{
    random_client_id, topic_matches, MemoryBroker, MemoryClient, MqttClient, MqttPacket,
    MqttSettings, QoS, TopicConfig,
};
pub use packet_id::{generate, generate_from_i64, PacketIdGenerator};
pub use router::{Transport, TransportRouter, Via, DEFAULT_CHUNK_DELAY};
pub use serial::{SerialConfig, SerialConnection, SerialEvent};
pub use state::{
    Acknowledgment, ConfigMode, Correlation, OutboundRecord, ResponseTimeout, SessionState,
    DEFAULT_RESPONSE_TIMEOUT, NODELESS_WANT_CONFIG_ID,
};
pub use transport::{connect_tcp, RadioIo, RadioStream, DEFAULT_TCP_PORT};
