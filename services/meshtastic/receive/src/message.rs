//! Result of the receive pipeline.

use crate::dispatch::{Certainty, SourceKind};
use crate::error::ReceiveError;
use meshtastic_proto::PortNum;
use meshtastic_wire::NodeId;
use serde::Serialize;
use serde_json::Value;

/// Outer envelope a message arrived in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "transport", rename_all = "snake_case")]
pub enum Source {
    /// MQTT gateway feed
    Mqtt {
        /// Topic the envelope was published on
        topic: String,
    },
    /// Locally attached radio
    Serial,
}

impl Source {
    /// Source kind used for decoder selection
    pub fn kind(&self) -> SourceKind {
        match self {
            Source::Mqtt { .. } => SourceKind::Mqtt,
            Source::Serial => SourceKind::Serial,
        }
    }

    /// MQTT topic, if any
    pub fn topic(&self) -> Option<&str> {
        match self {
            Source::Mqtt { topic } => Some(topic),
            Source::Serial => None,
        }
    }
}

/// A received packet with whatever could be decrypted and decoded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedMessage {
    /// Outer envelope
    pub source: Source,
    /// Sender
    pub from: NodeId,
    /// Destination
    pub to: NodeId,
    /// Packet id
    pub id: u32,
    /// Channel index
    pub channel: u32,
    /// `!hex` sender
    pub node_id_from: String,
    /// `!hex` destination
    pub node_id_to: String,
    /// Channel name from the service envelope
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    /// Gateway from the service envelope
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_id: Option<String>,
    /// The payload arrived encrypted and was decrypted
    pub decrypted: bool,
    /// Application port of the decoded payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portnum: Option<PortNum>,
    /// Confidence in the decoder used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certainty: Option<Certainty>,
    /// The mesh packet as JSON, decoded payload included
    pub packet: Value,
    /// Decoded and enriched application payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// First failure encountered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ReceiveError>,
    /// Diagnostics that did not stop processing
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    /// Raw envelope bytes as hex
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_packet: Option<String>,
}

impl EnrichedMessage {
    /// Message with addressing only
    pub fn new(source: Source, from: NodeId, to: NodeId, id: u32) -> Self {
        Self {
            source,
            from,
            to,
            id,
            channel: 0,
            node_id_from: from.to_string(),
            node_id_to: to.to_string(),
            channel_id: None,
            gateway_id: None,
            decrypted: false,
            portnum: None,
            certainty: None,
            packet: Value::Null,
            payload: None,
            error: None,
            notes: Vec::new(),
            raw_packet: None,
        }
    }

    /// MQTT topic, if any
    pub fn topic(&self) -> Option<&str> {
        self.source.topic()
    }

    /// Record a failure; the first one is kept as the error, later ones
    /// become notes.
    pub fn record_error(&mut self, error: ReceiveError) {
        if self.error.is_none() {
            self.error = Some(error);
        } else {
            self.notes.push(error.to_string());
        }
    }

    /// Decryption failed
    pub fn is_undecryptable(&self) -> bool {
        matches!(self.error, Some(ReceiveError::Decryption(_)))
    }

    /// Every scalar of the message joined by spaces, for text filtering
    pub fn flatten(&self) -> String {
        let mut parts = Vec::new();
        if let Ok(value) = serde_json::to_value(self) {
            collect_scalars(&value, &mut parts);
        }
        parts.join(" ")
    }
}

fn collect_scalars(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Null => {}
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|v| collect_scalars(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_scalars(v, out)),
        other => out.push(other.to_string()),
    }
}
