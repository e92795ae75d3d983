//! Core mesh messages: packets, payloads, node database entries and the
//! radio envelopes exchanged with a locally attached device.

use crate::portnums::PortNum;
use crate::telemetry::DeviceMetrics;
use serde::Serialize;

/// Maximum number of payload bytes a `Data` message may carry.
pub const DATA_PAYLOAD_LEN: usize = 233;

/// GPS position report (`POSITION_APP`).
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct Position {
    /// Latitude in 1e-7 degrees
    #[prost(sfixed32, optional, tag = "1")]
    pub latitude_i: Option<i32>,
    /// Longitude in 1e-7 degrees
    #[prost(sfixed32, optional, tag = "2")]
    pub longitude_i: Option<i32>,
    /// Altitude above MSL in meters
    #[prost(int32, optional, tag = "3")]
    pub altitude: Option<i32>,
    /// Seconds since the unix epoch
    #[prost(fixed32, tag = "4")]
    pub time: u32,
    /// Source of the location fix
    #[prost(int32, tag = "5")]
    pub location_source: i32,
    /// Source of the altitude
    #[prost(int32, tag = "6")]
    pub altitude_source: i32,
    /// GPS timestamp of the fix
    #[prost(fixed32, tag = "7")]
    pub timestamp: u32,
    /// Sub-second adjustment of `timestamp`
    #[prost(int32, tag = "8")]
    pub timestamp_millis_adjust: i32,
    /// Height above ellipsoid
    #[prost(sint32, optional, tag = "9")]
    pub altitude_hae: Option<i32>,
    /// Geoidal separation
    #[prost(sint32, optional, tag = "10")]
    pub altitude_geoidal_separation: Option<i32>,
    /// Position dilution of precision (1/100)
    #[prost(uint32, tag = "11")]
    pub pdop: u32,
    /// Horizontal dilution of precision (1/100)
    #[prost(uint32, tag = "12")]
    pub hdop: u32,
    /// Vertical dilution of precision (1/100)
    #[prost(uint32, tag = "13")]
    pub vdop: u32,
    /// GPS accuracy in mm
    #[prost(uint32, tag = "14")]
    pub gps_accuracy: u32,
    /// Ground speed in m/s
    #[prost(uint32, optional, tag = "15")]
    pub ground_speed: Option<u32>,
    /// True north track in 1/100 degrees
    #[prost(uint32, optional, tag = "16")]
    pub ground_track: Option<u32>,
    /// GPS fix quality
    #[prost(uint32, tag = "17")]
    pub fix_quality: u32,
    /// GPS fix type (2D/3D)
    #[prost(uint32, tag = "18")]
    pub fix_type: u32,
    /// Satellites in view
    #[prost(uint32, tag = "19")]
    pub sats_in_view: u32,
    /// Sensor id for multi-GPS setups
    #[prost(uint32, tag = "20")]
    pub sensor_id: u32,
    /// Estimated seconds until the next update
    #[prost(uint32, tag = "21")]
    pub next_update: u32,
    /// Sequence number for this report
    #[prost(uint32, tag = "22")]
    pub seq_number: u32,
    /// Bits of precision kept by the sender
    #[prost(uint32, tag = "23")]
    pub precision_bits: u32,
}

/// Node identity broadcast (`NODEINFO_APP`).
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct User {
    /// `!xxxxxxxx` node id
    #[prost(string, tag = "1")]
    pub id: String,
    /// Full display name
    #[prost(string, tag = "2")]
    pub long_name: String,
    /// Up to four character name
    #[prost(string, tag = "3")]
    pub short_name: String,
    /// Hardware MAC address (deprecated upstream, still sent by older firmware)
    #[prost(bytes = "vec", tag = "4")]
    pub macaddr: Vec<u8>,
    /// Hardware model enum value
    #[prost(int32, tag = "5")]
    pub hw_model: i32,
    /// Licensed amateur operator
    #[prost(bool, tag = "6")]
    pub is_licensed: bool,
    /// Device role enum value
    #[prost(int32, tag = "7")]
    pub role: i32,
    /// Curve25519 public key
    #[prost(bytes = "vec", tag = "8")]
    pub public_key: Vec<u8>,
}

/// Hops discovered by a traceroute (`TRACEROUTE_APP`).
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct RouteDiscovery {
    /// Nodes traversed towards the destination
    #[prost(fixed32, repeated, tag = "1")]
    pub route: Vec<u32>,
    /// SNR (x4) for each hop towards the destination
    #[prost(int32, repeated, tag = "2")]
    pub snr_towards: Vec<i32>,
    /// Nodes traversed on the way back
    #[prost(fixed32, repeated, tag = "3")]
    pub route_back: Vec<u32>,
    /// SNR (x4) for each hop back
    #[prost(int32, repeated, tag = "4")]
    pub snr_back: Vec<i32>,
}

/// Routing control message (`ROUTING_APP`): acks, naks and route discovery.
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct Routing {
    /// Payload variant
    #[prost(oneof = "routing::Variant", tags = "1, 2, 3")]
    #[serde(flatten)]
    pub variant: Option<routing::Variant>,
}

/// Nested types for [`Routing`].
pub mod routing {
    use serde::Serialize;

    /// Routing payload variant
    #[derive(Clone, PartialEq, ::prost::Oneof, Serialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Variant {
        /// Route request
        #[prost(message, tag = "1")]
        RouteRequest(super::RouteDiscovery),
        /// Route reply
        #[prost(message, tag = "2")]
        RouteReply(super::RouteDiscovery),
        /// Delivery result; `None` is an ack
        #[prost(enumeration = "Error", tag = "3")]
        ErrorReason(i32),
    }

    /// Delivery failure reasons
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration, Serialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    #[repr(i32)]
    pub enum Error {
        /// Delivered (ack)
        None = 0,
        /// No route to destination
        NoRoute = 1,
        /// Explicit nak received
        GotNak = 2,
        /// Timed out
        Timeout = 3,
        /// No suitable interface
        NoInterface = 4,
        /// Retransmission limit reached
        MaxRetransmit = 5,
        /// Channel unknown to the receiver
        NoChannel = 6,
        /// Packet too large
        TooLarge = 7,
        /// No response from the application
        NoResponse = 8,
        /// Regional duty cycle exhausted
        DutyCycleLimit = 9,
        /// Malformed request
        BadRequest = 32,
        /// Sender not authorized
        NotAuthorized = 33,
        /// PKI decryption failed
        PkiFailed = 34,
        /// PKI key unknown
        PkiUnknownPubkey = 35,
    }
}

/// Application payload of a mesh packet.
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct Data {
    /// Message type used to select the payload decoder
    #[prost(enumeration = "PortNum", tag = "1")]
    pub portnum: i32,
    /// Opaque application bytes
    #[prost(bytes = "vec", tag = "2")]
    pub payload: Vec<u8>,
    /// Ask the receiving application to answer
    #[prost(bool, tag = "3")]
    pub want_response: bool,
    /// Final destination when relayed
    #[prost(fixed32, tag = "4")]
    pub dest: u32,
    /// Original sender when relayed
    #[prost(fixed32, tag = "5")]
    pub source: u32,
    /// Packet id this message answers
    #[prost(fixed32, tag = "6")]
    pub request_id: u32,
    /// Packet id this message replies to
    #[prost(fixed32, tag = "7")]
    pub reply_id: u32,
    /// Non-zero when the payload is an emoji reaction
    #[prost(fixed32, tag = "8")]
    pub emoji: u32,
    /// Bit flags (ok-to-mqtt etc.)
    #[prost(uint32, optional, tag = "9")]
    pub bitfield: Option<u32>,
}

impl Data {
    /// Build a `Data` for the given port.
    pub fn new(portnum: PortNum, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            portnum: portnum as i32,
            payload: payload.into(),
            ..Default::default()
        }
    }
}

/// Shared map marker (`WAYPOINT_APP`).
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct Waypoint {
    /// Waypoint id
    #[prost(uint32, tag = "1")]
    pub id: u32,
    /// Latitude in 1e-7 degrees
    #[prost(sfixed32, optional, tag = "2")]
    pub latitude_i: Option<i32>,
    /// Longitude in 1e-7 degrees
    #[prost(sfixed32, optional, tag = "3")]
    pub longitude_i: Option<i32>,
    /// Expiry as seconds since the epoch, 0 for never
    #[prost(uint32, tag = "4")]
    pub expire: u32,
    /// Node allowed to edit, 0 for anyone
    #[prost(uint32, tag = "5")]
    pub locked_to: u32,
    /// Name
    #[prost(string, tag = "6")]
    pub name: String,
    /// Description
    #[prost(string, tag = "7")]
    pub description: String,
    /// Unicode icon code point
    #[prost(fixed32, tag = "8")]
    pub icon: u32,
}

/// A node's view of its direct neighbors (`NEIGHBORINFO_APP`).
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct NeighborInfo {
    /// Reporting node
    #[prost(uint32, tag = "1")]
    pub node_id: u32,
    /// Last node that relayed this report
    #[prost(uint32, tag = "2")]
    pub last_sent_by_id: u32,
    /// Broadcast interval of the reporting node
    #[prost(uint32, tag = "3")]
    pub node_broadcast_interval_secs: u32,
    /// Neighbor list
    #[prost(message, repeated, tag = "4")]
    pub neighbors: Vec<Neighbor>,
}

/// One neighbor entry.
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct Neighbor {
    /// Neighbor node number
    #[prost(uint32, tag = "1")]
    pub node_id: u32,
    /// SNR of the last packet heard from it
    #[prost(float, tag = "2")]
    pub snr: f32,
    /// Reception time of that packet
    #[prost(fixed32, tag = "3")]
    pub last_rx_time: u32,
    /// Its broadcast interval
    #[prost(uint32, tag = "4")]
    pub node_broadcast_interval_secs: u32,
}

/// Compressed payload (`TEXT_MESSAGE_COMPRESSED_APP`, `SIMULATOR_APP`).
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct Compressed {
    /// Port of the compressed content
    #[prost(enumeration = "PortNum", tag = "1")]
    pub portnum: i32,
    /// Compressed bytes
    #[prost(bytes = "vec", tag = "2")]
    pub data: Vec<u8>,
}

/// Unit of transmission on the mesh.
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct MeshPacket {
    /// Sender node number
    #[prost(fixed32, tag = "1")]
    pub from: u32,
    /// Destination node number (0xffffffff for broadcast)
    #[prost(fixed32, tag = "2")]
    pub to: u32,
    /// Channel index (or channel hash once on air)
    #[prost(uint32, tag = "3")]
    pub channel: u32,
    /// Either the decoded `Data` or its ciphertext
    #[prost(oneof = "mesh_packet::PayloadVariant", tags = "4, 5")]
    #[serde(flatten)]
    pub payload_variant: Option<mesh_packet::PayloadVariant>,
    /// Packet id, unique per sender while in flight
    #[prost(fixed32, tag = "6")]
    pub id: u32,
    /// Receive time, seconds since the epoch
    #[prost(fixed32, tag = "7")]
    pub rx_time: u32,
    /// Receive SNR
    #[prost(float, tag = "8")]
    pub rx_snr: f32,
    /// Remaining relays
    #[prost(uint32, tag = "9")]
    pub hop_limit: u32,
    /// Request an ack from the destination
    #[prost(bool, tag = "10")]
    pub want_ack: bool,
    /// Transmit priority enum value
    #[prost(int32, tag = "11")]
    pub priority: i32,
    /// Receive RSSI
    #[prost(int32, tag = "12")]
    pub rx_rssi: i32,
    /// Delayed broadcast marker
    #[prost(int32, tag = "13")]
    pub delayed: i32,
    /// Packet passed through an MQTT gateway
    #[prost(bool, tag = "14")]
    pub via_mqtt: bool,
    /// Hop limit at origin
    #[prost(uint32, tag = "15")]
    pub hop_start: u32,
    /// Sender public key for PKI packets
    #[prost(bytes = "vec", tag = "16")]
    pub public_key: Vec<u8>,
    /// Payload encrypted with PKI rather than the channel PSK
    #[prost(bool, tag = "17")]
    pub pki_encrypted: bool,
}

/// Nested types for [`MeshPacket`].
pub mod mesh_packet {
    use serde::Serialize;

    /// Active payload representation
    #[derive(Clone, PartialEq, ::prost::Oneof, Serialize)]
    #[serde(rename_all = "snake_case")]
    pub enum PayloadVariant {
        /// Plaintext application payload
        #[prost(message, tag = "4")]
        Decoded(super::Data),
        /// Serialized `Data` encrypted with the channel PSK
        #[prost(bytes = "vec", tag = "5")]
        Encrypted(Vec<u8>),
    }
}

impl MeshPacket {
    /// The plaintext payload, if that is the active representation.
    pub fn decoded(&self) -> Option<&Data> {
        match &self.payload_variant {
            Some(mesh_packet::PayloadVariant::Decoded(data)) => Some(data),
            _ => None,
        }
    }

    /// The ciphertext, if that is the active representation.
    pub fn encrypted(&self) -> Option<&[u8]> {
        match &self.payload_variant {
            Some(mesh_packet::PayloadVariant::Encrypted(bytes)) => Some(bytes),
            _ => None,
        }
    }
}

/// Information about the locally attached node.
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct MyNodeInfo {
    /// Node number of the attached radio
    #[prost(uint32, tag = "1")]
    pub my_node_num: u32,
    /// Reboots since the last factory reset
    #[prost(uint32, tag = "8")]
    pub reboot_count: u32,
    /// Oldest client app version the firmware accepts
    #[prost(uint32, tag = "11")]
    pub min_app_version: u32,
}

/// Node database entry sent during the config handshake.
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct NodeInfo {
    /// Node number
    #[prost(uint32, tag = "1")]
    pub num: u32,
    /// Identity
    #[prost(message, optional, tag = "2")]
    pub user: Option<User>,
    /// Last known position
    #[prost(message, optional, tag = "3")]
    pub position: Option<Position>,
    /// SNR of the last packet
    #[prost(float, tag = "4")]
    pub snr: f32,
    /// Last heard, seconds since the epoch
    #[prost(fixed32, tag = "5")]
    pub last_heard: u32,
    /// Last device metrics
    #[prost(message, optional, tag = "6")]
    pub device_metrics: Option<DeviceMetrics>,
    /// Channel index the node was heard on
    #[prost(uint32, tag = "7")]
    pub channel: u32,
    /// Heard through MQTT
    #[prost(bool, tag = "8")]
    pub via_mqtt: bool,
    /// Hops away
    #[prost(uint32, optional, tag = "9")]
    pub hops_away: Option<u32>,
    /// Favorite flag
    #[prost(bool, tag = "10")]
    pub is_favorite: bool,
}

/// Firmware log line forwarded over the protobuf stream.
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct LogRecord {
    /// Log text
    #[prost(string, tag = "1")]
    pub message: String,
    /// Seconds since the epoch
    #[prost(fixed32, tag = "2")]
    pub time: u32,
    /// Emitting subsystem
    #[prost(string, tag = "3")]
    pub source: String,
    /// Level enum value
    #[prost(int32, tag = "4")]
    pub level: i32,
}

/// Transmit queue state of the attached radio.
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct QueueStatus {
    /// Result of the last enqueue
    #[prost(int32, tag = "1")]
    pub res: i32,
    /// Free slots
    #[prost(uint32, tag = "2")]
    pub free: u32,
    /// Queue capacity
    #[prost(uint32, tag = "3")]
    pub maxlen: u32,
    /// Packet the status refers to
    #[prost(uint32, tag = "4")]
    pub mesh_packet_id: u32,
}

/// Firmware capabilities.
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct DeviceMetadata {
    /// Firmware version string
    #[prost(string, tag = "1")]
    pub firmware_version: String,
    /// Device state schema version
    #[prost(uint32, tag = "2")]
    pub device_state_version: u32,
    /// Supports shutdown
    #[prost(bool, tag = "3")]
    pub can_shutdown: bool,
    /// Has WiFi
    #[prost(bool, tag = "4")]
    pub has_wifi: bool,
    /// Has Bluetooth
    #[prost(bool, tag = "5")]
    pub has_bluetooth: bool,
    /// Has Ethernet
    #[prost(bool, tag = "6")]
    pub has_ethernet: bool,
    /// Device role enum value
    #[prost(int32, tag = "7")]
    pub role: i32,
    /// Position flags
    #[prost(uint32, tag = "8")]
    pub position_flags: u32,
    /// Hardware model enum value
    #[prost(int32, tag = "9")]
    pub hw_model: i32,
    /// Remote hardware module enabled
    #[prost(bool, tag = "10")]
    pub has_remote_hardware: bool,
}

/// Keepalive sent by clients on idle serial links.
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct Heartbeat {}

/// Client-to-radio envelope.
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct ToRadio {
    /// Payload variant
    #[prost(oneof = "to_radio::PayloadVariant", tags = "1, 3, 4, 7")]
    #[serde(flatten)]
    pub payload_variant: Option<to_radio::PayloadVariant>,
}

/// Nested types for [`ToRadio`].
pub mod to_radio {
    use serde::Serialize;

    /// Payload variant
    #[derive(Clone, PartialEq, ::prost::Oneof, Serialize)]
    #[serde(rename_all = "snake_case")]
    pub enum PayloadVariant {
        /// Packet to transmit
        #[prost(message, tag = "1")]
        Packet(super::MeshPacket),
        /// Start the config handshake
        #[prost(uint32, tag = "3")]
        WantConfigId(u32),
        /// Ask the radio to drop this client
        #[prost(bool, tag = "4")]
        Disconnect(bool),
        /// Keepalive
        #[prost(message, tag = "7")]
        Heartbeat(super::Heartbeat),
    }
}

impl ToRadio {
    /// Wrap a mesh packet for transmission.
    pub fn packet(packet: MeshPacket) -> Self {
        Self {
            payload_variant: Some(to_radio::PayloadVariant::Packet(packet)),
        }
    }

    /// Config handshake request.
    pub fn want_config(id: u32) -> Self {
        Self {
            payload_variant: Some(to_radio::PayloadVariant::WantConfigId(id)),
        }
    }

    /// Keepalive.
    pub fn heartbeat() -> Self {
        Self {
            payload_variant: Some(to_radio::PayloadVariant::Heartbeat(Heartbeat {})),
        }
    }
}

/// Radio-to-client envelope.
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct FromRadio {
    /// Monotonic id assigned by the radio
    #[prost(uint32, tag = "1")]
    pub id: u32,
    /// Payload variant
    #[prost(oneof = "from_radio::PayloadVariant", tags = "2, 3, 4, 6, 7, 8, 10, 11, 13")]
    #[serde(flatten)]
    pub payload_variant: Option<from_radio::PayloadVariant>,
}

/// Nested types for [`FromRadio`].
pub mod from_radio {
    use serde::Serialize;

    /// Payload variant
    #[derive(Clone, PartialEq, ::prost::Oneof, Serialize)]
    #[serde(rename_all = "snake_case")]
    pub enum PayloadVariant {
        /// Received packet
        #[prost(message, tag = "2")]
        Packet(super::MeshPacket),
        /// Local node information
        #[prost(message, tag = "3")]
        MyInfo(super::MyNodeInfo),
        /// Node database entry
        #[prost(message, tag = "4")]
        NodeInfo(super::NodeInfo),
        /// Firmware log line
        #[prost(message, tag = "6")]
        LogRecord(super::LogRecord),
        /// Handshake finished for this `want_config_id`
        #[prost(uint32, tag = "7")]
        ConfigCompleteId(u32),
        /// Radio rebooted
        #[prost(bool, tag = "8")]
        Rebooted(bool),
        /// Channel definition
        #[prost(message, tag = "10")]
        Channel(crate::channel::Channel),
        /// Transmit queue state
        #[prost(message, tag = "11")]
        QueueStatus(super::QueueStatus),
        /// Firmware capabilities
        #[prost(message, tag = "13")]
        Metadata(super::DeviceMetadata),
    }
}

impl FromRadio {
    /// The carried mesh packet, if any.
    pub fn packet(&self) -> Option<&MeshPacket> {
        match &self.payload_variant {
            Some(from_radio::PayloadVariant::Packet(packet)) => Some(packet),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_data_wire_layout() {
        let data = Data::new(PortNum::TextMessageApp, b"SYN".to_vec());
        let bytes = data.encode_to_vec();
        // field 1 varint = 1, field 2 len = 3 "SYN"
        assert_eq!(bytes, vec![0x08, 0x01, 0x12, 0x03, b'S', b'Y', b'N']);
        assert_eq!(Data::decode(bytes.as_slice()).unwrap(), data);
    }

    #[test]
    fn test_mesh_packet_payload_accessors() {
        let mut packet = MeshPacket {
            from: 0x0b0b,
            to: 0xffff_ffff,
            ..Default::default()
        };
        assert!(packet.decoded().is_none());
        assert!(packet.encrypted().is_none());

        packet.payload_variant = Some(mesh_packet::PayloadVariant::Encrypted(vec![1, 2, 3]));
        assert_eq!(packet.encrypted(), Some(&[1u8, 2, 3][..]));
        assert!(packet.decoded().is_none());
    }

    #[test]
    fn test_to_radio_want_config() {
        let msg = ToRadio::want_config(69421);
        let decoded = ToRadio::decode(msg.encode_to_vec().as_slice()).unwrap();
        assert_eq!(
            decoded.payload_variant,
            Some(to_radio::PayloadVariant::WantConfigId(69421))
        );
    }

    #[test]
    fn test_packet_serializes_flat() {
        let packet = MeshPacket {
            from: 1,
            payload_variant: Some(mesh_packet::PayloadVariant::Decoded(Data::new(
                PortNum::PositionApp,
                Vec::new(),
            ))),
            ..Default::default()
        };
        let value = serde_json::to_value(&packet).unwrap();
        assert_eq!(value["decoded"]["portnum"], 3);
        assert!(value.get("payload_variant").is_none());
    }
}
