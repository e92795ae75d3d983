//! Messages carried on the MQTT bridge.

use crate::mesh::MeshPacket;
use serde::Serialize;

/// Wrapper published by gateways on `msh/...` topics.
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct ServiceEnvelope {
    /// The mesh packet, usually still encrypted
    #[prost(message, optional, tag = "1")]
    pub packet: Option<MeshPacket>,
    /// Channel name the packet was heard on
    #[prost(string, tag = "2")]
    pub channel_id: String,
    /// Gateway node id, `!xxxxxxxx`
    #[prost(string, tag = "3")]
    pub gateway_id: String,
}

/// Periodic node summary published on the map topic (`MAP_REPORT_APP`).
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct MapReport {
    /// Full display name
    #[prost(string, tag = "1")]
    pub long_name: String,
    /// Short name
    #[prost(string, tag = "2")]
    pub short_name: String,
    /// Device role enum value
    #[prost(int32, tag = "3")]
    pub role: i32,
    /// Hardware model enum value
    #[prost(int32, tag = "4")]
    pub hw_model: i32,
    /// Firmware version
    #[prost(string, tag = "5")]
    pub firmware_version: String,
    /// LoRa region enum value
    #[prost(int32, tag = "6")]
    pub region: i32,
    /// Modem preset enum value
    #[prost(int32, tag = "7")]
    pub modem_preset: i32,
    /// Node still uses the default channel
    #[prost(bool, tag = "8")]
    pub has_default_channel: bool,
    /// Latitude in 1e-7 degrees
    #[prost(sfixed32, tag = "9")]
    pub latitude_i: i32,
    /// Longitude in 1e-7 degrees
    #[prost(sfixed32, tag = "10")]
    pub longitude_i: i32,
    /// Altitude in meters
    #[prost(int32, tag = "11")]
    pub altitude: i32,
    /// Position precision bits
    #[prost(uint32, tag = "12")]
    pub position_precision: u32,
    /// Online nodes seen locally
    #[prost(uint32, tag = "13")]
    pub num_online_local_nodes: u32,
}
