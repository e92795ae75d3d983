//! Application port numbers carried in `Data.portnum`.

use serde::Serialize;

/// Application/message type of a `Data` payload.
///
/// The numbering is part of the over-the-air protocol. Values below 64 are
/// core firmware apps, 64..=127 are firmware modules, 256..=511 are
/// reserved for third-party apps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i32)]
pub enum PortNum {
    /// Deprecated text messages / unset
    UnknownApp = 0,
    /// UTF-8 text message
    TextMessageApp = 1,
    /// GPIO control
    RemoteHardwareApp = 2,
    /// `Position`
    PositionApp = 3,
    /// `User`
    NodeinfoApp = 4,
    /// `Routing` (acks, naks, route discovery)
    RoutingApp = 5,
    /// `AdminMessage`
    AdminApp = 6,
    /// Unishox2-compressed text
    TextMessageCompressedApp = 7,
    /// `Waypoint`
    WaypointApp = 8,
    /// Codec2 audio frames
    AudioApp = 9,
    /// Detection sensor events
    DetectionSensorApp = 10,
    /// Ping/reply service
    ReplyApp = 32,
    /// IP tunnel
    IpTunnelApp = 33,
    /// `Paxcount`
    PaxcounterApp = 34,
    /// Serial module passthrough
    SerialApp = 64,
    /// `StoreAndForward`
    StoreForwardApp = 65,
    /// Range test sequence messages
    RangeTestApp = 66,
    /// `Telemetry`
    TelemetryApp = 67,
    /// Zone positioning
    ZpsApp = 68,
    /// Simulator bridge (`Compressed`)
    SimulatorApp = 69,
    /// `RouteDiscovery`
    TracerouteApp = 70,
    /// `NeighborInfo`
    NeighborinfoApp = 71,
    /// ATAK plugin (`TakPacket`)
    AtakPlugin = 72,
    /// `MapReport`
    MapReportApp = 73,
    /// Power stress testing
    PowerstressApp = 74,
    /// First private port
    PrivateApp = 256,
    /// ATAK forwarder (`TakPacket`)
    AtakForwarder = 257,
    /// Upper bound (exclusive) for valid port numbers
    Max = 511,
}

impl PortNum {
    /// Canonical upper-case name, e.g. `TEXT_MESSAGE_APP`.
    pub fn name(self) -> &'static str {
        match self {
            PortNum::UnknownApp => "UNKNOWN_APP",
            PortNum::TextMessageApp => "TEXT_MESSAGE_APP",
            PortNum::RemoteHardwareApp => "REMOTE_HARDWARE_APP",
            PortNum::PositionApp => "POSITION_APP",
            PortNum::NodeinfoApp => "NODEINFO_APP",
            PortNum::RoutingApp => "ROUTING_APP",
            PortNum::AdminApp => "ADMIN_APP",
            PortNum::TextMessageCompressedApp => "TEXT_MESSAGE_COMPRESSED_APP",
            PortNum::WaypointApp => "WAYPOINT_APP",
            PortNum::AudioApp => "AUDIO_APP",
            PortNum::DetectionSensorApp => "DETECTION_SENSOR_APP",
            PortNum::ReplyApp => "REPLY_APP",
            PortNum::IpTunnelApp => "IP_TUNNEL_APP",
            PortNum::PaxcounterApp => "PAXCOUNTER_APP",
            PortNum::SerialApp => "SERIAL_APP",
            PortNum::StoreForwardApp => "STORE_FORWARD_APP",
            PortNum::RangeTestApp => "RANGE_TEST_APP",
            PortNum::TelemetryApp => "TELEMETRY_APP",
            PortNum::ZpsApp => "ZPS_APP",
            PortNum::SimulatorApp => "SIMULATOR_APP",
            PortNum::TracerouteApp => "TRACEROUTE_APP",
            PortNum::NeighborinfoApp => "NEIGHBORINFO_APP",
            PortNum::AtakPlugin => "ATAK_PLUGIN",
            PortNum::MapReportApp => "MAP_REPORT_APP",
            PortNum::PowerstressApp => "POWERSTRESS_APP",
            PortNum::PrivateApp => "PRIVATE_APP",
            PortNum::AtakForwarder => "ATAK_FORWARDER",
            PortNum::Max => "MAX",
        }
    }
}

impl std::fmt::Display for PortNum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
