//! Payloads of the less common application ports.

use crate::channel::Channel;
use crate::mesh::{DeviceMetadata, MeshPacket, MyNodeInfo, User};
use serde::Serialize;

/// People counter report (`PAXCOUNTER_APP`).
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct Paxcount {
    /// WiFi devices seen
    #[prost(uint32, tag = "1")]
    pub wifi: u32,
    /// BLE devices seen
    #[prost(uint32, tag = "2")]
    pub ble: u32,
    /// Counter uptime in seconds
    #[prost(uint32, tag = "3")]
    pub uptime: u32,
}

/// Remote GPIO control (`REMOTE_HARDWARE_APP`).
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct HardwareMessage {
    /// Operation
    #[prost(enumeration = "hardware_message::Type", tag = "1")]
    pub r#type: i32,
    /// GPIOs affected by the operation
    #[prost(uint64, tag = "2")]
    pub gpio_mask: u64,
    /// GPIO levels for writes and read replies
    #[prost(uint64, tag = "3")]
    pub gpio_value: u64,
}

/// Nested types for [`HardwareMessage`].
pub mod hardware_message {
    use serde::Serialize;

    /// GPIO operation
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration, Serialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    #[repr(i32)]
    pub enum Type {
        /// Unset
        Unset = 0,
        /// Set GPIO levels
        WriteGpios = 1,
        /// Report changes on the masked GPIOs
        WatchGpios = 2,
        /// Change notification
        GpiosChanged = 3,
        /// Read GPIO levels
        ReadGpios = 4,
        /// Reply to a read
        ReadGpiosReply = 5,
    }
}

/// Store and forward protocol message (`STORE_FORWARD_APP`).
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct StoreAndForward {
    /// Request or response kind
    #[prost(enumeration = "store_and_forward::RequestResponse", tag = "1")]
    pub rr: i32,
    /// Variant payload
    #[prost(oneof = "store_and_forward::Variant", tags = "2, 3, 4, 5")]
    #[serde(flatten)]
    pub variant: Option<store_and_forward::Variant>,
}

/// Nested types for [`StoreAndForward`].
pub mod store_and_forward {
    use serde::Serialize;

    /// Router statistics
    #[derive(Clone, PartialEq, ::prost::Message, Serialize)]
    pub struct Statistics {
        /// Messages seen
        #[prost(uint32, tag = "1")]
        pub messages_total: u32,
        /// Messages stored
        #[prost(uint32, tag = "2")]
        pub messages_saved: u32,
        /// Storage capacity
        #[prost(uint32, tag = "3")]
        pub messages_max: u32,
        /// Router uptime in seconds
        #[prost(uint32, tag = "4")]
        pub up_time: u32,
        /// Requests served
        #[prost(uint32, tag = "5")]
        pub requests: u32,
        /// History requests served
        #[prost(uint32, tag = "6")]
        pub requests_history: u32,
        /// Heartbeat enabled
        #[prost(bool, tag = "7")]
        pub heartbeat: bool,
        /// Maximum messages returned per request
        #[prost(uint32, tag = "8")]
        pub return_max: u32,
        /// History window in minutes
        #[prost(uint32, tag = "9")]
        pub return_window: u32,
    }

    /// History reply header
    #[derive(Clone, PartialEq, ::prost::Message, Serialize)]
    pub struct History {
        /// Messages that will follow
        #[prost(uint32, tag = "1")]
        pub history_messages: u32,
        /// Window in minutes
        #[prost(uint32, tag = "2")]
        pub window: u32,
        /// Index of the last request
        #[prost(uint32, tag = "3")]
        pub last_request: u32,
    }

    /// Router heartbeat
    #[derive(Clone, PartialEq, ::prost::Message, Serialize)]
    pub struct Heartbeat {
        /// Heartbeat period in seconds
        #[prost(uint32, tag = "1")]
        pub period: u32,
        /// Secondary router flag
        #[prost(uint32, tag = "2")]
        pub secondary: u32,
    }

    /// Variant payload
    #[derive(Clone, PartialEq, ::prost::Oneof, Serialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Variant {
        /// Statistics
        #[prost(message, tag = "2")]
        Stats(Statistics),
        /// History header
        #[prost(message, tag = "3")]
        History(History),
        /// Heartbeat
        #[prost(message, tag = "4")]
        Heartbeat(Heartbeat),
        /// Stored text
        #[prost(bytes = "vec", tag = "5")]
        Text(Vec<u8>),
    }

    /// Request and response kinds
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration, Serialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    #[repr(i32)]
    pub enum RequestResponse {
        /// Unset
        Unset = 0,
        /// Router error
        RouterError = 1,
        /// Router heartbeat
        RouterHeartbeat = 2,
        /// Router ping
        RouterPing = 3,
        /// Router pong
        RouterPong = 4,
        /// Router busy
        RouterBusy = 5,
        /// Router history
        RouterHistory = 6,
        /// Router statistics
        RouterStats = 7,
        /// Stored direct text
        RouterTextDirect = 8,
        /// Stored broadcast text
        RouterTextBroadcast = 9,
        /// Client error
        ClientError = 64,
        /// Client history request
        ClientHistory = 65,
        /// Client statistics request
        ClientStats = 66,
        /// Client ping
        ClientPing = 67,
        /// Client pong
        ClientPong = 68,
        /// Client abort
        ClientAbort = 106,
    }
}

/// Serial module status (`SERIAL_APP`).
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct SerialConnectionStatus {
    /// Baud rate
    #[prost(uint32, tag = "1")]
    pub baud: u32,
    /// Link up
    #[prost(bool, tag = "2")]
    pub is_connected: bool,
}

/// ATAK bridge packet (`ATAK_PLUGIN`, `ATAK_FORWARDER`).
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct TakPacket {
    /// Strings are unishox2 compressed
    #[prost(bool, tag = "1")]
    pub is_compressed: bool,
    /// Sender contact
    #[prost(message, optional, tag = "2")]
    pub contact: Option<tak_packet::Contact>,
    /// Sender team and role
    #[prost(message, optional, tag = "3")]
    pub group: Option<tak_packet::Group>,
    /// Sender status
    #[prost(message, optional, tag = "4")]
    pub status: Option<tak_packet::Status>,
    /// Payload
    #[prost(oneof = "tak_packet::PayloadVariant", tags = "5, 6, 7")]
    #[serde(flatten)]
    pub payload_variant: Option<tak_packet::PayloadVariant>,
}

/// Nested types for [`TakPacket`].
pub mod tak_packet {
    use serde::Serialize;

    /// ATAK contact
    #[derive(Clone, PartialEq, ::prost::Message, Serialize)]
    pub struct Contact {
        /// Callsign
        #[prost(string, tag = "1")]
        pub callsign: String,
        /// Device callsign
        #[prost(string, tag = "2")]
        pub device_callsign: String,
    }

    /// ATAK group
    #[derive(Clone, PartialEq, ::prost::Message, Serialize)]
    pub struct Group {
        /// Member role enum value
        #[prost(int32, tag = "1")]
        pub role: i32,
        /// Team color enum value
        #[prost(int32, tag = "2")]
        pub team: i32,
    }

    /// ATAK status
    #[derive(Clone, PartialEq, ::prost::Message, Serialize)]
    pub struct Status {
        /// Battery level
        #[prost(uint32, tag = "1")]
        pub battery: u32,
    }

    /// Position location information
    #[derive(Clone, PartialEq, ::prost::Message, Serialize)]
    pub struct Pli {
        /// Latitude in 1e-7 degrees
        #[prost(sfixed32, tag = "1")]
        pub latitude_i: i32,
        /// Longitude in 1e-7 degrees
        #[prost(sfixed32, tag = "2")]
        pub longitude_i: i32,
        /// Altitude in meters
        #[prost(int32, tag = "3")]
        pub altitude: i32,
        /// Speed
        #[prost(uint32, tag = "4")]
        pub speed: u32,
        /// Course in degrees
        #[prost(uint32, tag = "5")]
        pub course: u32,
    }

    /// ATAK chat
    #[derive(Clone, PartialEq, ::prost::Message, Serialize)]
    pub struct GeoChat {
        /// Message text
        #[prost(string, tag = "1")]
        pub message: String,
        /// Recipient uid
        #[prost(string, optional, tag = "2")]
        pub to: Option<String>,
        /// Recipient callsign
        #[prost(string, optional, tag = "3")]
        pub to_callsign: Option<String>,
    }

    /// Payload
    #[derive(Clone, PartialEq, ::prost::Oneof, Serialize)]
    #[serde(rename_all = "snake_case")]
    pub enum PayloadVariant {
        /// Position report
        #[prost(message, tag = "5")]
        Pli(Pli),
        /// Chat message
        #[prost(message, tag = "6")]
        Chat(GeoChat),
        /// Raw CoT detail
        #[prost(bytes = "vec", tag = "7")]
        Detail(Vec<u8>),
    }
}

/// Persisted device state snapshot.
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct DeviceState {
    /// Local node
    #[prost(message, optional, tag = "2")]
    pub my_node: Option<MyNodeInfo>,
    /// Owner identity
    #[prost(message, optional, tag = "3")]
    pub owner: Option<User>,
    /// Queued packets for the phone
    #[prost(message, repeated, tag = "5")]
    pub receive_queue: Vec<MeshPacket>,
    /// Last text message received
    #[prost(message, optional, tag = "7")]
    pub rx_text_message: Option<MeshPacket>,
    /// Schema version
    #[prost(uint32, tag = "8")]
    pub version: u32,
    /// Do not persist
    #[prost(bool, tag = "9")]
    pub no_save: bool,
    /// GPS was reset
    #[prost(bool, tag = "11")]
    pub did_gps_reset: bool,
    /// Last waypoint received
    #[prost(message, optional, tag = "12")]
    pub rx_waypoint: Option<MeshPacket>,
}

/// Remote administration (`ADMIN_APP`).
///
/// Only the variants a client issues or commonly receives are modelled;
/// other tags are skipped on decode.
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct AdminMessage {
    /// Request or response
    #[prost(
        oneof = "admin_message::PayloadVariant",
        tags = "1, 2, 3, 4, 12, 13, 32, 33, 64, 65, 97, 98, 100"
    )]
    #[serde(flatten)]
    pub payload_variant: Option<admin_message::PayloadVariant>,
    /// Session passkey for authorized admin
    #[prost(bytes = "vec", tag = "101")]
    pub session_passkey: Vec<u8>,
}

/// Nested types for [`AdminMessage`].
pub mod admin_message {
    use serde::Serialize;

    /// Request or response
    #[derive(Clone, PartialEq, ::prost::Oneof, Serialize)]
    #[serde(rename_all = "snake_case")]
    pub enum PayloadVariant {
        /// Ask for channel `index + 1`
        #[prost(uint32, tag = "1")]
        GetChannelRequest(u32),
        /// Channel reply
        #[prost(message, tag = "2")]
        GetChannelResponse(super::Channel),
        /// Ask for the owner
        #[prost(bool, tag = "3")]
        GetOwnerRequest(bool),
        /// Owner reply
        #[prost(message, tag = "4")]
        GetOwnerResponse(super::User),
        /// Ask for firmware metadata
        #[prost(bool, tag = "12")]
        GetDeviceMetadataRequest(bool),
        /// Metadata reply
        #[prost(message, tag = "13")]
        GetDeviceMetadataResponse(super::DeviceMetadata),
        /// Set the owner
        #[prost(message, tag = "32")]
        SetOwner(super::User),
        /// Set a channel
        #[prost(message, tag = "33")]
        SetChannel(super::Channel),
        /// Start a settings transaction
        #[prost(bool, tag = "64")]
        BeginEditSettings(bool),
        /// Commit a settings transaction
        #[prost(bool, tag = "65")]
        CommitEditSettings(bool),
        /// Reboot after this many seconds
        #[prost(int32, tag = "97")]
        RebootSeconds(i32),
        /// Shut down after this many seconds
        #[prost(int32, tag = "98")]
        ShutdownSeconds(i32),
        /// Clear the node database
        #[prost(int32, tag = "100")]
        NodedbReset(i32),
    }
}
