//! Channel definitions reported by the radio during the config handshake.

use serde::Serialize;

/// A channel slot on the radio.
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct Channel {
    /// Slot index (0 is the primary channel)
    #[prost(int32, tag = "1")]
    pub index: i32,
    /// Channel settings
    #[prost(message, optional, tag = "2")]
    pub settings: Option<ChannelSettings>,
    /// Slot role
    #[prost(enumeration = "channel::Role", tag = "3")]
    pub role: i32,
}

/// Nested types for [`Channel`].
pub mod channel {
    use serde::Serialize;

    /// How a channel slot is used
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration, Serialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    #[repr(i32)]
    pub enum Role {
        /// Unused slot
        Disabled = 0,
        /// Primary channel
        Primary = 1,
        /// Secondary channel
        Secondary = 2,
    }
}

/// Name and key material of a channel.
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct ChannelSettings {
    /// Deprecated channel number
    #[prost(uint32, tag = "1")]
    pub channel_num: u32,
    /// Pre-shared key; a single byte selects one of the well-known keys
    #[prost(bytes = "vec", tag = "2")]
    pub psk: Vec<u8>,
    /// Channel name, empty for the modem preset default
    #[prost(string, tag = "3")]
    pub name: String,
    /// Channel id
    #[prost(fixed32, tag = "4")]
    pub id: u32,
    /// Forward packets from this channel to MQTT
    #[prost(bool, tag = "5")]
    pub uplink_enabled: bool,
    /// Forward packets from MQTT to this channel
    #[prost(bool, tag = "6")]
    pub downlink_enabled: bool,
}
