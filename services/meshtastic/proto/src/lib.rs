//! Meshtastic protobuf message schemas.
//!
//! Hand-maintained prost structs for the subset of the public Meshtastic
//! `.proto` files a client needs: the radio envelopes (`ToRadio`,
//! `FromRadio`), the MQTT `ServiceEnvelope`, the `MeshPacket`/`Data` pair and
//! the per-port application payloads dispatched on the receive path.
//!
//! Field numbers match the upstream schema so frames produced here are
//! byte-compatible with firmware and with other client libraries.
//!
//! Every message also derives `serde::Serialize` so decoded payloads can be
//! rendered as JSON and flattened for text filtering.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod apps;
pub mod channel;
pub mod mesh;
pub mod mqtt;
pub mod portnums;
pub mod telemetry;

pub use apps::{
    AdminMessage, DeviceState, HardwareMessage, Paxcount, SerialConnectionStatus,
    StoreAndForward, TakPacket,
};
pub use channel::{Channel, ChannelSettings};
pub use mesh::{
    Compressed, Data, DeviceMetadata, FromRadio, Heartbeat, LogRecord, MeshPacket, MyNodeInfo,
    Neighbor, NeighborInfo, NodeInfo, Position, QueueStatus, RouteDiscovery, Routing, ToRadio,
    User, Waypoint, DATA_PAYLOAD_LEN,
};
pub use mqtt::{MapReport, ServiceEnvelope};
pub use portnums::PortNum;
pub use telemetry::Telemetry;

pub use prost::Message;
