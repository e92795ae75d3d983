//! Per-connection session state and the want-config handshake.
//!
//! One [`SessionState`] belongs to one connection. It records what the
//! radio told us during the handshake and correlates replies with the
//! requests registered through [`SessionState::register_pending`]. Nothing
//! here retries or waits; callers poll the flags.

use meshtastic_proto::mesh::from_radio::PayloadVariant as FromRadioVariant;
use meshtastic_proto::mesh::routing::{Error as RoutingError, Variant as RoutingVariant};
use meshtastic_proto::{
    Channel, DeviceMetadata, FromRadio, MeshPacket, Message, MyNodeInfo, NodeInfo, PortNum,
    QueueStatus, Routing, ToRadio,
};
use meshtastic_wire::NodeId;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Reserved `want_config_id` asking the radio to skip the node database
pub const NODELESS_WANT_CONFIG_ID: u32 = 69420;

/// Default reply timeout
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(20);

/// What the handshake should request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigMode {
    /// Full configuration including the node database
    #[default]
    Full,
    /// Configuration without the node database
    Nodeless,
}

/// Reply flags set by [`SessionState::apply_packet`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Acknowledgment {
    /// Destination acknowledged
    pub received_ack: bool,
    /// Delivery failed
    pub received_nak: bool,
    /// Our own radio heard the packet relayed
    pub received_impl_ack: bool,
    /// Traceroute reply
    pub received_trace_route: bool,
    /// Telemetry reply
    pub received_telemetry: bool,
    /// Position reply
    pub received_position: bool,
    /// Waypoint reply
    pub received_waypoint: bool,
}

impl Acknowledgment {
    /// Clear every flag
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Deadline for the reply to the latest request
#[derive(Debug, Clone, Copy)]
pub struct ResponseTimeout {
    expire_timeout: Duration,
    expire_at: Option<Instant>,
}

impl ResponseTimeout {
    /// Timeout of `expire_timeout`, not yet armed
    pub fn new(expire_timeout: Duration) -> Self {
        Self {
            expire_timeout,
            expire_at: None,
        }
    }

    /// Arm the deadline from now
    pub fn reset(&mut self) {
        self.expire_at = Some(Instant::now() + self.expire_timeout);
    }

    /// True once an armed deadline has passed
    pub fn expired(&self) -> bool {
        self.expire_at.is_some_and(|at| Instant::now() >= at)
    }

    /// Configured duration
    pub fn duration(&self) -> Duration {
        self.expire_timeout
    }
}

impl Default for ResponseTimeout {
    fn default() -> Self {
        Self::new(DEFAULT_RESPONSE_TIMEOUT)
    }
}

/// A packet handed to a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRecord {
    /// Packet id
    pub packet_id: u32,
    /// Destination
    pub to: NodeId,
    /// Acknowledgment requested
    pub want_ack: bool,
    /// Hand-off time
    pub sent_at: Instant,
}

/// Reply matched to a pending request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Correlation {
    /// Delivered to the destination
    Ack(u32),
    /// Relayed by our own radio, destination silent so far
    ImplicitAck(u32),
    /// Delivery failed with the given routing error
    Nak(u32, i32),
    /// Application reply on the given port
    Response(u32, PortNum),
}

/// Handshake results and reply bookkeeping of one connection
#[derive(Debug, Default)]
pub struct SessionState {
    mode: ConfigMode,
    want_config_id: Option<u32>,
    config_complete: bool,
    my_info: Option<MyNodeInfo>,
    nodes_by_num: HashMap<u32, NodeInfo>,
    channels: Vec<Channel>,
    metadata: Option<DeviceMetadata>,
    queue_status: Option<QueueStatus>,
    pending: HashMap<u32, OutboundRecord>,
    /// Reply flags
    pub acknowledgment: Acknowledgment,
    /// Reply deadline
    pub timeout: ResponseTimeout,
}

impl SessionState {
    /// Empty state for the given handshake mode
    pub fn new(mode: ConfigMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Handshake mode
    pub fn mode(&self) -> ConfigMode {
        self.mode
    }

    /// Forget everything learned from the radio (used on reconnect)
    pub fn reset(&mut self) {
        self.want_config_id = None;
        self.config_complete = false;
        self.clear_caches();
        self.pending.clear();
        self.acknowledgment.reset();
    }

    fn clear_caches(&mut self) {
        self.my_info = None;
        self.nodes_by_num.clear();
        self.channels.clear();
        self.metadata = None;
        self.queue_status = None;
    }

    /// Begin a handshake: clear the caches, pick a `want_config_id` and
    /// return the request to send.
    pub fn start_config(&mut self) -> ToRadio {
        self.clear_caches();
        self.config_complete = false;

        let id = match self.mode {
            ConfigMode::Nodeless => NODELESS_WANT_CONFIG_ID,
            ConfigMode::Full => {
                let id = rand::random::<u32>();
                if id == NODELESS_WANT_CONFIG_ID {
                    id + 1
                } else {
                    id
                }
            }
        };
        self.want_config_id = Some(id);
        debug!("Starting config handshake with want_config_id {}", id);
        ToRadio::want_config(id)
    }

    /// Live `want_config_id`
    pub fn want_config_id(&self) -> Option<u32> {
        self.want_config_id
    }

    /// The radio confirmed the live handshake
    pub fn is_config_complete(&self) -> bool {
        self.config_complete
    }

    /// Local node information
    pub fn my_info(&self) -> Option<&MyNodeInfo> {
        self.my_info.as_ref()
    }

    /// Local node number, once known
    pub fn my_node_num(&self) -> Option<u32> {
        self.my_info.as_ref().map(|info| info.my_node_num)
    }

    /// Node database entry
    pub fn node(&self, num: u32) -> Option<&NodeInfo> {
        self.nodes_by_num.get(&num)
    }

    /// All node database entries
    pub fn nodes(&self) -> impl Iterator<Item = &NodeInfo> {
        self.nodes_by_num.values()
    }

    /// Channels in the order received
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Firmware capabilities
    pub fn metadata(&self) -> Option<&DeviceMetadata> {
        self.metadata.as_ref()
    }

    /// Last queue status
    pub fn queue_status(&self) -> Option<&QueueStatus> {
        self.queue_status.as_ref()
    }

    /// Record a message from the radio.
    ///
    /// Returns the correlation when the message carries a reply to a
    /// pending request.
    pub fn apply_from_radio(&mut self, msg: &FromRadio) -> Option<Correlation> {
        match &msg.payload_variant {
            Some(FromRadioVariant::MyInfo(info)) => {
                info!("Attached radio is {}", NodeId(info.my_node_num));
                self.my_info = Some(info.clone());
            }
            Some(FromRadioVariant::NodeInfo(node)) => {
                self.nodes_by_num.insert(node.num, node.clone());
            }
            Some(FromRadioVariant::Channel(channel)) => {
                self.channels.push(channel.clone());
            }
            Some(FromRadioVariant::Metadata(metadata)) => {
                self.metadata = Some(metadata.clone());
            }
            Some(FromRadioVariant::QueueStatus(status)) => {
                self.queue_status = Some(status.clone());
            }
            Some(FromRadioVariant::ConfigCompleteId(id)) => {
                if Some(*id) == self.want_config_id {
                    info!(
                        "Config handshake complete ({} nodes, {} channels)",
                        self.nodes_by_num.len(),
                        self.channels.len()
                    );
                    self.config_complete = true;
                } else {
                    warn!("Ignoring config_complete_id {} for a stale handshake", id);
                }
            }
            Some(FromRadioVariant::Rebooted(_)) => {
                warn!("Radio rebooted, handshake must be restarted");
                self.config_complete = false;
            }
            Some(FromRadioVariant::Packet(packet)) => return self.apply_packet(packet),
            Some(FromRadioVariant::LogRecord(_)) | None => {}
        }
        None
    }

    /// Remember a sent packet so replies to it can be correlated
    pub fn register_pending(&mut self, record: OutboundRecord) {
        self.timeout.reset();
        self.pending.insert(record.packet_id, record);
    }

    /// Outstanding request
    pub fn pending(&self, packet_id: u32) -> Option<&OutboundRecord> {
        self.pending.get(&packet_id)
    }

    /// Number of outstanding requests
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Match a received packet against pending requests and set the reply
    /// flags. Encrypted packets are ignored.
    pub fn apply_packet(&mut self, packet: &MeshPacket) -> Option<Correlation> {
        let data = packet.decoded()?;
        if data.request_id == 0 || !self.pending.contains_key(&data.request_id) {
            return None;
        }
        let request_id = data.request_id;

        let correlation = match data.portnum() {
            PortNum::RoutingApp => {
                let routing = match Routing::decode(data.payload.as_slice()) {
                    Ok(routing) => routing,
                    Err(e) => {
                        warn!("Undecodable routing reply to {:#010x}: {}", request_id, e);
                        return None;
                    }
                };
                match routing.variant {
                    Some(RoutingVariant::ErrorReason(code)) if code != RoutingError::None as i32 => {
                        self.acknowledgment.received_nak = true;
                        Correlation::Nak(request_id, code)
                    }
                    _ if Some(packet.from) == self.my_node_num() => {
                        self.acknowledgment.received_impl_ack = true;
                        Correlation::ImplicitAck(request_id)
                    }
                    _ => {
                        self.acknowledgment.received_ack = true;
                        Correlation::Ack(request_id)
                    }
                }
            }
            port @ (PortNum::TracerouteApp
            | PortNum::TelemetryApp
            | PortNum::PositionApp
            | PortNum::WaypointApp) => {
                match port {
                    PortNum::TracerouteApp => self.acknowledgment.received_trace_route = true,
                    PortNum::TelemetryApp => self.acknowledgment.received_telemetry = true,
                    PortNum::PositionApp => self.acknowledgment.received_position = true,
                    _ => self.acknowledgment.received_waypoint = true,
                }
                Correlation::Response(request_id, port)
            }
            other => Correlation::Response(request_id, other),
        };

        // an implicit ack keeps the entry: the destination may still answer
        if !matches!(correlation, Correlation::ImplicitAck(_)) {
            self.pending.remove(&request_id);
        }
        debug!("Correlated reply: {:?}", correlation);
        Some(correlation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshtastic_proto::mesh::mesh_packet::PayloadVariant;
    use meshtastic_proto::Data;

    fn reply(from: u32, port: PortNum, request_id: u32, payload: Vec<u8>) -> MeshPacket {
        let mut data = Data::new(port, payload);
        data.request_id = request_id;
        MeshPacket {
            from,
            payload_variant: Some(PayloadVariant::Decoded(data)),
            ..Default::default()
        }
    }

    fn routing(code: RoutingError) -> Vec<u8> {
        Routing {
            variant: Some(RoutingVariant::ErrorReason(code as i32)),
        }
        .encode_to_vec()
    }

    fn record(packet_id: u32) -> OutboundRecord {
        OutboundRecord {
            packet_id,
            to: NodeId(0x1234),
            want_ack: true,
            sent_at: Instant::now(),
        }
    }

    #[test]
    fn test_full_handshake_avoids_sentinel() {
        let mut state = SessionState::new(ConfigMode::Full);
        for _ in 0..64 {
            state.start_config();
            assert_ne!(state.want_config_id(), Some(NODELESS_WANT_CONFIG_ID));
        }
    }

    #[test]
    fn test_nodeless_handshake_uses_sentinel() {
        let mut state = SessionState::new(ConfigMode::Nodeless);
        let msg = state.start_config();
        assert_eq!(msg, ToRadio::want_config(NODELESS_WANT_CONFIG_ID));
    }

    #[test]
    fn test_config_complete_requires_live_id() {
        let mut state = SessionState::new(ConfigMode::Full);
        state.start_config();
        let id = state.want_config_id().unwrap();

        let stale = FromRadio {
            id: 1,
            payload_variant: Some(FromRadioVariant::ConfigCompleteId(id.wrapping_add(7))),
        };
        state.apply_from_radio(&stale);
        assert!(!state.is_config_complete());

        let done = FromRadio {
            id: 2,
            payload_variant: Some(FromRadioVariant::ConfigCompleteId(id)),
        };
        state.apply_from_radio(&done);
        assert!(state.is_config_complete());
    }

    #[test]
    fn test_start_config_clears_caches() {
        let mut state = SessionState::new(ConfigMode::Full);
        state.apply_from_radio(&FromRadio {
            id: 1,
            payload_variant: Some(FromRadioVariant::NodeInfo(NodeInfo {
                num: 9,
                ..Default::default()
            })),
        });
        state.apply_from_radio(&FromRadio {
            id: 2,
            payload_variant: Some(FromRadioVariant::MyInfo(MyNodeInfo {
                my_node_num: 0x0b0b,
                ..Default::default()
            })),
        });
        assert!(state.node(9).is_some());
        assert_eq!(state.my_node_num(), Some(0x0b0b));

        state.start_config();
        assert!(state.node(9).is_none());
        assert!(state.my_info().is_none());
    }

    #[test]
    fn test_ack_and_nak_correlation() {
        let mut state = SessionState::new(ConfigMode::Full);
        state.register_pending(record(10));
        state.register_pending(record(11));

        let ack = reply(0x1234, PortNum::RoutingApp, 10, routing(RoutingError::None));
        assert_eq!(state.apply_packet(&ack), Some(Correlation::Ack(10)));
        assert!(state.acknowledgment.received_ack);
        assert!(state.pending(10).is_none());

        let nak = reply(0x1234, PortNum::RoutingApp, 11, routing(RoutingError::MaxRetransmit));
        assert_eq!(
            state.apply_packet(&nak),
            Some(Correlation::Nak(11, RoutingError::MaxRetransmit as i32))
        );
        assert!(state.acknowledgment.received_nak);
        assert_eq!(state.pending_count(), 0);
    }

    #[test]
    fn test_implicit_ack_from_own_radio() {
        let mut state = SessionState::new(ConfigMode::Full);
        state.apply_from_radio(&FromRadio {
            id: 1,
            payload_variant: Some(FromRadioVariant::MyInfo(MyNodeInfo {
                my_node_num: 0x0b0b,
                ..Default::default()
            })),
        });
        state.register_pending(record(5));

        let relayed = reply(0x0b0b, PortNum::RoutingApp, 5, routing(RoutingError::None));
        assert_eq!(state.apply_packet(&relayed), Some(Correlation::ImplicitAck(5)));
        assert!(state.acknowledgment.received_impl_ack);
        assert!(state.pending(5).is_some());
    }

    #[test]
    fn test_response_flags() {
        let mut state = SessionState::new(ConfigMode::Full);
        state.register_pending(record(20));
        state.register_pending(record(21));

        let trace = reply(0x1234, PortNum::TracerouteApp, 20, Vec::new());
        assert_eq!(
            state.apply_packet(&trace),
            Some(Correlation::Response(20, PortNum::TracerouteApp))
        );
        assert!(state.acknowledgment.received_trace_route);

        // unrelated request id
        let stray = reply(0x1234, PortNum::PositionApp, 99, Vec::new());
        assert_eq!(state.apply_packet(&stray), None);
        assert!(!state.acknowledgment.received_position);

        state.acknowledgment.reset();
        assert_eq!(state.acknowledgment, Acknowledgment::default());
    }

    #[test]
    fn test_response_timeout() {
        let mut timeout = ResponseTimeout::new(Duration::from_millis(0));
        assert!(!timeout.expired());
        timeout.reset();
        assert!(timeout.expired());
        assert_eq!(ResponseTimeout::default().duration(), Duration::from_secs(20));
    }
}
