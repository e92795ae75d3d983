//! Port number to payload decoder table.

use crate::error::ReceiveError;
use meshtastic_proto::{
    AdminMessage, Compressed, Data, DeviceState, FromRadio, HardwareMessage, MapReport, Message,
    NeighborInfo, Paxcount, PortNum, Position, RouteDiscovery, Routing, SerialConnectionStatus,
    StoreAndForward, TakPacket, Telemetry, User, Waypoint,
};
use serde::Serialize;
use serde_json::Value;

/// Where a packet entered the receive path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// MQTT gateway feed
    Mqtt,
    /// Locally attached radio
    Serial,
}

/// Confidence in a table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Certainty {
    /// Schema known to match the port
    Verified,
    /// Schema chosen without confirmation; the note says why
    Unverified(&'static str),
}

/// Payload schema for a port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoder {
    /// `AdminMessage`
    Admin,
    /// `TakPacket`
    Tak,
    /// `DeviceState`
    DeviceState,
    /// `MapReport`
    MapReport,
    /// `NeighborInfo`
    NeighborInfo,
    /// `User`
    User,
    /// `Paxcount`
    Paxcount,
    /// `Position`
    Position,
    /// `FromRadio`
    FromRadio,
    /// `HardwareMessage`
    HardwareMessage,
    /// `Routing`
    Routing,
    /// `SerialConnectionStatus`
    SerialConnectionStatus,
    /// `Compressed`
    Compressed,
    /// `StoreAndForward`
    StoreAndForward,
    /// `Telemetry`
    Telemetry,
    /// Nested `Data`
    Data,
    /// UTF-8 text
    Text,
    /// `RouteDiscovery`
    RouteDiscovery,
    /// `Waypoint`
    Waypoint,
    /// No schema, payload passed through
    Unknown,
}

/// One row of the dispatch table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchEntry {
    /// Payload schema
    pub decoder: Decoder,
    /// Confidence
    pub certainty: Certainty,
    /// Render the payload as text when the schema does not fit
    pub text_fallback: bool,
}

impl DispatchEntry {
    const fn verified(decoder: Decoder) -> Self {
        Self {
            decoder,
            certainty: Certainty::Verified,
            text_fallback: false,
        }
    }

    const fn unverified(decoder: Decoder, note: &'static str) -> Self {
        Self {
            decoder,
            certainty: Certainty::Unverified(note),
            text_fallback: true,
        }
    }
}

/// Table row for `portnum` heard from `source`
pub fn dispatch(portnum: PortNum, source: SourceKind) -> DispatchEntry {
    use Decoder as D;
    match portnum {
        PortNum::AdminApp => DispatchEntry::verified(D::Admin),
        PortNum::AtakForwarder | PortNum::AtakPlugin => DispatchEntry::verified(D::Tak),
        PortNum::DetectionSensorApp => DispatchEntry::unverified(
            D::DeviceState,
            "detection sensor payloads are usually plain text",
        ),
        PortNum::MapReportApp => DispatchEntry::verified(D::MapReport),
        PortNum::NeighborinfoApp => DispatchEntry::verified(D::NeighborInfo),
        PortNum::NodeinfoApp => DispatchEntry::verified(D::User),
        PortNum::PaxcounterApp => DispatchEntry::verified(D::Paxcount),
        PortNum::PositionApp => DispatchEntry::verified(D::Position),
        PortNum::RangeTestApp => DispatchEntry::unverified(
            D::FromRadio,
            "range test schema unconfirmed",
        ),
        PortNum::RemoteHardwareApp => DispatchEntry::verified(D::HardwareMessage),
        PortNum::RoutingApp => DispatchEntry::verified(D::Routing),
        PortNum::SerialApp => DispatchEntry::verified(D::SerialConnectionStatus),
        PortNum::SimulatorApp | PortNum::TextMessageCompressedApp => {
            DispatchEntry::verified(D::Compressed)
        }
        PortNum::StoreForwardApp => DispatchEntry::verified(D::StoreAndForward),
        PortNum::TelemetryApp => DispatchEntry::verified(D::Telemetry),
        PortNum::TextMessageApp => match source {
            SourceKind::Mqtt => {
                DispatchEntry::unverified(D::Text, "text decoded as UTF-8 on the MQTT path")
            }
            SourceKind::Serial => DispatchEntry::unverified(
                D::Data,
                "text decoded as nested Data on the serial path",
            ),
        },
        PortNum::UnknownApp => DispatchEntry::verified(D::Data),
        PortNum::TracerouteApp => DispatchEntry::verified(D::RouteDiscovery),
        PortNum::WaypointApp => DispatchEntry::verified(D::Waypoint),
        PortNum::AudioApp
        | PortNum::ReplyApp
        | PortNum::IpTunnelApp
        | PortNum::ZpsApp
        | PortNum::PowerstressApp
        | PortNum::PrivateApp
        | PortNum::Max => DispatchEntry::verified(D::Unknown),
    }
}

fn decode_as<M: Message + Default + Serialize>(payload: &[u8]) -> Result<Value, ReceiveError> {
    let msg = M::decode(payload)?;
    Ok(serde_json::to_value(&msg)?)
}

/// Render a byte payload as a JSON string when it is UTF-8, otherwise as
/// the byte array.
pub fn bytes_value(bytes: &[u8]) -> Value {
    match std::str::from_utf8(bytes) {
        Ok(text) => Value::String(text.to_string()),
        Err(_) => Value::from(bytes.to_vec()),
    }
}

/// Decode `payload` with the schema of `decoder`
pub fn decode(decoder: Decoder, payload: &[u8]) -> Result<Value, ReceiveError> {
    match decoder {
        Decoder::Admin => decode_as::<AdminMessage>(payload),
        Decoder::Tak => decode_as::<TakPacket>(payload),
        Decoder::DeviceState => decode_as::<DeviceState>(payload),
        Decoder::MapReport => decode_as::<MapReport>(payload),
        Decoder::NeighborInfo => decode_as::<NeighborInfo>(payload),
        Decoder::User => decode_as::<User>(payload),
        Decoder::Paxcount => decode_as::<Paxcount>(payload),
        Decoder::Position => decode_as::<Position>(payload),
        Decoder::FromRadio => decode_as::<FromRadio>(payload),
        Decoder::HardwareMessage => decode_as::<HardwareMessage>(payload),
        Decoder::Routing => decode_as::<Routing>(payload),
        Decoder::SerialConnectionStatus => decode_as::<SerialConnectionStatus>(payload),
        Decoder::Compressed => decode_as::<Compressed>(payload),
        Decoder::StoreAndForward => decode_as::<StoreAndForward>(payload),
        Decoder::Telemetry => decode_as::<Telemetry>(payload),
        Decoder::Data => {
            let data = Data::decode(payload)?;
            let mut value = serde_json::to_value(&data)?;
            value["payload"] = bytes_value(&data.payload);
            Ok(value)
        }
        Decoder::Text => std::str::from_utf8(payload)
            .map(|text| Value::String(text.to_string()))
            .map_err(|e| ReceiveError::Decode(e.to_string())),
        Decoder::RouteDiscovery => decode_as::<RouteDiscovery>(payload),
        Decoder::Waypoint => decode_as::<Waypoint>(payload),
        Decoder::Unknown => Ok(Value::from(payload.to_vec())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshtastic_proto::mesh::routing;

    #[test]
    fn test_every_port_has_an_entry() {
        for raw in 0..=511 {
            if let Ok(port) = PortNum::try_from(raw) {
                let _ = dispatch(port, SourceKind::Mqtt);
                let _ = dispatch(port, SourceKind::Serial);
            }
        }
    }

    #[test]
    fn test_flagged_entries() {
        let range = dispatch(PortNum::RangeTestApp, SourceKind::Mqtt);
        assert_eq!(range.decoder, Decoder::FromRadio);
        assert!(matches!(range.certainty, Certainty::Unverified(_)));
        assert!(range.text_fallback);

        assert_eq!(
            dispatch(PortNum::TextMessageApp, SourceKind::Mqtt).decoder,
            Decoder::Text
        );
        assert_eq!(
            dispatch(PortNum::TextMessageApp, SourceKind::Serial).decoder,
            Decoder::Data
        );
        assert_eq!(
            dispatch(PortNum::PositionApp, SourceKind::Serial).certainty,
            Certainty::Verified
        );
    }

    #[test]
    fn test_decode_position() {
        let position = Position {
            latitude_i: Some(377_749_000),
            longitude_i: Some(-1_224_194_000),
            time: 1_700_000_000,
            ..Default::default()
        };
        let value = decode(Decoder::Position, &position.encode_to_vec()).unwrap();
        assert_eq!(value["latitude_i"], 377_749_000);
        assert_eq!(value["time"], 1_700_000_000u32);
    }

    #[test]
    fn test_decode_routing() {
        let ack = Routing {
            variant: Some(routing::Variant::ErrorReason(routing::Error::None as i32)),
        };
        let value = decode(Decoder::Routing, &ack.encode_to_vec()).unwrap();
        assert_eq!(value["error_reason"], 0);
    }

    #[test]
    fn test_text_and_passthrough() {
        assert_eq!(decode(Decoder::Text, b"hello").unwrap(), "hello");
        assert!(decode(Decoder::Text, &[0xff, 0xfe]).is_err());
        assert_eq!(
            decode(Decoder::Unknown, &[1, 2, 3]).unwrap(),
            serde_json::json!([1, 2, 3])
        );
    }

    #[test]
    fn test_malformed_payload() {
        let err = decode(Decoder::Telemetry, &[0xff, 0xff, 0xff]).unwrap_err();
        assert!(matches!(err, ReceiveError::Decode(_)));
    }
}
