//! Field post-processing on decoded payloads.
//!
//! Only top-level keys of a payload object are rewritten.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::DateTime;
use serde_json::{Map, Value};

/// Scale of `latitude_i`/`longitude_i`
pub const COORDINATE_SCALE: f64 = 1e-7;

/// `1970-01-01 00:00:00 UTC` style rendering of an epoch time
pub fn utc_string(epoch_secs: i64) -> Option<String> {
    DateTime::from_timestamp(epoch_secs, 0).map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
}

/// Colon separated lowercase hex
pub fn mac_string(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// Bytes of a JSON byte array
fn byte_array(value: &Value) -> Option<Vec<u8>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_u64().and_then(|b| u8::try_from(b).ok()))
        .collect()
}

fn scale_coordinate(obj: &mut Map<String, Value>, raw: &str, scaled: &str) {
    if let Some(v) = obj.get(raw).and_then(Value::as_i64) {
        obj.insert(scaled.to_string(), Value::from(v as f64 * COORDINATE_SCALE));
    }
}

fn base64_field(obj: &mut Map<String, Value>, key: &str) {
    if let Some(bytes) = obj.get(key).and_then(byte_array) {
        obj.insert(key.to_string(), Value::String(STANDARD.encode(bytes)));
    }
}

fn time_field(obj: &mut Map<String, Value>, key: &str, rendered: &str) {
    if let Some(utc) = obj.get(key).and_then(Value::as_i64).and_then(utc_string) {
        obj.insert(rendered.to_string(), Value::String(utc));
    }
}

/// Add degrees, MAC, key and time renderings to a decoded payload
pub fn enrich_payload(payload: &mut Value) {
    let Some(obj) = payload.as_object_mut() else {
        return;
    };
    scale_coordinate(obj, "latitude_i", "latitude");
    scale_coordinate(obj, "longitude_i", "longitude");
    if let Some(mac) = obj.get("macaddr").and_then(byte_array) {
        obj.insert("macaddr".to_string(), Value::String(mac_string(&mac)));
    }
    base64_field(obj, "public_key");
    time_field(obj, "time", "time_utc");
}

/// Add `rx_time_utc` and base64 key material to a rendered mesh packet
pub fn enrich_packet(packet: &mut Value) {
    let Some(obj) = packet.as_object_mut() else {
        return;
    };
    time_field(obj, "rx_time", "rx_time_utc");
    base64_field(obj, "public_key");
}

/// Coordinates worth reverse geocoding: both present and not both zero
pub fn coordinates(payload: &Value) -> Option<(f64, f64)> {
    let lat = payload.get("latitude")?.as_f64()?;
    let lon = payload.get("longitude")?.as_f64()?;
    if lat == 0.0 && lon == 0.0 {
        None
    } else {
        Some((lat, lon))
    }
}
