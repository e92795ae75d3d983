//! Receive path for Meshtastic traffic.
//!
//! Raw envelopes from an MQTT gateway or a locally attached radio are
//! decrypted with the channel key, decoded by port number and enriched for
//! display. The feed is untrusted and continuous, so nothing here fails the
//! stream: undecryptable or malformed packets come back as messages that
//! carry the error alongside the fields that could be recovered.
//!
//! ## Features
//!
//! - **Envelope Decoding**: `ServiceEnvelope`, `FromRadio` or JSON
//! - **Channel Decryption**: key chosen by the channel segment of the topic
//! - **Port Dispatch**: total table from `PortNum` to payload schema, with
//!   unconfirmed entries flagged
//! - **Enrichment**: degrees, MAC addresses, base64 keys, UTC timestamps
//! - **Geocoding**: optional reverse lookup through a [`Geocoder`]
//! - **Filtering**: include/exclude substrings over the flattened message

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dispatch;
pub mod enrich;
pub mod error;
pub mod filter;
pub mod geocode;
pub mod message;
pub mod pipeline;

// Re-export main types
pub use dispatch::{decode, dispatch, Certainty, Decoder, DispatchEntry, SourceKind};
pub use enrich::{enrich_packet, enrich_payload, mac_string, utc_string};
pub use error::ReceiveError;
pub use filter::MessageFilter;
pub use geocode::Geocoder;
pub use message::{EnrichedMessage, Source};
pub use pipeline::{ReceiveOptions, ReceivePipeline, UNDECRYPTABLE};
