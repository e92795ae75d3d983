//! Building mesh packets from application data.

use crate::error::SessionError;
use crate::packet_id::generate;
use meshtastic_crypto::{CryptoEngine, DEFAULT_CHANNEL};
use meshtastic_proto::mesh::mesh_packet::PayloadVariant;
use meshtastic_proto::{Data, Message, MeshPacket, PortNum, DATA_PAYLOAD_LEN};
use meshtastic_wire::NodeId;
use std::sync::Arc;
use tracing::debug;

/// Default relay budget
pub const DEFAULT_HOP_LIMIT: u32 = 3;

/// Default channel index for text messages
pub const DEFAULT_TEXT_CHANNEL: u32 = 6;

/// Default text when none is given
pub const DEFAULT_TEXT: &str = "SYN";

/// Addressing and delivery options for one send call
#[derive(Debug, Clone, PartialEq)]
pub struct SendOptions {
    /// Sender
    pub from: NodeId,
    /// Destination
    pub to: NodeId,
    /// Channel index written into the packet
    pub channel: u32,
    /// Channel name used for key lookup and MQTT topics
    pub channel_name: String,
    /// Ask the destination to acknowledge
    pub want_ack: bool,
    /// Ask the destination application to answer
    pub want_response: bool,
    /// Relay budget
    pub hop_limit: u32,
    /// Id of the previous packet from this sender, 0 for none
    pub last_packet_id: u32,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            from: NodeId::DEFAULT_SENDER,
            to: NodeId::BROADCAST,
            channel: 0,
            channel_name: DEFAULT_CHANNEL.to_string(),
            want_ack: false,
            want_response: false,
            hop_limit: DEFAULT_HOP_LIMIT,
            last_packet_id: 0,
        }
    }
}

impl SendOptions {
    /// Defaults for text messages (channel index 6)
    pub fn for_text() -> Self {
        Self {
            channel: DEFAULT_TEXT_CHANNEL,
            ..Self::default()
        }
    }

    /// Set sender and destination from their external string forms
    pub fn with_ids(mut self, from: &str, to: &str) -> Result<Self, SessionError> {
        self.from = NodeId::parse(from)?;
        self.to = NodeId::parse(to)?;
        Ok(self)
    }
}

/// Reject a `Data` that cannot be sent.
pub fn validate(data: &Data) -> Result<(), SessionError> {
    if data.payload.len() > DATA_PAYLOAD_LEN {
        return Err(SessionError::PayloadTooLarge {
            len: data.payload.len(),
            max: DATA_PAYLOAD_LEN,
        });
    }
    if data.portnum <= 0 || data.portnum >= PortNum::Max as i32 {
        return Err(SessionError::InvalidPortNumber(data.portnum));
    }
    Ok(())
}

/// Turns `Data` into ready-to-route `MeshPacket`s.
#[derive(Debug, Clone)]
pub struct PacketAssembler {
    crypto: Arc<CryptoEngine>,
}

impl PacketAssembler {
    /// Create an assembler sharing `crypto`
    pub fn new(crypto: Arc<CryptoEngine>) -> Self {
        Self { crypto }
    }

    /// Cipher used for channel keys
    pub fn crypto(&self) -> &CryptoEngine {
        &self.crypto
    }

    /// Validate, assign an id after `opts.last_packet_id`, and encrypt when
    /// the channel has a key.
    pub fn build_data_packet(&self, data: Data, opts: &SendOptions) -> Result<MeshPacket, SessionError> {
        validate(&data)?;
        let id = generate(opts.last_packet_id);
        self.assemble(data, opts, id)
    }

    /// Same as [`build_data_packet`](Self::build_data_packet) with a caller
    /// chosen id.
    pub fn build_with_id(&self, data: Data, opts: &SendOptions, id: u32) -> Result<MeshPacket, SessionError> {
        validate(&data)?;
        self.assemble(data, opts, id)
    }

    fn assemble(&self, data: Data, opts: &SendOptions, id: u32) -> Result<MeshPacket, SessionError> {
        let from = opts.from.as_u32();
        let payload_variant = if self.crypto.is_encrypted(&opts.channel_name) {
            let plaintext = data.encode_to_vec();
            let ciphertext = self
                .crypto
                .encrypt_packet(&opts.channel_name, id, from, &plaintext)?;
            PayloadVariant::Encrypted(ciphertext)
        } else {
            PayloadVariant::Decoded(data)
        };

        debug!(
            "Assembled packet {:#010x} from {} to {} on {} ({})",
            id,
            opts.from,
            opts.to,
            opts.channel_name,
            match payload_variant {
                PayloadVariant::Encrypted(_) => "encrypted",
                PayloadVariant::Decoded(_) => "plaintext",
            }
        );

        Ok(MeshPacket {
            from,
            to: opts.to.as_u32(),
            channel: opts.channel,
            id,
            want_ack: opts.want_ack,
            hop_limit: opts.hop_limit,
            payload_variant: Some(payload_variant),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshtastic_crypto::{decrypt, nonce, KeyTable, DEFAULT_KEY};

    fn assembler() -> PacketAssembler {
        PacketAssembler::new(Arc::new(CryptoEngine::default()))
    }

    fn text(payload: &[u8]) -> Data {
        Data::new(PortNum::TextMessageApp, payload.to_vec())
    }

    #[test]
    fn test_syn_scenario_decrypts_with_default_key() {
        let opts = SendOptions::default().with_ids("!00000b0b", "!ffffffff").unwrap();
        let packet = assembler().build_data_packet(text(b"SYN"), &opts).unwrap();

        assert_eq!(packet.from, 0x0b0b);
        assert_eq!(packet.to, 0xffff_ffff);
        assert_eq!(packet.hop_limit, 3);
        assert!(packet.decoded().is_none());

        let ciphertext = packet.encrypted().unwrap();
        let plaintext = decrypt(&DEFAULT_KEY, &nonce(packet.id, packet.from), ciphertext).unwrap();
        let data = Data::decode(plaintext.as_slice()).unwrap();
        assert_eq!(data.portnum(), PortNum::TextMessageApp);
        assert_eq!(data.payload, b"SYN".to_vec());
    }

    #[test]
    fn test_payload_limit() {
        let asm = assembler();
        let opts = SendOptions::default();

        assert!(asm
            .build_data_packet(text(&[b'a'; DATA_PAYLOAD_LEN]), &opts)
            .is_ok());
        let err = asm
            .build_data_packet(text(&[b'a'; DATA_PAYLOAD_LEN + 1]), &opts)
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::PayloadTooLarge { len: 234, max: 233 }
        ));
    }

    #[test]
    fn test_port_number_bounds() {
        let asm = assembler();
        let opts = SendOptions::default();
        for bad in [0, -3, PortNum::Max as i32, 600] {
            let data = Data {
                portnum: bad,
                ..Default::default()
            };
            assert!(matches!(
                asm.build_data_packet(data, &opts),
                Err(SessionError::InvalidPortNumber(p)) if p == bad
            ));
        }
        let private = Data::new(PortNum::PrivateApp, vec![1]);
        assert!(asm.build_data_packet(private, &opts).is_ok());
    }

    #[test]
    fn test_sequential_id() {
        let opts = SendOptions {
            last_packet_id: 41,
            ..SendOptions::default()
        };
        let packet = assembler().build_data_packet(text(b"x"), &opts).unwrap();
        assert_eq!(packet.id, 42);
    }

    #[test]
    fn test_unkeyed_channel_stays_plaintext() {
        let mut keys = KeyTable::new();
        keys.insert("Open", "").unwrap();
        let asm = PacketAssembler::new(Arc::new(CryptoEngine::new(keys)));
        let opts = SendOptions {
            channel_name: "Open".into(),
            ..SendOptions::for_text()
        };

        let packet = asm.build_data_packet(text(b"hi"), &opts).unwrap();
        assert_eq!(packet.channel, DEFAULT_TEXT_CHANNEL);
        assert_eq!(packet.decoded().unwrap().payload, b"hi".to_vec());
    }

    #[test]
    fn test_bad_node_id_string() {
        assert!(matches!(
            SendOptions::default().with_ids("!nothex", "!ffffffff"),
            Err(SessionError::Wire(_))
        ));
    }
}
