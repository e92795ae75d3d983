//! Mesh node addresses.
//!
//! A node is a 32-bit number on the wire and `!` + hex everywhere humans
//! see it. Both forms, plus plain decimal and `0x` hex, are accepted at
//! every ingress point and normalized once into [`NodeId`].

use crate::error::WireError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 32-bit mesh node number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "NodeIdRepr", into = "String")]
pub struct NodeId(pub u32);

impl NodeId {
    /// Broadcast destination
    pub const BROADCAST: NodeId = NodeId(0xFFFF_FFFF);

    /// Sender used when the caller does not provide one
    pub const DEFAULT_SENDER: NodeId = NodeId(0x0000_0B0B);

    /// Parse `!xxxxxxxx`, a decimal integer, or a `0x` hex integer.
    pub fn parse(input: &str) -> Result<Self, WireError> {
        let s = input.trim();
        let invalid = || WireError::InvalidNodeId(input.to_string());

        let (digits, radix) = if let Some(hex) = s.strip_prefix('!') {
            if hex.is_empty() || hex.len() > 8 {
                return Err(invalid());
            }
            (hex, 16)
        } else if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            (hex, 16)
        } else {
            (s, 10)
        };

        if digits.is_empty() || digits.starts_with('+') {
            return Err(invalid());
        }
        u32::from_str_radix(digits, radix)
            .map(NodeId)
            .map_err(|_| invalid())
    }

    /// Raw node number
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// True for the broadcast address
    pub fn is_broadcast(self) -> bool {
        self == Self::BROADCAST
    }

    /// `!` followed by exactly eight lowercase hex digits
    pub fn to_padded(self) -> String {
        format!("!{:08x}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "!{:x}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<u32> for NodeId {
    fn from(value: u32) -> Self {
        NodeId(value)
    }
}

impl From<NodeId> for u32 {
    fn from(value: NodeId) -> Self {
        value.0
    }
}

impl From<NodeId> for String {
    fn from(value: NodeId) -> Self {
        value.to_padded()
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::DEFAULT_SENDER
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NodeIdRepr {
    Number(u32),
    Text(String),
}

impl TryFrom<NodeIdRepr> for NodeId {
    type Error = WireError;

    fn try_from(repr: NodeIdRepr) -> Result<Self, Self::Error> {
        match repr {
            NodeIdRepr::Number(n) => Ok(NodeId(n)),
            NodeIdRepr::Text(s) => NodeId::parse(&s),
        }
    }
}
