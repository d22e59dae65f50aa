//! Side-channel node list events
//!
//! # Wire Format
//!
//! ```text
//! [MRNL][version:u16][length:u32][bitcode payload...]
//! ```

use bitcode::{Decode, Encode};
use meshroad_shared::{NodeListId, NodeRecord};

use crate::error::NetError;

/// Node list event magic bytes
pub const NODE_LIST_MAGIC: [u8; 4] = *b"MRNL";

/// Current node list event version
pub const NODE_LIST_VERSION: u16 = 1;

/// Header size: magic (4) + version (2) + length (4)
pub const NODE_LIST_HEADER_SIZE: usize = 10;

/// One chunk of a node list: `nodes` fill `[start, start + nodes.len())`
/// of a list of `total_nodes`
#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct NodeListEvent {
    pub list_id: NodeListId,
    pub total_nodes: u32,
    pub start: u32,
    pub nodes: Vec<NodeRecord>,
}

impl NodeListEvent {
    /// End of the covered range (exclusive), `None` when it overflows `u32`
    pub fn end(&self) -> Option<u32> {
        let len = u32::try_from(self.nodes.len()).ok()?;
        self.start.checked_add(len)
    }

    /// Serialize with framing
    pub fn to_bytes(&self) -> Vec<u8> {
        let payload = bitcode::encode(self);
        let mut bytes = Vec::with_capacity(NODE_LIST_HEADER_SIZE + payload.len());

        bytes.extend_from_slice(&NODE_LIST_MAGIC);
        bytes.extend_from_slice(&NODE_LIST_VERSION.to_le_bytes());
        bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&payload);

        bytes
    }

    /// Deserialize, validating magic, version and length first
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, NetError> {
        if bytes.len() < NODE_LIST_HEADER_SIZE {
            return Err(NetError::EventTooShort);
        }

        if bytes[0..4] != NODE_LIST_MAGIC {
            return Err(NetError::InvalidMagic);
        }

        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != NODE_LIST_VERSION {
            return Err(NetError::VersionMismatch {
                expected: NODE_LIST_VERSION,
                actual: version,
            });
        }

        let length = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]) as usize;
        let available = bytes.len() - NODE_LIST_HEADER_SIZE;
        if available < length {
            return Err(NetError::LengthMismatch {
                expected: length,
                actual: available,
            });
        }

        let payload = &bytes[NODE_LIST_HEADER_SIZE..NODE_LIST_HEADER_SIZE + length];
        bitcode::decode(payload).map_err(|e| NetError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> NodeListEvent {
        NodeListEvent {
            list_id: NodeListId(7),
            total_nodes: 40,
            start: 32,
            nodes: (0..8)
                .map(|i| NodeRecord::new([i as f32, 0.0, 0.5], 10.0, 5.0, [0.0, 0.0, 1.0]))
                .collect(),
        }
    }

    #[test]
    fn framed_round_trip() {
        let ev = event();
        let bytes = ev.to_bytes();
        assert_eq!(&bytes[0..4], b"MRNL");
        assert_eq!(NodeListEvent::from_bytes(&bytes).unwrap(), ev);
        assert_eq!(ev.end(), Some(40));
    }

    #[test]
    fn end_overflow_is_none() {
        let mut ev = event();
        ev.start = u32::MAX;
        assert_eq!(ev.end(), None);
        ev.start = u32::MAX - 8;
        assert_eq!(ev.end(), Some(u32::MAX));
    }

    #[test]
    fn rejects_bad_framing() {
        let bytes = event().to_bytes();

        assert!(matches!(
            NodeListEvent::from_bytes(&bytes[..5]),
            Err(NetError::EventTooShort)
        ));

        let mut bad = bytes.clone();
        bad[0] = b'X';
        assert!(matches!(NodeListEvent::from_bytes(&bad), Err(NetError::InvalidMagic)));

        let mut bad = bytes.clone();
        bad[4] = 9;
        assert!(matches!(
            NodeListEvent::from_bytes(&bad),
            Err(NetError::VersionMismatch {
                expected: 1,
                actual: 9
            })
        ));

        assert!(matches!(
            NodeListEvent::from_bytes(&bytes[..bytes.len() - 1]),
            Err(NetError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn garbage_payload_fails_to_decode() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&NODE_LIST_MAGIC);
        bytes.extend_from_slice(&NODE_LIST_VERSION.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.push(0xff);
        assert!(matches!(NodeListEvent::from_bytes(&bytes), Err(NetError::Decode(_))));
    }
}
