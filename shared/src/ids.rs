//! Identifiers shared between the sending and receiving side of a connection.

use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Identifies one chunked node list on a connection.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Encode, Decode,
)]
pub struct NodeListId(pub u32);

/// Identifies a replicated road on the receiving side of a connection.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Encode, Decode,
)]
pub struct GhostId(pub u32);

impl std::fmt::Display for NodeListId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "list#{}", self.0)
    }
}

impl std::fmt::Display for GhostId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ghost#{}", self.0)
    }
}
