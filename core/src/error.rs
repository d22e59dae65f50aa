//! Error types for the road pipeline, the network codec and configuration loading

use thiserror::Error;

use crate::material::MaterialSlot;

/// Geometry pipeline and editor errors
///
/// A failed regeneration leaves the road with its previous geometry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoadError {
    /// Forward and up vectors of a slice are parallel (or zero)
    #[error("degenerate frame at slice {slice}: forward and up vectors are parallel")]
    DegenerateFrame { slice: usize },

    /// Vertex or index emission disagrees with the analytic buffer counts
    #[error(
        "{slot:?} buffer mismatch: expected {expected_verts} verts / {expected_indices} indices, wrote {verts} / {indices}"
    )]
    BufferCountMismatch {
        slot: MaterialSlot,
        expected_verts: usize,
        expected_indices: usize,
        verts: usize,
        indices: usize,
    },

    /// An emitted index references a vertex that was never written
    #[error("{slot:?} buffer index {index} out of range for {verts} vertices")]
    IndexOutOfRange {
        slot: MaterialSlot,
        index: u32,
        verts: usize,
    },

    /// Editor operation addressed a node that does not exist
    #[error("node index {index} out of range (len {len})")]
    NodeIndex { index: usize, len: usize },

    /// A profile needs at least two nodes
    #[error("profile must keep at least 2 nodes")]
    ProfileTooShort,

    /// Too many profile nodes to describe on the wire
    #[error("profile has {0} nodes, more than the wire format allows")]
    ProfileTooLong(usize),
}

/// Update packet and node list event decoding errors
#[derive(Debug, Error)]
pub enum NetError {
    #[error("truncated packet: {0}")]
    Truncated(#[from] std::io::Error),

    #[error("invalid profile material tag {0}")]
    InvalidMaterialTag(u8),

    #[error("invalid node section kind {0}")]
    InvalidNodeSection(u8),

    #[error("material name is not valid UTF-8")]
    InvalidString,

    #[error("chunk [{start}, {end}) outside list of {total} nodes")]
    ChunkOutOfRange { start: u32, end: u64, total: u32 },

    #[error("list {list} announces {total} nodes, more than the limit of {max}")]
    ListTooLarge { list: u32, total: u32, max: u32 },

    #[error("list {list} announced {expected} nodes, chunk says {actual}")]
    ListSizeMismatch {
        list: u32,
        expected: u32,
        actual: u32,
    },

    #[error("event too short")]
    EventTooShort,

    #[error("invalid event magic")]
    InvalidMagic,

    #[error("event version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: u16, actual: u16 },

    #[error("event length mismatch: header says {expected}, payload is {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("event payload decode failed: {0}")]
    Decode(String),

    #[error("packet budget exceeded: need {needed} bytes, {remaining} remaining")]
    PacketFull { needed: usize, remaining: usize },

    #[error(transparent)]
    Road(#[from] RoadError),
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
