//! POD records for road and profile nodes.
//!
//! These are the exchange form of the editable road data: what goes into
//! persisted fields, ghost update packets and chunked node list events.
//! The geometry crate converts them to and from its glam-based types.

use bitcode::{Decode, Encode};
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// One road control node (32 bytes).
///
/// Memory layout matches the wire layout: position, width, depth, normal.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, Encode, Decode, Pod, Zeroable,
)]
#[repr(C)]
pub struct NodeRecord {
    pub position: [f32; 3],
    pub width: f32,
    pub depth: f32,
    /// Up vector of the road surface at this node
    pub normal: [f32; 3],
}

impl NodeRecord {
    pub const fn new(position: [f32; 3], width: f32, depth: f32, normal: [f32; 3]) -> Self {
        Self {
            position,
            width,
            depth,
            normal,
        }
    }

    /// Bit-exact comparison (distinguishes -0.0 and NaN payloads).
    pub fn bits_eq(&self, other: &Self) -> bool {
        bytemuck::bytes_of(self) == bytemuck::bytes_of(other)
    }
}

/// One cross-section profile node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct ProfileNodeRecord {
    /// Profile-space position: x outward from the road edge, y up
    pub position: [f32; 2],
    /// Average neighbouring face normals at this node
    pub smooth: bool,
    /// Material tag of the segment ending at this node (0 = side, 1 = top, 2 = bottom).
    /// Meaningless on the first node.
    pub material: u8,
}

impl ProfileNodeRecord {
    pub const fn new(position: [f32; 2], smooth: bool, material: u8) -> Self {
        Self {
            position,
            smooth,
            material,
        }
    }
}
