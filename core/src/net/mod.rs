//! Road replication
//!
//! An authoritative road sends delta updates to observers. Each update
//! starts with a [`RoadMask`] byte naming the sections that follow:
//!
//! ```text
//! [mask:u8]
//! MESH_ROAD  transform (12 x f32), 3 material names, texture length,
//!            break angle, width subdivisions
//! PROFILE    [count:u16] then per node x, y, [smooth | tag << 1]:u8
//! NODE       [kind:u8] 0 = [count:u16] + 32-byte nodes inline,
//!                      1 = [list id:u32] delivered as node list events
//! REGEN      no payload, rebuild geometry after applying the rest
//! ```
//!
//! Node lists too large for the current packet travel as a side channel
//! of [`NodeListEvent`]s and are reassembled by a [`NodeListManager`].

mod event;
mod lists;
mod packet;
mod replica;


pub use event::{NODE_LIST_HEADER_SIZE, NODE_LIST_MAGIC, NODE_LIST_VERSION, NodeListEvent};
pub use lists::{NodeListDelivery, NodeListManager};
pub use packet::{PacketReader, PacketWriter};
pub use replica::ClientReplica;

bitflags::bitflags! {
    /// Dirty sections of a road
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RoadMask: u8 {
        /// Transform, materials and generation parameters
        const MESH_ROAD = 0b0000_0001;
        /// Road node list
        const NODE = 0b0000_0010;
        /// Rebuild derived geometry after applying the other sections
        const REGEN = 0b0000_0100;
        /// Profile node list
        const PROFILE = 0b0000_1000;
    }
}

/// Node section kind: nodes follow inline
pub const NODE_SECTION_INLINE: u8 = 0;

/// Node section kind: nodes arrive as a chunked list
pub const NODE_SECTION_LIST: u8 = 1;
