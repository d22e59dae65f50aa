//! Centralized constants for MeshRoad.
//!
//! Engineering bounds shared by the geometry pipeline, the persisted
//! field parser and the network codec.

/// Narrowest road node allowed; narrower values are clamped.
pub const MIN_NODE_WIDTH: f32 = 0.25;

/// Widest road node allowed; wider values are clamped.
pub const MAX_NODE_WIDTH: f32 = 50.0;

/// Shallowest road node allowed; shallower values are clamped.
pub const MIN_NODE_DEPTH: f32 = 0.25;

/// Deepest road node allowed; deeper values are clamped.
pub const MAX_NODE_DEPTH: f32 = 50.0;

/// Spline sampling density: at least one sample per this many meters of arc.
pub const MIN_METERS_PER_SEGMENT: f32 = 1.0;

/// Default break angle in degrees.
pub const DEFAULT_BREAK_ANGLE: f32 = 3.0;

/// Smallest accepted break angle in degrees.
pub const MIN_BREAK_ANGLE: f32 = 0.1;

/// Largest accepted break angle in degrees.
pub const MAX_BREAK_ANGLE: f32 = 180.0;

/// Default distance, in meters, over which the road texture repeats once.
pub const DEFAULT_TEXTURE_LENGTH: f32 = 5.0;

/// Shortest accepted texture repeat length.
pub const MIN_TEXTURE_LENGTH: f32 = 0.1;

/// Upper bound on extra vertex columns across the road surface.
pub const MAX_WIDTH_SUBDIVISIONS: u32 = 100;

/// Default road node width in meters.
pub const DEFAULT_NODE_WIDTH: f32 = 10.0;

/// Default road node depth in meters.
pub const DEFAULT_NODE_DEPTH: f32 = 5.0;

/// Profile node count is written as a u16.
pub const MAX_PROFILE_NODES: usize = u16::MAX as usize;

/// Default per-packet byte budget.
pub const MAX_PACKET_SIZE: usize = 1500;

/// Bytes kept free in a packet before a node list is written inline.
pub const PACKET_SAFETY_MARGIN: usize = 100;

/// Bytes per node on the wire: position (12) + width (4) + depth (4) + normal (12).
pub const NODE_RECORD_WIRE_SIZE: usize = 32;

/// Default number of nodes carried by one side-channel node list event.
pub const DEFAULT_NODES_PER_EVENT: usize = 32;

/// Largest node list a receiver will assemble.
pub const MAX_NODE_LIST_NODES: u32 = 65_536;

/// Node lists a receiver holds at once while assembling, parked or awaited.
pub const MAX_PENDING_NODE_LISTS: usize = 64;

/// Finished node list ids remembered so late duplicate chunks are ignored.
pub const RETIRED_NODE_LIST_HISTORY: usize = 256;

/// Clamp a node width into engineering bounds.
#[inline]
pub fn clamp_width(width: f32) -> f32 {
    if width.is_nan() {
        return MIN_NODE_WIDTH;
    }
    width.clamp(MIN_NODE_WIDTH, MAX_NODE_WIDTH)
}

/// Clamp a node depth into engineering bounds.
#[inline]
pub fn clamp_depth(depth: f32) -> f32 {
    if depth.is_nan() {
        return MIN_NODE_DEPTH;
    }
    depth.clamp(MIN_NODE_DEPTH, MAX_NODE_DEPTH)
}
