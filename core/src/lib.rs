//! MeshRoad Core - Procedural road geometry
//!
//! This crate turns an editable list of road control nodes and a 2D
//! cross-section profile into render buffers, collision data and a compact
//! delta stream for replicating the road to remote observers.
//!
//! # Architecture
//!
//! - [`MeshRoad`] - The editable road object and its derived geometry
//! - [`Profile`] - Cross-section swept along both road edges
//! - [`slice`] / [`segment`] - Piecewise-linear sampling of the node spline
//! - [`mesh`] - Top / Bottom / Side vertex and index buffers
//! - [`collision`] - Triangle soup, convex lists and ray casts
//! - [`net`] - Update packets, chunked node lists and the client replica
//! - [`scene`] - Capability traits a host scene walks objects by
//!
//! Nothing here renders, simulates or opens sockets; hosts feed the
//! buffers, triangles and packets to their own systems.

pub mod arena;
pub mod bounds;
pub mod collision;
pub mod config;
pub mod error;
pub mod material;
pub mod mesh;
pub mod net;
pub mod profile;
pub mod road;
pub mod scene;
pub mod segment;
pub mod slice;
pub mod spline;

// Re-export the road object and its parameters
pub use road::{FIELDS, FieldDescriptor, MeshRoad, RoadGeometry, RoadParams, UpdateOutcome};

// Re-export geometry types
pub use bounds::Aabb;
pub use collision::{CollisionMesh, RayHit, RoadConvex, Triangle};
pub use mesh::{BufferCounts, GeometryBuffer, MeshCounts, RoadVertex};
pub use profile::{Profile, ProfileNode, SegmentMaterial};
pub use segment::Segment;
pub use slice::Slice;
pub use spline::RoadNode;

// Re-export materials, configuration and errors
pub use config::{GeometryConfig, NetConfig, RoadConfig};
pub use error::{ConfigError, NetError, RoadError};
pub use material::{MaterialId, MaterialLibrary, MaterialSlot, RoadMaterials};

// Re-export replication types
pub use net::{ClientReplica, NodeListManager, PacketReader, PacketWriter, RoadMask};

// Re-export capability traits
pub use scene::{Collidable, Networked, Renderable, Transformable};
