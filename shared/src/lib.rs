//! Shared types for MeshRoad procedural roads.
//!
//! Everything here is plain data: engineering constants, the POD records
//! exchanged between an authoritative road and its replicas, connection
//! identifiers, and the persisted text-field format.
//!
//! # Modules
//!
//! - [`constants`] - Engineering bounds and wire sizes
//! - [`records`] - `NodeRecord` / `ProfileNodeRecord` exchange types
//! - [`math`] - POD affine transform
//! - [`ids`] - Node list and ghost identifiers
//! - [`fields`] - `Node = "...";` style persisted fields

pub mod constants;
pub mod fields;
pub mod ids;
pub mod math;
pub mod records;

pub use ids::{GhostId, NodeListId};
pub use math::Transform3x4;
pub use records::{NodeRecord, ProfileNodeRecord};
