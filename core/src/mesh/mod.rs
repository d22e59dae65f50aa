//! Road mesh buffers
//!
//! The road is emitted into three vertex/index buffers, one per material
//! slot:
//!
//! - Top: the driving surface (with optional width subdivisions) plus
//!   profile segments tagged `Top`
//! - Bottom: the underside between the profile bottoms plus profile
//!   segments tagged `Bottom`
//! - Side: profile segments tagged `Side` plus the front and back caps
//!
//! Vertex and triangle counts are known analytically before emission and
//! checked against what was written.

mod emit;


use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

use crate::material::MaterialSlot;
use crate::profile::Profile;

pub use emit::emit_buffers;

/// Packed road vertex (44 bytes)
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct RoadVertex {
    pub position: Vec3,
    pub normal: Vec3,
    /// Slice forward vector
    pub tangent: Vec3,
    pub uv: Vec2,
}

/// Vertex and triangle count of one buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MeshCounts {
    pub verts: usize,
    pub tris: usize,
}

impl MeshCounts {
    #[inline]
    pub fn indices(&self) -> usize {
        self.tris * 3
    }
}

/// Analytic counts for all three buffers
pub struct BufferCounts;

impl BufferCounts {
    /// Counts in slot order (Top, Bottom, Side)
    pub fn compute(num_slices: usize, width_subdivisions: u32, profile: &Profile) -> [MeshCounts; 3] {
        if num_slices < 2 {
            return [MeshCounts::default(); 3];
        }

        let slices = num_slices;
        let segs = num_slices - 1;
        let wsub = width_subdivisions as usize;
        let tagged = profile.count_by_material();
        let profile_nodes = profile.node_count();

        // Each tagged profile segment is two strips (left and right edge),
        // two vertices wide, one quad per road segment.
        let top = MeshCounts {
            verts: slices * (2 + wsub) + slices * 4 * tagged.top,
            tris: segs * 2 * (wsub + 1) + segs * 4 * tagged.top,
        };
        let bottom = MeshCounts {
            verts: slices * 2 + slices * 4 * tagged.bottom,
            tris: segs * 2 + segs * 4 * tagged.bottom,
        };
        let side = MeshCounts {
            verts: slices * 4 * tagged.side + 4 * profile_nodes,
            tris: segs * 4 * tagged.side + 4 * (profile_nodes - 1),
        };

        [top, bottom, side]
    }
}

/// One material buffer
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryBuffer {
    pub slot: MaterialSlot,
    pub vertices: Vec<RoadVertex>,
    pub indices: Vec<u32>,
}

impl GeometryBuffer {
    pub fn new(slot: MaterialSlot) -> Self {
        Self {
            slot,
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Vertex data ready for upload
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Index data ready for upload
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Iterate triangles as vertex triples
    pub fn triangles(&self) -> impl Iterator<Item = [&RoadVertex; 3]> + '_ {
        self.indices.chunks_exact(3).map(|tri| {
            [
                &self.vertices[tri[0] as usize],
                &self.vertices[tri[1] as usize],
                &self.vertices[tri[2] as usize],
            ]
        })
    }
}
