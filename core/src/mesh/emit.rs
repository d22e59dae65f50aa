//! Vertex and index emission
//!
//! Every surface is written as a strip: `cols` vertices per slice, one
//! quad between matching columns of adjacent slices. A quad is wound
//! `a0, a1, b1, b0` so its face normal is `(a1 - a0) × forward`; strips
//! order their columns so that normal points out of the road.

use glam::Vec2;

use super::{BufferCounts, GeometryBuffer, MeshCounts, RoadVertex};
use crate::error::RoadError;
use crate::material::MaterialSlot;
use crate::profile::{Profile, SegmentMaterial};
use crate::slice::Slice;

const LEFT: f32 = -1.0;
const RIGHT: f32 = 1.0;

struct BufferWriter {
    buffer: GeometryBuffer,
}

impl BufferWriter {
    fn new(slot: MaterialSlot, counts: MeshCounts) -> Self {
        let mut buffer = GeometryBuffer::new(slot);
        buffer.vertices.reserve(counts.verts);
        buffer.indices.reserve(counts.indices());
        Self { buffer }
    }

    #[inline]
    fn base(&self) -> u32 {
        self.buffer.vertices.len() as u32
    }

    #[inline]
    fn quad(&mut self, a: u32, b: u32, c: u32, d: u32) {
        self.buffer.indices.extend_from_slice(&[a, b, c, a, c, d]);
    }

    /// `cols` vertices per slice, quads between adjacent slices
    fn strip(
        &mut self,
        slices: &[Slice],
        cols: usize,
        mut vertex: impl FnMut(&Slice, usize) -> RoadVertex,
    ) {
        let base = self.base();
        for slice in slices {
            for c in 0..cols {
                self.buffer.vertices.push(vertex(slice, c));
            }
        }

        let cols = cols as u32;
        for k in 0..slices.len() as u32 - 1 {
            for c in 0..cols - 1 {
                let a0 = base + k * cols + c;
                let b0 = a0 + cols;
                self.quad(a0, a0 + 1, b0 + 1, b0);
            }
        }
    }

    /// Strip along one edge for profile segment `seg`
    fn profile_strip(
        &mut self,
        slices: &[Slice],
        profile: &Profile,
        seg: usize,
        side: f32,
        texture_length: f32,
    ) {
        // Right edge walks the profile forward, left edge backward
        let nodes = if side > 0.0 { [seg, seg + 1] } else { [seg + 1, seg] };

        self.strip(slices, 2, |s, c| {
            let node = nodes[c];
            let end = node - seg;
            let position = if side > 0.0 { s.right[node] } else { s.left[node] };
            RoadVertex {
                position,
                normal: s.profile_normal(profile.vertex_normal(seg, end), side),
                tangent: s.fvec,
                uv: Vec2::new(
                    profile.length_at(node) / texture_length,
                    s.distance / texture_length,
                ),
            }
        });
    }

    fn tagged_profile_strips(
        &mut self,
        slices: &[Slice],
        profile: &Profile,
        material: SegmentMaterial,
        texture_length: f32,
    ) {
        for seg in 0..profile.segment_count() {
            if profile.segment_material(seg) != material {
                continue;
            }
            self.profile_strip(slices, profile, seg, LEFT, texture_length);
            self.profile_strip(slices, profile, seg, RIGHT, texture_length);
        }
    }

    /// Cap across the cross-section of `slice`, laddered between the left
    /// and right edges. Faces point outward while the profile descends.
    fn cap(&mut self, slice: &Slice, front: bool, texture_length: f32) {
        let n = slice.left.len() as u32;
        let base = self.base();
        let normal = if front { -slice.fvec } else { slice.fvec };

        for p in slice.left.iter().chain(slice.right.iter()) {
            let local = *p - slice.p1;
            self.buffer.vertices.push(RoadVertex {
                position: *p,
                normal,
                tangent: slice.rvec,
                uv: Vec2::new(
                    local.dot(slice.rvec) / texture_length,
                    local.dot(slice.uvec) / texture_length,
                ),
            });
        }

        for k in 0..n - 1 {
            let l0 = base + k;
            let l1 = l0 + 1;
            let r0 = base + n + k;
            let r1 = r0 + 1;
            if front {
                self.quad(l0, l1, r1, r0);
            } else {
                self.quad(l0, r0, r1, l1);
            }
        }
    }

    fn finish(self, expected: MeshCounts) -> Result<GeometryBuffer, RoadError> {
        let buffer = self.buffer;
        let verts = buffer.vertices.len();
        let indices = buffer.indices.len();

        if verts != expected.verts || indices != expected.indices() {
            return Err(RoadError::BufferCountMismatch {
                slot: buffer.slot,
                expected_verts: expected.verts,
                expected_indices: expected.indices(),
                verts,
                indices,
            });
        }

        if let Some(&index) = buffer.indices.iter().max() {
            if index as usize >= verts {
                return Err(RoadError::IndexOutOfRange {
                    slot: buffer.slot,
                    index,
                    verts,
                });
            }
        }

        Ok(buffer)
    }
}

/// Emit the Top, Bottom and Side buffers for a slice list.
///
/// Fewer than two slices yield three empty buffers.
pub fn emit_buffers(
    slices: &[Slice],
    profile: &Profile,
    width_subdivisions: u32,
    texture_length: f32,
) -> Result<[GeometryBuffer; 3], RoadError> {
    if slices.len() < 2 {
        return Ok(MaterialSlot::ALL.map(GeometryBuffer::new));
    }

    let [top_counts, bottom_counts, side_counts] =
        BufferCounts::compute(slices.len(), width_subdivisions, profile);

    // Top: surface from the left profile start to the right profile start
    let mut top = BufferWriter::new(MaterialSlot::Top, top_counts);
    let cols = 2 + width_subdivisions as usize;
    let last_col = (cols - 1) as f32;
    top.strip(slices, cols, |s, c| {
        let frac = c as f32 / last_col;
        let span = s.left[0].distance(s.right[0]);
        RoadVertex {
            position: s.left[0].lerp(s.right[0], frac),
            normal: s.uvec,
            tangent: s.fvec,
            uv: Vec2::new(frac * span / texture_length, s.distance / texture_length),
        }
    });
    top.tagged_profile_strips(slices, profile, SegmentMaterial::Top, texture_length);

    // Bottom: right to left so the face looks down
    let mut bottom = BufferWriter::new(MaterialSlot::Bottom, bottom_counts);
    bottom.strip(slices, 2, |s, c| {
        let span = s.pb0.distance(s.pb2);
        RoadVertex {
            position: if c == 0 { s.pb2 } else { s.pb0 },
            normal: -s.uvec,
            tangent: s.fvec,
            uv: Vec2::new(c as f32 * span / texture_length, s.distance / texture_length),
        }
    });
    bottom.tagged_profile_strips(slices, profile, SegmentMaterial::Bottom, texture_length);

    let mut side = BufferWriter::new(MaterialSlot::Side, side_counts);
    side.tagged_profile_strips(slices, profile, SegmentMaterial::Side, texture_length);
    side.cap(&slices[0], true, texture_length);
    side.cap(&slices[slices.len() - 1], false, texture_length);

    let buffers = [
        top.finish(top_counts)?,
        bottom.finish(bottom_counts)?,
        side.finish(side_counts)?,
    ];

    tracing::debug!(
        top_verts = buffers[0].vertices.len(),
        bottom_verts = buffers[1].vertices.len(),
        side_verts = buffers[2].vertices.len(),
        "emitted road buffers"
    );

    Ok(buffers)
}
