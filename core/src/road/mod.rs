//! The MeshRoad object
//!
//! A [`MeshRoad`] owns the editable data (control nodes, profile,
//! generation parameters, transform) and the geometry derived from it.
//! Every editor operation marks the affected replication sections dirty
//! and rebuilds the geometry.
//!
//! Nodes and geometry live in road-local space; queries take and return
//! world-space values through the road transform.
//!
//! Regeneration is all-or-nothing: a new [`RoadGeometry`] is built from
//! scratch and swapped in only when every stage succeeded, so a failed
//! rebuild leaves the previous geometry in place.

mod fields;
mod update;

#[cfg(test)]
mod tests;

use glam::{Affine3A, Mat3, Vec2, Vec3};
use meshroad_shared::constants::{
    DEFAULT_BREAK_ANGLE, DEFAULT_TEXTURE_LENGTH, MAX_BREAK_ANGLE, MAX_WIDTH_SUBDIVISIONS,
    MIN_BREAK_ANGLE, MIN_TEXTURE_LENGTH, clamp_depth, clamp_width,
};
use meshroad_shared::{NodeRecord, Transform3x4};

use crate::bounds::Aabb;
use crate::collision::{self, CollisionMesh, RayHit, RoadConvex, Triangle};
use crate::config::{GeometryConfig, RoadConfig};
use crate::error::RoadError;
use crate::material::{MaterialSlot, RoadMaterials};
use crate::mesh::{GeometryBuffer, emit_buffers};
use crate::net::RoadMask;
use crate::profile::{Profile, ProfileNode, SegmentMaterial};
use crate::segment::{Segment, build_segments};
use crate::slice::{Slice, generate_slices, slice_bounds};
use crate::spline::RoadNode;

pub use fields::{FIELDS, FieldDescriptor};
pub use update::UpdateOutcome;

// ============================================================================
// Parameters
// ============================================================================

/// Per-road generation parameters
#[derive(Debug, Clone, PartialEq)]
pub struct RoadParams {
    pub materials: RoadMaterials,
    /// Meters per texture repeat along the road
    pub texture_length: f32,
    /// Degrees of turning before a new slice
    pub break_angle: f32,
    /// Extra vertex columns across the surface
    pub width_subdivisions: u32,
}

impl Default for RoadParams {
    fn default() -> Self {
        Self {
            materials: RoadMaterials::default(),
            texture_length: DEFAULT_TEXTURE_LENGTH,
            break_angle: DEFAULT_BREAK_ANGLE,
            width_subdivisions: 0,
        }
    }
}

impl RoadParams {
    pub fn from_config(config: &GeometryConfig) -> Self {
        Self {
            materials: RoadMaterials::default(),
            texture_length: config.texture_length,
            break_angle: config.break_angle,
            width_subdivisions: config.width_subdivisions,
        }
        .sanitized()
    }

    /// Clamp into engineering bounds; NaN falls back to the default
    pub fn sanitized(mut self) -> Self {
        self.texture_length = if self.texture_length.is_nan() {
            DEFAULT_TEXTURE_LENGTH
        } else {
            self.texture_length.max(MIN_TEXTURE_LENGTH)
        };
        self.break_angle = if self.break_angle.is_nan() {
            DEFAULT_BREAK_ANGLE
        } else {
            self.break_angle.clamp(MIN_BREAK_ANGLE, MAX_BREAK_ANGLE)
        };
        self.width_subdivisions = self.width_subdivisions.min(MAX_WIDTH_SUBDIVISIONS);
        self
    }
}

// ============================================================================
// Derived geometry
// ============================================================================

/// Everything rebuilt by [`MeshRoad::regenerate`], in road-local space
#[derive(Debug, Clone, PartialEq)]
pub struct RoadGeometry {
    pub slices: Vec<Slice>,
    pub segments: Vec<Segment>,
    /// Top, Bottom, Side
    pub buffers: [GeometryBuffer; 3],
    pub collision: CollisionMesh,
    pub bounds: Option<Aabb>,
}

impl Default for RoadGeometry {
    fn default() -> Self {
        Self {
            slices: Vec::new(),
            segments: Vec::new(),
            buffers: MaterialSlot::ALL.map(GeometryBuffer::new),
            collision: CollisionMesh::default(),
            bounds: None,
        }
    }
}

impl RoadGeometry {
    fn build(nodes: &[RoadNode], profile: &Profile, params: &RoadParams) -> Result<Self, RoadError> {
        let slices = generate_slices(nodes, profile, params.break_angle)?;
        let segments = build_segments(&slices);
        let buffers = emit_buffers(
            &slices,
            profile,
            params.width_subdivisions,
            params.texture_length,
        )?;
        let collision = CollisionMesh::build(&slices);
        let bounds = slice_bounds(&slices);

        Ok(Self {
            slices,
            segments,
            buffers,
            collision,
            bounds,
        })
    }

    pub fn buffer(&self, slot: MaterialSlot) -> &GeometryBuffer {
        &self.buffers[slot.index()]
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

// ============================================================================
// Transform helpers
// ============================================================================

pub(crate) fn affine_to_rows(t: &Affine3A) -> Transform3x4 {
    let m = t.matrix3;
    let p = t.translation;
    Transform3x4::from_rows(
        [m.x_axis.x, m.y_axis.x, m.z_axis.x, p.x],
        [m.x_axis.y, m.y_axis.y, m.z_axis.y, p.y],
        [m.x_axis.z, m.y_axis.z, m.z_axis.z, p.z],
    )
}

pub(crate) fn rows_to_affine(t: &Transform3x4) -> Affine3A {
    let [r0, r1, r2] = [t.row0, t.row1, t.row2];
    let matrix = Mat3::from_cols(
        Vec3::new(r0[0], r1[0], r2[0]),
        Vec3::new(r0[1], r1[1], r2[1]),
        Vec3::new(r0[2], r1[2], r2[2]),
    );
    Affine3A::from_mat3_translation(matrix, Vec3::new(r0[3], r1[3], r2[3]))
}

fn transform_aabb(t: &Affine3A, aabb: &Aabb) -> Aabb {
    let (lo, hi) = (aabb.min, aabb.max);
    let corners = (0..8).map(|i| {
        t.transform_point3(Vec3::new(
            if i & 1 == 0 { lo.x } else { hi.x },
            if i & 2 == 0 { lo.y } else { hi.y },
            if i & 4 == 0 { lo.z } else { hi.z },
        ))
    });
    Aabb::from_points(corners).unwrap_or(*aabb)
}

// ============================================================================
// MeshRoad
// ============================================================================

#[derive(Debug, Clone)]
pub struct MeshRoad {
    transform: Affine3A,
    world_to_local: Affine3A,
    params: RoadParams,
    nodes: Vec<RoadNode>,
    profile: Profile,
    geometry: RoadGeometry,
    dirty: RoadMask,
    peak_offset: f32,
    /// Width and depth given to nodes appended without one
    node_defaults: (f32, f32),
}

impl Default for MeshRoad {
    fn default() -> Self {
        Self::new(&RoadConfig::default())
    }
}

impl MeshRoad {
    /// Empty road with parameters seeded from `config`
    pub fn new(config: &RoadConfig) -> Self {
        Self {
            transform: Affine3A::IDENTITY,
            world_to_local: Affine3A::IDENTITY,
            params: RoadParams::from_config(&config.geometry),
            nodes: Vec::new(),
            profile: Profile::default(),
            geometry: RoadGeometry::default(),
            dirty: RoadMask::all(),
            peak_offset: config.geometry.collision_peak_offset,
            node_defaults: (
                clamp_width(config.geometry.node_width),
                clamp_depth(config.geometry.node_depth),
            ),
        }
    }

    /// Road through `nodes`, regenerated
    pub fn with_nodes(config: &RoadConfig, nodes: Vec<RoadNode>) -> Result<Self, RoadError> {
        let mut road = Self::new(config);
        road.nodes = nodes;
        road.regenerate()?;
        Ok(road)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn transform(&self) -> &Affine3A {
        &self.transform
    }

    pub fn params(&self) -> &RoadParams {
        &self.params
    }

    pub fn nodes(&self) -> &[RoadNode] {
        &self.nodes
    }

    pub fn node_records(&self) -> Vec<NodeRecord> {
        self.nodes.iter().map(RoadNode::to_record).collect()
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn geometry(&self) -> &RoadGeometry {
        &self.geometry
    }

    pub fn dirty(&self) -> RoadMask {
        self.dirty
    }

    pub fn clear_dirty(&mut self, mask: RoadMask) {
        self.dirty.remove(mask);
    }

    /// Bounds of the generated road in world space
    pub fn world_bounds(&self) -> Option<Aabb> {
        self.geometry
            .bounds
            .map(|b| transform_aabb(&self.transform, &b))
    }

    // ------------------------------------------------------------------
    // Regeneration
    // ------------------------------------------------------------------

    /// Rebuild every derived structure. On failure the previous geometry
    /// is kept and the error returned.
    pub fn regenerate(&mut self) -> Result<(), RoadError> {
        let geometry = RoadGeometry::build(&self.nodes, &self.profile, &self.params)?;

        tracing::debug!(
            nodes = self.nodes.len(),
            slices = geometry.slices.len(),
            segments = geometry.segments.len(),
            triangles = geometry.collision.triangle_count(),
            "regenerated road"
        );

        self.geometry = geometry;
        Ok(())
    }

    fn edited(&mut self, mask: RoadMask) -> Result<(), RoadError> {
        self.dirty |= mask | RoadMask::REGEN;
        self.regenerate()
    }

    fn check_node(&self, index: usize) -> Result<(), RoadError> {
        if index >= self.nodes.len() {
            return Err(RoadError::NodeIndex {
                index,
                len: self.nodes.len(),
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Node editing
    // ------------------------------------------------------------------

    /// Append a node; width and depth are clamped. Returns its index.
    pub fn add_node(
        &mut self,
        position: Vec3,
        width: f32,
        depth: f32,
        normal: Vec3,
    ) -> Result<usize, RoadError> {
        self.nodes.push(RoadNode::new(position, width, depth, normal));
        self.edited(RoadMask::NODE)?;
        Ok(self.nodes.len() - 1)
    }

    /// Append a Z-up node with the configured default width and depth
    pub fn append_node(&mut self, position: Vec3) -> Result<usize, RoadError> {
        let (width, depth) = self.node_defaults;
        self.add_node(position, width, depth, Vec3::Z)
    }

    /// Insert a node before `index` (`index == len` appends)
    pub fn insert_node(
        &mut self,
        index: usize,
        position: Vec3,
        width: f32,
        depth: f32,
        normal: Vec3,
    ) -> Result<(), RoadError> {
        if index > self.nodes.len() {
            return Err(RoadError::NodeIndex {
                index,
                len: self.nodes.len(),
            });
        }
        self.nodes
            .insert(index, RoadNode::new(position, width, depth, normal));
        self.edited(RoadMask::NODE)
    }

    pub fn delete_node(&mut self, index: usize) -> Result<RoadNode, RoadError> {
        self.check_node(index)?;
        let removed = self.nodes.remove(index);
        self.edited(RoadMask::NODE)?;
        Ok(removed)
    }

    pub fn set_node_position(&mut self, index: usize, position: Vec3) -> Result<(), RoadError> {
        self.check_node(index)?;
        self.nodes[index].position = position;
        self.edited(RoadMask::NODE)
    }

    pub fn set_node_width(&mut self, index: usize, width: f32) -> Result<(), RoadError> {
        self.check_node(index)?;
        self.nodes[index].width = clamp_width(width);
        self.edited(RoadMask::NODE)
    }

    pub fn set_node_depth(&mut self, index: usize, depth: f32) -> Result<(), RoadError> {
        self.check_node(index)?;
        self.nodes[index].depth = clamp_depth(depth);
        self.edited(RoadMask::NODE)
    }

    /// Set the surface up vector of a node; a zero vector resets it to +Z
    pub fn set_node_normal(&mut self, index: usize, normal: Vec3) -> Result<(), RoadError> {
        self.check_node(index)?;
        self.nodes[index].normal = normal.normalize_or(Vec3::Z);
        self.edited(RoadMask::NODE)
    }

    /// Replace the whole node list; every node is re-clamped
    pub fn set_nodes(&mut self, nodes: Vec<RoadNode>) -> Result<(), RoadError> {
        self.nodes = nodes
            .into_iter()
            .map(|n| RoadNode::new(n.position, n.width, n.depth, n.normal))
            .collect();
        self.edited(RoadMask::NODE)
    }

    // ------------------------------------------------------------------
    // Profile editing
    // ------------------------------------------------------------------

    pub fn set_profile(&mut self, profile: Profile) -> Result<(), RoadError> {
        self.profile = profile;
        self.edited(RoadMask::PROFILE)
    }

    pub fn add_profile_node(&mut self, position: Vec2) -> Result<usize, RoadError> {
        let index = self.profile.add_node(position)?;
        self.edited(RoadMask::PROFILE)?;
        Ok(index)
    }

    pub fn insert_profile_node(&mut self, index: usize, position: Vec2) -> Result<(), RoadError> {
        self.profile.insert_node(index, position)?;
        self.edited(RoadMask::PROFILE)
    }

    pub fn delete_profile_node(&mut self, index: usize) -> Result<ProfileNode, RoadError> {
        let removed = self.profile.delete_node(index)?;
        self.edited(RoadMask::PROFILE)?;
        Ok(removed)
    }

    pub fn set_profile_node_position(
        &mut self,
        index: usize,
        position: Vec2,
    ) -> Result<(), RoadError> {
        self.profile.set_node_position(index, position)?;
        self.edited(RoadMask::PROFILE)
    }

    pub fn set_profile_smooth(&mut self, index: usize, smooth: bool) -> Result<(), RoadError> {
        self.profile.set_smooth(index, smooth)?;
        self.edited(RoadMask::PROFILE)
    }

    pub fn set_profile_segment_material(
        &mut self,
        seg: usize,
        material: SegmentMaterial,
    ) -> Result<(), RoadError> {
        self.profile.set_segment_material(seg, material)?;
        self.edited(RoadMask::PROFILE)
    }

    // ------------------------------------------------------------------
    // Parameters and transform
    // ------------------------------------------------------------------

    pub fn set_params(&mut self, params: RoadParams) -> Result<(), RoadError> {
        self.params = params.sanitized();
        self.edited(RoadMask::MESH_ROAD)
    }

    pub fn set_material(&mut self, slot: MaterialSlot, name: impl Into<String>) {
        self.params.materials.set(slot, name);
        self.dirty |= RoadMask::MESH_ROAD;
    }

    /// Geometry is local, so moving the road needs no rebuild
    pub fn set_transform(&mut self, transform: Affine3A) {
        self.transform = transform;
        self.world_to_local = transform.inverse();
        self.dirty |= RoadMask::MESH_ROAD;
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    fn local_box(&self, world: &Aabb) -> Aabb {
        transform_aabb(&self.world_to_local, world)
    }

    fn normal_to_world(&self, n: Vec3) -> Vec3 {
        let m = Mat3::from(self.world_to_local.matrix3).transpose();
        (m * n).normalize_or(n)
    }

    fn triangle_to_world(&self, tri: &Triangle) -> Triangle {
        Triangle::new(
            self.transform.transform_point3(tri.a),
            self.transform.transform_point3(tri.b),
            self.transform.transform_point3(tri.c),
        )
    }

    /// Whether `point` lies inside any segment volume
    pub fn contains_point(&self, point: Vec3) -> bool {
        let local = self.world_to_local.transform_point3(point);
        self.geometry
            .segments
            .iter()
            .any(|seg| seg.contains_point(local))
    }

    /// Indices of the segments whose volume may overlap `query`
    pub fn segments_in_box(&self, query: &Aabb) -> Vec<usize> {
        let local = self.local_box(query);
        self.geometry
            .segments
            .iter()
            .filter(|seg| seg.bounds.overlaps(&local) && seg.intersects_box(&local))
            .map(|seg| seg.slice0)
            .collect()
    }

    /// Nearest hit along the world-space segment `start..end`
    pub fn cast_ray(&self, start: Vec3, end: Vec3) -> Option<RayHit> {
        let local_start = self.world_to_local.transform_point3(start);
        let local_end = self.world_to_local.transform_point3(end);
        let hit = collision::cast_ray(
            &self.geometry.slices,
            &self.geometry.segments,
            local_start,
            local_end,
        )?;
        Some(RayHit {
            point: start.lerp(end, hit.t),
            normal: self.normal_to_world(hit.normal),
            ..hit
        })
    }

    /// Editor pick against the driving surface; `t` is along `dir`
    pub fn pick_surface(&self, origin: Vec3, dir: Vec3) -> Option<RayHit> {
        let local_origin = self.world_to_local.transform_point3(origin);
        let local_dir = self.world_to_local.transform_vector3(dir);
        let hit = collision::pick_surface(&self.geometry.slices, local_origin, local_dir)?;
        Some(RayHit {
            point: origin + dir * hit.t,
            normal: self.normal_to_world(hit.normal),
            ..hit
        })
    }

    /// World-space convexes for the triangles overlapping `query`
    pub fn build_convex_list(&self, query: &Aabb) -> Vec<RoadConvex> {
        let local = self.local_box(query);
        collision::build_convex_list(
            &self.geometry.slices,
            &self.geometry.segments,
            &local,
            self.peak_offset,
        )
        .into_iter()
        .map(|c| RoadConvex {
            points: c.points.map(|p| self.transform.transform_point3(p)),
            normal: self.normal_to_world(c.normal),
            segment: c.segment,
        })
        .collect()
    }

    /// World-space triangles overlapping `query`
    pub fn build_poly_list(&self, query: &Aabb) -> Vec<Triangle> {
        let local = self.local_box(query);
        collision::build_poly_list(&self.geometry.slices, &self.geometry.segments, &local)
            .iter()
            .map(|tri| self.triangle_to_world(tri))
            .collect()
    }
}
