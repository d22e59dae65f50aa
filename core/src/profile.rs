//! Cross-section profile
//!
//! A profile is a 2D polyline swept along both edges of the road. Profile
//! space has `x` pointing outward from the road edge and `y` pointing up;
//! the first node sits on the road surface edge. Each segment between two
//! nodes carries a material tag choosing the buffer it is emitted into.
//!
//! Face normals and cumulative lengths are derived data, regenerated after
//! every edit.

use glam::Vec2;
use meshroad_shared::ProfileNodeRecord;
use meshroad_shared::constants::MAX_PROFILE_NODES;

use crate::error::RoadError;
use crate::material::MaterialSlot;

/// Buffer a profile segment is emitted into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum SegmentMaterial {
    #[default]
    Side = 0,
    Top = 1,
    Bottom = 2,
}

impl SegmentMaterial {
    /// Decode a wire/persisted tag
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Side),
            1 => Some(Self::Top),
            2 => Some(Self::Bottom),
            _ => None,
        }
    }

    #[inline]
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn slot(self) -> MaterialSlot {
        match self {
            Self::Side => MaterialSlot::Side,
            Self::Top => MaterialSlot::Top,
            Self::Bottom => MaterialSlot::Bottom,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileNode {
    pub position: Vec2,
    pub smooth: bool,
    /// Tag of the segment ending at this node; ignored on the first node
    pub material: SegmentMaterial,
}

impl ProfileNode {
    pub fn new(position: Vec2, smooth: bool, material: SegmentMaterial) -> Self {
        Self {
            position,
            smooth,
            material,
        }
    }
}

/// Number of profile segments tagged with each material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaterialCounts {
    pub side: usize,
    pub top: usize,
    pub bottom: usize,
}

impl MaterialCounts {
    pub fn get(&self, material: SegmentMaterial) -> usize {
        match material {
            SegmentMaterial::Side => self.side,
            SegmentMaterial::Top => self.top,
            SegmentMaterial::Bottom => self.bottom,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    nodes: Vec<ProfileNode>,
    face_normals: Vec<Vec2>,
    /// Per segment: normal at its start node and at its end node
    vertex_normals: Vec<[Vec2; 2]>,
    /// Per node: profile arc length from the first node
    lengths: Vec<f32>,
}

impl Default for Profile {
    /// Vertical wall from the road edge down 5 meters
    fn default() -> Self {
        let nodes = vec![
            ProfileNode::new(Vec2::ZERO, false, SegmentMaterial::Side),
            ProfileNode::new(Vec2::new(0.0, -5.0), false, SegmentMaterial::Side),
        ];
        let mut profile = Self {
            nodes,
            face_normals: Vec::new(),
            vertex_normals: Vec::new(),
            lengths: Vec::new(),
        };
        profile.regenerate();
        profile
    }
}

impl Profile {
    pub fn new(nodes: Vec<ProfileNode>) -> Result<Self, RoadError> {
        if nodes.len() < 2 {
            return Err(RoadError::ProfileTooShort);
        }
        if nodes.len() > MAX_PROFILE_NODES {
            return Err(RoadError::ProfileTooLong(nodes.len()));
        }
        let mut profile = Self {
            nodes,
            face_normals: Vec::new(),
            vertex_normals: Vec::new(),
            lengths: Vec::new(),
        };
        profile.regenerate();
        Ok(profile)
    }

    /// Build from exchange records. Unknown tags fall back to `Side`.
    pub fn from_records(records: &[ProfileNodeRecord]) -> Result<Self, RoadError> {
        let nodes = records
            .iter()
            .enumerate()
            .map(|(i, rec)| {
                let material = SegmentMaterial::from_tag(rec.material).unwrap_or_else(|| {
                    if i > 0 {
                        tracing::warn!(node = i, tag = rec.material, "unknown profile material tag");
                    }
                    SegmentMaterial::Side
                });
                ProfileNode::new(Vec2::from(rec.position), rec.smooth, material)
            })
            .collect();
        Self::new(nodes)
    }

    pub fn to_records(&self) -> Vec<ProfileNodeRecord> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| {
                let tag = if i == 0 { 0 } else { node.material.tag() };
                ProfileNodeRecord::new(node.position.to_array(), node.smooth, tag)
            })
            .collect()
    }

    #[inline]
    pub fn nodes(&self) -> &[ProfileNode] {
        &self.nodes
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn segment_count(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Material of the segment from node `seg` to node `seg + 1`
    #[inline]
    pub fn segment_material(&self, seg: usize) -> SegmentMaterial {
        self.nodes[seg + 1].material
    }

    pub fn count_by_material(&self) -> MaterialCounts {
        let mut counts = MaterialCounts::default();
        for seg in 0..self.segment_count() {
            match self.segment_material(seg) {
                SegmentMaterial::Side => counts.side += 1,
                SegmentMaterial::Top => counts.top += 1,
                SegmentMaterial::Bottom => counts.bottom += 1,
            }
        }
        counts
    }

    #[inline]
    pub fn face_normal(&self, seg: usize) -> Vec2 {
        self.face_normals[seg]
    }

    /// Shading normal of segment `seg` at its start (`end == 0`) or end (`end == 1`)
    #[inline]
    pub fn vertex_normal(&self, seg: usize, end: usize) -> Vec2 {
        self.vertex_normals[seg][end]
    }

    /// Profile arc length from the first node to `node`
    #[inline]
    pub fn length_at(&self, node: usize) -> f32 {
        self.lengths[node]
    }

    pub fn total_length(&self) -> f32 {
        self.lengths.last().copied().unwrap_or(0.0)
    }

    /// How far the profile reaches below the road surface (never negative)
    pub fn depth(&self) -> f32 {
        let min_y = self
            .nodes
            .iter()
            .map(|n| n.position.y)
            .fold(f32::INFINITY, f32::min);
        (-min_y).max(0.0)
    }

    /// Vertical scale placing the profile's lowest point at `road_depth`
    pub fn vertical_scale(&self, road_depth: f32) -> f32 {
        let depth = self.depth();
        if depth > 1e-6 { road_depth / depth } else { 1.0 }
    }

    // ------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------

    /// Append a node; the new segment is tagged `Side`
    pub fn add_node(&mut self, position: Vec2) -> Result<usize, RoadError> {
        if self.nodes.len() >= MAX_PROFILE_NODES {
            return Err(RoadError::ProfileTooLong(self.nodes.len() + 1));
        }
        self.nodes
            .push(ProfileNode::new(position, false, SegmentMaterial::Side));
        self.regenerate();
        Ok(self.nodes.len() - 1)
    }

    /// Insert a node before `index`. The new node inherits the material of
    /// the segment it splits so both halves keep the same tag.
    pub fn insert_node(&mut self, index: usize, position: Vec2) -> Result<(), RoadError> {
        if index > self.nodes.len() {
            return Err(RoadError::NodeIndex {
                index,
                len: self.nodes.len(),
            });
        }
        if self.nodes.len() >= MAX_PROFILE_NODES {
            return Err(RoadError::ProfileTooLong(self.nodes.len() + 1));
        }
        let material = self
            .nodes
            .get(index)
            .filter(|_| index > 0)
            .map(|n| n.material)
            .unwrap_or_default();
        self.nodes
            .insert(index, ProfileNode::new(position, false, material));
        self.regenerate();
        Ok(())
    }

    pub fn delete_node(&mut self, index: usize) -> Result<ProfileNode, RoadError> {
        self.check_index(index)?;
        if self.nodes.len() <= 2 {
            return Err(RoadError::ProfileTooShort);
        }
        let removed = self.nodes.remove(index);
        self.regenerate();
        Ok(removed)
    }

    pub fn set_node_position(&mut self, index: usize, position: Vec2) -> Result<(), RoadError> {
        self.check_index(index)?;
        self.nodes[index].position = position;
        self.regenerate();
        Ok(())
    }

    pub fn set_smooth(&mut self, index: usize, smooth: bool) -> Result<(), RoadError> {
        self.check_index(index)?;
        self.nodes[index].smooth = smooth;
        self.regenerate();
        Ok(())
    }

    pub fn set_segment_material(
        &mut self,
        seg: usize,
        material: SegmentMaterial,
    ) -> Result<(), RoadError> {
        if seg >= self.segment_count() {
            return Err(RoadError::NodeIndex {
                index: seg,
                len: self.segment_count(),
            });
        }
        self.nodes[seg + 1].material = material;
        self.regenerate();
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<(), RoadError> {
        if index >= self.nodes.len() {
            return Err(RoadError::NodeIndex {
                index,
                len: self.nodes.len(),
            });
        }
        Ok(())
    }

    /// Recompute face normals, shading normals and cumulative lengths
    fn regenerate(&mut self) {
        let seg_count = self.segment_count();

        self.face_normals.clear();
        let mut fallback = Vec2::X;
        for seg in 0..seg_count {
            let d = self.nodes[seg + 1].position - self.nodes[seg].position;
            let n = Vec2::new(-d.y, d.x).normalize_or(fallback);
            self.face_normals.push(n);
            fallback = n;
        }

        self.vertex_normals.clear();
        let last_node = self.nodes.len() - 1;
        for seg in 0..seg_count {
            let face = self.face_normals[seg];

            let start = if seg > 0 && self.nodes[seg].smooth {
                (self.face_normals[seg - 1] + face).normalize_or(face)
            } else {
                face
            };

            let end = if seg + 1 < last_node && self.nodes[seg + 1].smooth {
                (face + self.face_normals[seg + 1]).normalize_or(face)
            } else {
                face
            };

            self.vertex_normals.push([start, end]);
        }

        self.lengths.clear();
        let mut total = 0.0;
        self.lengths.push(0.0);
        for seg in 0..seg_count {
            total += self.nodes[seg].position.distance(self.nodes[seg + 1].position);
            self.lengths.push(total);
        }
    }
}
