//! Segments: the road strip between two adjacent slices
//!
//! Each segment keeps six inward-facing half-space planes that enclose
//! both slice rings. The plane normals come from the averaged slice frame;
//! the offsets are pushed out to the farthest corner, so the volume is a
//! conservative hexahedron around the segment.

use glam::Vec3;

use crate::bounds::Aabb;
use crate::slice::Slice;

/// Tolerance for point containment
const CONTAINS_EPSILON: f32 = 1e-4;

/// Half-space `normal · p + d >= 0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub d: f32,
}

impl Plane {
    /// Plane with `normal` through the point of `points` lowest along it,
    /// leaving every point on the non-negative side
    fn enclosing(normal: Vec3, points: &[Vec3]) -> Self {
        let min = points
            .iter()
            .map(|p| normal.dot(*p))
            .fold(f32::INFINITY, f32::min);
        Self { normal, d: -min }
    }

    #[inline]
    pub fn distance(&self, p: Vec3) -> f32 {
        self.normal.dot(p) + self.d
    }
}

/// Plane order in [`Segment::planes`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentPlane {
    Left = 0,
    Right = 1,
    Near = 2,
    Far = 3,
    Top = 4,
    Bottom = 5,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Index of the first slice; the second is `slice0 + 1`
    pub slice0: usize,
    pub planes: [Plane; 6],
    pub bounds: Aabb,
}

impl Segment {
    pub fn new(slice0: usize, s0: &Slice, s1: &Slice) -> Self {
        let corners: Vec<Vec3> = s0.ring().chain(s1.ring()).collect();

        let right = (s0.rvec + s1.rvec).normalize_or(s0.rvec);
        let up = (s0.uvec + s1.uvec).normalize_or(s0.uvec);

        let planes = [
            Plane::enclosing(right, &corners),
            Plane::enclosing(-right, &corners),
            Plane::enclosing(s0.fvec, &corners),
            Plane::enclosing(-s1.fvec, &corners),
            Plane::enclosing(-up, &corners),
            Plane::enclosing(up, &corners),
        ];

        // The ring is never empty: a profile has at least two nodes
        let bounds = Aabb::from_points(corners.iter().copied())
            .unwrap_or_else(|| Aabb::from_point(s0.p1));

        Self {
            slice0,
            planes,
            bounds,
        }
    }

    #[inline]
    pub fn slice1(&self) -> usize {
        self.slice0 + 1
    }

    #[inline]
    pub fn plane(&self, which: SegmentPlane) -> &Plane {
        &self.planes[which as usize]
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.distance(p) >= -CONTAINS_EPSILON)
    }

    /// Conservative box test: rejects as soon as the box corner farthest
    /// along a plane normal is still behind that plane
    pub fn intersects_box(&self, aabb: &Aabb) -> bool {
        for plane in &self.planes {
            let n = plane.normal;
            let x = if n.x >= 0.0 { aabb.max.x } else { aabb.min.x };
            let y = if n.y >= 0.0 { aabb.max.y } else { aabb.min.y };
            let z = if n.z >= 0.0 { aabb.max.z } else { aabb.min.z };
            if n.x * x + n.y * y + n.z * z + plane.d < 0.0 {
                return false;
            }
        }
        true
    }
}

/// One segment per adjacent slice pair
pub fn build_segments(slices: &[Slice]) -> Vec<Segment> {
    slices
        .windows(2)
        .enumerate()
        .map(|(i, pair)| Segment::new(i, &pair[0], &pair[1]))
        .collect()
}
