//! Collision geometry and ray queries
//!
//! Collision works on the same slices as rendering but ignores profile
//! material tags: every profile segment is solid. Each triangle can be
//! handed out as-is (poly list) or as a four-point convex whose fourth
//! point is pushed into the road along the face normal (convex list).

use glam::Vec3;
use smallvec::SmallVec;

use crate::bounds::Aabb;
use crate::segment::Segment;
use crate::slice::Slice;

/// Distance from a triangle centroid to its convex peak
pub const DEFAULT_PEAK_OFFSET: f32 = 0.5;

const DET_EPSILON: f32 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
}

impl Triangle {
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self { a, b, c }
    }

    /// Unit face normal, counter-clockwise
    pub fn normal(&self) -> Vec3 {
        (self.b - self.a).cross(self.c - self.a).normalize_or_zero()
    }

    pub fn centroid(&self) -> Vec3 {
        (self.a + self.b + self.c) / 3.0
    }

    pub fn bounds(&self) -> Aabb {
        let mut aabb = Aabb::from_point(self.a);
        aabb.extend(self.b);
        aabb.extend(self.c);
        aabb
    }

    /// Möller–Trumbore, two-sided. Returns `t >= 0` along `dir`.
    pub fn intersect_ray(&self, origin: Vec3, dir: Vec3) -> Option<f32> {
        let e1 = self.b - self.a;
        let e2 = self.c - self.a;
        let p = dir.cross(e2);
        let det = e1.dot(p);
        if det.abs() < DET_EPSILON {
            return None;
        }

        let inv = 1.0 / det;
        let s = origin - self.a;
        let u = s.dot(p) * inv;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(e1);
        let v = dir.dot(q) * inv;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = e2.dot(q) * inv;
        (t >= 0.0).then_some(t)
    }

    /// Intersection with the segment `start..end`, `t` in [0, 1]
    pub fn intersect_line(&self, start: Vec3, end: Vec3) -> Option<f32> {
        self.intersect_ray(start, end - start)
            .filter(|&t| t <= 1.0)
    }
}

type Triangles = SmallVec<[Triangle; 16]>;

/// Two triangles wound like the render strips: `a0, a1, b1` and `a0, b1, b0`
fn push_quad(out: &mut Triangles, a0: Vec3, a1: Vec3, b1: Vec3, b0: Vec3) {
    out.push(Triangle::new(a0, a1, b1));
    out.push(Triangle::new(a0, b1, b0));
}

fn push_cap(out: &mut Triangles, slice: &Slice, front: bool) {
    for k in 0..slice.left.len() - 1 {
        let (l0, l1) = (slice.left[k], slice.left[k + 1]);
        let (r0, r1) = (slice.right[k], slice.right[k + 1]);
        if front {
            push_quad(out, l0, l1, r1, r0);
        } else {
            push_quad(out, l0, r0, r1, l1);
        }
    }
}

/// Every solid triangle of the segment starting at slice `seg`.
///
/// Top surface, bottom, each profile segment on both edges, plus the front
/// cap on the first segment and the back cap on the last.
pub fn segment_triangles(slices: &[Slice], seg: usize) -> Triangles {
    let mut out = Triangles::new();
    let (s0, s1) = (&slices[seg], &slices[seg + 1]);

    push_quad(&mut out, s0.left[0], s0.right[0], s1.right[0], s1.left[0]);
    push_quad(&mut out, s0.pb2, s0.pb0, s1.pb0, s1.pb2);

    for k in 0..s0.left.len() - 1 {
        push_quad(&mut out, s0.left[k + 1], s0.left[k], s1.left[k], s1.left[k + 1]);
        push_quad(&mut out, s0.right[k], s0.right[k + 1], s1.right[k + 1], s1.right[k]);
    }

    if seg == 0 {
        push_cap(&mut out, s0, true);
    }
    if seg + 2 == slices.len() {
        push_cap(&mut out, s1, false);
    }

    out
}

/// Triangle plus an inner peak, usable as a support-mapped convex
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoadConvex {
    pub points: [Vec3; 4],
    pub normal: Vec3,
    pub segment: usize,
}

impl RoadConvex {
    pub fn from_triangle(tri: &Triangle, segment: usize, peak_offset: f32) -> Self {
        let normal = tri.normal();
        let peak = tri.centroid() - normal * peak_offset;
        Self {
            points: [tri.a, tri.b, tri.c, peak],
            normal,
            segment,
        }
    }

    /// Farthest point along `dir`
    pub fn support(&self, dir: Vec3) -> Vec3 {
        let mut best = self.points[0];
        let mut best_dot = best.dot(dir);
        for p in &self.points[1..] {
            let d = p.dot(dir);
            if d > best_dot {
                best = *p;
                best_dot = d;
            }
        }
        best
    }

    pub fn bounds(&self) -> Aabb {
        let mut aabb = Aabb::from_point(self.points[0]);
        for p in &self.points[1..] {
            aabb.extend(*p);
        }
        aabb
    }
}

/// Segments whose planes admit `query`
fn segments_touching<'a>(
    segments: &'a [Segment],
    query: &'a Aabb,
) -> impl Iterator<Item = &'a Segment> + 'a {
    segments
        .iter()
        .filter(move |seg| seg.bounds.overlaps(query) && seg.intersects_box(query))
}

/// Convexes for every triangle overlapping `query`
pub fn build_convex_list(
    slices: &[Slice],
    segments: &[Segment],
    query: &Aabb,
    peak_offset: f32,
) -> Vec<RoadConvex> {
    let mut out = Vec::new();
    for seg in segments_touching(segments, query) {
        for tri in segment_triangles(slices, seg.slice0) {
            if tri.bounds().overlaps(query) {
                out.push(RoadConvex::from_triangle(&tri, seg.slice0, peak_offset));
            }
        }
    }
    out
}

/// Raw triangles overlapping `query`
pub fn build_poly_list(slices: &[Slice], segments: &[Segment], query: &Aabb) -> Vec<Triangle> {
    let mut out = Vec::new();
    for seg in segments_touching(segments, query) {
        out.extend(
            segment_triangles(slices, seg.slice0)
                .into_iter()
                .filter(|tri| tri.bounds().overlaps(query)),
        );
    }
    out
}

/// Unshared triangle soup for a physics world
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollisionMesh {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
    /// Owning segment per triangle
    pub segments: Vec<u32>,
}

impl CollisionMesh {
    pub fn build(slices: &[Slice]) -> Self {
        let mut mesh = Self::default();
        for seg in 0..slices.len().saturating_sub(1) {
            for tri in segment_triangles(slices, seg) {
                let base = mesh.vertices.len() as u32;
                mesh.vertices.extend([tri.a, tri.b, tri.c]);
                mesh.triangles.push([base, base + 1, base + 2]);
                mesh.segments.push(seg as u32);
            }
        }
        mesh
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn triangle(&self, index: usize) -> Triangle {
        let [a, b, c] = self.triangles[index];
        Triangle::new(
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Parameter along `start..end`
    pub t: f32,
    pub point: Vec3,
    pub normal: Vec3,
    pub segment: usize,
}

/// Nearest hit along `start..end` with `t` in [0, 1).
///
/// Segments are filtered by their bounds and visited nearest entry first;
/// the walk stops once a segment's entry lies beyond the best hit.
pub fn cast_ray(slices: &[Slice], segments: &[Segment], start: Vec3, end: Vec3) -> Option<RayHit> {
    let mut candidates: SmallVec<[(f32, usize); 32]> = segments
        .iter()
        .filter_map(|seg| seg.bounds.intersect_line(start, end).map(|t| (t, seg.slice0)))
        .collect();
    candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut best: Option<RayHit> = None;
    for (entry, seg) in candidates {
        if best.is_some_and(|hit| entry > hit.t) {
            break;
        }

        for tri in segment_triangles(slices, seg) {
            let Some(t) = tri.intersect_line(start, end) else {
                continue;
            };
            if t >= 1.0 || best.is_some_and(|hit| hit.t <= t) {
                continue;
            }
            best = Some(RayHit {
                t,
                point: start.lerp(end, t),
                normal: tri.normal(),
                segment: seg,
            });
        }
    }
    best
}

/// Ray against a planar quad given in winding order. Returns `t >= 0`.
pub fn intersect_ray_quad(origin: Vec3, dir: Vec3, quad: &[Vec3; 4]) -> Option<f32> {
    let first = Triangle::new(quad[0], quad[1], quad[2]).intersect_ray(origin, dir);
    let second = Triangle::new(quad[0], quad[2], quad[3]).intersect_ray(origin, dir);
    match (first, second) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Editor picking against the driving surface only
pub fn pick_surface(slices: &[Slice], origin: Vec3, dir: Vec3) -> Option<RayHit> {
    let mut best: Option<RayHit> = None;
    for (seg, pair) in slices.windows(2).enumerate() {
        let (s0, s1) = (&pair[0], &pair[1]);
        let quad = [s0.left[0], s0.right[0], s1.right[0], s1.left[0]];
        let Some(t) = intersect_ray_quad(origin, dir, &quad) else {
            continue;
        };
        if best.is_some_and(|hit| hit.t <= t) {
            continue;
        }
        best = Some(RayHit {
            t,
            point: origin + dir * t,
            normal: (s0.uvec + s1.uvec).normalize_or(s0.uvec),
            segment: seg,
        });
    }
    best
}
