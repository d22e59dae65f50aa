//! Road control nodes and the spline through them
//!
//! The spline is a centripetal Catmull-Rom curve: knot spacing is the
//! square root of the chord length, which keeps it from looping or
//! cusping on uneven node spacing. Width, depth and the up normal are
//! interpolated with the same coefficients as the position.

use std::ops::{Add, Mul, Sub};

use glam::Vec3;
use meshroad_shared::NodeRecord;
use meshroad_shared::constants::{clamp_depth, clamp_width};

/// Chord steps used to approximate the arc length of one spline segment
const ARC_LENGTH_STEPS: usize = 32;

/// One editable road control node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoadNode {
    pub position: Vec3,
    pub width: f32,
    pub depth: f32,
    /// Up vector of the road surface
    pub normal: Vec3,
}

impl RoadNode {
    /// Create a node, clamping width/depth and normalizing the normal
    pub fn new(position: Vec3, width: f32, depth: f32, normal: Vec3) -> Self {
        Self {
            position,
            width: clamp_width(width),
            depth: clamp_depth(depth),
            normal: normal.normalize_or(Vec3::Z),
        }
    }

    /// Node with a Z-up surface
    pub fn flat(position: Vec3, width: f32, depth: f32) -> Self {
        Self::new(position, width, depth, Vec3::Z)
    }

    pub fn from_record(rec: &NodeRecord) -> Self {
        Self::new(
            Vec3::from(rec.position),
            rec.width,
            rec.depth,
            Vec3::from(rec.normal),
        )
    }

    pub fn to_record(&self) -> NodeRecord {
        NodeRecord::new(
            self.position.to_array(),
            self.width,
            self.depth,
            self.normal.to_array(),
        )
    }

    /// Like [`RoadNode::from_record`] but keeps values bit-for-bit.
    ///
    /// Used for replicated lists, which were clamped by the sender.
    pub fn from_record_exact(rec: &NodeRecord) -> Self {
        Self {
            position: Vec3::from(rec.position),
            width: rec.width,
            depth: rec.depth,
            normal: Vec3::from(rec.normal),
        }
    }
}

/// Cubic coefficients `c0 + c1 t + c2 t² + c3 t³`
#[derive(Debug, Clone, Copy)]
struct Cubic<T> {
    c: [T; 4],
}

impl<T> Cubic<T>
where
    T: Copy + Add<Output = T> + Sub<Output = T> + Mul<f32, Output = T>,
{
    /// Non-uniform Catmull-Rom between `x1` and `x2` with knot spacings `dt`
    fn catmull(x: [T; 4], dt: [f32; 3]) -> Self {
        let [x0, x1, x2, x3] = x;
        let [dt0, dt1, dt2] = dt;

        // Tangents in [t1, t2] parameterization, rescaled to [0, 1]
        let m1 = ((x1 - x0) * (1.0 / dt0) - (x2 - x0) * (1.0 / (dt0 + dt1))
            + (x2 - x1) * (1.0 / dt1))
            * dt1;
        let m2 = ((x2 - x1) * (1.0 / dt1) - (x3 - x1) * (1.0 / (dt1 + dt2))
            + (x3 - x2) * (1.0 / dt2))
            * dt1;

        let c0 = x1;
        let c1 = m1;
        let c2 = x1 * -3.0 + x2 * 3.0 - m1 * 2.0 - m2;
        let c3 = x1 * 2.0 - x2 * 2.0 + m1 + m2;
        Self {
            c: [c0, c1, c2, c3],
        }
    }

    #[inline]
    fn eval(&self, t: f32) -> T {
        let [c0, c1, c2, c3] = self.c;
        ((c3 * t + c2) * t + c1) * t + c0
    }
}

#[derive(Debug, Clone)]
struct SplineSegment {
    position: Cubic<Vec3>,
    width: Cubic<f32>,
    depth: Cubic<f32>,
    normal: Cubic<Vec3>,
}

/// Spline through an ordered node list
#[derive(Debug, Clone)]
pub struct RoadSpline {
    nodes: Vec<RoadNode>,
    segments: Vec<SplineSegment>,
}

fn mirror(a: RoadNode, b: RoadNode) -> RoadNode {
    RoadNode {
        position: a.position * 2.0 - b.position,
        width: a.width * 2.0 - b.width,
        depth: a.depth * 2.0 - b.depth,
        normal: a.normal * 2.0 - b.normal,
    }
}

impl RoadSpline {
    /// Fewer than two nodes produce a spline with no segments
    pub fn new(nodes: &[RoadNode]) -> Self {
        let mut segments = Vec::new();
        if nodes.len() >= 2 {
            let last = nodes.len() - 1;
            for i in 0..last {
                let n1 = nodes[i];
                let n2 = nodes[i + 1];
                let n0 = if i == 0 { mirror(n1, n2) } else { nodes[i - 1] };
                let n3 = if i + 1 == last {
                    mirror(n2, n1)
                } else {
                    nodes[i + 2]
                };
                segments.push(Self::build_segment([n0, n1, n2, n3]));
            }
        }
        Self {
            nodes: nodes.to_vec(),
            segments,
        }
    }

    fn build_segment(n: [RoadNode; 4]) -> SplineSegment {
        let mut dt0 = n[0].position.distance(n[1].position).sqrt();
        let mut dt1 = n[1].position.distance(n[2].position).sqrt();
        let mut dt2 = n[2].position.distance(n[3].position).sqrt();

        // Repeated control points
        if dt1 < 1e-4 {
            dt1 = 1.0;
        }
        if dt0 < 1e-4 {
            dt0 = dt1;
        }
        if dt2 < 1e-4 {
            dt2 = dt1;
        }
        let dt = [dt0, dt1, dt2];

        SplineSegment {
            position: Cubic::catmull(n.map(|k| k.position), dt),
            width: Cubic::catmull(n.map(|k| k.width), dt),
            depth: Cubic::catmull(n.map(|k| k.depth), dt),
            normal: Cubic::catmull(n.map(|k| k.normal), dt),
        }
    }

    #[inline]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Interpolated node on segment `seg` at local `t` in [0, 1].
    ///
    /// The end points return the control nodes exactly.
    pub fn evaluate(&self, seg: usize, t: f32) -> RoadNode {
        if t <= 0.0 {
            return self.nodes[seg];
        }
        if t >= 1.0 {
            return self.nodes[seg + 1];
        }

        let s = &self.segments[seg];
        let fallback = self.nodes[seg].normal.lerp(self.nodes[seg + 1].normal, t);
        RoadNode {
            position: s.position.eval(t),
            width: clamp_width(s.width.eval(t)),
            depth: clamp_depth(s.depth.eval(t)),
            normal: s.normal.eval(t).normalize_or(fallback.normalize_or(Vec3::Z)),
        }
    }

    /// Approximate arc length of segment `seg`
    pub fn arc_length(&self, seg: usize) -> f32 {
        let mut length = 0.0;
        let mut prev = self.nodes[seg].position;
        for step in 1..=ARC_LENGTH_STEPS {
            let t = step as f32 / ARC_LENGTH_STEPS as f32;
            let p = self.evaluate(seg, t).position;
            length += prev.distance(p);
            prev = p;
        }
        length
    }
}
