//! Slice generation
//!
//! The spline is sampled at roughly one sample per meter of arc, then
//! reduced to a piecewise-linear path: a sample survives as a slice when
//! it sits on a control node, or when the turning accumulated since the
//! previous slice exceeds the break angle. Each slice carries its frame
//! and the profile swept along both road edges.

use glam::Vec3;
use meshroad_shared::constants::MIN_METERS_PER_SEGMENT;

use crate::bounds::Aabb;
use crate::error::RoadError;
use crate::profile::Profile;
use crate::spline::{RoadNode, RoadSpline};

/// Slices closer than this are merged
const COINCIDENT_EPSILON: f32 = 1e-5;

/// Cross-section of the road at one spline parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    /// Left surface edge
    pub p0: Vec3,
    /// Centerline point
    pub p1: Vec3,
    /// Right surface edge
    pub p2: Vec3,
    /// Bottom of the left profile
    pub pb0: Vec3,
    /// Bottom of the right profile
    pub pb2: Vec3,
    pub rvec: Vec3,
    pub fvec: Vec3,
    pub uvec: Vec3,
    pub width: f32,
    pub depth: f32,
    /// Control node starting the spline segment this slice lies on
    pub parent_node: usize,
    /// Global spline parameter (`parent_node + local t`)
    pub t: f32,
    /// Centerline distance from the first slice, in meters
    pub distance: f32,
    /// Profile swept along the left edge, one vertex per profile node
    pub left: Vec<Vec3>,
    /// Profile swept along the right edge, one vertex per profile node
    pub right: Vec<Vec3>,
}

impl Slice {
    /// Map a profile-space normal to world space on one side (`-1` left, `+1` right)
    #[inline]
    pub fn profile_normal(&self, n: glam::Vec2, side: f32) -> Vec3 {
        (self.rvec * (side * n.x) + self.uvec * n.y).normalize_or(self.uvec)
    }

    /// Every swept vertex of this slice
    pub fn ring(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.left.iter().chain(self.right.iter()).copied()
    }
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    node: RoadNode,
    parent: usize,
    t: f32,
    /// Sits on a control node
    forced: bool,
}

fn turn_angle(incoming: Vec3, outgoing: Vec3) -> f32 {
    let (Some(a), Some(b)) = (incoming.try_normalize(), outgoing.try_normalize()) else {
        return 0.0;
    };
    a.dot(b).clamp(-1.0, 1.0).acos()
}

fn sample_spline(spline: &RoadSpline) -> Vec<Sample> {
    let mut samples = Vec::new();
    let seg_count = spline.segment_count();

    for seg in 0..seg_count {
        let arc = spline.arc_length(seg);
        let steps = ((arc / MIN_METERS_PER_SEGMENT).ceil() as usize).max(1);
        let last_seg = seg + 1 == seg_count;
        let end = if last_seg { steps + 1 } else { steps };

        for j in 0..end {
            let t = j as f32 / steps as f32;
            samples.push(Sample {
                node: spline.evaluate(seg, t),
                parent: seg,
                t: seg as f32 + t,
                forced: j == 0 || j == steps,
            });
        }
    }

    samples
}

/// Pick the samples that become slices
fn select_breaks(samples: &[Sample], break_angle: f32) -> Vec<Sample> {
    let mut picked = vec![samples[0]];
    let mut accumulated = 0.0f32;

    for k in 1..samples.len() - 1 {
        if samples[k].forced {
            picked.push(samples[k]);
            accumulated = 0.0;
            continue;
        }

        let incoming = samples[k].node.position - samples[k - 1].node.position;
        let outgoing = samples[k + 1].node.position - samples[k].node.position;
        accumulated += turn_angle(incoming, outgoing);

        if accumulated > break_angle {
            picked.push(samples[k]);
            accumulated = 0.0;
        }
    }

    picked.push(samples[samples.len() - 1]);

    // Coincident samples (repeated nodes) would give a zero forward vector.
    // The final sample always wins so the road ends exactly on the last node.
    let mut deduped: Vec<Sample> = Vec::with_capacity(picked.len());
    let last = picked.len() - 1;
    for (i, s) in picked.into_iter().enumerate() {
        match deduped.last_mut() {
            Some(prev) if prev.node.position.distance(s.node.position) < COINCIDENT_EPSILON => {
                if i == last {
                    *prev = s;
                }
            }
            _ => deduped.push(s),
        }
    }
    deduped
}

/// Generate slices for a node list.
///
/// Returns an empty list for fewer than two nodes, or when every node
/// coincides. Fails only on a degenerate frame (up parallel to forward).
pub fn generate_slices(
    nodes: &[RoadNode],
    profile: &Profile,
    break_angle_deg: f32,
) -> Result<Vec<Slice>, RoadError> {
    if nodes.len() < 2 {
        return Ok(Vec::new());
    }

    let spline = RoadSpline::new(nodes);
    let samples = sample_spline(&spline);
    let picked = select_breaks(&samples, break_angle_deg.to_radians());
    if picked.len() < 2 {
        return Ok(Vec::new());
    }

    let count = picked.len();
    let mut slices = Vec::with_capacity(count);
    let mut distance = 0.0;

    for k in 0..count {
        let s = picked[k];
        let p1 = s.node.position;

        let forward = if k == 0 {
            picked[1].node.position - p1
        } else if k == count - 1 {
            p1 - picked[k - 1].node.position
        } else {
            let ahead = (picked[k + 1].node.position - p1).normalize_or_zero();
            let behind = (p1 - picked[k - 1].node.position).normalize_or_zero();
            ahead + behind
        };

        let fvec = forward
            .try_normalize()
            .ok_or(RoadError::DegenerateFrame { slice: k })?;
        let rvec = fvec
            .cross(s.node.normal)
            .try_normalize()
            .ok_or(RoadError::DegenerateFrame { slice: k })?;
        let uvec = rvec.cross(fvec).normalize();

        if k > 0 {
            distance += picked[k - 1].node.position.distance(p1);
        }

        let half = rvec * (s.node.width * 0.5);
        let p0 = p1 - half;
        let p2 = p1 + half;

        let scale = profile.vertical_scale(s.node.depth);
        let mut left = Vec::with_capacity(profile.node_count());
        let mut right = Vec::with_capacity(profile.node_count());
        for pn in profile.nodes() {
            let down = uvec * (pn.position.y * scale);
            left.push(p0 - rvec * pn.position.x + down);
            right.push(p2 + rvec * pn.position.x + down);
        }

        slices.push(Slice {
            p0,
            p1,
            p2,
            pb0: left[left.len() - 1],
            pb2: right[right.len() - 1],
            rvec,
            fvec,
            uvec,
            width: s.node.width,
            depth: s.node.depth,
            parent_node: s.parent,
            t: s.t,
            distance,
            left,
            right,
        });
    }

    tracing::debug!(
        nodes = nodes.len(),
        samples = samples.len(),
        slices = slices.len(),
        "generated road slices"
    );

    Ok(slices)
}

/// World bounds over every swept vertex, including the bottom of the profile
pub fn slice_bounds(slices: &[Slice]) -> Option<Aabb> {
    Aabb::from_points(
        slices
            .iter()
            .flat_map(|s| [s.p0, s.p1, s.p2].into_iter().chain(s.ring())),
    )
}

#[cfg(test)]
mod tests;
