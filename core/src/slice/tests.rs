//! Tests for slice generation

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::*;

fn straight(count: usize, spacing: f32) -> Vec<RoadNode> {
    (0..count)
        .map(|i| RoadNode::flat(Vec3::new(0.0, i as f32 * spacing, 0.0), 10.0, 5.0))
        .collect()
}

fn quarter_circle(count: usize, radius: f32) -> Vec<RoadNode> {
    (0..count)
        .map(|i| {
            let a = std::f32::consts::FRAC_PI_2 * i as f32 / (count - 1) as f32;
            RoadNode::flat(Vec3::new(radius * a.cos(), radius * a.sin(), 0.0), 8.0, 2.0)
        })
        .collect()
}

fn random_road(rng: &mut Pcg32) -> Vec<RoadNode> {
    let count = rng.random_range(2..8);
    let mut y = 0.0;
    (0..count)
        .map(|_| {
            y += rng.random_range(2.0..30.0);
            RoadNode::flat(
                Vec3::new(rng.random_range(-20.0..20.0), y, rng.random_range(-3.0..3.0)),
                rng.random_range(2.0..20.0),
                rng.random_range(0.5..6.0),
            )
        })
        .collect()
}

#[test]
fn straight_road_breaks_only_at_nodes() {
    let slices = generate_slices(&straight(3, 10.0), &Profile::default(), 3.0).unwrap();
    assert_eq!(slices.len(), 3);
    assert_eq!(slices[0].p1, Vec3::ZERO);
    assert_eq!(slices[1].p1, Vec3::new(0.0, 10.0, 0.0));
    assert_eq!(slices[2].p1, Vec3::new(0.0, 20.0, 0.0));
    assert_eq!(slices[2].distance, 20.0);
}

#[test]
fn fewer_than_two_nodes_is_a_noop() {
    let profile = Profile::default();
    assert!(generate_slices(&[], &profile, 3.0).unwrap().is_empty());
    assert!(
        generate_slices(&straight(1, 10.0), &profile, 3.0)
            .unwrap()
            .is_empty()
    );
}

#[test]
fn first_and_last_slice_sit_on_end_nodes() {
    let mut rng = Pcg32::seed_from_u64(0x5eed);
    let profile = Profile::default();
    for _ in 0..50 {
        let nodes = random_road(&mut rng);
        for angle in [0.5, 3.0, 15.0, 90.0] {
            let slices = generate_slices(&nodes, &profile, angle).unwrap();
            assert!(slices.len() >= 2);
            assert_eq!(slices[0].p1, nodes[0].position);
            assert_eq!(slices[slices.len() - 1].p1, nodes[nodes.len() - 1].position);
        }
    }
}

#[test]
fn smaller_break_angle_never_reduces_slice_count() {
    let profile = Profile::default();
    let mut rng = Pcg32::seed_from_u64(42);
    let mut roads = vec![quarter_circle(5, 50.0)];
    roads.extend((0..20).map(|_| random_road(&mut rng)));

    for nodes in roads {
        let mut previous = 0;
        for angle in [90.0, 30.0, 10.0, 5.0, 3.0, 1.0, 0.5, 0.1] {
            let count = generate_slices(&nodes, &profile, angle).unwrap().len();
            assert!(count >= previous, "angle {angle}: {count} < {previous}");
            previous = count;
        }
    }
}

#[test]
fn curves_get_intermediate_slices() {
    let nodes = quarter_circle(3, 50.0);
    let slices = generate_slices(&nodes, &Profile::default(), 3.0).unwrap();
    assert!(slices.len() > nodes.len());
    // Every node is still a slice
    for node in &nodes {
        assert!(slices.iter().any(|s| s.p1 == node.position));
    }
}

#[test]
fn frames_are_orthonormal() {
    let slices = generate_slices(&quarter_circle(4, 30.0), &Profile::default(), 2.0).unwrap();
    for s in &slices {
        assert!((s.fvec.length() - 1.0).abs() < 1e-5);
        assert!((s.rvec.length() - 1.0).abs() < 1e-5);
        assert!((s.uvec.length() - 1.0).abs() < 1e-5);
        assert!(s.fvec.dot(s.rvec).abs() < 1e-5);
        assert!(s.fvec.dot(s.uvec).abs() < 1e-5);
        assert!((s.rvec.cross(s.fvec) - s.uvec).length() < 1e-5);
    }
}

#[test]
fn profile_is_swept_down_to_node_depth() {
    let slices = generate_slices(&straight(2, 10.0), &Profile::default(), 3.0).unwrap();
    let s = &slices[0];
    assert!((s.p0 - Vec3::new(-5.0, 0.0, 0.0)).length() < 1e-5);
    assert!((s.p2 - Vec3::new(5.0, 0.0, 0.0)).length() < 1e-5);
    assert!((s.pb0 - Vec3::new(-5.0, 0.0, -5.0)).length() < 1e-5);
    assert!((s.pb2 - Vec3::new(5.0, 0.0, -5.0)).length() < 1e-5);

    let bounds = slice_bounds(&slices).unwrap();
    assert!((bounds.min - Vec3::new(-5.0, 0.0, -5.0)).length() < 1e-5);
    assert!((bounds.max - Vec3::new(5.0, 10.0, 0.0)).length() < 1e-5);
}

#[test]
fn repeated_nodes_collapse() {
    let mut nodes = straight(3, 10.0);
    let repeated = nodes[1];
    nodes.insert(1, repeated);
    let slices = generate_slices(&nodes, &Profile::default(), 3.0).unwrap();
    assert_eq!(slices.len(), 3);
    assert_eq!(slices[2].p1, nodes[3].position);

    let same = vec![nodes[0], nodes[0]];
    assert!(generate_slices(&same, &Profile::default(), 3.0).unwrap().is_empty());
}

#[test]
fn up_parallel_to_forward_is_degenerate() {
    let nodes: Vec<RoadNode> = (0..2)
        .map(|i| RoadNode::new(Vec3::new(0.0, i as f32 * 10.0, 0.0), 10.0, 5.0, Vec3::Y))
        .collect();
    let err = generate_slices(&nodes, &Profile::default(), 3.0).unwrap_err();
    assert_eq!(err, RoadError::DegenerateFrame { slice: 0 });
}
