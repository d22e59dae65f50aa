//! MeshRoad editing, regeneration, query and field tests

use glam::{Affine3A, Quat, Vec2, Vec3};
use meshroad_shared::constants::{
    DEFAULT_BREAK_ANGLE, MAX_NODE_WIDTH, MAX_WIDTH_SUBDIVISIONS, MIN_NODE_DEPTH,
};

use super::*;
use crate::config::GeometryConfig;
use crate::material::MaterialSlot;

const EPS: f32 = 1e-4;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// 10 wide, 5 deep, running up local +Y from 0 to 20
fn straight_road() -> MeshRoad {
    let nodes = (0..3)
        .map(|i| RoadNode::flat(Vec3::new(0.0, i as f32 * 10.0, 0.0), 10.0, 5.0))
        .collect();
    MeshRoad::with_nodes(&RoadConfig::default(), nodes).unwrap()
}

/// Local (x, y, z) lands on world (100 - y, 50 + x, 10 + z)
fn placed_road() -> MeshRoad {
    let mut road = straight_road();
    road.set_transform(Affine3A::from_rotation_translation(
        Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
        Vec3::new(100.0, 50.0, 10.0),
    ));
    road
}

fn close(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < EPS
}

// ============================================================================
// Editing
// ============================================================================

#[test]
fn node_edits_clamp_and_mark_dirty() {
    let mut road = MeshRoad::default();
    assert_eq!(road.dirty(), RoadMask::all());
    road.clear_dirty(RoadMask::all());

    let first = road.add_node(Vec3::ZERO, 500.0, -1.0, Vec3::Z).unwrap();
    assert_eq!(first, 0);
    assert_eq!(road.nodes()[0].width, MAX_NODE_WIDTH);
    assert_eq!(road.nodes()[0].depth, MIN_NODE_DEPTH);
    assert_eq!(road.dirty(), RoadMask::NODE | RoadMask::REGEN);
    // One node makes no road
    assert!(road.geometry().is_empty());

    road.add_node(Vec3::new(0.0, 20.0, 0.0), 10.0, 5.0, Vec3::Z)
        .unwrap();
    assert_eq!(road.geometry().segments.len(), 1);

    road.insert_node(1, Vec3::new(0.0, 10.0, 0.0), 8.0, 4.0, Vec3::new(0.0, 0.0, 3.0))
        .unwrap();
    assert_eq!(road.nodes().len(), 3);
    assert!(close(road.nodes()[1].normal, Vec3::Z));
    assert_eq!(road.geometry().segments.len(), 2);

    road.set_node_width(2, 12.0).unwrap();
    road.set_node_depth(2, 0.0).unwrap();
    road.set_node_normal(0, Vec3::ZERO).unwrap();
    assert_eq!(road.nodes()[2].width, 12.0);
    assert_eq!(road.nodes()[2].depth, MIN_NODE_DEPTH);
    assert_eq!(road.nodes()[0].normal, Vec3::Z);

    road.set_node_position(2, Vec3::new(0.0, 30.0, 0.0)).unwrap();
    let last = road.geometry().slices.last().unwrap();
    assert_eq!(last.p1, Vec3::new(0.0, 30.0, 0.0));

    let removed = road.delete_node(1).unwrap();
    assert_eq!(removed.width, 8.0);
    assert_eq!(road.nodes().len(), 2);
}

#[test]
fn appended_nodes_use_configured_defaults() {
    let config = RoadConfig {
        geometry: GeometryConfig {
            node_width: 6.0,
            node_depth: 99.0,
            ..GeometryConfig::default()
        },
        ..RoadConfig::default()
    };
    let mut road = MeshRoad::new(&config);
    road.append_node(Vec3::ZERO).unwrap();
    let index = road.append_node(Vec3::new(0.0, 15.0, 0.0)).unwrap();
    assert_eq!(index, 1);
    assert_eq!(road.nodes()[1].width, 6.0);
    assert_eq!(road.nodes()[1].depth, 50.0);
    assert_eq!(road.nodes()[1].normal, Vec3::Z);
    assert_eq!(road.geometry().segments.len(), 1);
}

#[test]
fn bad_node_indices_are_rejected() {
    let mut road = straight_road();
    assert_eq!(
        road.set_node_width(3, 1.0),
        Err(RoadError::NodeIndex { index: 3, len: 3 })
    );
    assert_eq!(
        road.insert_node(4, Vec3::ZERO, 1.0, 1.0, Vec3::Z),
        Err(RoadError::NodeIndex { index: 4, len: 3 })
    );
    assert!(matches!(
        road.delete_node(7),
        Err(RoadError::NodeIndex { index: 7, .. })
    ));
    assert_eq!(road.nodes().len(), 3);

    // Appending through insert is fine
    road.insert_node(3, Vec3::new(0.0, 30.0, 0.0), 10.0, 5.0, Vec3::Z)
        .unwrap();
    assert_eq!(road.nodes().len(), 4);
}

#[test]
fn profile_edits_mark_the_profile_dirty() {
    let mut road = straight_road();
    road.clear_dirty(RoadMask::all());

    let index = road.add_profile_node(Vec2::new(2.0, -6.0)).unwrap();
    assert_eq!(index, 2);
    assert_eq!(road.dirty(), RoadMask::PROFILE | RoadMask::REGEN);
    assert_eq!(road.geometry().slices[0].left.len(), 3);

    let side_before = road.geometry().buffer(MaterialSlot::Side).vertices.len();
    let bottom_before = road.geometry().buffer(MaterialSlot::Bottom).vertices.len();
    road.set_profile_segment_material(1, SegmentMaterial::Bottom)
        .unwrap();
    let side = road.geometry().buffer(MaterialSlot::Side).vertices.len();
    let bottom = road.geometry().buffer(MaterialSlot::Bottom).vertices.len();
    // 3 slices, 4 vertices per tagged segment
    assert_eq!(side_before - side, 12);
    assert_eq!(bottom - bottom_before, 12);

    road.set_profile_smooth(1, true).unwrap();
    assert!(road.profile().nodes()[1].smooth);
    road.set_profile_node_position(2, Vec2::new(1.0, -5.0))
        .unwrap();
    road.insert_profile_node(1, Vec2::new(0.5, -2.0)).unwrap();
    assert_eq!(road.profile().node_count(), 4);

    road.delete_profile_node(3).unwrap();
    road.delete_profile_node(2).unwrap();
    assert_eq!(road.delete_profile_node(1), Err(RoadError::ProfileTooShort));
    assert_eq!(road.profile().node_count(), 2);
}

#[test]
fn params_and_materials() {
    let mut road = straight_road();
    road.clear_dirty(RoadMask::all());

    road.set_material(MaterialSlot::Side, "Cobble");
    assert_eq!(road.params().materials.side, "Cobble");
    assert_eq!(road.dirty(), RoadMask::MESH_ROAD);

    road.set_params(RoadParams {
        texture_length: -3.0,
        break_angle: f32::NAN,
        width_subdivisions: 2,
        ..road.params().clone()
    })
    .unwrap();
    assert_eq!(road.params().break_angle, DEFAULT_BREAK_ANGLE);
    assert!(road.params().texture_length > 0.0);
    assert_eq!(road.params().materials.side, "Cobble");
    assert_eq!(road.dirty(), RoadMask::MESH_ROAD | RoadMask::REGEN);
    // Two extra columns across the surface
    assert_eq!(road.geometry().buffer(MaterialSlot::Top).vertices.len(), 3 * 4);
}

#[test]
fn failed_regeneration_keeps_previous_geometry() {
    let mut road = straight_road();
    let before = road.geometry().clone();

    // Up along the direction of travel has no right vector
    let err = road.set_node_normal(1, Vec3::Y).unwrap_err();
    assert!(matches!(err, RoadError::DegenerateFrame { .. }));
    assert_eq!(road.geometry(), &before);
    assert!(road.dirty().contains(RoadMask::NODE));

    road.set_node_normal(1, Vec3::Z).unwrap();
    assert_eq!(road.geometry().slices.len(), before.slices.len());
}

#[test]
fn moving_the_road_needs_no_rebuild() {
    let mut road = straight_road();
    road.clear_dirty(RoadMask::all());
    let before = road.geometry().clone();

    road.set_transform(Affine3A::from_translation(Vec3::new(5.0, 0.0, 0.0)));
    assert_eq!(road.geometry(), &before);
    assert_eq!(road.dirty(), RoadMask::MESH_ROAD);

    let bounds = road.world_bounds().unwrap();
    assert!(close(bounds.min, Vec3::new(0.0, 0.0, -5.0)));
    assert!(close(bounds.max, Vec3::new(10.0, 20.0, 0.0)));
}

// ============================================================================
// Queries
// ============================================================================

#[test]
fn containment_in_world_space() {
    let road = placed_road();
    assert!(road.contains_point(Vec3::new(97.0, 51.0, 9.0)));
    assert!(road.contains_point(Vec3::new(85.0, 46.0, 6.0)));
    // Beside the road, then above it
    assert!(!road.contains_point(Vec3::new(97.0, 58.0, 9.0)));
    assert!(!road.contains_point(Vec3::new(97.0, 51.0, 12.0)));

    let bounds = road.world_bounds().unwrap();
    assert!(close(bounds.min, Vec3::new(80.0, 45.0, 5.0)));
    assert!(close(bounds.max, Vec3::new(100.0, 55.0, 10.0)));
}

#[test]
fn segments_in_a_world_box() {
    let road = placed_road();
    let near_start = Aabb::new(Vec3::new(96.0, 49.0, 9.0), Vec3::new(98.0, 51.0, 11.0));
    assert_eq!(road.segments_in_box(&near_start), vec![0]);

    let across = Aabb::new(Vec3::new(85.0, 40.0, 0.0), Vec3::new(95.0, 60.0, 20.0));
    assert_eq!(road.segments_in_box(&across), vec![0, 1]);

    let away = Aabb::new(Vec3::splat(-10.0), Vec3::splat(-5.0));
    assert!(road.segments_in_box(&away).is_empty());
}

#[test]
fn ray_cast_in_world_space() {
    let road = placed_road();

    let hit = road
        .cast_ray(Vec3::new(97.0, 51.0, 20.0), Vec3::new(97.0, 51.0, 0.0))
        .unwrap();
    assert!((hit.t - 0.5).abs() < EPS);
    assert!(close(hit.point, Vec3::new(97.0, 51.0, 10.0)));
    assert!(close(hit.normal, Vec3::Z));

    // Along the road into the front cap, whose local normal is -Y
    let hit = road
        .cast_ray(Vec3::new(110.0, 51.0, 9.0), Vec3::new(70.0, 51.0, 9.0))
        .unwrap();
    assert!((hit.t - 0.25).abs() < EPS);
    assert_eq!(hit.segment, 0);
    assert!(close(hit.normal, Vec3::X));

    assert!(
        road.cast_ray(Vec3::new(97.0, 70.0, 20.0), Vec3::new(97.0, 70.0, 0.0))
            .is_none()
    );
}

#[test]
fn pick_in_world_space() {
    let road = placed_road();
    let hit = road
        .pick_surface(Vec3::new(86.0, 48.0, 15.0), -Vec3::Z)
        .unwrap();
    assert_eq!(hit.segment, 1);
    assert!((hit.t - 5.0).abs() < EPS);
    assert!(close(hit.point, Vec3::new(86.0, 48.0, 10.0)));
    assert!(close(hit.normal, Vec3::Z));

    assert!(road.pick_surface(Vec3::new(86.0, 48.0, 15.0), Vec3::Z).is_none());
}

#[test]
fn collision_lists_in_world_space() {
    let road = placed_road();
    let query = Aabb::new(Vec3::new(96.0, 49.0, 9.0), Vec3::new(98.0, 51.0, 11.0));

    let convexes = road.build_convex_list(&query);
    assert!(!convexes.is_empty());
    assert!(convexes.iter().all(|c| c.segment == 0));
    assert!(convexes.iter().all(|c| c.bounds().overlaps(&query)));
    // Surface convexes point up, with the peak below the face
    for convex in &convexes {
        assert!(close(convex.normal, Vec3::Z));
        assert!(convex.points[3].z < convex.points[0].z);
    }

    let polys = road.build_poly_list(&query);
    assert_eq!(polys.len(), convexes.len());
    assert!(polys.iter().all(|t| t.normal().z > 0.99));

    let away = Aabb::new(Vec3::splat(-10.0), Vec3::splat(-5.0));
    assert!(road.build_convex_list(&away).is_empty());
    assert!(road.build_poly_list(&away).is_empty());
}

// ============================================================================
// Persisted fields
// ============================================================================

#[test]
fn fields_round_trip() {
    let mut road = placed_road();
    road.set_material(MaterialSlot::Top, "Asphalt");
    road.set_params(RoadParams {
        texture_length: 12.5,
        break_angle: 1.5,
        width_subdivisions: 4,
        ..road.params().clone()
    })
    .unwrap();
    road.add_profile_node(Vec2::new(1.5, -6.0)).unwrap();
    road.set_profile_smooth(1, true).unwrap();
    road.set_profile_segment_material(1, SegmentMaterial::Bottom)
        .unwrap();

    let text = road.to_fields();
    assert!(text.contains("topMaterial = \"Asphalt\";"));
    assert_eq!(text.lines().filter(|l| l.starts_with("Node =")).count(), 3);
    assert_eq!(text.lines().filter(|l| l.starts_with("ProfileNode =")).count(), 3);

    let loaded = MeshRoad::from_fields(&RoadConfig::default(), &text).unwrap();
    assert_eq!(loaded.params(), road.params());
    assert_eq!(loaded.transform(), road.transform());
    assert_eq!(loaded.profile().to_records(), road.profile().to_records());
    for (a, b) in loaded.node_records().iter().zip(road.node_records().iter()) {
        assert!(a.bits_eq(b));
    }
    assert_eq!(loaded.geometry(), road.geometry());
}

#[test]
fn malformed_field_lines_are_skipped() {
    init_tracing();
    let text = "\
// authored by hand
Node = \"0 0 0 10 5 0 0 1\";
Node = \"1 2 3\";
Node = \"0 10 0 10 5 0 0 1\";
ProfileNode = \"0 0 2 0\";
breakAngle = \"wide\";
WIDTHSUBDIVISIONS = \"500\";
colour = \"red\";
";
    let road = MeshRoad::from_fields(&RoadConfig::default(), text).unwrap();
    assert_eq!(road.nodes().len(), 2);
    assert_eq!(road.params().break_angle, DEFAULT_BREAK_ANGLE);
    assert_eq!(road.params().width_subdivisions, MAX_WIDTH_SUBDIVISIONS);
    assert_eq!(road.profile(), &Profile::default());
    assert_eq!(road.geometry().segments.len(), 1);
}

#[test]
fn field_table_lookup() {
    assert_eq!(FIELDS.len(), 7);
    let desc = fields::field("TEXTURELENGTH").unwrap();
    assert_eq!(desc.name, "textureLength");
    assert!(fields::field("Node").is_none());

    let mut road = MeshRoad::default();
    assert!((desc.set)(&mut road, "9.5"));
    assert_eq!((desc.get)(&road), "9.5");
    assert!(!(desc.set)(&mut road, "nine"));

    let transform = fields::field("transform").unwrap();
    assert!(!(transform.set)(&mut road, "1 2 3"));
    assert!((transform.set)(&mut road, "1 0 0 4 0 1 0 5 0 0 1 6"));
    assert_eq!(road.transform().translation, Vec3::new(4.0, 5.0, 6.0).into());
}
