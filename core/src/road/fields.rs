//! Persisted road fields
//!
//! Scalar fields go through the static [`FIELDS`] table: one name, one
//! getter and one setter each. Nodes and profile nodes are repeated
//! `Node` / `ProfileNode` lines in list order.

use meshroad_shared::Transform3x4;
use meshroad_shared::fields::{
    NODE_FIELD, PROFILE_NODE_FIELD, format_field_line, format_node, format_profile_node,
    parse_field_line, parse_node, parse_profile_node,
};

use super::{MeshRoad, affine_to_rows, rows_to_affine};
use crate::config::RoadConfig;
use crate::error::RoadError;
use crate::profile::Profile;
use crate::spline::RoadNode;

/// Typed accessor pair for one persisted field
pub struct FieldDescriptor {
    pub name: &'static str,
    pub get: fn(&MeshRoad) -> String,
    /// Returns `false` when the value does not parse
    pub set: fn(&mut MeshRoad, &str) -> bool,
}

impl std::fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

fn parse_f32(value: &str) -> Option<f32> {
    value.trim().parse().ok()
}

fn format_transform(road: &MeshRoad) -> String {
    affine_to_rows(&road.transform)
        .to_array()
        .iter()
        .map(f32::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_transform(road: &mut MeshRoad, value: &str) -> bool {
    let values: Vec<f32> = match value.split_whitespace().map(str::parse).collect() {
        Ok(values) => values,
        Err(_) => return false,
    };
    let Ok(values) = <[f32; 12]>::try_from(values) else {
        return false;
    };
    road.set_transform(rows_to_affine(&Transform3x4::from_array(values)));
    true
}

pub static FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor {
        name: "topMaterial",
        get: |road| road.params.materials.top.clone(),
        set: |road, value| {
            road.params.materials.top = value.to_string();
            true
        },
    },
    FieldDescriptor {
        name: "bottomMaterial",
        get: |road| road.params.materials.bottom.clone(),
        set: |road, value| {
            road.params.materials.bottom = value.to_string();
            true
        },
    },
    FieldDescriptor {
        name: "sideMaterial",
        get: |road| road.params.materials.side.clone(),
        set: |road, value| {
            road.params.materials.side = value.to_string();
            true
        },
    },
    FieldDescriptor {
        name: "textureLength",
        get: |road| road.params.texture_length.to_string(),
        set: |road, value| match parse_f32(value) {
            Some(v) => {
                road.params.texture_length = v;
                true
            }
            None => false,
        },
    },
    FieldDescriptor {
        name: "breakAngle",
        get: |road| road.params.break_angle.to_string(),
        set: |road, value| match parse_f32(value) {
            Some(v) => {
                road.params.break_angle = v;
                true
            }
            None => false,
        },
    },
    FieldDescriptor {
        name: "widthSubdivisions",
        get: |road| road.params.width_subdivisions.to_string(),
        set: |road, value| match value.trim().parse() {
            Ok(v) => {
                road.params.width_subdivisions = v;
                true
            }
            Err(_) => false,
        },
    },
    FieldDescriptor {
        name: "transform",
        get: format_transform,
        set: parse_transform,
    },
];

/// Look up a field by name (case-insensitive)
pub fn field(name: &str) -> Option<&'static FieldDescriptor> {
    FIELDS.iter().find(|f| f.name.eq_ignore_ascii_case(name))
}

impl MeshRoad {
    /// Serialize to persisted field lines
    pub fn to_fields(&self) -> String {
        let mut lines: Vec<String> = FIELDS
            .iter()
            .map(|f| format_field_line(f.name, &(f.get)(self)))
            .collect();

        lines.extend(
            self.nodes
                .iter()
                .map(|n| format_field_line(NODE_FIELD, &format_node(&n.to_record()))),
        );
        lines.extend(
            self.profile
                .to_records()
                .iter()
                .map(|p| format_field_line(PROFILE_NODE_FIELD, &format_profile_node(p))),
        );

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }

    /// Build a road from persisted field lines and regenerate it.
    ///
    /// Malformed or unknown lines are skipped with a warning. Without at
    /// least two valid `ProfileNode` lines the default profile is used.
    pub fn from_fields(config: &RoadConfig, text: &str) -> Result<Self, RoadError> {
        let mut road = Self::new(config);
        let mut nodes = Vec::new();
        let mut profile_records = Vec::new();

        for (line_no, line) in text.lines().enumerate() {
            let Some((name, value)) = parse_field_line(line) else {
                continue;
            };

            if name == NODE_FIELD {
                match parse_node(value) {
                    Some(rec) => nodes.push(RoadNode::from_record(&rec)),
                    None => tracing::warn!(line = line_no + 1, value, "skipping malformed Node"),
                }
            } else if name == PROFILE_NODE_FIELD {
                match parse_profile_node(value) {
                    Some(rec) => profile_records.push(rec),
                    None => {
                        tracing::warn!(line = line_no + 1, value, "skipping malformed ProfileNode")
                    }
                }
            } else if let Some(desc) = field(name) {
                if !(desc.set)(&mut road, value) {
                    tracing::warn!(line = line_no + 1, field = name, value, "skipping bad value");
                }
            } else {
                tracing::warn!(line = line_no + 1, field = name, "unknown road field");
            }
        }

        road.params = road.params.clone().sanitized();
        road.nodes = nodes;
        if !profile_records.is_empty() {
            road.profile = Profile::from_records(&profile_records).unwrap_or_else(|err| {
                tracing::warn!(%err, "invalid persisted profile, using default");
                Profile::default()
            });
        }

        road.regenerate()?;
        Ok(road)
    }
}
