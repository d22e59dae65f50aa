//! Persisted text fields
//!
//! Roads are authored as one field per line:
//!
//! ```text
//! Node = "<x> <y> <z> <width> <depth> <nx> <ny> <nz>";
//! ProfileNode = "<x> <y> <smoothFlag:0|1> <materialTag:int>";
//! ```
//!
//! Values are fixed-format scans. A value with the wrong token count (or a
//! token that does not parse) yields `None`; callers skip such lines.

use crate::records::{NodeRecord, ProfileNodeRecord};

/// Field name of a persisted road node line
pub const NODE_FIELD: &str = "Node";

/// Field name of a persisted profile node line
pub const PROFILE_NODE_FIELD: &str = "ProfileNode";

/// Split a `Name = "value";` line into its name and unquoted value.
///
/// Returns `None` for blank lines, comments and lines without `=`.
pub fn parse_field_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with("//") || line.starts_with('#') {
        return None;
    }

    let (name, value) = line.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let value = value.trim();
    let value = value.strip_suffix(';').unwrap_or(value).trim_end();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);

    Some((name, value))
}

/// Format a field line in the persisted layout.
pub fn format_field_line(name: &str, value: &str) -> String {
    format!("{} = \"{}\";", name, value)
}

fn scan_floats<const N: usize>(value: &str) -> Option<[f32; N]> {
    let mut out = [0.0f32; N];
    let mut tokens = value.split_whitespace();
    for slot in out.iter_mut() {
        *slot = tokens.next()?.parse().ok()?;
    }
    if tokens.next().is_some() {
        return None;
    }
    Some(out)
}

/// Scan a `Node` value: exactly 8 floats.
pub fn parse_node(value: &str) -> Option<NodeRecord> {
    let [x, y, z, width, depth, nx, ny, nz] = scan_floats::<8>(value)?;
    Some(NodeRecord::new([x, y, z], width, depth, [nx, ny, nz]))
}

/// Scan a `ProfileNode` value: `<x> <y> <smooth> <material>`.
pub fn parse_profile_node(value: &str) -> Option<ProfileNodeRecord> {
    let tokens: Vec<&str> = value.split_whitespace().collect();
    let [x, y, smooth, material] = tokens.as_slice() else {
        return None;
    };

    let x: f32 = x.parse().ok()?;
    let y: f32 = y.parse().ok()?;
    let smooth = match smooth.parse::<i32>().ok()? {
        0 => false,
        1 => true,
        _ => return None,
    };
    let material = u8::try_from(material.parse::<i32>().ok()?).ok()?;

    Some(ProfileNodeRecord::new([x, y], smooth, material))
}

/// Format a `Node` value.
///
/// Uses the shortest representation that parses back to the same float.
pub fn format_node(node: &NodeRecord) -> String {
    let [x, y, z] = node.position;
    let [nx, ny, nz] = node.normal;
    format!(
        "{} {} {} {} {} {} {} {}",
        x, y, z, node.width, node.depth, nx, ny, nz
    )
}

/// Format a `ProfileNode` value.
pub fn format_profile_node(node: &ProfileNodeRecord) -> String {
    format!(
        "{} {} {} {}",
        node.position[0],
        node.position[1],
        u8::from(node.smooth),
        node.material
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_field_lines() {
        assert_eq!(
            parse_field_line("  Node = \"1 2 3 10 5 0 0 1\";"),
            Some(("Node", "1 2 3 10 5 0 0 1"))
        );
        assert_eq!(
            parse_field_line("breakAngle = \"3\";"),
            Some(("breakAngle", "3"))
        );
        assert_eq!(parse_field_line("textureLength = 5;"), Some(("textureLength", "5")));
        assert_eq!(parse_field_line(""), None);
        assert_eq!(parse_field_line("// Node = \"1\";"), None);
        assert_eq!(parse_field_line("no equals sign"), None);
    }

    #[test]
    fn parses_node_value() {
        let node = parse_node("1 2 3 10 5 0 0 1").unwrap();
        assert_eq!(node.position, [1.0, 2.0, 3.0]);
        assert_eq!(node.width, 10.0);
        assert_eq!(node.depth, 5.0);
        assert_eq!(node.normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn rejects_wrong_token_count() {
        assert!(parse_node("1 2 3 10 5 0 0").is_none());
        assert!(parse_node("1 2 3 10 5 0 0 1 9").is_none());
        assert!(parse_node("1 2 x 10 5 0 0 1").is_none());
        assert!(parse_profile_node("0 -5 1").is_none());
        assert!(parse_profile_node("0 -5 1 0 0").is_none());
    }

    #[test]
    fn parses_profile_node_value() {
        let node = parse_profile_node("0.5 -5 1 2").unwrap();
        assert_eq!(node.position, [0.5, -5.0]);
        assert!(node.smooth);
        assert_eq!(node.material, 2);

        assert!(parse_profile_node("0 0 2 0").is_none());
        assert!(parse_profile_node("0 0 0 -1").is_none());
    }

    #[test]
    fn formatted_values_scan_back() {
        let node = NodeRecord::new([0.1, -7.25, 1e-3], 12.5, 3.0, [0.0, 0.6, 0.8]);
        assert_eq!(parse_node(&format_node(&node)), Some(node));

        let prof = ProfileNodeRecord::new([2.0, -0.5], false, 1);
        assert_eq!(parse_profile_node(&format_profile_node(&prof)), Some(prof));

        let line = format_field_line(NODE_FIELD, &format_node(&node));
        let (name, value) = parse_field_line(&line).unwrap();
        assert_eq!(name, NODE_FIELD);
        assert_eq!(parse_node(value), Some(node));
    }
}
