//! Road configuration (`meshroad.toml`)
//!
//! Defaults for newly created roads and the replication budget. Every
//! field has a serde default, so a partial file (or an empty one) loads.

use std::path::Path;

use anyhow::Context;
use meshroad_shared::constants::{
    DEFAULT_BREAK_ANGLE, DEFAULT_NODE_DEPTH, DEFAULT_NODE_WIDTH, DEFAULT_NODES_PER_EVENT,
    DEFAULT_TEXTURE_LENGTH, MAX_BREAK_ANGLE, MAX_PACKET_SIZE, MAX_WIDTH_SUBDIVISIONS,
    MIN_BREAK_ANGLE, MIN_TEXTURE_LENGTH, PACKET_SAFETY_MARGIN, clamp_depth, clamp_width,
};
use serde::{Deserialize, Serialize};

use crate::collision::DEFAULT_PEAK_OFFSET;
use crate::error::ConfigError;

/// Smallest packet budget that still leaves room for a header and margin
const MIN_PACKET_SIZE: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RoadConfig {
    /// New-road geometry defaults
    #[serde(default)]
    pub geometry: GeometryConfig,
    /// Replication budget
    #[serde(default)]
    pub net: NetConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryConfig {
    /// Width of nodes added without one (default: 10)
    #[serde(default = "default_node_width")]
    pub node_width: f32,
    /// Depth of nodes added without one (default: 5)
    #[serde(default = "default_node_depth")]
    pub node_depth: f32,
    /// Degrees of turning before a new slice (default: 3)
    #[serde(default = "default_break_angle")]
    pub break_angle: f32,
    /// Meters per texture repeat (default: 5)
    #[serde(default = "default_texture_length")]
    pub texture_length: f32,
    /// Extra vertex columns across the surface (default: 0)
    #[serde(default)]
    pub width_subdivisions: u32,
    /// Depth of collision convex peaks below their face (default: 0.5)
    #[serde(default = "default_peak_offset")]
    pub collision_peak_offset: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetConfig {
    /// Bytes per update packet (default: 1500)
    #[serde(default = "default_packet_size")]
    pub max_packet_size: usize,
    /// Bytes kept free before writing a node list inline (default: 100)
    #[serde(default = "default_safety_margin")]
    pub safety_margin: usize,
    /// Nodes per side-channel event (default: 32)
    #[serde(default = "default_nodes_per_event")]
    pub nodes_per_event: usize,
}

fn default_node_width() -> f32 {
    DEFAULT_NODE_WIDTH
}
fn default_node_depth() -> f32 {
    DEFAULT_NODE_DEPTH
}
fn default_break_angle() -> f32 {
    DEFAULT_BREAK_ANGLE
}
fn default_texture_length() -> f32 {
    DEFAULT_TEXTURE_LENGTH
}
fn default_peak_offset() -> f32 {
    DEFAULT_PEAK_OFFSET
}

fn default_packet_size() -> usize {
    MAX_PACKET_SIZE
}
fn default_safety_margin() -> usize {
    PACKET_SAFETY_MARGIN
}
fn default_nodes_per_event() -> usize {
    DEFAULT_NODES_PER_EVENT
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            node_width: default_node_width(),
            node_depth: default_node_depth(),
            break_angle: default_break_angle(),
            texture_length: default_texture_length(),
            width_subdivisions: 0,
            collision_peak_offset: default_peak_offset(),
        }
    }
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            max_packet_size: default_packet_size(),
            safety_margin: default_safety_margin(),
            nodes_per_event: default_nodes_per_event(),
        }
    }
}

/// Clamp `v` into `[min, max]`, mapping NaN to `fallback`
fn clamp_or(v: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if v.is_nan() { fallback } else { v.clamp(min, max) }
}

impl RoadConfig {
    /// Copy with every value clamped into engineering bounds
    pub fn sanitized(&self) -> Self {
        let g = &self.geometry;
        let n = &self.net;
        Self {
            geometry: GeometryConfig {
                node_width: clamp_width(g.node_width),
                node_depth: clamp_depth(g.node_depth),
                break_angle: clamp_or(
                    g.break_angle,
                    MIN_BREAK_ANGLE,
                    MAX_BREAK_ANGLE,
                    DEFAULT_BREAK_ANGLE,
                ),
                texture_length: clamp_or(
                    g.texture_length,
                    MIN_TEXTURE_LENGTH,
                    f32::MAX,
                    DEFAULT_TEXTURE_LENGTH,
                ),
                width_subdivisions: g.width_subdivisions.min(MAX_WIDTH_SUBDIVISIONS),
                collision_peak_offset: clamp_or(
                    g.collision_peak_offset,
                    0.0,
                    f32::MAX,
                    DEFAULT_PEAK_OFFSET,
                ),
            },
            net: NetConfig {
                max_packet_size: n.max_packet_size.max(MIN_PACKET_SIZE),
                safety_margin: n.safety_margin.min(n.max_packet_size.max(MIN_PACKET_SIZE) / 2),
                nodes_per_event: n.nodes_per_event.max(1),
            },
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Read and sanitize a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!(path = %path.display(), "loaded road config");
        Ok(config.sanitized())
    }

    /// Like [`RoadConfig::load`], with the path in the error chain
    pub fn load_with_context(path: &Path) -> anyhow::Result<Self> {
        Self::load(path).with_context(|| format!("loading road config {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }
}
