//! Road material slots and name resolution
//!
//! A road references three material assets by name. Resolution never
//! fails: an unknown name maps to [`MaterialId::WARNING`] so the road
//! still renders, visibly flagged.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// Which of the three road buffers a material applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialSlot {
    Top,
    Bottom,
    Side,
}

impl MaterialSlot {
    pub const ALL: [MaterialSlot; 3] = [MaterialSlot::Top, MaterialSlot::Bottom, MaterialSlot::Side];

    #[inline]
    pub const fn index(self) -> usize {
        match self {
            MaterialSlot::Top => 0,
            MaterialSlot::Bottom => 1,
            MaterialSlot::Side => 2,
        }
    }
}

/// Resolved material handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(pub u32);

impl MaterialId {
    /// Fallback material drawn when an asset cannot be found
    pub const WARNING: MaterialId = MaterialId(u32::MAX);

    pub fn is_warning(self) -> bool {
        self == Self::WARNING
    }
}

/// Material asset names of a road, one per slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadMaterials {
    pub top: String,
    pub bottom: String,
    pub side: String,
}

impl Default for RoadMaterials {
    fn default() -> Self {
        Self {
            top: "DefaultRoadMaterialTop".to_string(),
            bottom: "DefaultRoadMaterialOther".to_string(),
            side: "DefaultRoadMaterialOther".to_string(),
        }
    }
}

impl RoadMaterials {
    pub fn get(&self, slot: MaterialSlot) -> &str {
        match slot {
            MaterialSlot::Top => &self.top,
            MaterialSlot::Bottom => &self.bottom,
            MaterialSlot::Side => &self.side,
        }
    }

    pub fn set(&mut self, slot: MaterialSlot, name: impl Into<String>) {
        let name = name.into();
        match slot {
            MaterialSlot::Top => self.top = name,
            MaterialSlot::Bottom => self.bottom = name,
            MaterialSlot::Side => self.side = name,
        }
    }
}

/// Name → id registry supplied by the host
#[derive(Debug, Default)]
pub struct MaterialLibrary {
    by_name: HashMap<String, MaterialId>,
    next_id: u32,
}

impl MaterialLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a material, returning its id (existing id if already known)
    pub fn register(&mut self, name: impl Into<String>) -> MaterialId {
        let name = name.into();
        if let Some(id) = self.by_name.get(&name) {
            return *id;
        }
        let id = MaterialId(self.next_id);
        self.next_id += 1;
        self.by_name.insert(name, id);
        id
    }

    /// Look up a material, falling back to the warning material
    pub fn resolve(&self, name: &str) -> MaterialId {
        match self.by_name.get(name) {
            Some(id) => *id,
            None => {
                tracing::warn!(material = name, "material not found, using warning material");
                MaterialId::WARNING
            }
        }
    }

    /// Resolve all three slots of a road, in slot order
    pub fn resolve_road(&self, materials: &RoadMaterials) -> [MaterialId; 3] {
        MaterialSlot::ALL.map(|slot| self.resolve(materials.get(slot)))
    }
}
