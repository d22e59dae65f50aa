//! Road update packets
//!
//! Sections are written in a fixed order: MESH_ROAD, PROFILE, NODE, then
//! the REGEN bit. A section that does not fit in the packet is rolled back
//! and reported as unsent so the caller can retry it in the next packet.
//! Decoding reads every section before applying any of them, so a bad
//! packet leaves the road untouched.

use meshroad_shared::constants::NODE_RECORD_WIRE_SIZE;
use meshroad_shared::{GhostId, NodeListId, NodeRecord, Transform3x4};

use super::{MeshRoad, RoadParams, affine_to_rows, rows_to_affine};
use crate::error::NetError;
use crate::material::RoadMaterials;
use crate::net::{
    NODE_SECTION_INLINE, NODE_SECTION_LIST, NodeListManager, PacketReader, PacketWriter, RoadMask,
};
use crate::profile::{Profile, ProfileNode, SegmentMaterial};
use crate::spline::RoadNode;

const SMOOTH_BIT: u8 = 0b0000_0001;
const TAG_SHIFT: u8 = 1;
const TAG_MASK: u8 = 0b0000_0111;

/// What an applied update asks of the receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Sections present in the packet
    pub mask: RoadMask,
    /// Chunked node list not yet assembled; nodes arrive with it
    pub pending_list: Option<NodeListId>,
    /// Sender asked for a rebuild
    pub regenerate: bool,
}

impl UpdateOutcome {
    /// Rebuild now, or wait for a pending node list
    pub fn ready_to_regenerate(&self) -> bool {
        self.regenerate && self.pending_list.is_none()
    }
}

enum NodeSection {
    Inline(Vec<NodeRecord>),
    List(NodeListId),
}

struct MeshRoadSection {
    transform: Transform3x4,
    params: RoadParams,
}

impl MeshRoad {
    // ========================================================================
    // Packing
    // ========================================================================

    /// Write the sections named by `mask` and return the ones left unsent.
    ///
    /// REGEN is only sent once every other requested section made it in.
    pub fn pack_update(
        &self,
        mask: RoadMask,
        writer: &mut PacketWriter,
        lists: &mut NodeListManager,
    ) -> RoadMask {
        let header = writer.len();
        if writer.write_u8(0).is_err() {
            return mask;
        }

        let mut sent = RoadMask::empty();
        for section in [RoadMask::MESH_ROAD, RoadMask::PROFILE, RoadMask::NODE] {
            if !mask.contains(section) {
                continue;
            }
            let mark = writer.len();
            let result = if section == RoadMask::MESH_ROAD {
                self.write_mesh_road(writer)
            } else if section == RoadMask::PROFILE {
                self.write_profile(writer)
            } else {
                self.write_nodes(writer, lists)
            };
            match result {
                Ok(()) => sent |= section,
                Err(err) => {
                    writer.truncate(mark);
                    tracing::debug!(section = ?section, %err, "road section deferred");
                }
            }
        }

        let others = mask - RoadMask::REGEN;
        if mask.contains(RoadMask::REGEN) && sent.contains(others) {
            sent |= RoadMask::REGEN;
        }

        writer.patch_u8(header, sent.bits());
        mask - sent
    }

    /// Pack the dirty sections and clear the ones that were sent
    pub fn pack_dirty(&mut self, writer: &mut PacketWriter, lists: &mut NodeListManager) -> RoadMask {
        let unsent = self.pack_update(self.dirty, writer, lists);
        self.dirty = unsent;
        unsent
    }

    fn write_mesh_road(&self, w: &mut PacketWriter) -> Result<(), NetError> {
        w.write_transform(&affine_to_rows(&self.transform))?;
        w.write_string(&self.params.materials.top)?;
        w.write_string(&self.params.materials.bottom)?;
        w.write_string(&self.params.materials.side)?;
        w.write_f32(self.params.texture_length)?;
        w.write_f32(self.params.break_angle)?;
        w.write_u32(self.params.width_subdivisions)?;
        Ok(())
    }

    fn write_profile(&self, w: &mut PacketWriter) -> Result<(), NetError> {
        let nodes = self.profile.nodes();
        w.write_u16(nodes.len() as u16)?;
        for (i, node) in nodes.iter().enumerate() {
            let tag = if i == 0 { 0 } else { node.material.tag() };
            let flags = (node.smooth as u8) | ((tag & TAG_MASK) << TAG_SHIFT);
            w.write_vec2(node.position)?;
            w.write_u8(flags)?;
        }
        Ok(())
    }

    fn write_nodes(&self, w: &mut PacketWriter, lists: &mut NodeListManager) -> Result<(), NetError> {
        let estimate = 1 + 2 + self.nodes.len() * NODE_RECORD_WIRE_SIZE;

        if self.nodes.len() <= u16::MAX as usize && w.fits_with_margin(estimate) {
            w.write_u8(NODE_SECTION_INLINE)?;
            w.write_u16(self.nodes.len() as u16)?;
            for node in &self.nodes {
                w.write_node(&node.to_record())?;
            }
            return Ok(());
        }

        // Only queue the list once its reference is sure to fit
        w.ensure(1 + 4)?;
        let id = lists.queue_list(&self.node_records());
        w.write_u8(NODE_SECTION_LIST)?;
        w.write_u32(id.0)?;
        Ok(())
    }

    // ========================================================================
    // Unpacking
    // ========================================================================

    /// Read one update and apply it.
    ///
    /// A chunked node list that has not finished assembling is claimed for
    /// `ghost`; its nodes are applied later with [`MeshRoad::apply_node_records`].
    /// Any NODE section cancels lists `ghost` was still waiting on.
    /// The geometry is not rebuilt here; see [`UpdateOutcome::ready_to_regenerate`].
    pub fn unpack_update(
        &mut self,
        reader: &mut PacketReader<'_>,
        lists: &mut NodeListManager,
        ghost: GhostId,
    ) -> Result<UpdateOutcome, NetError> {
        let mask = RoadMask::from_bits_truncate(reader.read_u8()?);

        let mesh_road = if mask.contains(RoadMask::MESH_ROAD) {
            Some(read_mesh_road(reader)?)
        } else {
            None
        };
        let profile = if mask.contains(RoadMask::PROFILE) {
            Some(read_profile(reader)?)
        } else {
            None
        };
        let nodes = if mask.contains(RoadMask::NODE) {
            Some(read_nodes(reader)?)
        } else {
            None
        };

        if let Some(section) = mesh_road {
            self.transform = rows_to_affine(&section.transform);
            self.world_to_local = self.transform.inverse();
            self.params = section.params;
        }
        if let Some(profile) = profile {
            self.profile = profile;
        }

        // Newer nodes supersede any list this ghost is still waiting on
        if nodes.is_some() {
            lists.cancel_waiting(ghost);
        }

        let mut pending_list = None;
        match nodes {
            Some(NodeSection::Inline(records)) => self.apply_node_records(&records),
            Some(NodeSection::List(id)) => match lists.claim_or_wait(id, ghost) {
                Some(records) => self.apply_node_records(&records),
                None => pending_list = Some(id),
            },
            None => {}
        }

        Ok(UpdateOutcome {
            mask,
            pending_list,
            regenerate: mask.contains(RoadMask::REGEN),
        })
    }

    /// Replace the node list with replicated records, bit for bit
    pub fn apply_node_records(&mut self, records: &[NodeRecord]) {
        self.nodes = records.iter().map(RoadNode::from_record_exact).collect();
    }
}

fn read_mesh_road(r: &mut PacketReader<'_>) -> Result<MeshRoadSection, NetError> {
    let transform = r.read_transform()?;
    let materials = RoadMaterials {
        top: r.read_string()?,
        bottom: r.read_string()?,
        side: r.read_string()?,
    };
    let params = RoadParams {
        materials,
        texture_length: r.read_f32()?,
        break_angle: r.read_f32()?,
        width_subdivisions: r.read_u32()?,
    }
    .sanitized();
    Ok(MeshRoadSection { transform, params })
}

fn read_profile(r: &mut PacketReader<'_>) -> Result<Profile, NetError> {
    let count = r.read_u16()? as usize;
    let mut nodes = Vec::with_capacity(count);
    for i in 0..count {
        let position = r.read_vec2()?;
        let flags = r.read_u8()?;
        let tag = (flags >> TAG_SHIFT) & TAG_MASK;
        // First node's tag is a placeholder
        let material = if i == 0 {
            SegmentMaterial::default()
        } else {
            SegmentMaterial::from_tag(tag).ok_or(NetError::InvalidMaterialTag(tag))?
        };
        nodes.push(ProfileNode::new(position, flags & SMOOTH_BIT != 0, material));
    }
    Ok(Profile::new(nodes)?)
}

fn read_nodes(r: &mut PacketReader<'_>) -> Result<NodeSection, NetError> {
    match r.read_u8()? {
        NODE_SECTION_INLINE => {
            let count = r.read_u16()? as usize;
            let mut records = Vec::with_capacity(count);
            for _ in 0..count {
                records.push(r.read_node()?);
            }
            Ok(NodeSection::Inline(records))
        }
        NODE_SECTION_LIST => Ok(NodeSection::List(NodeListId(r.read_u32()?))),
        kind => Err(NetError::InvalidNodeSection(kind)),
    }
}
