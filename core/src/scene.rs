//! Capability traits for scene objects
//!
//! A host scene holds objects by capability rather than by type: the
//! renderer walks `dyn Renderable`, physics walks `dyn Collidable`, the
//! connection layer walks `dyn Networked`. [`MeshRoad`] implements all
//! four by forwarding to the components it owns.

use glam::{Affine3A, Vec3};
use meshroad_shared::GhostId;

use crate::bounds::Aabb;
use crate::collision::{RayHit, RoadConvex, Triangle};
use crate::error::NetError;
use crate::material::{MaterialId, MaterialLibrary};
use crate::mesh::GeometryBuffer;
use crate::net::{NodeListManager, PacketReader, PacketWriter, RoadMask};
use crate::road::{MeshRoad, UpdateOutcome};

/// Object placed in the world by an affine transform
pub trait Transformable {
    fn transform(&self) -> &Affine3A;
    fn set_transform(&mut self, transform: Affine3A);
    /// World-space bounds, `None` while the object has no extent
    fn world_bounds(&self) -> Option<Aabb>;
}

/// Object replicated from an authority to its ghosts
pub trait Networked {
    /// Sections changed since they were last sent
    fn dirty_mask(&self) -> RoadMask;

    /// Pack dirty sections into `writer`, keeping the unsent ones dirty
    fn pack_dirty(&mut self, writer: &mut PacketWriter, lists: &mut NodeListManager) -> RoadMask;

    fn unpack(
        &mut self,
        reader: &mut PacketReader<'_>,
        lists: &mut NodeListManager,
        ghost: GhostId,
    ) -> Result<UpdateOutcome, NetError>;
}

/// Object that hands buffers to the renderer
pub trait Renderable {
    /// Local-space buffers, one per material slot
    fn buffers(&self) -> &[GeometryBuffer];

    /// Material of each buffer, in [`Renderable::buffers`] order
    fn material_ids(&self, library: &MaterialLibrary) -> Vec<MaterialId>;
}

/// Object that takes part in collision queries; all values in world space
pub trait Collidable {
    fn contains_point(&self, point: Vec3) -> bool;
    fn cast_ray(&self, start: Vec3, end: Vec3) -> Option<RayHit>;
    fn build_convex_list(&self, query: &Aabb) -> Vec<RoadConvex>;
    fn build_poly_list(&self, query: &Aabb) -> Vec<Triangle>;
}

impl Transformable for MeshRoad {
    fn transform(&self) -> &Affine3A {
        MeshRoad::transform(self)
    }

    fn set_transform(&mut self, transform: Affine3A) {
        MeshRoad::set_transform(self, transform);
    }

    fn world_bounds(&self) -> Option<Aabb> {
        MeshRoad::world_bounds(self)
    }
}

impl Networked for MeshRoad {
    fn dirty_mask(&self) -> RoadMask {
        self.dirty()
    }

    fn pack_dirty(&mut self, writer: &mut PacketWriter, lists: &mut NodeListManager) -> RoadMask {
        MeshRoad::pack_dirty(self, writer, lists)
    }

    fn unpack(
        &mut self,
        reader: &mut PacketReader<'_>,
        lists: &mut NodeListManager,
        ghost: GhostId,
    ) -> Result<UpdateOutcome, NetError> {
        let outcome = self.unpack_update(reader, lists, ghost)?;
        if outcome.ready_to_regenerate() {
            if let Err(err) = self.regenerate() {
                tracing::warn!(%ghost, %err, "regeneration after update failed");
            }
        }
        Ok(outcome)
    }
}

impl Renderable for MeshRoad {
    fn buffers(&self) -> &[GeometryBuffer] {
        &self.geometry().buffers
    }

    fn material_ids(&self, library: &MaterialLibrary) -> Vec<MaterialId> {
        library.resolve_road(&self.params().materials).to_vec()
    }
}

impl Collidable for MeshRoad {
    fn contains_point(&self, point: Vec3) -> bool {
        MeshRoad::contains_point(self, point)
    }

    fn cast_ray(&self, start: Vec3, end: Vec3) -> Option<RayHit> {
        MeshRoad::cast_ray(self, start, end)
    }

    fn build_convex_list(&self, query: &Aabb) -> Vec<RoadConvex> {
        MeshRoad::build_convex_list(self, query)
    }

    fn build_poly_list(&self, query: &Aabb) -> Vec<Triangle> {
        MeshRoad::build_poly_list(self, query)
    }
}
