//! Receiving side of road replication
//!
//! A [`ClientReplica`] owns the ghost roads of one connection and the
//! node list assembly for it. Packets for one connection are processed
//! serially, so none of this needs locking.

use hashbrown::HashMap;
use meshroad_shared::{GhostId, NodeListId};

use super::RoadMask;
use super::event::NodeListEvent;
use super::lists::{NodeListDelivery, NodeListManager};
use super::packet::PacketReader;
use crate::arena::{Arena, SlotIndex};
use crate::config::RoadConfig;
use crate::error::NetError;
use crate::road::{MeshRoad, UpdateOutcome};

/// Deliveries for unknown ghosts are retried this many times, then dropped
pub const MAX_DELIVERY_RETRIES: u32 = 8;

#[derive(Debug)]
struct DeferredDelivery {
    delivery: NodeListDelivery,
    attempts: u32,
}

#[derive(Debug)]
pub struct ClientReplica {
    config: RoadConfig,
    roads: Arena<MeshRoad>,
    ghosts: HashMap<GhostId, SlotIndex>,
    lists: NodeListManager,
    deferred: Vec<DeferredDelivery>,
}

impl Default for ClientReplica {
    fn default() -> Self {
        Self::new(RoadConfig::default())
    }
}

impl ClientReplica {
    pub fn new(config: RoadConfig) -> Self {
        let config = config.sanitized();
        Self {
            lists: NodeListManager::new(config.net.nodes_per_event),
            config,
            roads: Arena::new(),
            ghosts: HashMap::new(),
            deferred: Vec::new(),
        }
    }

    pub fn road(&self, ghost: GhostId) -> Option<&MeshRoad> {
        self.roads.get(*self.ghosts.get(&ghost)?)
    }

    pub fn ghost_count(&self) -> usize {
        self.roads.len()
    }

    /// Apply one road update, creating the ghost on first contact.
    ///
    /// A new ghost is only kept once its first update decodes.
    pub fn receive_update(&mut self, ghost: GhostId, bytes: &[u8]) -> Result<UpdateOutcome, NetError> {
        let mut reader = PacketReader::new(bytes);

        let existing = self
            .ghosts
            .get(&ghost)
            .and_then(|&slot| self.roads.get_mut(slot));
        let outcome = match existing {
            Some(road) => apply_update(road, &mut reader, &mut self.lists, ghost)?,
            None => {
                let mut road = MeshRoad::new(&self.config);
                let outcome = apply_update(&mut road, &mut reader, &mut self.lists, ghost)?;
                let slot = self.roads.insert(road);
                self.ghosts.insert(ghost, slot);
                tracing::debug!(%ghost, slot, "created road ghost");
                outcome
            }
        };

        // Deferred lists for this ghost are older than these nodes
        if outcome.mask.contains(RoadMask::NODE) {
            self.deferred.retain(|d| d.delivery.ghost != ghost);
        }

        Ok(outcome)
    }

    /// Feed one framed node list event
    pub fn receive_event(&mut self, bytes: &[u8]) -> Result<Option<NodeListId>, NetError> {
        let event = NodeListEvent::from_bytes(bytes)?;
        self.lists.receive(event)
    }

    /// Apply node lists that completed for waiting ghosts. Lists whose
    /// ghost is unknown are kept and retried on the next call.
    ///
    /// Returns the number of lists applied.
    pub fn process_deliveries(&mut self) -> usize {
        let mut pending: Vec<DeferredDelivery> = std::mem::take(&mut self.deferred);
        pending.extend(
            self.lists
                .take_ready()
                .into_iter()
                .map(|delivery| DeferredDelivery {
                    delivery,
                    attempts: 0,
                }),
        );

        let mut applied = 0;
        for mut entry in pending {
            let ghost = entry.delivery.ghost;
            let road = self
                .ghosts
                .get(&ghost)
                .and_then(|&slot| self.roads.get_mut(slot));

            match road {
                Some(road) => {
                    road.apply_node_records(&entry.delivery.nodes);
                    if let Err(err) = road.regenerate() {
                        tracing::warn!(%ghost, %err, "ghost regeneration failed, keeping previous geometry");
                    }
                    applied += 1;
                }
                None => {
                    entry.attempts += 1;
                    if entry.attempts >= MAX_DELIVERY_RETRIES {
                        tracing::warn!(%ghost, list = %entry.delivery.list, "dropping node list for unknown ghost");
                    } else {
                        tracing::warn!(%ghost, list = %entry.delivery.list, "node list for unknown ghost, deferring");
                        self.deferred.push(entry);
                    }
                }
            }
        }

        applied
    }

    /// Drop a ghost. Node lists it was waiting on stay claimed and are
    /// deferred if they complete before the ghost returns.
    pub fn remove_ghost(&mut self, ghost: GhostId) -> Option<MeshRoad> {
        let slot = self.ghosts.remove(&ghost)?;
        self.roads.remove(slot)
    }

    pub fn deferred_count(&self) -> usize {
        self.deferred.len()
    }
}

fn apply_update(
    road: &mut MeshRoad,
    reader: &mut PacketReader<'_>,
    lists: &mut NodeListManager,
    ghost: GhostId,
) -> Result<UpdateOutcome, NetError> {
    let outcome = road.unpack_update(reader, lists, ghost)?;
    if outcome.ready_to_regenerate() {
        if let Err(err) = road.regenerate() {
            tracing::warn!(%ghost, %err, "ghost regeneration failed, keeping previous geometry");
        }
    }
    Ok(outcome)
}
