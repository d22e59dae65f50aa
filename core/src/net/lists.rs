//! Chunked node list transfer
//!
//! The sending side splits a node list into events of bounded size. The
//! receiving side assembles them in any order; a completed list is either
//! claimed by the road update that references it, or parked until that
//! update arrives. An update that arrives first registers interest and
//! the list is handed out by [`NodeListManager::take_ready`] on completion.
//!
//! Receiver state is bounded: lists larger than [`MAX_NODE_LIST_NODES`] are
//! rejected, at most `max_pending` lists are held (oldest evicted first), and
//! finished ids are remembered so late duplicate chunks do not reassemble
//! a list nobody will claim.

use std::collections::VecDeque;

use hashbrown::{HashMap, HashSet};
use meshroad_shared::constants::{
    DEFAULT_NODES_PER_EVENT, MAX_NODE_LIST_NODES, MAX_PENDING_NODE_LISTS,
    RETIRED_NODE_LIST_HISTORY,
};
use meshroad_shared::{GhostId, NodeListId, NodeRecord};

use super::event::NodeListEvent;
use crate::error::NetError;

/// A completed list addressed to a waiting ghost
#[derive(Debug, Clone, PartialEq)]
pub struct NodeListDelivery {
    pub ghost: GhostId,
    pub list: NodeListId,
    pub nodes: Vec<NodeRecord>,
}

#[derive(Debug)]
struct PartialList {
    slots: Vec<Option<NodeRecord>>,
    filled: usize,
    stamp: u64,
}

impl PartialList {
    fn new(total: usize, stamp: u64) -> Self {
        Self {
            slots: vec![None; total],
            filled: 0,
            stamp,
        }
    }

    fn is_complete(&self) -> bool {
        self.filled == self.slots.len()
    }

    fn into_nodes(self) -> Vec<NodeRecord> {
        self.slots.into_iter().flatten().collect()
    }
}

/// Receiver entry tagged with the tick it was created at
#[derive(Debug)]
struct Stamped<T> {
    value: T,
    stamp: u64,
}

#[derive(Debug)]
pub struct NodeListManager {
    nodes_per_event: usize,
    next_id: u32,
    outgoing: VecDeque<NodeListEvent>,
    max_pending: usize,
    clock: u64,
    assembling: HashMap<NodeListId, PartialList>,
    /// Complete, not yet claimed
    completed: HashMap<NodeListId, Stamped<Vec<NodeRecord>>>,
    /// Claimed before completion
    waiting: HashMap<NodeListId, Stamped<GhostId>>,
    /// Claimed, delivered, cancelled or evicted
    retired: HashSet<NodeListId>,
    retired_order: VecDeque<NodeListId>,
    ready: Vec<NodeListDelivery>,
}

impl Default for NodeListManager {
    fn default() -> Self {
        Self::new(DEFAULT_NODES_PER_EVENT)
    }
}

impl NodeListManager {
    pub fn new(nodes_per_event: usize) -> Self {
        Self {
            nodes_per_event: nodes_per_event.max(1),
            next_id: 0,
            outgoing: VecDeque::new(),
            max_pending: MAX_PENDING_NODE_LISTS,
            clock: 0,
            assembling: HashMap::new(),
            completed: HashMap::new(),
            waiting: HashMap::new(),
            retired: HashSet::new(),
            retired_order: VecDeque::new(),
            ready: Vec::new(),
        }
    }

    /// Limit on lists held at once while receiving
    pub fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = max_pending.max(1);
        self
    }

    pub fn nodes_per_event(&self) -> usize {
        self.nodes_per_event
    }

    // ========================================================================
    // Sending
    // ========================================================================

    /// Split `nodes` into events and queue them for sending
    pub fn queue_list(&mut self, nodes: &[NodeRecord]) -> NodeListId {
        let id = NodeListId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);

        if nodes.len() > MAX_NODE_LIST_NODES as usize {
            tracing::warn!(list = %id, nodes = nodes.len(), "node list exceeds receiver limit");
        }

        let total = nodes.len() as u32;
        let mut start = 0u32;
        for chunk in nodes.chunks(self.nodes_per_event) {
            self.outgoing.push_back(NodeListEvent {
                list_id: id,
                total_nodes: total,
                start,
                nodes: chunk.to_vec(),
            });
            start += chunk.len() as u32;
        }

        tracing::debug!(
            list = %id,
            nodes = nodes.len(),
            events = nodes.len().div_ceil(self.nodes_per_event),
            "queued node list"
        );

        id
    }

    /// Events waiting to be sent, oldest first
    pub fn drain_outgoing(&mut self) -> Vec<NodeListEvent> {
        self.outgoing.drain(..).collect()
    }

    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }

    // ========================================================================
    // Receiving
    // ========================================================================

    /// Assemble one event. Returns the list id when this event completed it.
    ///
    /// Duplicate chunks are ignored, as are chunks for lists that already
    /// completed or were retired.
    pub fn receive(&mut self, event: NodeListEvent) -> Result<Option<NodeListId>, NetError> {
        let id = event.list_id;
        if self.retired.contains(&id) || self.completed.contains_key(&id) {
            return Ok(None);
        }

        let total = event.total_nodes;
        if total > MAX_NODE_LIST_NODES {
            return Err(NetError::ListTooLarge {
                list: id.0,
                total,
                max: MAX_NODE_LIST_NODES,
            });
        }

        let Some(end) = event.end().filter(|&end| end <= total) else {
            return Err(NetError::ChunkOutOfRange {
                start: event.start,
                end: u64::from(event.start) + event.nodes.len() as u64,
                total,
            });
        };

        if !self.assembling.contains_key(&id) {
            self.make_room();
            let stamp = self.tick();
            self.assembling.insert(id, PartialList::new(total as usize, stamp));
        }
        let Some(partial) = self.assembling.get_mut(&id) else {
            return Ok(None);
        };
        if partial.slots.len() != total as usize {
            return Err(NetError::ListSizeMismatch {
                list: id.0,
                expected: partial.slots.len() as u32,
                actual: total,
            });
        }

        let range = event.start as usize..end as usize;
        for (slot, node) in partial.slots[range].iter_mut().zip(event.nodes) {
            if slot.is_none() {
                *slot = Some(node);
                partial.filled += 1;
            }
        }

        if !partial.is_complete() {
            return Ok(None);
        }

        let Some(partial) = self.assembling.remove(&id) else {
            return Ok(None);
        };
        let stamp = partial.stamp;
        let nodes = partial.into_nodes();
        tracing::debug!(list = %id, nodes = nodes.len(), "node list complete");

        match self.waiting.remove(&id) {
            Some(waiting) => {
                self.retire(id);
                self.ready.push(NodeListDelivery {
                    ghost: waiting.value,
                    list: id,
                    nodes,
                });
            }
            None => {
                self.completed.insert(id, Stamped { value: nodes, stamp });
            }
        }

        Ok(Some(id))
    }

    /// Take a completed list now, or register `ghost` to receive it on completion
    pub fn claim_or_wait(&mut self, list: NodeListId, ghost: GhostId) -> Option<Vec<NodeRecord>> {
        if let Some(parked) = self.completed.remove(&list) {
            self.retire(list);
            return Some(parked.value);
        }
        if self.retired.contains(&list) {
            tracing::warn!(%ghost, %list, "claim for a retired node list");
            return None;
        }
        if !self.waiting.contains_key(&list) {
            self.make_room();
        }
        let stamp = self.tick();
        self.waiting.insert(list, Stamped { value: ghost, stamp });
        None
    }

    /// Drop every list `ghost` is waiting on, including completed ones not
    /// yet taken. Called when newer nodes supersede them.
    ///
    /// Returns the number of lists dropped.
    pub fn cancel_waiting(&mut self, ghost: GhostId) -> usize {
        let stale: Vec<NodeListId> = self
            .waiting
            .iter()
            .filter(|(_, w)| w.value == ghost)
            .map(|(&id, _)| id)
            .collect();
        for &id in &stale {
            self.forget(id);
        }

        let before = self.ready.len();
        self.ready.retain(|d| d.ghost != ghost);
        let dropped = stale.len() + before - self.ready.len();
        if dropped > 0 {
            tracing::debug!(%ghost, dropped, "cancelled superseded node lists");
        }
        dropped
    }

    /// Lists completed for ghosts that were waiting on them
    pub fn take_ready(&mut self) -> Vec<NodeListDelivery> {
        std::mem::take(&mut self.ready)
    }

    pub fn is_assembling(&self, list: NodeListId) -> bool {
        self.assembling.contains_key(&list)
    }

    /// Lists held while assembling, parked or awaited
    pub fn pending_lists(&self) -> usize {
        self.assembling.len()
            + self.completed.len()
            + self
                .waiting
                .keys()
                .filter(|id| !self.assembling.contains_key(*id))
                .count()
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn make_room(&mut self) {
        while self.pending_lists() >= self.max_pending {
            let oldest = self
                .assembling
                .iter()
                .map(|(&id, p)| (id, p.stamp))
                .chain(self.completed.iter().map(|(&id, p)| (id, p.stamp)))
                .chain(self.waiting.iter().map(|(&id, w)| (id, w.stamp)))
                .min_by_key(|&(_, stamp)| stamp);
            let Some((id, _)) = oldest else {
                break;
            };
            tracing::warn!(list = %id, "evicting stale node list");
            self.forget(id);
        }
    }

    fn forget(&mut self, id: NodeListId) {
        self.assembling.remove(&id);
        self.completed.remove(&id);
        self.waiting.remove(&id);
        self.retire(id);
    }

    fn retire(&mut self, id: NodeListId) {
        if !self.retired.insert(id) {
            return;
        }
        self.retired_order.push_back(id);
        if self.retired_order.len() > RETIRED_NODE_LIST_HISTORY
            && let Some(old) = self.retired_order.pop_front()
        {
            self.retired.remove(&old);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(count: usize) -> Vec<NodeRecord> {
        (0..count)
            .map(|i| NodeRecord::new([i as f32, 2.0 * i as f32, 0.0], 10.0, 5.0, [0.0, 0.0, 1.0]))
            .collect()
    }

    #[test]
    fn chunks_respect_event_size() {
        let mut sender = NodeListManager::new(4);
        let id = sender.queue_list(&nodes(10));
        let events = sender.drain_outgoing();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events.iter().map(|e| (e.start, e.nodes.len())).collect::<Vec<_>>(),
            vec![(0, 4), (4, 4), (8, 2)]
        );
        assert!(events.iter().all(|e| e.list_id == id && e.total_nodes == 10));
        assert!(!sender.has_outgoing());
        assert_ne!(sender.queue_list(&nodes(1)), id);
    }

    #[test]
    fn out_of_order_assembly_then_claim() {
        let source = nodes(10);
        let mut sender = NodeListManager::new(3);
        let id = sender.queue_list(&source);
        let mut events = sender.drain_outgoing();
        events.reverse();

        let mut receiver = NodeListManager::default();
        let last = events.len() - 1;
        for (i, ev) in events.into_iter().enumerate() {
            let done = receiver.receive(ev).unwrap();
            assert_eq!(done.is_some(), i == last);
        }
        assert_eq!(receiver.claim_or_wait(id, GhostId(1)), Some(source));
        assert!(receiver.take_ready().is_empty());
    }

    #[test]
    fn claim_before_completion_waits() {
        let source = nodes(5);
        let mut sender = NodeListManager::new(2);
        let id = sender.queue_list(&source);
        let events = sender.drain_outgoing();

        let mut receiver = NodeListManager::default();
        receiver.receive(events[0].clone()).unwrap();
        assert!(receiver.is_assembling(id));
        assert_eq!(receiver.claim_or_wait(id, GhostId(9)), None);

        // Duplicate chunk changes nothing
        receiver.receive(events[0].clone()).unwrap();
        for ev in events.into_iter().skip(1) {
            receiver.receive(ev).unwrap();
        }

        let ready = receiver.take_ready();
        assert_eq!(
            ready,
            vec![NodeListDelivery {
                ghost: GhostId(9),
                list: id,
                nodes: source,
            }]
        );
    }

    #[test]
    fn inconsistent_chunks_are_rejected() {
        let mut receiver = NodeListManager::default();
        let bad = NodeListEvent {
            list_id: NodeListId(1),
            total_nodes: 2,
            start: 1,
            nodes: nodes(2),
        };
        assert!(matches!(
            receiver.receive(bad),
            Err(NetError::ChunkOutOfRange {
                start: 1,
                end: 3,
                total: 2
            })
        ));

        let first = NodeListEvent {
            list_id: NodeListId(2),
            total_nodes: 4,
            start: 0,
            nodes: nodes(2),
        };
        let mismatched = NodeListEvent {
            list_id: NodeListId(2),
            total_nodes: 5,
            start: 2,
            nodes: nodes(2),
        };
        assert_eq!(receiver.receive(first).unwrap(), None);
        assert!(matches!(
            receiver.receive(mismatched),
            Err(NetError::ListSizeMismatch { list: 2, .. })
        ));
    }

    fn chunk(list: u32, total: u32, start: u32, count: usize) -> NodeListEvent {
        NodeListEvent {
            list_id: NodeListId(list),
            total_nodes: total,
            start,
            nodes: nodes(count),
        }
    }

    #[test]
    fn chunk_start_near_u32_max_is_out_of_range() {
        let mut receiver = NodeListManager::default();
        let result = receiver.receive(chunk(3, 5, u32::MAX, 1));
        assert!(matches!(
            result,
            Err(NetError::ChunkOutOfRange {
                start: u32::MAX,
                end,
                total: 5
            }) if end == u64::from(u32::MAX) + 1
        ));
        assert!(!receiver.is_assembling(NodeListId(3)));
        assert_eq!(receiver.pending_lists(), 0);
    }

    #[test]
    fn oversized_lists_are_rejected() {
        let mut receiver = NodeListManager::default();
        assert!(matches!(
            receiver.receive(chunk(4, u32::MAX, 0, 0)),
            Err(NetError::ListTooLarge { list: 4, .. })
        ));
        assert_eq!(receiver.pending_lists(), 0);

        assert_eq!(receiver.receive(chunk(5, MAX_NODE_LIST_NODES, 0, 2)).unwrap(), None);
        assert!(receiver.is_assembling(NodeListId(5)));
    }

    #[test]
    fn late_duplicates_after_claim_are_ignored() {
        let mut receiver = NodeListManager::default();
        let id = NodeListId(6);
        assert_eq!(receiver.receive(chunk(6, 3, 0, 3)).unwrap(), Some(id));
        assert_eq!(receiver.claim_or_wait(id, GhostId(1)), Some(nodes(3)));

        assert_eq!(receiver.receive(chunk(6, 3, 0, 3)).unwrap(), None);
        assert_eq!(receiver.pending_lists(), 0);

        // Nothing will arrive again, so nothing waits on it
        assert_eq!(receiver.claim_or_wait(id, GhostId(1)), None);
        assert_eq!(receiver.pending_lists(), 0);
    }

    #[test]
    fn oldest_lists_are_evicted() {
        let mut receiver = NodeListManager::default().with_max_pending(2);
        receiver.receive(chunk(1, 4, 0, 2)).unwrap();
        receiver.receive(chunk(2, 4, 0, 2)).unwrap();
        receiver.receive(chunk(3, 4, 0, 2)).unwrap();

        assert!(!receiver.is_assembling(NodeListId(1)));
        assert!(receiver.is_assembling(NodeListId(2)));
        assert!(receiver.is_assembling(NodeListId(3)));
        assert_eq!(receiver.pending_lists(), 2);

        // The evicted list does not start over
        assert_eq!(receiver.receive(chunk(1, 4, 2, 2)).unwrap(), None);
        assert!(!receiver.is_assembling(NodeListId(1)));

        // Waiting on a list that has not started also takes a slot
        assert_eq!(receiver.claim_or_wait(NodeListId(9), GhostId(1)), None);
        assert!(!receiver.is_assembling(NodeListId(2)));
        assert_eq!(receiver.pending_lists(), 2);
    }

    #[test]
    fn cancelled_claims_are_not_delivered() {
        let mut receiver = NodeListManager::default();

        // Still assembling when cancelled
        receiver.receive(chunk(1, 4, 0, 2)).unwrap();
        assert_eq!(receiver.claim_or_wait(NodeListId(1), GhostId(7)), None);
        assert_eq!(receiver.cancel_waiting(GhostId(7)), 1);
        assert_eq!(receiver.receive(chunk(1, 4, 2, 2)).unwrap(), None);
        assert!(receiver.take_ready().is_empty());

        // Completed but not yet taken
        assert_eq!(receiver.claim_or_wait(NodeListId(2), GhostId(7)), None);
        assert_eq!(receiver.claim_or_wait(NodeListId(3), GhostId(8)), None);
        receiver.receive(chunk(2, 1, 0, 1)).unwrap();
        receiver.receive(chunk(3, 1, 0, 1)).unwrap();
        assert_eq!(receiver.cancel_waiting(GhostId(7)), 1);

        let ready = receiver.take_ready();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].ghost, GhostId(8));
        assert_eq!(receiver.pending_lists(), 0);
    }
}
