/*!
 * Partition List
 * Address-ordered doubly-linked partitions stored in an index arena
 */

use super::super::fit::FitPolicy;
use super::super::static_partition::insufficient;
use super::super::types::{AllocationRequest, MemoryResult, Partition, ProcessTag};
use crate::core::types::{Address, MemoryId, Size};

/// Stable handle of a node inside one list.
///
/// Handles stay valid until their node is merged away; clones of a list hand
/// out the same handles for the same sequence of operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct Node {
    partition: Partition,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

/// Doubly-linked sequence of partitions with explicit prev/next indices
#[derive(Debug, Clone, Default)]
pub struct PartitionList {
    slots: Vec<Option<Node>>,
    vacant: Vec<usize>,
    head: Option<NodeId>,
    tail: Option<NodeId>,
    len: usize,
}

impl PartitionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_partitions(partitions: impl IntoIterator<Item = Partition>) -> Self {
        let mut list = Self::new();
        for partition in partitions {
            list.push_back(partition);
        }
        list
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, id: NodeId) -> Option<&Partition> {
        self.node(id).map(|node| &node.partition)
    }

    pub fn next_of(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|node| node.next)
    }

    pub fn prev_of(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|node| node.prev)
    }

    /// Walk the list from lowest to highest address
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    /// Copy of the partitions in address order
    pub fn layout(&self) -> Vec<Partition> {
        self.iter().map(|(_, partition)| partition.clone()).collect()
    }

    pub fn push_back(&mut self, partition: Partition) -> NodeId {
        let id = self.alloc_slot(Node {
            partition,
            prev: self.tail,
            next: None,
        });

        match self.tail {
            Some(tail) => self.node_mut(tail).next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        id
    }

    fn insert_after(&mut self, at: NodeId, partition: Partition) -> NodeId {
        let next = self.next_of(at);
        let id = self.alloc_slot(Node {
            partition,
            prev: Some(at),
            next,
        });

        self.node_mut(at).next = Some(id);
        match next {
            Some(next) => self.node_mut(next).prev = Some(id),
            None => self.tail = Some(id),
        }
        id
    }

    fn unlink(&mut self, id: NodeId) -> Option<Partition> {
        let node = self.slots.get_mut(id.0)?.take()?;

        match node.prev {
            Some(prev) => self.node_mut(prev).next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => self.node_mut(next).prev = node.prev,
            None => self.tail = node.prev,
        }

        self.vacant.push(id.0);
        self.len -= 1;
        Some(node.partition)
    }

    /// Occupy the head of a free node with `size` bytes.
    ///
    /// The remainder becomes a new free node right after it when larger than
    /// `split_threshold`, otherwise the whole node is consumed. Returns the
    /// node's start address.
    pub fn split_allocate(
        &mut self,
        id: NodeId,
        size: Size,
        tag: ProcessTag,
        split_threshold: Size,
    ) -> Option<Address> {
        let partition = &mut self.node_mut_checked(id)?.partition;
        if !partition.is_free() || partition.size < size {
            return None;
        }

        let address = partition.address;
        let remainder = partition.size - size;
        partition.occupy(tag);

        if remainder > split_threshold {
            partition.size = size;
            self.insert_after(id, Partition::free(address + size, remainder));
        }
        Some(address)
    }

    /// Mark every node owned by `memory_id` free, returning the bytes released
    pub fn release_owned(&mut self, memory_id: MemoryId) -> Size {
        let owned: Vec<NodeId> = self
            .iter()
            .filter(|(_, partition)| partition.is_owned_by(memory_id))
            .map(|(id, _)| id)
            .collect();

        let mut freed = 0;
        for id in owned {
            if let Some(node) = self.node_mut_checked(id) {
                freed += node.partition.size;
                node.partition.release();
            }
        }
        freed
    }

    /// Merge every run of adjacent free nodes into one, returning the merge count
    pub fn coalesce(&mut self) -> usize {
        let mut merged = 0;
        let mut cursor = self.head;

        while let Some(id) = cursor {
            let next = self.next_of(id);
            let absorb = match next {
                Some(next) => self.is_free_node(id) && self.is_free_node(next),
                None => false,
            };

            match (absorb, next) {
                (true, Some(next)) => {
                    if let Some(absorbed) = self.unlink(next) {
                        self.node_mut(id).partition.size += absorbed.size;
                        merged += 1;
                    }
                    // Stay on `id`: its new successor may be free too
                }
                _ => cursor = next,
            }
        }
        merged
    }

    /// Dry-run a multi-segment allocation on a clone of this list.
    ///
    /// Returns the node each placeable segment would take, in segment order,
    /// or the error of the first segment that finds no region. `self` is never
    /// touched; `commit` replays the plan.
    pub fn plan(
        &self,
        request: &AllocationRequest,
        policy: FitPolicy,
        split_threshold: Size,
    ) -> MemoryResult<Vec<NodeId>> {
        let mut scratch = self.clone();
        let mut steps = Vec::new();

        for segment in request.placeable_segments() {
            let chosen = policy
                .select(scratch.iter(), segment.size)
                .ok_or_else(|| insufficient(scratch.iter().map(|(_, p)| p), segment.size))?;
            scratch.split_allocate(
                chosen,
                segment.size,
                request.tag(Some(&segment.name), segment.requested(segment.size)),
                split_threshold,
            );
            steps.push(chosen);
        }
        Ok(steps)
    }

    /// Apply a plan produced by `plan` on an identical list
    pub fn commit(
        &mut self,
        request: &AllocationRequest,
        plan: &[NodeId],
        policy: FitPolicy,
        split_threshold: Size,
    ) -> Vec<Address> {
        let mut addresses = Vec::with_capacity(plan.len());
        for (segment, &id) in request.placeable_segments().zip(plan) {
            debug_assert_eq!(policy.select(self.iter(), segment.size), Some(id));
            if let Some(address) = self.split_allocate(
                id,
                segment.size,
                request.tag(Some(&segment.name), segment.requested(segment.size)),
                split_threshold,
            ) {
                addresses.push(address);
            }
        }
        addresses
    }

    fn is_free_node(&self, id: NodeId) -> bool {
        self.get(id).map_or(false, Partition::is_free)
    }

    fn alloc_slot(&mut self, node: Node) -> NodeId {
        self.len += 1;
        match self.vacant.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                NodeId(slot)
            }
            None => {
                self.slots.push(Some(node));
                NodeId(self.slots.len() - 1)
            }
        }
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    fn node_mut_checked(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Links only ever point at live slots
    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        match self.slots[id.0].as_mut() {
            Some(node) => node,
            None => unreachable!("dangling partition link {}", id.0),
        }
    }
}

/// Address-ordered iterator over `(NodeId, &Partition)`
pub struct Iter<'a> {
    list: &'a PartitionList,
    cursor: Option<NodeId>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (NodeId, &'a Partition);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let node = self.list.node(id)?;
        self.cursor = node.next;
        Some((id, &node.partition))
    }
}
