/*!
 * Dynamic Partitioning
 *
 * Variable-size partitions carved on demand from an address-ordered list.
 *
 * ## Behaviour
 *
 * - **Splitting**: a chosen free region gives its head to the request and
 *   keeps the tail free, unless the tail is no larger than the split threshold
 * - **Coalescing**: after every free, adjacent free regions are merged so no
 *   two neighbours are ever both free
 * - **Compaction**: when enabled, occupied regions slide down behind the OS
 *   region and all free space collects in one trailing region
 */

mod compaction;
mod list;

pub use list::{Iter, NodeId, PartitionList};

use super::address_space::AddressSpace;
use super::fit::FitPolicy;
use super::static_partition::insufficient;
use super::traits::BackingStore;
use super::types::*;
use crate::core::types::{MemoryId, Size};
use crate::core::units::{format_address, format_bytes};
use log::{debug, info};

/// Dynamic partitioning backing store
#[derive(Debug, Clone)]
pub struct DynamicPartitioner {
    pub(super) space: AddressSpace,
    pub(super) policy: FitPolicy,
    pub(super) split_threshold: Size,
    pub(super) compaction_enabled: bool,
    pub(super) list: PartitionList,
}

impl DynamicPartitioner {
    pub fn new(space: AddressSpace, policy: FitPolicy) -> Self {
        info!(
            "Dynamic partitioning initialized: {} user space starting at {} ({})",
            format_bytes(space.user_size()),
            format_address(space.user_start()),
            policy
        );
        Self {
            space,
            policy,
            split_threshold: 0,
            compaction_enabled: false,
            list: PartitionList::from_partitions([
                space.os_partition(),
                Partition::free(space.user_start(), space.user_size()),
            ]),
        }
    }

    /// Absorb remainders of at most `threshold` bytes instead of splitting them off
    pub fn with_split_threshold(mut self, threshold: Size) -> Self {
        self.split_threshold = threshold;
        self
    }

    pub fn with_compaction(mut self, enabled: bool) -> Self {
        self.compaction_enabled = enabled;
        self
    }

    pub fn list(&self) -> &PartitionList {
        &self.list
    }
}

impl BackingStore for DynamicPartitioner {
    fn technique(&self) -> Technique {
        Technique::Dynamic
    }

    fn allocate(&mut self, request: &AllocationRequest) -> MemoryResult<Placement> {
        let requested = request.checked_size()?;
        let chosen = self
            .policy
            .select(self.list.iter(), requested)
            .ok_or_else(|| insufficient(self.list.iter().map(|(_, p)| p), requested))?;

        debug!(
            "{} chose region at {} for {} bytes",
            self.policy,
            self.list.get(chosen).map_or(0, |p| p.address),
            requested
        );

        let tag = request.tag(None, request.requested_size());
        let address = self
            .list
            .split_allocate(chosen, requested, tag, self.split_threshold)
            .ok_or_else(|| insufficient(self.list.iter().map(|(_, p)| p), requested))?;

        info!(
            "Allocated {} at {} for {}",
            format_bytes(requested),
            format_address(address),
            request.instance_name
        );
        Ok(Placement::Regions(vec![address]))
    }

    fn free_process(&mut self, memory_id: MemoryId) -> Size {
        let freed = self.list.release_owned(memory_id);
        if freed == 0 {
            return 0;
        }

        let merged = self.list.coalesce();
        info!(
            "Released {} held by memory id {}, coalesced {} adjacent free regions ({} regions total)",
            format_bytes(freed),
            memory_id,
            merged,
            self.list.len()
        );
        freed
    }

    fn compact(&mut self) -> MemoryResult<Compaction> {
        if !self.compaction_enabled {
            return Err(MemoryError::InvalidRequest(
                "compaction is disabled for this configuration".to_string(),
            ));
        }
        Ok(self.compact_layout())
    }

    fn partitions(&self) -> Vec<Partition> {
        self.list.layout()
    }

    fn total_memory(&self) -> Size {
        self.space.total()
    }
}
