/*!
 * Segmentation
 * One region per segment, placed as an all-or-nothing transaction
 */

use super::address_space::AddressSpace;
use super::dynamic::PartitionList;
use super::fit::FitPolicy;
use super::traits::BackingStore;
use super::types::*;
use crate::core::types::{MemoryId, Size};
use crate::core::units::{format_address, format_bytes};
use log::{info, warn};

/// Segments split regions whenever any remainder is left
const SEGMENT_SPLIT_THRESHOLD: Size = 0;

/// Segmentation backing store
#[derive(Debug, Clone)]
pub struct SegmentAllocator {
    space: AddressSpace,
    policy: FitPolicy,
    list: PartitionList,
}

impl SegmentAllocator {
    pub fn new(space: AddressSpace, policy: FitPolicy) -> Self {
        info!(
            "Segmentation initialized: {} user space ({})",
            format_bytes(space.user_size()),
            policy
        );
        Self {
            space,
            policy,
            list: PartitionList::from_partitions([
                space.os_partition(),
                Partition::free(space.user_start(), space.user_size()),
            ]),
        }
    }
}

impl BackingStore for SegmentAllocator {
    fn technique(&self) -> Technique {
        Technique::Segmentation
    }

    fn allocate(&mut self, request: &AllocationRequest) -> MemoryResult<Placement> {
        request.checked_size()?;
        let plan = match self.list.plan(request, self.policy, SEGMENT_SPLIT_THRESHOLD) {
            Ok(plan) => plan,
            Err(err) => {
                warn!(
                    "Segment placement for {} failed during verification: {}",
                    request.instance_name, err
                );
                return Err(err);
            }
        };

        let addresses = self
            .list
            .commit(request, &plan, self.policy, SEGMENT_SPLIT_THRESHOLD);

        for (segment, address) in request.placeable_segments().zip(&addresses) {
            info!(
                "Placed {} {} ({}) at {}",
                request.instance_name,
                segment.name,
                format_bytes(segment.size),
                format_address(*address)
            );
        }
        Ok(Placement::Regions(addresses))
    }

    fn free_process(&mut self, memory_id: MemoryId) -> Size {
        let freed = self.list.release_owned(memory_id);
        if freed > 0 {
            let merged = self.list.coalesce();
            info!(
                "Released {} of segments held by memory id {}, merged {} free holes",
                format_bytes(freed),
                memory_id,
                merged
            );
        }
        freed
    }

    fn partitions(&self) -> Vec<Partition> {
        self.list.layout()
    }

    fn total_memory(&self) -> Size {
        self.space.total()
    }
}
