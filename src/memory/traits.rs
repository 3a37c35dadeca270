/*!
 * Memory Traits
 * Backing store abstractions
 */

use super::types::*;
use crate::core::types::{MemoryId, Size};

/// Anything a fit policy can choose between
pub trait Region {
    fn is_free(&self) -> bool;

    fn size(&self) -> Size;
}

impl Region for Partition {
    fn is_free(&self) -> bool {
        self.free
    }

    fn size(&self) -> Size {
        self.size
    }
}

/// A partitioning discipline owning every record of the address space
pub trait BackingStore: std::fmt::Debug {
    /// Discipline implemented by this store
    fn technique(&self) -> Technique;

    /// Place a request; on error the store is left untouched
    fn allocate(&mut self, request: &AllocationRequest) -> MemoryResult<Placement>;

    /// Release every record stamped with `memory_id`, returning the bytes freed
    fn free_process(&mut self, memory_id: MemoryId) -> Size;

    /// Relocate occupied regions to eliminate external fragmentation
    fn compact(&mut self) -> MemoryResult<Compaction> {
        Err(MemoryError::InvalidRequest(format!(
            "compaction is not available for {} partitioning",
            self.technique()
        )))
    }

    /// Address-ordered partitions (OS region and unusable spans included)
    fn partitions(&self) -> Vec<Partition>;

    /// Page frames, empty for region-based stores
    fn frames(&self) -> &[Frame] {
        &[]
    }

    /// Total bytes of the simulated address space
    fn total_memory(&self) -> Size;

    /// Partitions currently held by `memory_id`
    fn regions_of(&self, memory_id: MemoryId) -> Vec<Partition> {
        self.partitions()
            .into_iter()
            .filter(|partition| partition.is_owned_by(memory_id))
            .collect()
    }

    fn stats(&self) -> MemoryStats {
        MemoryStats::from_layout(self.total_memory(), &self.partitions(), self.frames())
    }
}
