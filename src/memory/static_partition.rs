/*!
 * Static Partitioning
 * Partitions carved once at initialization, never split or merged
 */

use super::address_space::AddressSpace;
use super::fit::FitPolicy;
use super::traits::BackingStore;
use super::types::*;
use crate::core::types::{MemoryId, Size};
use crate::core::units::{format_address, format_bytes};
use log::{debug, info};

/// Fixed or variable static partitions
#[derive(Debug, Clone)]
pub struct StaticPartitioner {
    space: AddressSpace,
    technique: Technique,
    policy: FitPolicy,
    partitions: Vec<Partition>,
}

impl StaticPartitioner {
    /// Divide user space into equal partitions of `partition_size`
    pub fn fixed(space: AddressSpace, partition_size: Size, policy: FitPolicy) -> MemoryResult<Self> {
        let user_space = space.user_size();
        if partition_size == 0 || user_space % partition_size != 0 {
            return Err(MemoryError::InvalidPartitionSize {
                partition_size,
                user_space,
            });
        }

        let count = user_space / partition_size;
        let sizes = vec![partition_size; count];
        info!(
            "Static-fixed partitioning: {} partitions of {}",
            count,
            format_bytes(partition_size)
        );
        Ok(Self::build(space, Technique::StaticFixed, policy, &sizes))
    }

    /// Lay out caller-supplied partition sizes in order; leftover user space becomes one extra partition
    pub fn variable(space: AddressSpace, sizes: &[Size], policy: FitPolicy) -> MemoryResult<Self> {
        if sizes.iter().any(|&size| size == 0) {
            return Err(MemoryError::InvalidRequest(
                "variable partitions must have a non-zero size".to_string(),
            ));
        }

        let user_space = space.user_size();
        let requested = sizes
            .iter()
            .try_fold(0usize, |total, &size| total.checked_add(size))
            .filter(|&requested| requested <= user_space)
            .ok_or_else(|| {
                MemoryError::InvalidRequest(format!(
                    "variable partitions do not fit in {} bytes of user space",
                    user_space
                ))
            })?;

        let mut layout = sizes.to_vec();
        if requested < user_space {
            layout.push(user_space - requested);
        }
        info!(
            "Static-variable partitioning: {} partitions over {}",
            layout.len(),
            format_bytes(user_space)
        );
        Ok(Self::build(space, Technique::StaticVariable, policy, &layout))
    }

    /// Store left behind by a failed initialization: OS region plus one unusable span
    pub fn unpartitioned(space: AddressSpace, technique: Technique) -> Self {
        Self {
            space,
            technique,
            policy: FitPolicy::default(),
            partitions: space.os_only_layout(),
        }
    }

    fn build(space: AddressSpace, technique: Technique, policy: FitPolicy, sizes: &[Size]) -> Self {
        let mut partitions = Vec::with_capacity(sizes.len() + 1);
        partitions.push(space.os_partition());

        let mut address = space.user_start();
        for &size in sizes {
            partitions.push(Partition::free(address, size));
            address += size;
        }

        Self {
            space,
            technique,
            policy,
            partitions,
        }
    }
}

impl BackingStore for StaticPartitioner {
    fn technique(&self) -> Technique {
        self.technique
    }

    fn allocate(&mut self, request: &AllocationRequest) -> MemoryResult<Placement> {
        let requested = request.checked_size()?;
        let index = self
            .policy
            .select(self.partitions.iter().enumerate(), requested)
            .ok_or_else(|| insufficient(&self.partitions, requested))?;

        let partition = &mut self.partitions[index];
        partition.occupy(request.tag(None, request.requested_size()));
        debug!(
            "{} picked partition {} ({}) for {}",
            self.policy,
            index,
            format_bytes(partition.size),
            request.instance_name
        );
        info!(
            "Allocated static partition at {} to {}: {} used of {}, {} internal fragmentation",
            format_address(partition.address),
            request.instance_name,
            format_bytes(requested),
            format_bytes(partition.size),
            format_bytes(partition.internal_fragmentation())
        );

        Ok(Placement::Regions(vec![partition.address]))
    }

    fn free_process(&mut self, memory_id: MemoryId) -> Size {
        let mut freed = 0;
        for partition in self
            .partitions
            .iter_mut()
            .filter(|partition| partition.is_owned_by(memory_id))
        {
            freed += partition.size;
            partition.release();
        }

        if freed > 0 {
            info!(
                "Released {} of static partitions held by memory id {}",
                format_bytes(freed),
                memory_id
            );
        }
        freed
    }

    fn partitions(&self) -> Vec<Partition> {
        self.partitions.clone()
    }

    fn total_memory(&self) -> Size {
        self.space.total()
    }
}

/// Failure report for a request no free partition can hold
pub(crate) fn insufficient<'a>(
    partitions: impl IntoIterator<Item = &'a Partition>,
    requested: Size,
) -> MemoryError {
    let (largest_free, total_free) = partitions
        .into_iter()
        .filter(|partition| partition.is_free())
        .fold((0, 0), |(largest, total), partition| {
            (largest.max(partition.size), total + partition.size)
        });

    MemoryError::InsufficientMemory {
        requested,
        largest_free,
        total_free,
    }
}
