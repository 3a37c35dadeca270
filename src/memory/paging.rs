/*!
 * Paging
 * Uniform frames handed out per logical page, recorded in page tables
 */

use super::address_space::AddressSpace;
use super::traits::BackingStore;
use super::types::*;
use crate::core::types::{MemoryId, Size};
use crate::core::units::format_bytes;
use log::{info, warn};

/// Paging backing store
#[derive(Debug, Clone)]
pub struct PageAllocator {
    space: AddressSpace,
    page_size: Size,
    frames: Vec<Frame>,
    /// User space past the last whole frame; never allocatable
    tail: Option<Partition>,
}

impl PageAllocator {
    pub fn new(space: AddressSpace, page_size: Size) -> MemoryResult<Self> {
        if page_size == 0 {
            return Err(MemoryError::InvalidRequest(
                "page size must be non-zero".to_string(),
            ));
        }

        let base = space.user_start();
        let count = space.user_size() / page_size;
        let frames: Vec<Frame> = (0..count)
            .map(|id| Frame::new(id, base + id * page_size, page_size))
            .collect();

        let covered = count * page_size;
        let leftover = space.user_size() - covered;
        let tail = (leftover > 0)
            .then(|| Partition::reserved(base + covered, leftover, Owner::Fragment));

        info!(
            "Paging initialized: {} frames of {}, {} unusable tail",
            count,
            format_bytes(page_size),
            format_bytes(leftover)
        );
        Ok(Self {
            space,
            page_size,
            frames,
            tail,
        })
    }

    pub fn page_size(&self) -> Size {
        self.page_size
    }

    pub fn free_frames(&self) -> usize {
        self.frames.iter().filter(|frame| frame.is_free()).count()
    }

    /// Pages each segment needs, rounded up; zero-size segments need none
    pub fn pages_for(&self, size: Size) -> usize {
        size.div_ceil(self.page_size)
    }
}

impl BackingStore for PageAllocator {
    fn technique(&self) -> Technique {
        Technique::Paging
    }

    fn allocate(&mut self, request: &AllocationRequest) -> MemoryResult<Placement> {
        request.checked_size()?;
        let needed: usize = request
            .placeable_segments()
            .map(|segment| self.pages_for(segment.size))
            .sum();
        let available = self.free_frames();

        if available < needed {
            warn!(
                "{} needs {} pages but only {} frames are free",
                request.instance_name, needed, available
            );
            return Err(MemoryError::InsufficientMemory {
                requested: needed.saturating_mul(self.page_size),
                largest_free: if available > 0 { self.page_size } else { 0 },
                total_free: available * self.page_size,
            });
        }

        let free: Vec<usize> = self
            .frames
            .iter()
            .filter(|frame| frame.is_free())
            .map(|frame| frame.id)
            .take(needed)
            .collect();
        let mut free = free.into_iter();
        let mut table = Vec::with_capacity(needed);

        for segment in request.placeable_segments() {
            for page in 0..self.pages_for(segment.size) {
                let Some(frame_id) = free.next() else {
                    unreachable!("free frame count checked above");
                };
                let used = (segment.size - page * self.page_size).min(self.page_size);
                self.frames[frame_id].assign(request.tag(Some(&segment.name), segment.requested(used)), page);
                table.push(PageTableEntry {
                    segment: segment.name.clone(),
                    logical_page: page,
                    frame_id,
                });
            }
        }

        info!(
            "Mapped {} pages for {} ({} frames still free)",
            table.len(),
            request.instance_name,
            self.free_frames()
        );
        Ok(Placement::Pages(table))
    }

    fn free_process(&mut self, memory_id: MemoryId) -> Size {
        let mut released = 0;
        for frame in self
            .frames
            .iter_mut()
            .filter(|frame| frame.is_owned_by(memory_id))
        {
            frame.clear();
            released += 1;
        }

        if released > 0 {
            info!(
                "Released {} frames held by memory id {}",
                released, memory_id
            );
        }
        released * self.page_size
    }

    fn partitions(&self) -> Vec<Partition> {
        let mut partitions = vec![self.space.os_partition()];
        partitions.extend(self.tail.clone());
        partitions
    }

    fn frames(&self) -> &[Frame] {
        &self.frames
    }

    fn total_memory(&self) -> Size {
        self.space.total()
    }
}
