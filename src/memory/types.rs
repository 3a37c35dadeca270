/*!
 * Memory Types
 * Common types for the simulated backing stores
 */

use crate::core::limits::{PRESSURE_CRITICAL, PRESSURE_HIGH, PRESSURE_MEDIUM};
use crate::core::types::{Address, InstanceId, MemoryId, Size};
use crate::core::units::{format_address, format_bytes};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Memory operation result
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Memory errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum MemoryError {
    #[error("Invalid partition size: {partition_size} bytes does not evenly divide {user_space} bytes of user space")]
    #[diagnostic(
        code(memory::invalid_partition_size),
        help("Pick a fixed partition size that divides the user space exactly.")
    )]
    InvalidPartitionSize { partition_size: Size, user_space: Size },

    #[error("Insufficient memory: requested {requested} bytes, largest free region {largest_free} bytes ({total_free} bytes free in total)")]
    #[diagnostic(
        code(memory::insufficient_memory),
        help("Remove running processes, or compact memory when using dynamic partitioning.")
    )]
    InsufficientMemory {
        requested: Size,
        largest_free: Size,
        total_free: Size,
    },

    #[error("Invalid request: {0}")]
    #[diagnostic(code(memory::invalid_request))]
    InvalidRequest(String),

    #[error("Process instance {0} not found")]
    #[diagnostic(
        code(memory::process_not_found),
        help("The instance may already have been removed.")
    )]
    ProcessNotFound(InstanceId),
}

/// Partitioning discipline backing the address space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Technique {
    StaticFixed,
    StaticVariable,
    Dynamic,
    Segmentation,
    Paging,
}

impl Technique {
    /// Plain (single-region) backings queue failed requests instead of rejecting them
    pub fn queues_on_failure(self) -> bool {
        matches!(
            self,
            Technique::StaticFixed | Technique::StaticVariable | Technique::Dynamic
        )
    }
}

impl fmt::Display for Technique {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Technique::StaticFixed => write!(f, "static-fixed"),
            Technique::StaticVariable => write!(f, "static-variable"),
            Technique::Dynamic => write!(f, "dynamic"),
            Technique::Segmentation => write!(f, "segmentation"),
            Technique::Paging => write!(f, "paging"),
        }
    }
}

/// Back-reference from a memory record to the instance holding it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessTag {
    pub memory_id: MemoryId,
    pub instance_name: String,
    pub segment: Option<String>,
    /// Bytes of the record actually requested by the process
    pub requested: Size,
}

/// Who holds a non-free partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Owner {
    Os,
    Process(ProcessTag),
    /// Paging tail shorter than a frame
    Fragment,
    /// User space left unpartitioned after a failed initialization
    Unpartitioned,
}

/// Contiguous span of the simulated address space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub address: Address,
    pub size: Size,
    pub free: bool,
    pub owner: Option<Owner>,
}

impl Partition {
    pub fn free(address: Address, size: Size) -> Self {
        Self {
            address,
            size,
            free: true,
            owner: None,
        }
    }

    /// Non-free span that no allocator may hand out
    pub fn reserved(address: Address, size: Size, owner: Owner) -> Self {
        Self {
            address,
            size,
            free: false,
            owner: Some(owner),
        }
    }

    pub fn end(&self) -> Address {
        self.address + self.size
    }

    pub fn is_free(&self) -> bool {
        self.free
    }

    pub fn occupy(&mut self, tag: ProcessTag) {
        self.free = false;
        self.owner = Some(Owner::Process(tag));
    }

    pub fn release(&mut self) {
        self.free = true;
        self.owner = None;
    }

    pub fn tag(&self) -> Option<&ProcessTag> {
        match &self.owner {
            Some(Owner::Process(tag)) => Some(tag),
            _ => None,
        }
    }

    pub fn memory_id(&self) -> Option<MemoryId> {
        self.tag().map(|tag| tag.memory_id)
    }

    pub fn is_owned_by(&self, memory_id: MemoryId) -> bool {
        !self.free && self.memory_id() == Some(memory_id)
    }

    /// Bytes held but not requested; the whole span for a paging tail
    pub fn internal_fragmentation(&self) -> Size {
        match &self.owner {
            Some(Owner::Process(tag)) => self.size.saturating_sub(tag.requested),
            Some(Owner::Fragment) => self.size,
            _ => 0,
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let state = match &self.owner {
            None => "free".to_string(),
            Some(Owner::Os) => "os".to_string(),
            Some(Owner::Fragment) => "fragment".to_string(),
            Some(Owner::Unpartitioned) => "unpartitioned".to_string(),
            Some(Owner::Process(tag)) => match &tag.segment {
                Some(segment) => format!("{} {}", tag.instance_name, segment),
                None => tag.instance_name.clone(),
            },
        };
        write!(
            f,
            "[{}..{}) {} {}",
            format_address(self.address),
            format_address(self.end()),
            format_bytes(self.size),
            state
        )
    }
}

/// Fixed-size physical allocation unit of the paging backing store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub id: usize,
    pub address: Address,
    pub size: Size,
    pub free: bool,
    pub owner: Option<ProcessTag>,
    pub logical_page: Option<usize>,
}

impl Frame {
    pub fn new(id: usize, address: Address, size: Size) -> Self {
        Self {
            id,
            address,
            size,
            free: true,
            owner: None,
            logical_page: None,
        }
    }

    pub fn is_free(&self) -> bool {
        self.free
    }

    pub fn segment_name(&self) -> Option<&str> {
        self.owner.as_ref().and_then(|tag| tag.segment.as_deref())
    }

    pub fn is_owned_by(&self, memory_id: MemoryId) -> bool {
        !self.free
            && self
                .owner
                .as_ref()
                .map_or(false, |tag| tag.memory_id == memory_id)
    }

    pub fn assign(&mut self, tag: ProcessTag, logical_page: usize) {
        self.free = false;
        self.owner = Some(tag);
        self.logical_page = Some(logical_page);
    }

    pub fn clear(&mut self) {
        self.free = true;
        self.owner = None;
        self.logical_page = None;
    }

    pub fn internal_fragmentation(&self) -> Size {
        self.owner
            .as_ref()
            .map_or(0, |tag| self.size.saturating_sub(tag.requested))
    }
}

/// One row of a process page table
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageTableEntry {
    pub segment: String,
    pub logical_page: usize,
    pub frame_id: usize,
}

/// A named segment to be placed in memory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentRequest {
    pub name: String,
    pub size: Size,
    /// Held on behalf of the process (stack/heap reserve) but not requested by it
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub reserve: bool,
}

impl SegmentRequest {
    pub fn new(name: impl Into<String>, size: Size) -> Self {
        Self {
            name: name.into(),
            size,
            reserve: false,
        }
    }

    pub fn reserve(name: impl Into<String>, size: Size) -> Self {
        Self {
            reserve: true,
            ..Self::new(name, size)
        }
    }

    /// Requested share of `held` bytes of this segment; a reserve requests nothing
    pub fn requested(&self, held: Size) -> Size {
        if self.reserve {
            0
        } else {
            held
        }
    }
}

/// Sum of segment sizes, `None` on overflow
pub fn segments_size<'a>(segments: impl IntoIterator<Item = &'a SegmentRequest>) -> Option<Size> {
    segments
        .into_iter()
        .try_fold(0usize, |total, segment| total.checked_add(segment.size))
}

/// Memory allocation request, stamped with the owner key it will be stored under
#[derive(Debug, Clone)]
pub struct AllocationRequest {
    pub memory_id: MemoryId,
    pub instance_name: String,
    pub segments: Vec<SegmentRequest>,
}

impl AllocationRequest {
    pub fn new(memory_id: MemoryId, instance_name: impl Into<String>) -> Self {
        Self {
            memory_id,
            instance_name: instance_name.into(),
            segments: Vec::new(),
        }
    }

    pub fn with_segment(mut self, name: impl Into<String>, size: Size) -> Self {
        self.segments.push(SegmentRequest::new(name, size));
        self
    }

    pub fn with_reserve(mut self, name: impl Into<String>, size: Size) -> Self {
        self.segments.push(SegmentRequest::reserve(name, size));
        self
    }

    /// Segments an allocator must place; zero-size segments are skipped everywhere
    pub fn placeable_segments(&self) -> impl Iterator<Item = &SegmentRequest> {
        self.segments.iter().filter(|segment| segment.size > 0)
    }

    /// Total bytes to place, saturating at `Size::MAX`
    pub fn total_size(&self) -> Size {
        segments_size(&self.segments).unwrap_or(Size::MAX)
    }

    /// Bytes the process asked for, excluding reserve segments
    pub fn requested_size(&self) -> Size {
        let requested = self.segments.iter().filter(|segment| !segment.reserve);
        segments_size(requested).unwrap_or(Size::MAX)
    }

    /// Total bytes to place; a request for nothing, or for more than the
    /// address width can express, is invalid
    pub fn checked_size(&self) -> MemoryResult<Size> {
        match segments_size(&self.segments) {
            Some(0) => Err(MemoryError::InvalidRequest(format!(
                "{} requests no memory",
                self.instance_name
            ))),
            Some(size) => Ok(size),
            None => Err(MemoryError::InvalidRequest(format!(
                "{} requests more memory than can be addressed",
                self.instance_name
            ))),
        }
    }

    pub(crate) fn tag(&self, segment: Option<&str>, requested: Size) -> ProcessTag {
        ProcessTag {
            memory_id: self.memory_id,
            instance_name: self.instance_name.clone(),
            segment: segment.map(str::to_string),
            requested,
        }
    }
}

/// Where a successful allocation landed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "records", rename_all = "snake_case")]
pub enum Placement {
    /// Start addresses of the partitions taken, in segment order
    Regions(Vec<Address>),
    /// Page table of the process
    Pages(Vec<PageTableEntry>),
}

/// Result of a compaction pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compaction {
    pub relocated: usize,
    pub free_bytes: Size,
}

/// Memory statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total_memory: usize,
    pub used_memory: usize,
    pub available_memory: usize,
    pub usage_percentage: f64,
    pub allocated_blocks: usize,
    pub free_blocks: usize,
    pub largest_free_block: usize,
    pub internal_fragmentation: usize,
    pub external_fragmentation: usize,
}

impl MemoryStats {
    /// Summarize a layout; partitions and frames together must tile the address space
    pub fn from_layout(total_memory: Size, partitions: &[Partition], frames: &[Frame]) -> Self {
        let free_sizes: Vec<Size> = partitions
            .iter()
            .filter(|p| p.is_free())
            .map(|p| p.size)
            .chain(frames.iter().filter(|f| f.is_free()).map(|f| f.size))
            .collect();

        let available_memory: Size = free_sizes.iter().sum();
        let largest_free_block = free_sizes.iter().copied().max().unwrap_or(0);
        let used_memory = total_memory - available_memory;

        let allocated_blocks = partitions.iter().filter(|p| p.tag().is_some()).count()
            + frames.iter().filter(|f| !f.is_free()).count();

        let internal_fragmentation = partitions
            .iter()
            .map(Partition::internal_fragmentation)
            .chain(frames.iter().map(Frame::internal_fragmentation))
            .sum();

        Self {
            total_memory,
            used_memory,
            available_memory,
            usage_percentage: (used_memory as f64 / total_memory as f64) * 100.0,
            allocated_blocks,
            free_blocks: free_sizes.len(),
            largest_free_block,
            internal_fragmentation,
            external_fragmentation: available_memory - largest_free_block,
        }
    }

    pub fn memory_pressure(&self) -> MemoryPressure {
        let ratio = self.usage_percentage / 100.0;
        if ratio >= PRESSURE_CRITICAL {
            MemoryPressure::Critical
        } else if ratio >= PRESSURE_HIGH {
            MemoryPressure::High
        } else if ratio >= PRESSURE_MEDIUM {
            MemoryPressure::Medium
        } else {
            MemoryPressure::Low
        }
    }
}

/// Memory pressure levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryPressure {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for MemoryPressure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MemoryPressure::Low => write!(f, "LOW"),
            MemoryPressure::Medium => write!(f, "MEDIUM"),
            MemoryPressure::High => write!(f, "HIGH"),
            MemoryPressure::Critical => write!(f, "CRITICAL"),
        }
    }
}
