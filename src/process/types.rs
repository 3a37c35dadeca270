/*!
 * Process Types
 * Templates, instances and admission outcomes
 */

use crate::core::types::{InstanceId, MemoryId, Size};
use crate::memory::{
    segments_size, AllocationRequest, MemoryError, MemoryResult, PageTableEntry, SegmentRequest,
};
use serde::{Deserialize, Serialize};

/// Immutable program description a process is started from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessTemplate {
    pub name: String,
    pub segments: Vec<SegmentRequest>,
}

impl ProcessTemplate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            segments: Vec::new(),
        }
    }

    pub fn with_segment(mut self, name: impl Into<String>, size: Size) -> Self {
        self.segments.push(SegmentRequest::new(name, size));
        self
    }

    /// Add a segment that is held for the process but not counted as requested
    pub fn with_reserve(mut self, name: impl Into<String>, size: Size) -> Self {
        self.segments.push(SegmentRequest::reserve(name, size));
        self
    }

    /// Single-image process: its code plus the stack/heap reserve
    pub fn plain(name: impl Into<String>, size: Size, stack_heap_overhead: Size) -> Self {
        let template = Self::new(name).with_segment(".text", size);
        if stack_heap_overhead > 0 {
            template.with_reserve(".stack_heap", stack_heap_overhead)
        } else {
            template
        }
    }

    /// Bytes to place, saturating at `Size::MAX`
    pub fn total_size(&self) -> Size {
        segments_size(&self.segments).unwrap_or(Size::MAX)
    }

    /// Bytes to place; fails for an empty template or one whose size overflows
    pub fn checked_size(&self) -> MemoryResult<Size> {
        match segments_size(&self.segments) {
            Some(0) => Err(MemoryError::InvalidRequest(format!(
                "process {} requests no memory",
                self.name
            ))),
            Some(size) => Ok(size),
            None => Err(MemoryError::InvalidRequest(format!(
                "process {} requests more memory than can be addressed",
                self.name
            ))),
        }
    }

    /// Drop segments that hold nothing
    pub fn without_empty_segments(mut self) -> Self {
        self.segments.retain(|segment| segment.size > 0);
        self
    }

    pub(crate) fn to_request(&self, memory_id: MemoryId, instance_name: &str) -> AllocationRequest {
        AllocationRequest {
            memory_id,
            instance_name: instance_name.to_string(),
            segments: self.segments.clone(),
        }
    }
}

/// What the caller asks the engine to start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProcessRequest {
    /// A template from the engine's catalogue, by name
    Template { name: String },
    /// Ad-hoc single-image process; the configured stack/heap reserve is added
    Plain { name: Option<String>, size: Size },
    /// Ad-hoc process with explicit segments
    Custom { template: ProcessTemplate },
}

impl ProcessRequest {
    pub fn template(name: impl Into<String>) -> Self {
        ProcessRequest::Template { name: name.into() }
    }

    pub fn plain(name: impl Into<String>, size: Size) -> Self {
        ProcessRequest::Plain {
            name: Some(name.into()),
            size,
        }
    }

    pub fn custom(template: ProcessTemplate) -> Self {
        ProcessRequest::Custom { template }
    }
}

/// A process currently holding memory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInstance {
    pub instance_id: InstanceId,
    pub memory_id: MemoryId,
    pub template_name: String,
    pub name: String,
    pub segments: Vec<SegmentRequest>,
    /// Empty unless the paging backing store holds the process
    pub page_table: Vec<PageTableEntry>,
}

impl ProcessInstance {
    pub fn total_size(&self) -> Size {
        segments_size(&self.segments).unwrap_or(Size::MAX)
    }

    /// Page table ordered by segment name, then logical page
    pub fn sorted_page_table(&self) -> Vec<PageTableEntry> {
        let mut table = self.page_table.clone();
        table.sort();
        table
    }
}

/// Outcome of `add_process`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Admission {
    Allocated {
        instance_id: InstanceId,
        memory_id: MemoryId,
        name: String,
    },
    /// Parked in the waiting queue at this zero-based position
    Queued { position: usize },
    Rejected { reason: MemoryError },
}

impl Admission {
    pub fn instance_id(&self) -> Option<InstanceId> {
        match self {
            Admission::Allocated { instance_id, .. } => Some(*instance_id),
            _ => None,
        }
    }

    pub fn is_allocated(&self) -> bool {
        matches!(self, Admission::Allocated { .. })
    }
}
