/*!
 * Memory Snapshot
 * Read-only copy of the engine state for rendering
 */

use crate::core::types::{InstanceId, Size};
use crate::memory::{FitPolicy, Frame, MemoryStats, PageTableEntry, Partition, Technique};
use crate::process::{ProcessInstance, WaitingEntry};
use serde::{Deserialize, Serialize};

/// Page table of one running instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessPageTable {
    pub instance_id: InstanceId,
    pub name: String,
    pub entries: Vec<PageTableEntry>,
}

/// Everything a presentation layer needs; owns its data, so mutating it never reaches the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub technique: Technique,
    pub fit_policy: FitPolicy,
    pub page_size: Option<Size>,
    pub total_memory: Size,
    pub partitions: Vec<Partition>,
    pub frames: Vec<Frame>,
    pub page_tables: Vec<ProcessPageTable>,
    pub processes: Vec<ProcessInstance>,
    pub waiting: Vec<WaitingEntry>,
    pub stats: MemoryStats,
}

impl MemorySnapshot {
    /// Sum of every partition and frame; equals `total_memory` for any consistent store
    pub fn covered_bytes(&self) -> Size {
        self.partitions.iter().map(|p| p.size).sum::<Size>()
            + self.frames.iter().map(|f| f.size).sum::<Size>()
    }

    /// Partitions and frames as `(address, size)` spans in address order
    pub fn spans(&self) -> Vec<(usize, Size)> {
        let mut spans: Vec<_> = self
            .partitions
            .iter()
            .map(|p| (p.address, p.size))
            .chain(self.frames.iter().map(|f| (f.address, f.size)))
            .collect();
        spans.sort_unstable();
        spans
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
