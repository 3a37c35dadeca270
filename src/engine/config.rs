/*!
 * Engine Configuration
 *
 * Options recognized by `initialize`. Every field has a default, so a JSON
 * document only needs the keys it changes.
 */

use crate::core::limits::*;
use crate::core::types::Size;
use crate::memory::{FitPolicy, MemoryError, MemoryResult};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the allocation engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Size of the simulated address space (default: 16 MiB)
    #[serde(rename = "totalMemoryMiB")]
    pub total_memory_mib: usize,

    /// Leading region reserved for the OS (default: 1 MiB)
    #[serde(rename = "osReservedMiB")]
    pub os_reserved_mib: usize,

    /// Partition size for static-fixed (default: 3 MiB)
    #[serde(rename = "fixedPartitionSizeMiB")]
    pub fixed_partition_size_mib: usize,

    /// Ordered partition sizes for static-variable (default: 1, 1, 2, 2, 3, 5 MiB)
    #[serde(rename = "variablePartitionSizesMiB")]
    pub variable_partition_sizes_mib: Vec<usize>,

    /// Frame size for paging, clamped to at least 32 KiB (default: 64 KiB)
    #[serde(rename = "pageSizeKiB")]
    pub page_size_kib: usize,

    #[serde(rename = "fitPolicy")]
    pub fit_policy: FitPolicy,

    /// Allow explicit compaction of the dynamic backing store (default: off)
    #[serde(rename = "compactionEnabled")]
    pub compaction_enabled: bool,

    /// Stack/heap reserve added to plain processes (default: 64 KiB)
    #[serde(rename = "stackHeapOverheadKiB")]
    pub stack_heap_overhead_kib: usize,

    /// Dynamic remainders at or below this are not split off (default: 16 KiB)
    #[serde(rename = "splitThresholdKiB")]
    pub split_threshold_kib: usize,
}

impl EngineConfig {
    /// Create default configuration
    pub fn new() -> Self {
        Self {
            total_memory_mib: DEFAULT_TOTAL_MEMORY_MIB,
            os_reserved_mib: DEFAULT_OS_RESERVED_MIB,
            fixed_partition_size_mib: DEFAULT_FIXED_PARTITION_MIB,
            variable_partition_sizes_mib: DEFAULT_VARIABLE_PARTITIONS_MIB.to_vec(),
            page_size_kib: DEFAULT_PAGE_SIZE_KIB,
            fit_policy: FitPolicy::FirstFit,
            compaction_enabled: false,
            stack_heap_overhead_kib: DEFAULT_STACK_HEAP_OVERHEAD_KIB,
            split_threshold_kib: DEFAULT_SPLIT_THRESHOLD_KIB,
        }
    }

    /// Parse a JSON document; missing keys keep their defaults
    pub fn from_json_str(json: &str) -> MemoryResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| MemoryError::InvalidRequest(format!("invalid configuration: {}", e)))
    }

    pub fn from_file(path: impl AsRef<Path>) -> MemoryResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            MemoryError::InvalidRequest(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    pub fn with_fit_policy(mut self, policy: FitPolicy) -> Self {
        self.fit_policy = policy;
        self
    }

    pub fn with_compaction(mut self, enabled: bool) -> Self {
        self.compaction_enabled = enabled;
        self
    }

    pub fn with_memory_mib(mut self, total: usize, os_reserved: usize) -> Self {
        self.total_memory_mib = total;
        self.os_reserved_mib = os_reserved;
        self
    }

    pub fn with_fixed_partition_mib(mut self, size: usize) -> Self {
        self.fixed_partition_size_mib = size;
        self
    }

    pub fn with_variable_partitions_mib(mut self, sizes: Vec<usize>) -> Self {
        self.variable_partition_sizes_mib = sizes;
        self
    }

    pub fn with_page_size_kib(mut self, size: usize) -> Self {
        self.page_size_kib = size;
        self
    }

    pub fn with_stack_heap_overhead_kib(mut self, size: usize) -> Self {
        self.stack_heap_overhead_kib = size;
        self
    }

    pub fn with_split_threshold_kib(mut self, size: usize) -> Self {
        self.split_threshold_kib = size;
        self
    }

    // Byte accessors saturate; `validated` rejects values that would.

    pub fn total_memory(&self) -> Size {
        self.total_memory_mib.saturating_mul(MIB)
    }

    pub fn os_reserved(&self) -> Size {
        self.os_reserved_mib.saturating_mul(MIB)
    }

    pub fn fixed_partition_size(&self) -> Size {
        self.fixed_partition_size_mib.saturating_mul(MIB)
    }

    pub fn variable_partition_sizes(&self) -> Vec<Size> {
        self.variable_partition_sizes_mib
            .iter()
            .map(|size| size.saturating_mul(MIB))
            .collect()
    }

    /// Frame size in bytes, never below the minimum page size
    pub fn page_size(&self) -> Size {
        self.page_size_kib.max(MIN_PAGE_SIZE_KIB).saturating_mul(KIB)
    }

    pub fn stack_heap_overhead(&self) -> Size {
        self.stack_heap_overhead_kib.saturating_mul(KIB)
    }

    pub fn split_threshold(&self) -> Size {
        self.split_threshold_kib.saturating_mul(KIB)
    }

    /// Apply the page size floor, warning when the requested size was raised
    pub fn normalized(mut self) -> Self {
        if self.page_size_kib < MIN_PAGE_SIZE_KIB {
            warn!(
                "Page size {} KiB is below the {} KiB minimum, using {} KiB",
                self.page_size_kib, MIN_PAGE_SIZE_KIB, MIN_PAGE_SIZE_KIB
            );
            self.page_size_kib = MIN_PAGE_SIZE_KIB;
        }
        self
    }

    /// Normalize, then check that every size converts to bytes without overflow
    pub fn validated(self) -> MemoryResult<Self> {
        let config = self.normalized();
        let scalars = [
            ("totalMemoryMiB", config.total_memory_mib, MIB),
            ("osReservedMiB", config.os_reserved_mib, MIB),
            ("fixedPartitionSizeMiB", config.fixed_partition_size_mib, MIB),
            ("pageSizeKiB", config.page_size_kib, KIB),
            ("stackHeapOverheadKiB", config.stack_heap_overhead_kib, KIB),
            ("splitThresholdKiB", config.split_threshold_kib, KIB),
        ];
        for (key, value, unit) in scalars {
            if value.checked_mul(unit).is_none() {
                return Err(overflow(key, value));
            }
        }

        config
            .variable_partition_sizes_mib
            .iter()
            .try_fold(0usize, |total, &size| {
                size.checked_mul(MIB)
                    .and_then(|bytes| total.checked_add(bytes))
                    .ok_or_else(|| overflow("variablePartitionSizesMiB", size))
            })?;

        Ok(config)
    }
}

fn overflow(key: &str, value: usize) -> MemoryError {
    MemoryError::InvalidRequest(format!(
        "configuration value {} = {} overflows the address width",
        key, value
    ))
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
