/*!
 * Simulator Limits and Constants
 *
 * Centralized location for the sizes, thresholds and defaults of the
 * simulated machine. Grouped by backing store.
 */

/// One kibibyte
pub const KIB: usize = 1024;

/// One mebibyte
pub const MIB: usize = 1024 * KIB;

// =============================================================================
// ADDRESS SPACE
// =============================================================================

/// Total simulated physical memory (16 MiB)
pub const DEFAULT_TOTAL_MEMORY_MIB: usize = 16;

/// Leading region reserved for the operating system (1 MiB)
pub const DEFAULT_OS_RESERVED_MIB: usize = 1;

// =============================================================================
// STATIC PARTITIONING
// =============================================================================

/// Fixed partition size; divides the default 15 MiB user space into 5 slots
pub const DEFAULT_FIXED_PARTITION_MIB: usize = 3;

/// Variable partition layout, remainder of user space is appended as one extra slot
pub const DEFAULT_VARIABLE_PARTITIONS_MIB: [usize; 6] = [1, 1, 2, 2, 3, 5];

// =============================================================================
// DYNAMIC PARTITIONING
// =============================================================================

/// Remainders at or below this size are absorbed into the allocation instead of split off
pub const DEFAULT_SPLIT_THRESHOLD_KIB: usize = 16;

/// Stack and heap reserve added to every plain process
pub const DEFAULT_STACK_HEAP_OVERHEAD_KIB: usize = 64;

// =============================================================================
// PAGING
// =============================================================================

/// Default frame size (64 KiB)
pub const DEFAULT_PAGE_SIZE_KIB: usize = 64;

/// Smaller page sizes are clamped up to this value
pub const MIN_PAGE_SIZE_KIB: usize = 32;

// =============================================================================
// MEMORY PRESSURE
// =============================================================================

/// Usage ratio reported as medium pressure
pub const PRESSURE_MEDIUM: f64 = 0.60;

/// Usage ratio reported as high pressure
pub const PRESSURE_HIGH: f64 = 0.80;

/// Usage ratio reported as critical pressure
pub const PRESSURE_CRITICAL: f64 = 0.95;
