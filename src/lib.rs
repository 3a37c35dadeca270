/*!
 * Partition Simulator Library
 * Memory manager allocation engine exposed as a library
 */

pub mod core;
pub mod engine;
pub mod memory;
pub mod monitoring;
pub mod process;

// Re-exports
pub use crate::core::{format_address, format_bytes, Address, InstanceId, MemoryId, Size};
pub use engine::{CompactionOutcome, EngineConfig, MemoryEngine, MemorySnapshot, Removal};
pub use memory::{
    BackingStore, FitPolicy, MemoryError, MemoryPressure, MemoryResult, MemoryStats, Technique,
};
pub use monitoring::init_tracing;
pub use process::{Admission, ProcessRequest, ProcessTemplate};
