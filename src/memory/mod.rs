/*!
 * Memory Module
 * Backing stores for the five partitioning disciplines
 */

pub mod address_space;
pub mod dynamic;
pub mod fit;
pub mod paging;
pub mod segmentation;
pub mod static_partition;
pub mod traits;
pub mod types;

// Re-export for convenience
pub use address_space::AddressSpace;
pub use dynamic::{DynamicPartitioner, PartitionList};
pub use fit::FitPolicy;
pub use paging::PageAllocator;
pub use segmentation::SegmentAllocator;
pub use static_partition::StaticPartitioner;
pub use traits::*;
pub use types::*;
