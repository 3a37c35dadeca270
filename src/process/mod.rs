/*!
 * Process Module
 * Templates, running instances and the waiting queue
 */

pub mod queue;
pub mod registry;
pub mod templates;
pub mod types;

// Re-export for convenience
pub use queue::{WaitingEntry, WaitingQueue};
pub use registry::ProcessRegistry;
pub use templates::{builtin_templates, builtin_workload};
pub use types::*;
