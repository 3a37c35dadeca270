/*!
 * Core Module
 * Fundamental simulator types, limits and formatting helpers
 */

pub mod limits;
pub mod types;
pub mod units;

// Re-export for convenience
pub use types::*;
pub use units::{format_address, format_bytes};
