/*!
 * Monitoring
 * Structured tracing setup and per-operation spans
 */

mod tracer;

pub use tracer::{init_tracing, next_trace_id, span_operation, OperationSpan};
