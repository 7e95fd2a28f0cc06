/*!
 * Monitoring
 * Tracing setup and operation spans
 */

mod tracer;

pub use tracer::{init_tracing, span_reset, ResetSpan, TRACE_JSON_ENV_VAR};
