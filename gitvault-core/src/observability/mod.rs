pub mod logging;
pub mod trace_context;

pub use logging::init_tracing;
pub use trace_context::{current_traceparent, REQUEST_ID_HEADER, TRACEPARENT_HEADER};
