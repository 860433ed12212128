//! Middleware for the fraud detection API
//!
//! Request tracing with request ids, plus the CORS policy.

mod cors;
mod tracing;

pub use self::cors::configure_cors;
pub use self::tracing::{request_tracing, REQUEST_ID_HEADER};
