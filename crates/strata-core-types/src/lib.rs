//! Core types shared across strata facilities
//!
//! This crate provides foundational types used by the error handling,
//! logging, and execution facilities:
//!
//! - **Correlation types**: RequestId, TraceId, RequestContext
//! - **Cancellation**: CancelToken for cooperative cancellation of runs
//! - **Schema constants**: Canonical field keys and event names

pub mod cancel;
pub mod correlation;
pub mod schema;

pub use cancel::CancelToken;
pub use correlation::{RequestContext, RequestId, TraceId};
