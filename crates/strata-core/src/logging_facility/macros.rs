//! Canonical logging macros
//!
//! These macros provide a structured, consistent way to log operations.

/// Log the start of an operation
///
/// # Example
///
/// ```
/// # use strata_core::log_op_start;
/// log_op_start!("create_snapshot");
/// log_op_start!("create_snapshot", data_source_id = "ds:orders");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = strata_core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = strata_core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// # Example
///
/// ```
/// # use strata_core::log_op_end;
/// log_op_end!("create_snapshot", duration_ms = 42);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = strata_core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = strata_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log an operation error
///
/// # Example
///
/// ```
/// # use strata_core::log_op_error;
/// # use strata_core::errors::{StrataError, StrataErrorKind};
/// let err = StrataError::new(StrataErrorKind::NotFound).with_message("missing");
/// log_op_error!("get_by_id", err, duration_ms = 10);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        let err: &$crate::errors::StrataError = &$err;
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = strata_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            "err.code" = err.code(),
            "err.message" = err.message(),
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        let err: &$crate::errors::StrataError = &$err;
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = strata_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            "err.code" = err.code(),
            "err.message" = err.message(),
            $($field)*
        );
    }};
}
