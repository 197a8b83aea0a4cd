//! Operation-boundary logging macros
//!
//! Callers must depend on `beatwatch-core-types`, which owns the field and
//! event names.

/// Log the start of an operation
///
/// ```
/// # use beatwatch_core::log_op_start;
/// log_op_start!("schedule_visit");
/// log_op_start!("schedule_visit", person_id = "p-1");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = beatwatch_core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = beatwatch_core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// ```
/// # use beatwatch_core::log_op_end;
/// log_op_end!("schedule_visit", duration_ms = 3);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = beatwatch_core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = beatwatch_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log a failed operation with its error kind and code
///
/// Client errors (scope, workflow, scheduling) log at `warn`; storage and
/// internal failures at `error`. `$err` is borrowed.
///
/// ```
/// # use beatwatch_core::log_op_error;
/// # use beatwatch_core::errors::{BwError, BwErrorKind};
/// let err = BwError::new(BwErrorKind::SchedulingConflict);
/// log_op_error!("schedule_visit", &err, duration_ms = 7);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {
        $crate::log_op_error!($op, $err, duration_ms = $duration,)
    };
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        let bw_err: &$crate::errors::BwError = $err;
        if bw_err.kind().is_client_error() {
            tracing::warn!(
                component = module_path!(),
                op = $op,
                event = beatwatch_core_types::schema::EVENT_END_ERROR,
                duration_ms = $duration,
                err_kind = ?bw_err.kind(),
                err_code = bw_err.code(),
                $($field)*
            );
        } else {
            tracing::error!(
                component = module_path!(),
                op = $op,
                event = beatwatch_core_types::schema::EVENT_END_ERROR,
                duration_ms = $duration,
                err_kind = ?bw_err.kind(),
                err_code = bw_err.code(),
                $($field)*
            );
        }
    }};
}
