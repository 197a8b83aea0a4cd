//! Structured logging for the beatwatch engine
//!
//! - `init(profile)` installs the global subscriber once
//! - `log_op_start!` / `log_op_end!` / `log_op_error!` bracket every engine
//!   operation with `component`, `op`, `event` and `duration_ms` fields
//! - `test_capture` records events in memory so tests can assert on them
//!
//! ```rust
//! use beatwatch_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
