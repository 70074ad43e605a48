//! Error values and engine errors
//!
//! Two layers:
//! - `ErrorInfo` is an in-language failure. It travels through failure
//!   continuations as `Val::Error` and can be caught by `try`.
//! - `EngineError` is what a driver reports to the host.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{Span, Val};

/* ===================== Error Codes ===================== */

pub const TYPE_ERROR: &str = "TYPE_ERROR";
pub const UNDEFINED_VARIABLE: &str = "UNDEFINED_VARIABLE";
pub const UNKNOWN_FUNCTION: &str = "UNKNOWN_FUNCTION";
pub const WRONG_ARG_COUNT: &str = "WRONG_ARG_COUNT";
pub const WRONG_ARG_TYPE: &str = "WRONG_ARG_TYPE";
pub const INDEX_OUT_OF_BOUNDS: &str = "INDEX_OUT_OF_BOUNDS";
pub const USER_ERROR: &str = "USER_ERROR";
pub const CONTROL_OUTSIDE_LOOP: &str = "CONTROL_OUTSIDE_LOOP";
pub const CANCELLED: &str = "CANCELLED";
pub const CANCEL_IGNORED: &str = "CANCEL_IGNORED";
pub const STEP_LIMIT: &str = "STEP_LIMIT";
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";

/// Error payload carried by `Val::Error`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self::new(CANCELLED, "Computation was cancelled")
    }

    /// The body kept reaching suspend points while being cancelled
    pub fn cancel_ignored(rounds: u32) -> Self {
        Self::new(
            CANCEL_IGNORED,
            format!("body suspended {} times while being cancelled", rounds),
        )
    }

    pub fn is_cancellation(&self) -> bool {
        self.code == CANCELLED
    }
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl From<ErrorInfo> for Val {
    fn from(err: ErrorInfo) -> Self {
        Val::Error(err)
    }
}

/* ===================== Engine Errors ===================== */

/// Errors a driver surfaces to its caller
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// A suspend call sits inside an ordinary call's arguments, where no
    /// pausable construct can reach it.
    #[error("{suspend}() cannot be used inside the arguments of {construct}() at {span}")]
    UnsupportedSuspendPosition {
        suspend: String,
        construct: String,
        span: Span,
    },

    /// A resume was delivered to a computation that already settled.
    #[error("computation has already settled and cannot be resumed")]
    ResumeAfterCompletion,

    /// A resume arrived while the computation was already running, or the
    /// pending continuation was already consumed.
    #[error("computation is already running; concurrent resume rejected")]
    ConcurrentResumeViolation,

    /// An uncaught failure reached the driver boundary.
    #[error("uncaught failure: {}", describe_failure(.0))]
    PropagatedFailure(Val),
}

impl EngineError {
    /// The failure value, when this error carries one
    pub fn failure(&self) -> Option<&Val> {
        match self {
            EngineError::PropagatedFailure(val) => Some(val),
            _ => None,
        }
    }

    /// Error code of the propagated failure, if it is an error value
    pub fn code(&self) -> Option<&str> {
        match self.failure() {
            Some(Val::Error(info)) => Some(&info.code),
            _ => None,
        }
    }
}

fn describe_failure(val: &Val) -> String {
    match val {
        Val::Error(info) => info.to_string(),
        other => other.to_string(),
    }
}
