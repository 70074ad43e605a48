//! Control flow signals

use super::values::Val;

/// Non-local exit raised during ordinary evaluation
///
/// Ordinary evaluation returns `Result<Val, Control>`. When an ordinary
/// sub-expression sits inside a pausable construct, the dispatcher routes
/// each signal to the matching continuation instead.
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    Break,
    Next,
    Return(Val),
    Throw(Val),
}

impl From<super::super::errors::ErrorInfo> for Control {
    fn from(err: super::super::errors::ErrorInfo) -> Self {
        Control::Throw(Val::Error(err))
    }
}
