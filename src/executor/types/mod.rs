//! Type definitions for the executor
//!
//! - AST nodes (Expr, Span)
//! - Runtime values (Val)
//! - Control flow signals (Control)

pub mod ast;
pub mod control;
pub mod values;

// Re-export all types for convenient access
pub use ast::{Expr, Span};
pub use control::Control;
pub use values::Val;
