//! Executor integration tests
//!
//! Bodies are written in surface syntax (or as JSON ASTs) and driven through
//! the public generator and task APIs.

mod helpers;

mod ast_tests;
mod error_tests;
mod generator_tests;
