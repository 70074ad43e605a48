//! Standard library functions
//!
//! Ordinary (non-pausable) functions available to bodies. These are never
//! suspension-aware: a suspend call inside their arguments is rejected by the
//! classifier before the body runs.
//!
//! Functions are organized by area:
//! - `ops` - arithmetic, comparison and logical negation
//! - `common` - lists, strings, printing and errors

mod common;
mod ops;

use std::collections::HashMap;
use std::rc::Rc;

use super::errors::{self, ErrorInfo};
use super::types::Val;

/// Signature of a native function
pub type NativeFn = Rc<dyn Fn(&[Val]) -> Result<Val, ErrorInfo>>;

/// Table of native functions
#[derive(Clone, Default)]
pub struct Natives {
    fns: HashMap<String, NativeFn>,
}

impl Natives {
    /// An empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard library
    pub fn standard() -> Self {
        let mut natives = Natives::new();
        ops::register(&mut natives);
        common::register(&mut natives);
        natives
    }

    /// Add or replace a function
    pub fn register(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&[Val]) -> Result<Val, ErrorInfo> + 'static,
    ) {
        self.fns.insert(name.into(), Rc::new(f));
    }

    /// Call a function by name
    pub fn call(&self, name: &str, args: &[Val]) -> Result<Val, ErrorInfo> {
        let f = self.fns.get(name).ok_or_else(|| {
            ErrorInfo::new(
                errors::UNKNOWN_FUNCTION,
                format!("could not find function \"{}\"", name),
            )
        })?;
        f(args)
    }
}

impl std::fmt::Debug for Natives {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.fns.keys().collect();
        names.sort();
        f.debug_struct("Natives").field("fns", &names).finish()
    }
}

/* ===================== Argument Helpers ===================== */

pub(crate) fn arity(name: &str, args: &[Val], count: usize) -> Result<(), ErrorInfo> {
    super::engine::check_arity(name, args.len(), count..=count)
}

pub(crate) fn num(name: &str, val: &Val) -> Result<f64, ErrorInfo> {
    match val {
        Val::Num(n) => Ok(*n),
        Val::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        other => Err(ErrorInfo::new(
            errors::WRONG_ARG_TYPE,
            format!(
                "non-numeric argument to {}(): got {}",
                name,
                other.type_name()
            ),
        )),
    }
}
