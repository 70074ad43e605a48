//! Evaluation engine
//!
//! `Engine` bundles the active registry and native function table and is
//! passed explicitly through every evaluation. It has two entry points:
//!
//! - `eval` - ordinary evaluation of an expression, native recursion, returns
//!   `Result<Val, Control>`
//! - `run` - the dispatcher for classified nodes: ordinary nodes are evaluated
//!   natively and their outcome routed to a continuation, pausable nodes call
//!   the construct's continuation-passing form

use std::rc::Rc;

use tracing::trace;

use super::classify::{classify, Node, NodeKind};
use super::cont::{Conts, Step};
use super::errors::{self, EngineError, ErrorInfo};
use super::frame::Frame;
use super::registry::Registry;
use super::stdlib::Natives;
use super::types::{Control, Expr, Val};

/// Cheap-to-clone evaluation context shared by all continuations of a
/// computation
#[derive(Clone)]
pub struct Engine {
    registry: Rc<Registry>,
    natives: Rc<Natives>,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn registry(&self) -> &Rc<Registry> {
        &self.registry
    }

    pub fn natives(&self) -> &Natives {
        &self.natives
    }

    /// Classify a body against this engine's registry
    pub fn plan(&self, body: &Expr) -> Result<Node, EngineError> {
        classify(body, &self.registry)
    }

    /// Ordinary evaluation
    pub fn eval(&self, expr: &Expr, frame: &Frame) -> Result<Val, Control> {
        match expr {
            Expr::LitNull => Ok(Val::Null),
            Expr::LitBool { v } => Ok(Val::Bool(*v)),
            Expr::LitNum { v } => Ok(Val::Num(*v)),
            Expr::LitStr { v } => Ok(Val::Str(v.clone())),
            Expr::Ident { name, .. } => frame.get(name).ok_or_else(|| {
                Control::from(ErrorInfo::new(
                    errors::UNDEFINED_VARIABLE,
                    format!("object '{}' not found", name),
                ))
            }),
            Expr::Call { func, args, .. } => {
                if let Some(construct) = self.registry.lookup(func) {
                    return construct.eval(args, frame, self);
                }
                let values = args
                    .iter()
                    .map(|arg| self.eval(arg, frame))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(self.natives.call(func, &values)?)
            }
        }
    }

    /// Dispatch a classified node in continuation-passing form
    pub fn run(&self, node: &Node, frame: &Frame, conts: Conts) -> Step {
        match node.kind() {
            NodeKind::Ordinary(expr) => match self.eval(expr, frame) {
                Ok(val) => conts.ok.call(val),
                Err(control) => conts.route(control),
            },
            NodeKind::Pausable {
                name,
                construct,
                args,
                ..
            } => {
                trace!(construct = %name, "dispatch pausable");
                construct.eval_cps(args, frame, conts, self)
            }
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// Builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    registry: Option<Rc<Registry>>,
    natives: Option<Natives>,
}

impl EngineBuilder {
    /// Registry to resolve constructs against (defaults to the builtins)
    pub fn registry(mut self, registry: Rc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Native function table (defaults to the standard library)
    pub fn natives(mut self, natives: Natives) -> Self {
        self.natives = Some(natives);
        self
    }

    pub fn build(self) -> Engine {
        Engine {
            registry: self.registry.unwrap_or_else(Registry::builtins),
            natives: Rc::new(self.natives.unwrap_or_else(Natives::standard)),
        }
    }
}

/// Check an argument count, producing the standard error
pub fn check_arity(
    name: &str,
    count: usize,
    range: std::ops::RangeInclusive<usize>,
) -> Result<(), ErrorInfo> {
    if range.contains(&count) {
        return Ok(());
    }
    let expected = if range.start() == range.end() {
        range.start().to_string()
    } else {
        format!("{} to {}", range.start(), range.end())
    };
    Err(ErrorInfo::new(
        errors::WRONG_ARG_COUNT,
        format!("{}() expects {} arguments, got {}", name, expected, count),
    ))
}
