//! Expression Classifier
//!
//! Decides, per call site, whether a construct runs in its ordinary form or in
//! its continuation-passing form. A suspend point is *reachable* when every
//! call between it and the body root is a registered construct. A suspend
//! point inside the arguments of any other call is unreachable, and the whole
//! body is rejected with `UnsupportedSuspendPosition` before it runs.
//!
//! The result is a plan: a tree of `Node`s where subtrees with no reachable
//! suspend point are kept as plain expressions and evaluated natively.

use std::rc::Rc;

use tracing::trace;

use super::errors::EngineError;
use super::registry::{Construct, Registry};
use super::types::{Expr, Span};

/// A classified expression
#[derive(Clone)]
pub struct Node(Rc<NodeKind>);

pub enum NodeKind {
    /// No reachable suspend point: evaluate with the ordinary implementation
    Ordinary(Expr),
    /// Contains a reachable suspend point: evaluate in continuation-passing form
    Pausable {
        name: String,
        construct: Rc<dyn Construct>,
        args: Vec<Node>,
        span: Span,
    },
}

impl Node {
    pub fn ordinary(expr: Expr) -> Self {
        Node(Rc::new(NodeKind::Ordinary(expr)))
    }

    pub fn kind(&self) -> &NodeKind {
        &self.0
    }

    pub fn is_pausable(&self) -> bool {
        matches!(*self.0, NodeKind::Pausable { .. })
    }

    /// The expression of an ordinary node
    pub fn expr(&self) -> Option<&Expr> {
        match &*self.0 {
            NodeKind::Ordinary(expr) => Some(expr),
            NodeKind::Pausable { .. } => None,
        }
    }

    /// The name of an ordinary identifier node
    pub fn as_ident(&self) -> Option<&str> {
        self.expr().and_then(Expr::as_ident)
    }

    /// True for an ordinary `NULL` literal, used for omitted arguments
    pub fn is_null(&self) -> bool {
        self.expr().is_some_and(Expr::is_null)
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &*self.0 {
            NodeKind::Ordinary(expr) => f.debug_tuple("Ordinary").field(expr).finish(),
            NodeKind::Pausable { name, args, .. } => f
                .debug_struct("Pausable")
                .field("name", name)
                .field("args", args)
                .finish(),
        }
    }
}

/// Classify an expression against a registry, producing its plan.
pub fn classify(expr: &Expr, registry: &Registry) -> Result<Node, EngineError> {
    if !reaches_suspend(expr, registry)? {
        return Ok(Node::ordinary(expr.clone()));
    }

    let Expr::Call { func, args, span } = expr else {
        return Ok(Node::ordinary(expr.clone()));
    };
    let Some(construct) = registry.lookup(func) else {
        return Ok(Node::ordinary(expr.clone()));
    };

    let args = args
        .iter()
        .map(|arg| classify(arg, registry))
        .collect::<Result<Vec<_>, _>>()?;

    trace!(construct = %func, "pausable call site");

    Ok(Node(Rc::new(NodeKind::Pausable {
        name: func.clone(),
        construct,
        args,
        span: *span,
    })))
}

/// Whether `expr` contains a reachable suspend point.
///
/// Fails when a suspend point is nested inside an ordinary call's arguments.
pub fn reaches_suspend(expr: &Expr, registry: &Registry) -> Result<bool, EngineError> {
    let Expr::Call { func, args, .. } = expr else {
        return Ok(false);
    };

    match registry.lookup(func) {
        Some(construct) => {
            let mut reaches = construct.is_suspend_point();
            for arg in args {
                // Check every argument so misplaced suspends are always reported
                reaches |= reaches_suspend(arg, registry)?;
            }
            Ok(reaches)
        }
        None => {
            for arg in args {
                if let Some((suspend, span)) = find_suspend(arg, registry) {
                    return Err(EngineError::UnsupportedSuspendPosition {
                        suspend,
                        construct: func.clone(),
                        span,
                    });
                }
            }
            Ok(false)
        }
    }
}

/// Find any suspend call in `expr`, regardless of reachability
fn find_suspend(expr: &Expr, registry: &Registry) -> Option<(String, Span)> {
    let Expr::Call { func, args, span } = expr else {
        return None;
    };
    if registry.is_suspend_point(func) {
        return Some((func.clone(), *span));
    }
    args.iter().find_map(|arg| find_suspend(arg, registry))
}
