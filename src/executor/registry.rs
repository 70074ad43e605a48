//! Pausable Registry
//!
//! Maps a construct name to its implementation. Registries are layered: each
//! layer is a mapping with a link to its parent, lookups walk from the nearest
//! layer outward, and the built-in constructs sit at the bottom.
//!
//! # Adding a Construct
//!
//! 1. Implement `Construct` for your struct (both the ordinary and the
//!    continuation-passing form)
//! 2. Register it on a layer with `Registry::register`
//! 3. Hand the layer to a computation through `ComputationOptions::define`
//!    or build your own layer over `Registry::builtins()`
//!
//! A layer is mutable only while it is owned. `snapshot` freezes it behind an
//! `Rc`, after which computations share it read-only.

use std::collections::HashMap;
use std::rc::Rc;

use super::classify::Node;
use super::cont::{Conts, Step};
use super::engine::Engine;
use super::frame::Frame;
use super::types::{Control, Expr, Val};

/// A control construct with an ordinary and a pausable implementation
pub trait Construct {
    /// Evaluate with no reachable suspend point among the arguments.
    fn eval(&self, args: &[Expr], frame: &Frame, engine: &Engine) -> Result<Val, Control>;

    /// Evaluate in continuation-passing form.
    ///
    /// `args` are the classified, unevaluated arguments. The implementation
    /// must finish by invoking exactly one of the continuations in `conts`
    /// (or by suspending), and must deliver ordinary failures through
    /// `conts.err` rather than returning them.
    fn eval_cps(&self, args: &[Node], frame: &Frame, conts: Conts, engine: &Engine) -> Step;

    /// Whether a call to this construct is itself a suspend point
    fn is_suspend_point(&self) -> bool {
        false
    }
}

/// One layer of construct definitions
#[derive(Default)]
pub struct Registry {
    defs: HashMap<String, Rc<dyn Construct>>,
    parent: Option<Rc<Registry>>,
}

thread_local! {
    static BUILTINS: Rc<Registry> = {
        let mut registry = Registry::default();
        super::constructs::register_builtins(&mut registry);
        Rc::new(registry)
    };
}

impl Registry {
    /// An empty layer with no parent
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared built-in layer: block, conditional, loops, assignment,
    /// short-circuit logic, try, and jumps
    pub fn builtins() -> Rc<Registry> {
        BUILTINS.with(Rc::clone)
    }

    /// An empty layer whose lookups fall back to `parent`
    pub fn scope(parent: &Rc<Registry>) -> Self {
        Registry {
            defs: HashMap::new(),
            parent: Some(parent.clone()),
        }
    }

    /// Add or shadow a definition in this layer
    pub fn register(&mut self, name: impl Into<String>, construct: impl Construct + 'static) {
        self.register_rc(name, Rc::new(construct));
    }

    pub fn register_rc(&mut self, name: impl Into<String>, construct: Rc<dyn Construct>) {
        self.defs.insert(name.into(), construct);
    }

    /// Find the nearest definition of `name`
    pub fn lookup(&self, name: &str) -> Option<Rc<dyn Construct>> {
        let mut layer = Some(self);
        while let Some(current) = layer {
            if let Some(construct) = current.defs.get(name) {
                return Some(construct.clone());
            }
            layer = current.parent.as_deref();
        }
        None
    }

    /// Whether `name` resolves to a suspend point
    pub fn is_suspend_point(&self, name: &str) -> bool {
        self.lookup(name)
            .is_some_and(|construct| construct.is_suspend_point())
    }

    /// Freeze this layer for sharing
    pub fn snapshot(self) -> Rc<Registry> {
        Rc::new(self)
    }

    /// Names defined in this layer only
    pub fn local_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.defs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("defs", &self.local_names())
            .field("parent", &self.parent)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::constructs::SuspendPoint;

    struct Marker;

    impl Construct for Marker {
        fn eval(&self, _args: &[Expr], _frame: &Frame, _engine: &Engine) -> Result<Val, Control> {
            Ok(Val::Str("marker".into()))
        }

        fn eval_cps(&self, _args: &[Node], _frame: &Frame, conts: Conts, _engine: &Engine) -> Step {
            conts.ok.call(Val::Str("marker".into()))
        }
    }

    #[test]
    fn test_builtins_cover_control_constructs() {
        let builtins = Registry::builtins();
        for name in ["{", "if", "while", "repeat", "for", "=", "<-", "<<-", "&&", "||", "try"] {
            assert!(builtins.lookup(name).is_some(), "missing builtin {}", name);
        }
        assert!(builtins.lookup("+").is_none());
        assert!(!builtins.is_suspend_point("if"));
    }

    #[test]
    fn test_nearer_scope_shadows_builtins() {
        let mut layer = Registry::scope(&Registry::builtins());
        layer.register("if", Marker);
        let layer = layer.snapshot();

        let construct = layer.lookup("if").expect("if should resolve");
        let engine = Engine::builder().registry(layer.clone()).build();
        let val = construct.eval(&[], &Frame::root(), &engine);
        assert_eq!(val, Ok(Val::Str("marker".into())));

        // Builtins are untouched
        assert!(layer.lookup("while").is_some());
        assert_eq!(layer.local_names(), vec!["if"]);
    }

    #[test]
    fn test_suspend_point_visible_through_layers() {
        let mut driver = Registry::scope(&Registry::builtins());
        driver.register("yield", SuspendPoint::new("yield"));
        let driver = driver.snapshot();
        let user = Registry::scope(&driver).snapshot();

        assert!(user.is_suspend_point("yield"));
        assert!(!user.is_suspend_point("await"));
    }
}
