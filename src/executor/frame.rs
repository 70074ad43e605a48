//! Frame store
//!
//! Variable bindings live on the heap rather than on the native call stack:
//! a paused computation keeps its frames alive through the continuations that
//! close over them. Frames chain to a lexical parent for lookup.
//!
//! Storage follows the flat-slot layout of the resumable VM environment: a
//! vector of cells in declaration order plus a name index into it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::types::Val;

/// A single mutable storage cell
pub type Cell = Rc<RefCell<Val>>;

#[derive(Default)]
struct Bindings {
    slots: Vec<(String, Cell)>,
    index: HashMap<String, usize>,
}

struct FrameData {
    bindings: RefCell<Bindings>,
    parent: Option<Frame>,
}

/// Reference-counted handle to a frame
#[derive(Clone)]
pub struct Frame(Rc<FrameData>);

impl Frame {
    /// Create a frame with no parent
    pub fn root() -> Self {
        Frame(Rc::new(FrameData {
            bindings: RefCell::new(Bindings::default()),
            parent: None,
        }))
    }

    /// Create a root frame pre-populated with bindings
    pub fn with_bindings<I, K>(bindings: I) -> Self
    where
        I: IntoIterator<Item = (K, Val)>,
        K: Into<String>,
    {
        let frame = Frame::root();
        for (name, val) in bindings {
            frame.set_local(name, val);
        }
        frame
    }

    /// Create a new frame whose lookups fall back to this one
    pub fn child(&self) -> Frame {
        Frame(Rc::new(FrameData {
            bindings: RefCell::new(Bindings::default()),
            parent: Some(self.clone()),
        }))
    }

    pub fn parent(&self) -> Option<&Frame> {
        self.0.parent.as_ref()
    }

    /// Look up a binding in this frame only
    pub fn local_cell(&self, name: &str) -> Option<Cell> {
        let bindings = self.0.bindings.borrow();
        bindings
            .index
            .get(name)
            .map(|&slot| bindings.slots[slot].1.clone())
    }

    /// Look up a binding, walking the parent chain
    pub fn cell(&self, name: &str) -> Option<Cell> {
        let mut frame = Some(self);
        while let Some(current) = frame {
            if let Some(cell) = current.local_cell(name) {
                return Some(cell);
            }
            frame = current.parent();
        }
        None
    }

    /// Read a variable, walking the parent chain
    pub fn get(&self, name: &str) -> Option<Val> {
        self.cell(name).map(|cell| cell.borrow().clone())
    }

    /// Bind or overwrite `name` in this frame
    pub fn set_local(&self, name: impl Into<String>, val: Val) {
        let name = name.into();
        if let Some(cell) = self.local_cell(&name) {
            *cell.borrow_mut() = val;
            return;
        }
        let mut bindings = self.0.bindings.borrow_mut();
        let slot = bindings.slots.len();
        bindings.index.insert(name.clone(), slot);
        bindings.slots.push((name, Rc::new(RefCell::new(val))));
    }

    /// Assign into the nearest enclosing frame that binds `name`, or the
    /// outermost frame when none does.
    pub fn set_enclosing(&self, name: impl Into<String>, val: Val) {
        let name = name.into();
        let mut outermost = self.clone();
        let mut frame = self.parent().cloned();
        while let Some(current) = frame {
            if let Some(cell) = current.local_cell(&name) {
                *cell.borrow_mut() = val;
                return;
            }
            frame = current.parent().cloned();
            outermost = current;
        }
        outermost.set_local(name, val);
    }

    /// Names bound in this frame, in binding order
    pub fn names(&self) -> Vec<String> {
        self.0
            .bindings
            .borrow()
            .slots
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Number of frames in the chain, including this one
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut frame = self.parent();
        while let Some(current) = frame {
            depth += 1;
            frame = current.parent();
        }
        depth
    }

    pub fn ptr_eq(&self, other: &Frame) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("names", &self.names())
            .field("depth", &self.depth())
            .finish()
    }
}
