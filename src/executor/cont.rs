//! Continuations and the trampoline
//!
//! A continuation is "the rest of the computation" as a heap closure. Pausable
//! constructs never call a continuation directly: `Cont::call` returns a
//! `Step::Bounce` and the driver's trampoline runs it once the current native
//! stack has unwound. Long-running loops therefore use constant native stack.

use std::rc::Rc;

use super::errors::{self, ErrorInfo};
use super::types::{Control, Val};

/// Deferred work for the trampoline
pub type Thunk = Box<dyn FnOnce() -> Step>;

/// What evaluating a piece of a pausable body produced
pub enum Step {
    /// More work to do; run the thunk
    Bounce(Thunk),
    /// A suspend point fired: hand `value` and the resumption to the driver
    Suspend { value: Val, resume: Resumption },
    /// The body finished with a value
    Done(Val),
    /// A failure reached the outermost failure continuation
    Failed(Val),
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Bounce(_) => write!(f, "Bounce"),
            Step::Suspend { value, .. } => write!(f, "Suspend({})", value),
            Step::Done(val) => write!(f, "Done({})", val),
            Step::Failed(val) => write!(f, "Failed({})", val),
        }
    }
}

/// A trampolined run that came to rest
#[derive(Debug)]
pub enum Settled {
    Suspended { value: Val, resume: Resumption },
    Completed(Val),
    Failed(Val),
}

/// Run steps until the computation suspends, completes or fails.
///
/// `limit` caps the number of bounces; exceeding it fails with `STEP_LIMIT`.
pub fn trampoline(mut step: Step, limit: Option<u64>) -> Settled {
    let mut bounces: u64 = 0;
    loop {
        match step {
            Step::Bounce(thunk) => {
                bounces += 1;
                if limit.is_some_and(|max| bounces > max) {
                    return Settled::Failed(Val::Error(ErrorInfo::new(
                        errors::STEP_LIMIT,
                        format!("exceeded step limit of {} without suspending", bounces - 1),
                    )));
                }
                step = thunk();
            }
            Step::Suspend { value, resume } => return Settled::Suspended { value, resume },
            Step::Done(val) => return Settled::Completed(val),
            Step::Failed(val) => return Settled::Failed(val),
        }
    }
}

/* ===================== Continuations ===================== */

/// A single-argument continuation. May be invoked any number of times.
#[derive(Clone)]
pub struct Cont(Rc<dyn Fn(Val) -> Step>);

impl Cont {
    pub fn new(f: impl Fn(Val) -> Step + 'static) -> Self {
        Cont(Rc::new(f))
    }

    /// Continuation that ends the computation with its argument
    pub fn done() -> Self {
        Cont::new(Step::Done)
    }

    /// Continuation that fails the computation with its argument
    pub fn failed() -> Self {
        Cont::new(Step::Failed)
    }

    /// Invoke through the trampoline
    pub fn call(&self, val: Val) -> Step {
        let f = self.0.clone();
        Step::Bounce(Box::new(move || f(val)))
    }
}

impl std::fmt::Debug for Cont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cont")
    }
}

/// The exits available at a position in a pausable body
///
/// `ok` and `err` are the success and failure continuations; `brk` and `next`
/// exist only inside a loop; `ret` finishes the whole body.
#[derive(Clone, Debug)]
pub struct Conts {
    pub ok: Cont,
    pub err: Cont,
    pub brk: Option<Cont>,
    pub next: Option<Cont>,
    pub ret: Cont,
}

impl Conts {
    /// Exits at the top of a body: value and return complete, failure fails
    pub fn top() -> Self {
        Conts {
            ok: Cont::done(),
            err: Cont::failed(),
            brk: None,
            next: None,
            ret: Cont::done(),
        }
    }

    pub fn with_ok(&self, ok: Cont) -> Self {
        Conts {
            ok,
            ..self.clone()
        }
    }

    pub fn with_err(&self, err: Cont) -> Self {
        Conts {
            err,
            ..self.clone()
        }
    }

    pub fn with_loop(&self, brk: Cont, next: Cont) -> Self {
        Conts {
            brk: Some(brk),
            next: Some(next),
            ..self.clone()
        }
    }

    /// Raise a failure
    pub fn fail(&self, err: impl Into<Val>) -> Step {
        self.err.call(err.into())
    }

    /// Route a control signal from ordinary evaluation to its continuation
    pub fn route(&self, control: Control) -> Step {
        match control {
            Control::Throw(err) => self.err.call(err),
            Control::Return(val) => self.ret.call(val),
            Control::Break => match &self.brk {
                Some(brk) => brk.call(Val::Null),
                None => self.fail(outside_loop("break")),
            },
            Control::Next => match &self.next {
                Some(next) => next.call(Val::Null),
                None => self.fail(outside_loop("next")),
            },
        }
    }
}

pub(crate) fn outside_loop(keyword: &str) -> ErrorInfo {
    ErrorInfo::new(
        errors::CONTROL_OUTSIDE_LOOP,
        format!("no loop for {} to jump to", keyword),
    )
}

/* ===================== Resumption ===================== */

/// The continuation captured at a suspend point
///
/// Deliberately not `Clone`: resuming consumes it, so a paused position can
/// be re-entered at most once per suspension.
pub struct Resumption {
    ok: Cont,
    err: Cont,
}

impl Resumption {
    pub fn new(ok: Cont, err: Cont) -> Self {
        Resumption { ok, err }
    }

    /// Re-enter the body after the suspend point
    pub fn resume(self, outcome: Result<Val, Val>) -> Step {
        match outcome {
            Ok(val) => self.ok.call(val),
            Err(err) => self.err.call(err),
        }
    }
}

impl std::fmt::Debug for Resumption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Resumption")
    }
}
