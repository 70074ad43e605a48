//! Computation state machine
//!
//! A `Computation` is one run of a body: its frame, its plan, and the state
//! the drivers move it through.
//!
//! ```text
//! Paused --resume--> Running --suspend--> Paused
//!                       |
//!                       +--> Completed(value) | Failed(error)
//! ```
//!
//! The paused continuation is consumed when a resume starts, so a second
//! resume arriving while the first is still running is rejected with
//! `ConcurrentResumeViolation` instead of re-entering the body.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, trace, warn};
use uuid::Uuid;

use super::classify::Node;
use super::constructs::SuspendPoint;
use super::cont::{trampoline, Cont, Conts, Resumption, Settled};
use super::engine::Engine;
use super::errors::{EngineError, ErrorInfo};
use super::frame::Frame;
use super::registry::{Construct, Registry};
use super::stdlib::Natives;
use super::types::{Expr, Val};

/// Suspensions tolerated during cancellation cleanup before a driver gives
/// up with `CANCEL_IGNORED`
pub const MAX_CANCEL_ROUNDS: u32 = 100;

/// Externally visible state of a computation
#[derive(Debug, Clone, PartialEq)]
pub enum ComputationState {
    /// Waiting to start or to be resumed
    Paused,
    Running,
    Completed(Val),
    Failed(Val),
}

/// What a single resume produced
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A suspend point handed out this value
    Suspended(Val),
    Completed(Val),
    Failed(Val),
}

enum State {
    Paused { resume: Resumption, pending: Val },
    Running,
    Completed(Val),
    Failed(Val),
}

pub struct Computation {
    id: Uuid,
    frame: Frame,
    pausable: bool,
    step_limit: Option<u64>,
    state: RefCell<State>,
}

impl Computation {
    /// Classify `body` and park it at its start.
    ///
    /// `suspend` is the driver's suspend point (`yield` or `await`).
    /// Classification errors surface here, before anything is evaluated.
    pub fn new(
        body: &Expr,
        suspend: SuspendPoint,
        options: ComputationOptions,
    ) -> Result<Self, EngineError> {
        let ComputationOptions {
            frame,
            inputs,
            definitions,
            natives,
            step_limit,
        } = options;

        let mut driver = Registry::scope(&Registry::builtins());
        driver.register(suspend.keyword(), suspend);
        let mut layer = Registry::scope(&driver.snapshot());
        for (name, construct) in definitions {
            layer.register_rc(name, construct);
        }

        let engine = Engine::builder()
            .registry(layer.snapshot())
            .natives(natives)
            .build();
        let plan = engine.plan(body)?;

        let frame = frame.map_or_else(Frame::root, |enclosing| enclosing.child());
        for (name, val) in inputs {
            frame.set_local(name, val);
        }

        let id = Uuid::new_v4();
        debug!(
            computation = %id,
            driver = suspend.keyword(),
            pausable = plan.is_pausable(),
            "computation created"
        );

        Ok(Computation {
            id,
            pausable: plan.is_pausable(),
            frame: frame.clone(),
            step_limit,
            state: RefCell::new(State::Paused {
                resume: start(plan, frame, engine),
                pending: Val::Null,
            }),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The computation's own frame
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Whether the body contains a reachable suspend point
    pub fn is_pausable(&self) -> bool {
        self.pausable
    }

    pub fn state(&self) -> ComputationState {
        match &*self.state.borrow() {
            State::Paused { .. } => ComputationState::Paused,
            State::Running => ComputationState::Running,
            State::Completed(val) => ComputationState::Completed(val.clone()),
            State::Failed(err) => ComputationState::Failed(err.clone()),
        }
    }

    /// The value handed out by the most recent suspend, while paused
    pub fn pending(&self) -> Option<Val> {
        match &*self.state.borrow() {
            State::Paused { pending, .. } => Some(pending.clone()),
            _ => None,
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(
            *self.state.borrow(),
            State::Completed(_) | State::Failed(_)
        )
    }

    /// Resume with a value (`Ok`) or inject a failure (`Err`) at the pending
    /// suspend point, and run until the next suspend or the end.
    ///
    /// The first resume starts the body; its input is ignored unless it is a
    /// failure, which fails the computation without running anything.
    pub fn resume(&self, input: Result<Val, Val>) -> Result<Event, EngineError> {
        let resume = {
            let mut state = self.state.borrow_mut();
            match std::mem::replace(&mut *state, State::Running) {
                State::Paused { resume, .. } => resume,
                State::Running => {
                    warn!(computation = %self.id, "resume rejected: already running");
                    return Err(EngineError::ConcurrentResumeViolation);
                }
                settled => {
                    *state = settled;
                    warn!(computation = %self.id, "resume rejected: already settled");
                    return Err(EngineError::ResumeAfterCompletion);
                }
            }
        };

        trace!(computation = %self.id, failure = input.is_err(), "resuming");
        let (state, event) = match trampoline(resume.resume(input), self.step_limit) {
            Settled::Suspended { value, resume } => (
                State::Paused {
                    resume,
                    pending: value.clone(),
                },
                Event::Suspended(value),
            ),
            Settled::Completed(val) => (State::Completed(val.clone()), Event::Completed(val)),
            Settled::Failed(err) => (State::Failed(err.clone()), Event::Failed(err)),
        };
        *self.state.borrow_mut() = state;

        debug!(computation = %self.id, event = ?event, "computation came to rest");
        Ok(event)
    }
}

impl std::fmt::Debug for Computation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computation")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// The resumption that runs a plan from the top
fn start(plan: Node, frame: Frame, engine: Engine) -> Resumption {
    let begin = Cont::new(move |_| engine.run(&plan, &frame, Conts::top()));
    Resumption::new(begin, Cont::failed())
}

/* ===================== Options ===================== */

/// Per-computation setup, shared by both drivers
pub struct ComputationOptions {
    frame: Option<Frame>,
    inputs: Vec<(String, Val)>,
    definitions: Vec<(String, Rc<dyn Construct>)>,
    natives: Natives,
    step_limit: Option<u64>,
}

impl Default for ComputationOptions {
    fn default() -> Self {
        ComputationOptions {
            frame: None,
            inputs: Vec::new(),
            definitions: Vec::new(),
            natives: Natives::standard(),
            step_limit: None,
        }
    }
}

impl ComputationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` in the computation's frame before it starts
    pub fn input(mut self, name: impl Into<String>, val: impl Into<Val>) -> Self {
        self.inputs.push((name.into(), val.into()));
        self
    }

    /// Enclosing frame; the computation runs in a fresh child of it
    pub fn frame(mut self, frame: Frame) -> Self {
        self.frame = Some(frame);
        self
    }

    /// Add a pausable construct visible to this computation only. It
    /// shadows built-ins of the same name.
    pub fn define(mut self, name: impl Into<String>, construct: impl Construct + 'static) -> Self {
        self.definitions.push((name.into(), Rc::new(construct)));
        self
    }

    /// Add an ordinary function
    pub fn native(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&[Val]) -> Result<Val, ErrorInfo> + 'static,
    ) -> Self {
        self.natives.register(name, f);
        self
    }

    /// Cap on trampoline bounces per resume
    pub fn step_limit(mut self, limit: Option<u64>) -> Self {
        self.step_limit = limit;
        self
    }
}

impl std::fmt::Debug for ComputationOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let definitions: Vec<&str> = self.definitions.iter().map(|(n, _)| n.as_str()).collect();
        f.debug_struct("ComputationOptions")
            .field("inputs", &self.inputs)
            .field("definitions", &definitions)
            .field("step_limit", &self.step_limit)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::errors;
    use crate::parser::parse_body;

    fn computation(source: &str, options: ComputationOptions) -> Computation {
        let body = parse_body(source).expect("parse failed");
        Computation::new(&body, SuspendPoint::new("yield"), options).expect("classify failed")
    }

    #[test]
    fn test_state_transitions() {
        let comp = computation("yield(1); 2", ComputationOptions::new());
        assert_eq!(comp.state(), ComputationState::Paused);
        assert!(comp.is_pausable());

        assert_eq!(comp.resume(Ok(Val::Null)), Ok(Event::Suspended(Val::Num(1.0))));
        assert_eq!(comp.pending(), Some(Val::Num(1.0)));

        assert_eq!(comp.resume(Ok(Val::Null)), Ok(Event::Completed(Val::Num(2.0))));
        assert_eq!(comp.state(), ComputationState::Completed(Val::Num(2.0)));
        assert_eq!(
            comp.resume(Ok(Val::Null)),
            Err(EngineError::ResumeAfterCompletion)
        );
    }

    #[test]
    fn test_failure_injected_before_start_runs_nothing() {
        let comp = computation("touched = TRUE; yield(1)", ComputationOptions::new());
        let event = comp.resume(Err(ErrorInfo::cancelled().into())).unwrap();
        assert_eq!(event, Event::Failed(ErrorInfo::cancelled().into()));
        assert_eq!(comp.frame().get("touched"), None);
    }

    #[test]
    fn test_inputs_bind_in_own_frame() {
        let outer = Frame::with_bindings([("base", Val::Num(10.0))]);
        let comp = computation(
            "base + offset",
            ComputationOptions::new().frame(outer.clone()).input("offset", 5.0),
        );
        assert_eq!(comp.resume(Ok(Val::Null)), Ok(Event::Completed(Val::Num(15.0))));
        assert!(comp.frame().parent().is_some_and(|p| p.ptr_eq(&outer)));
        assert_eq!(outer.get("offset"), None);
    }

    #[test]
    fn test_step_limit_fails_runaway_body() {
        let comp = computation(
            "repeat { x = 1; if (FALSE) yield(x) }",
            ComputationOptions::new().step_limit(Some(1_000)),
        );
        let Ok(Event::Failed(Val::Error(err))) = comp.resume(Ok(Val::Null)) else {
            unreachable!("expected step limit failure");
        };
        assert_eq!(err.code, errors::STEP_LIMIT);
    }

    #[test]
    fn test_resume_from_inside_the_body_is_rejected() {
        let slot: Rc<RefCell<Option<Rc<Computation>>>> = Rc::new(RefCell::new(None));
        let options = {
            let slot = slot.clone();
            ComputationOptions::new().native("reenter", move |_| {
                let guard = slot.borrow();
                let Some(comp) = guard.as_ref() else {
                    return Ok(Val::Null);
                };
                match comp.resume(Ok(Val::Null)) {
                    Err(EngineError::ConcurrentResumeViolation) => Ok(Val::Str("rejected".into())),
                    other => Ok(Val::Str(format!("{:?}", other))),
                }
            })
        };
        let comp = Rc::new(computation("yield(reenter())", options));
        *slot.borrow_mut() = Some(comp.clone());

        assert_eq!(
            comp.resume(Ok(Val::Null)),
            Ok(Event::Suspended(Val::Str("rejected".into())))
        );
        slot.borrow_mut().take();
    }
}
