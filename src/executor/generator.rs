//! Generator driver: pull one value at a time
//!
//! `advance` runs the body to its next `yield` and returns the yielded value,
//! or `None` once the body has ended. A failure that escapes the body is
//! returned as `PropagatedFailure`, and every later `advance` reports the same
//! failure again without re-running anything.
//!
//! A body with no reachable `yield` yields its own value once and then ends.
//! A body with reachable `yield`s does not yield its final value; it is kept
//! as `return_value`.

use tracing::{debug, warn};

use super::computation::{
    Computation, ComputationOptions, ComputationState, Event, MAX_CANCEL_ROUNDS,
};
use super::constructs::SuspendPoint;
use super::errors::{EngineError, ErrorInfo};
use super::types::{Expr, Val};

/// The generator suspend keyword
pub const YIELD: &str = "yield";

pub struct Generator {
    computation: Computation,
    cancelled: bool,
    /// Set once the iterator adapter has reported a failure
    exhausted: bool,
}

impl Generator {
    pub fn new(body: &Expr, options: ComputationOptions) -> Result<Self, EngineError> {
        let computation = Computation::new(body, SuspendPoint::new(YIELD), options)?;
        Ok(Generator {
            computation,
            cancelled: false,
            exhausted: false,
        })
    }

    /// Run to the next `yield`. The pending `yield` evaluates to the value it
    /// handed out.
    pub fn advance(&mut self) -> Result<Option<Val>, EngineError> {
        let input = self.computation.pending().unwrap_or(Val::Null);
        self.pull(Ok(input))
    }

    /// Run to the next `yield`, with the pending `yield` evaluating to `val`.
    /// Before the first `yield` there is nothing to receive `val`, so it is
    /// dropped.
    pub fn send(&mut self, val: Val) -> Result<Option<Val>, EngineError> {
        self.pull(Ok(val))
    }

    /// Raise `err` at the pending `yield`. The body may catch it and yield
    /// again.
    pub fn throw(&mut self, err: Val) -> Result<Option<Val>, EngineError> {
        self.pull(Err(err))
    }

    /// Inject cancellation at the pending `yield` and drive the body until it
    /// settles. `finally` clauses run; `catch` clauses do not see the
    /// cancellation. A `yield` reached while unwinding is cancelled in turn,
    /// up to `MAX_CANCEL_ROUNDS` times; past that the body is abandoned and
    /// `CANCEL_IGNORED` is returned.
    ///
    /// Returns an error only if cleanup raised something else or never
    /// stopped suspending.
    pub fn cancel(&mut self) -> Result<(), EngineError> {
        if self.cancelled || self.computation.is_settled() {
            self.cancelled = true;
            return Ok(());
        }
        self.cancelled = true;

        let mut rounds = 0;
        loop {
            match self.computation.resume(Err(ErrorInfo::cancelled().into()))? {
                Event::Suspended(_) if rounds >= MAX_CANCEL_ROUNDS => {
                    warn!(
                        computation = %self.computation.id(),
                        rounds,
                        "body kept suspending during cancellation"
                    );
                    return Err(EngineError::PropagatedFailure(
                        ErrorInfo::cancel_ignored(rounds).into(),
                    ));
                }
                Event::Suspended(_) => rounds += 1,
                Event::Completed(_) => break,
                Event::Failed(Val::Error(err)) if err.is_cancellation() => break,
                Event::Failed(err) => return Err(EngineError::PropagatedFailure(err)),
            }
        }
        debug!(computation = %self.computation.id(), "generator cancelled");
        Ok(())
    }

    /// The body's final value, once a body with reachable `yield`s has ended
    pub fn return_value(&self) -> Option<Val> {
        match self.computation.state() {
            ComputationState::Completed(val) if self.computation.is_pausable() => Some(val),
            _ => None,
        }
    }

    pub fn state(&self) -> ComputationState {
        self.computation.state()
    }

    pub fn is_done(&self) -> bool {
        self.cancelled || self.computation.is_settled()
    }

    pub fn computation(&self) -> &Computation {
        &self.computation
    }

    fn pull(&mut self, input: Result<Val, Val>) -> Result<Option<Val>, EngineError> {
        if self.cancelled {
            return Ok(None);
        }
        match self.computation.state() {
            ComputationState::Completed(_) => return Ok(None),
            ComputationState::Failed(err) => return Err(EngineError::PropagatedFailure(err)),
            ComputationState::Paused | ComputationState::Running => {}
        }

        match self.computation.resume(input)? {
            Event::Suspended(val) => Ok(Some(val)),
            Event::Completed(val) if !self.computation.is_pausable() => Ok(Some(val)),
            Event::Completed(_) => Ok(None),
            Event::Failed(err) => Err(EngineError::PropagatedFailure(err)),
        }
    }
}

impl Iterator for Generator {
    type Item = Result<Val, EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        match self.advance() {
            Ok(Some(val)) => Some(Ok(val)),
            Ok(None) => None,
            Err(err) => {
                self.exhausted = true;
                Some(Err(err))
            }
        }
    }
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("computation", &self.computation)
            .field("cancelled", &self.cancelled)
            .finish()
    }
}
