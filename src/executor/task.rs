//! Async driver: push-based tasks
//!
//! A `Task` runs a body whose suspend point is `await`. Each `await` hands its
//! value to the driver, which subscribes to it (when it is a `Promise`) and
//! returns. When the source settles, the resume is scheduled and runs on a
//! later scheduler turn, never inside the source's settle call.
//!
//! The task's own completion is a `Promise`, so tasks can await each other.
//!
//! Every suspension gets a ticket. A wake carrying an old ticket (for example
//! the source settling after the task was cancelled at that await) is
//! ignored.

use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;

use tracing::{debug, warn};
use uuid::Uuid;

use super::computation::{Computation, ComputationOptions, Event, MAX_CANCEL_ROUNDS};
use super::constructs::SuspendPoint;
use super::errors::{self, EngineError, ErrorInfo};
use super::promise::{Outcome, Promise, PromiseState, Resolver};
use super::scheduler::Scheduler;
use super::types::{Expr, Val};

/// The async suspend keyword
pub const AWAIT: &str = "await";

/// Handle to a running task. Clones share the task.
#[derive(Clone)]
pub struct Task {
    inner: Rc<TaskInner>,
}

struct TaskInner {
    computation: Computation,
    scheduler: Rc<dyn Scheduler>,
    promise: Promise,
    resolver: Resolver,
    ticket: Cell<u64>,
    cancel_requested: Cell<bool>,
    /// Suspensions seen since cancellation was first injected
    cancel_rounds: Cell<u32>,
}

impl Task {
    /// Create a task and schedule its first step. Nothing in the body runs
    /// until the scheduler's next turn.
    pub fn spawn(
        body: &Expr,
        scheduler: Rc<dyn Scheduler>,
        options: ComputationOptions,
    ) -> Result<Task, EngineError> {
        let computation = Computation::new(body, SuspendPoint::new(AWAIT), options)?;
        let (promise, resolver) = Promise::new(scheduler.clone());

        let inner = Rc::new(TaskInner {
            computation,
            scheduler,
            promise,
            resolver,
            ticket: Cell::new(0),
            cancel_requested: Cell::new(false),
            cancel_rounds: Cell::new(0),
        });
        debug!(task = %inner.computation.id(), "task spawned");

        let starter = inner.clone();
        inner
            .scheduler
            .schedule(Box::new(move || starter.step(0, Ok(Val::Null))));

        Ok(Task { inner })
    }

    pub fn id(&self) -> Uuid {
        self.inner.computation.id()
    }

    /// The task's completion as a value bodies can `await`
    pub fn promise(&self) -> Promise {
        self.inner.promise.clone()
    }

    pub fn state(&self) -> PromiseState {
        self.inner.promise.state()
    }

    pub fn is_settled(&self) -> bool {
        self.inner.promise.is_settled()
    }

    /// Register a completion callback; it runs on a scheduler turn
    pub fn on_settled(&self, callback: impl FnOnce(Outcome) + 'static) {
        self.inner.promise.then(callback);
    }

    /// Future resolving to the task's outcome, for use from Rust async code.
    ///
    /// The task still needs its scheduler to make progress.
    pub fn settled(&self) -> impl Future<Output = Outcome> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.inner.promise.then(move |outcome| {
            let _ = tx.send(outcome);
        });
        async move {
            rx.await.unwrap_or_else(|_| {
                Err(ErrorInfo::new(
                    errors::INTERNAL_ERROR,
                    "task was dropped before it settled",
                )
                .into())
            })
        }
    }

    /// Request cancellation. On the next scheduler turn a `CANCELLED`
    /// failure is injected at the pending `await`; `finally` clauses run and
    /// the task rejects. No effect once the task has settled.
    pub fn cancel(&self) {
        if self.inner.cancel_requested.replace(true) {
            return;
        }
        let inner = self.inner.clone();
        self.inner
            .scheduler
            .schedule(Box::new(move || inner.inject_cancel()));
    }
}

impl TaskInner {
    fn step(self: &Rc<Self>, ticket: u64, input: Outcome) {
        if ticket != self.ticket.get() {
            warn!(
                task = %self.computation.id(),
                ticket,
                current = self.ticket.get(),
                "ignoring stale wake"
            );
            return;
        }
        self.ticket.set(ticket + 1);

        match self.computation.resume(input) {
            Ok(Event::Suspended(_)) if self.cancel_rounds.get() >= MAX_CANCEL_ROUNDS => {
                let rounds = self.cancel_rounds.get();
                warn!(task = %self.computation.id(), rounds, "body kept awaiting during cancellation");
                self.resolver.reject(ErrorInfo::cancel_ignored(rounds).into());
            }
            Ok(Event::Suspended(awaited)) if self.cancel_requested.get() => {
                debug!(task = %self.computation.id(), awaited = %awaited, "await during cancellation");
                self.cancel_rounds.set(self.cancel_rounds.get() + 1);
                let inner = self.clone();
                self.scheduler
                    .schedule(Box::new(move || inner.inject_cancel()));
            }
            Ok(Event::Suspended(awaited)) => self.wait_on(awaited),
            Ok(Event::Completed(val)) => {
                debug!(task = %self.computation.id(), "task resolved");
                self.resolver.resolve(val);
            }
            Ok(Event::Failed(err)) => {
                debug!(task = %self.computation.id(), "task rejected");
                self.resolver.reject(err);
            }
            Err(err) => warn!(task = %self.computation.id(), error = %err, "resume rejected"),
        }
    }

    /// Subscribe to the awaited value. A non-promise counts as already
    /// resolved with itself; it is still delivered on a later turn.
    ///
    /// Resumes always run on this task's scheduler, whichever scheduler the
    /// awaited promise settles on.
    fn wait_on(self: &Rc<Self>, awaited: Val) {
        let ticket = self.ticket.get();
        let inner = self.clone();
        match awaited {
            Val::Promise(source) => {
                let scheduler = self.scheduler.clone();
                source.then(move |outcome| {
                    scheduler.schedule(Box::new(move || inner.step(ticket, outcome)))
                })
            }
            other => self
                .scheduler
                .schedule(Box::new(move || inner.step(ticket, Ok(other)))),
        }
    }

    fn inject_cancel(self: &Rc<Self>) {
        // The promise may have rejected while the body was still paused
        if self.computation.is_settled() || self.promise.is_settled() {
            return;
        }
        debug!(task = %self.computation.id(), "injecting cancellation");
        self.step(self.ticket.get(), Err(ErrorInfo::cancelled().into()));
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}
