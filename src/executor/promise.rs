//! Promises: eventually-settled external sources
//!
//! A `Promise` is the value an async body awaits; the matching `Resolver` is
//! held by whatever produces the result (a timer, an I/O completion, another
//! task). Settling never runs callbacks synchronously: each registered
//! callback is handed to the promise's scheduler and runs on a later turn.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, trace};
use uuid::Uuid;

use super::scheduler::Scheduler;
use super::types::Val;

/// Outcome delivered to `then` callbacks: `Ok` resolved, `Err` rejected
pub type Outcome = Result<Val, Val>;

type Callback = Box<dyn FnOnce(Outcome)>;

#[derive(Debug, Clone, PartialEq)]
pub enum PromiseState {
    Pending,
    Resolved(Val),
    Rejected(Val),
}

impl PromiseState {
    fn outcome(&self) -> Option<Outcome> {
        match self {
            PromiseState::Pending => None,
            PromiseState::Resolved(val) => Some(Ok(val.clone())),
            PromiseState::Rejected(err) => Some(Err(err.clone())),
        }
    }
}

struct PromiseInner {
    id: Uuid,
    state: PromiseState,
    callbacks: Vec<Callback>,
    scheduler: Rc<dyn Scheduler>,
}

/// Shared handle to an eventually-settled value. Clones refer to the same
/// promise; equality is identity.
#[derive(Clone)]
pub struct Promise(Rc<RefCell<PromiseInner>>);

/// The settling side of a `Promise`. Only the first settle takes effect.
#[derive(Clone)]
pub struct Resolver(Promise);

impl Promise {
    /// A pending promise and its resolver
    pub fn new(scheduler: Rc<dyn Scheduler>) -> (Promise, Resolver) {
        let promise = Promise(Rc::new(RefCell::new(PromiseInner {
            id: Uuid::new_v4(),
            state: PromiseState::Pending,
            callbacks: Vec::new(),
            scheduler,
        })));
        let resolver = Resolver(promise.clone());
        (promise, resolver)
    }

    pub fn resolved(scheduler: Rc<dyn Scheduler>, val: Val) -> Promise {
        let (promise, resolver) = Promise::new(scheduler);
        resolver.resolve(val);
        promise
    }

    pub fn rejected(scheduler: Rc<dyn Scheduler>, err: Val) -> Promise {
        let (promise, resolver) = Promise::new(scheduler);
        resolver.reject(err);
        promise
    }

    /// A promise that settles with `outcome` during the `turns`-th scheduler
    /// turn from now. With `turns == 0` it is settled immediately.
    pub fn after_turns(scheduler: Rc<dyn Scheduler>, turns: usize, outcome: Outcome) -> Promise {
        fn countdown(
            scheduler: Rc<dyn Scheduler>,
            remaining: usize,
            resolver: Resolver,
            outcome: Outcome,
        ) {
            if remaining == 0 {
                resolver.settle(outcome);
                return;
            }
            let next = scheduler.clone();
            scheduler.schedule(Box::new(move || {
                countdown(next, remaining - 1, resolver, outcome)
            }));
        }

        let (promise, resolver) = Promise::new(scheduler.clone());
        countdown(scheduler, turns, resolver, outcome);
        promise
    }

    pub fn id(&self) -> Uuid {
        self.0.borrow().id
    }

    pub fn state(&self) -> PromiseState {
        self.0.borrow().state.clone()
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self.0.borrow().state, PromiseState::Pending)
    }

    /// Register a callback for the outcome. If the promise has already
    /// settled, the callback is scheduled right away.
    pub fn then(&self, callback: impl FnOnce(Outcome) + 'static) {
        let settled = {
            let mut inner = self.0.borrow_mut();
            let outcome = inner.state.outcome();
            match outcome {
                None => {
                    inner.callbacks.push(Box::new(callback));
                    return;
                }
                Some(outcome) => (outcome, inner.scheduler.clone()),
            }
        };
        let (outcome, scheduler) = settled;
        scheduler.schedule(Box::new(move || callback(outcome)));
    }

    /// Short status for display: `pending`, `resolved` or `rejected`
    pub fn describe(&self) -> &'static str {
        match self.0.borrow().state {
            PromiseState::Pending => "pending",
            PromiseState::Resolved(_) => "resolved",
            PromiseState::Rejected(_) => "rejected",
        }
    }
}

impl PartialEq for Promise {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for Promise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.0.borrow();
        f.debug_struct("Promise")
            .field("id", &inner.id)
            .field("state", &inner.state)
            .finish()
    }
}

impl Resolver {
    /// Resolve with `val`; returns false if already settled
    pub fn resolve(&self, val: Val) -> bool {
        self.settle(Ok(val))
    }

    /// Reject with `err`; returns false if already settled
    pub fn reject(&self, err: Val) -> bool {
        self.settle(Err(err))
    }

    pub fn settle(&self, outcome: Outcome) -> bool {
        let (callbacks, scheduler) = {
            let mut inner = self.0 .0.borrow_mut();
            if !matches!(inner.state, PromiseState::Pending) {
                trace!(promise = %inner.id, "ignoring second settle");
                return false;
            }
            inner.state = match &outcome {
                Ok(val) => PromiseState::Resolved(val.clone()),
                Err(err) => PromiseState::Rejected(err.clone()),
            };
            debug!(promise = %inner.id, state = ?inner.state, "promise settled");
            (std::mem::take(&mut inner.callbacks), inner.scheduler.clone())
        };

        for callback in callbacks {
            let outcome = outcome.clone();
            scheduler.schedule(Box::new(move || callback(outcome)));
        }
        true
    }

    pub fn promise(&self) -> &Promise {
        &self.0
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Resolver").field(&self.0).finish()
    }
}
