//! Schedulers for the async driver
//!
//! The async driver never resumes a computation synchronously. It hands a job
//! to a `Scheduler` and the job runs on the scheduler's own turn.
//!
//! - `TurnQueue` - deterministic, manually driven turns (tests, embedding)
//! - `LocalScheduler` - jobs become tokio tasks on the current `LocalSet`

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::trace;

/// A unit of deferred work
pub type Job = Box<dyn FnOnce()>;

pub trait Scheduler {
    /// Queue `job` to run on a later turn. Must not run it synchronously.
    fn schedule(&self, job: Job);
}

/* ===================== TurnQueue ===================== */

#[derive(Default)]
struct TurnState {
    pending: VecDeque<Job>,
    turns: u64,
}

/// A turn-based job queue.
///
/// Each `run_turn` runs only the jobs that were queued before the turn began;
/// jobs scheduled during a turn wait for the next one.
#[derive(Clone, Default)]
pub struct TurnQueue {
    state: Rc<RefCell<TurnState>>,
}

impl TurnQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// This queue as a shareable scheduler
    pub fn handle(&self) -> Rc<dyn Scheduler> {
        Rc::new(self.clone())
    }

    /// Run one turn; returns how many jobs ran
    pub fn run_turn(&self) -> usize {
        let due = {
            let mut state = self.state.borrow_mut();
            state.turns += 1;
            state.pending.len()
        };

        for _ in 0..due {
            // Release the borrow before running: jobs schedule more jobs
            let job = self.state.borrow_mut().pending.pop_front();
            if let Some(job) = job {
                job();
            }
        }

        trace!(turn = self.turns(), jobs = due, "turn finished");
        due
    }

    /// Run turns until no jobs remain or `max_turns` have run. Returns the
    /// number of turns run.
    pub fn run_until_idle(&self, max_turns: u64) -> u64 {
        let mut ran = 0;
        while !self.is_idle() && ran < max_turns {
            self.run_turn();
            ran += 1;
        }
        ran
    }

    pub fn is_idle(&self) -> bool {
        self.state.borrow().pending.is_empty()
    }

    /// Turns run so far
    pub fn turns(&self) -> u64 {
        self.state.borrow().turns
    }

    pub fn pending(&self) -> usize {
        self.state.borrow().pending.len()
    }
}

impl Scheduler for TurnQueue {
    fn schedule(&self, job: Job) {
        self.state.borrow_mut().pending.push_back(job);
    }
}

impl std::fmt::Debug for TurnQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnQueue")
            .field("turns", &self.turns())
            .field("pending", &self.pending())
            .finish()
    }
}

/* ===================== LocalScheduler ===================== */

/// Runs each job as a tokio task on the current `LocalSet`.
///
/// Scheduling outside a `LocalSet` panics, as `tokio::task::spawn_local` does.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalScheduler;

impl LocalScheduler {
    pub fn handle() -> Rc<dyn Scheduler> {
        Rc::new(LocalScheduler)
    }
}

impl Scheduler for LocalScheduler {
    fn schedule(&self, job: Job) {
        tokio::task::spawn_local(async move { job() });
    }
}
