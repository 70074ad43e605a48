//! Pausable-construct engine
//!
//! Bodies are classified against a layered registry of constructs. Call sites
//! that can reach a suspend point run in continuation-passing form on a
//! trampoline; everything else runs as ordinary native evaluation. Two drivers
//! consume the result:
//!
//! - `Generator` - pull one value per `advance`, suspend point `yield`
//! - `Task` - resumed by a scheduler when awaited sources settle, suspend
//!   point `await`

pub mod classify;
pub mod computation;
pub mod constructs;
pub mod cont;
pub mod engine;
pub mod errors;
pub mod frame;
pub mod generator;
pub mod promise;
pub mod registry;
pub mod scheduler;
pub mod stdlib;
pub mod task;
pub mod types;

#[cfg(test)]
mod tests;

pub use computation::{Computation, ComputationOptions, ComputationState, Event};
pub use engine::Engine;
pub use errors::{EngineError, ErrorInfo};
pub use frame::Frame;
pub use generator::Generator;
pub use promise::{Promise, PromiseState, Resolver};
pub use registry::{Construct, Registry};
pub use scheduler::{LocalScheduler, Scheduler, TurnQueue};
pub use stdlib::Natives;
pub use task::Task;
pub use types::{Control, Expr, Span, Val};
