pub mod cli;
pub mod config;
pub mod executor;
pub mod parser;

// Re-export the driver API for convenience
pub use executor::{
    Computation, ComputationOptions, EngineError, Expr, Generator, LocalScheduler, Promise,
    PromiseState, Resolver, Scheduler, Task, TurnQueue, Val,
};
pub use parser::{parse_body, ParseError};
