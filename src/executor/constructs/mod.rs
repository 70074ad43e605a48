//! Built-in pausable constructs
//!
//! Each construct implements the ordinary evaluation and the
//! continuation-passing evaluation of one control form. The two must agree on
//! evaluation order and short-circuiting; the continuation-passing form just
//! expresses "what happens next" as a `Cont` instead of a native return.
//!
//! - `block.rs` - `{`
//! - `branch.rs` - `if`
//! - `loops.rs` - `while`, `repeat`, `for`
//! - `assign.rs` - `=`, `<-`, `<<-`
//! - `logic.rs` - `&&`, `||`
//! - `try_catch.rs` - `try` with catch and finally
//! - `jump.rs` - `break`, `next`, `return`
//! - `suspend.rs` - suspend points (`yield`, `await`), registered by drivers

mod assign;
mod block;
mod branch;
mod jump;
mod logic;
mod loops;
mod suspend;
mod try_catch;

pub use assign::Assign;
pub use block::Block;
pub use branch::If;
pub use jump::{Jump, Return};
pub use logic::{Logical, LogicalOp};
pub use loops::{For, Repeat, While};
pub use suspend::SuspendPoint;
pub use try_catch::TryCatch;

use super::registry::Registry;

/// Register the built-in control constructs
pub fn register_builtins(registry: &mut Registry) {
    registry.register("{", Block);
    registry.register("if", If);
    registry.register("while", While);
    registry.register("repeat", Repeat);
    registry.register("for", For);
    registry.register("=", Assign::local());
    registry.register("<-", Assign::local());
    registry.register("<<-", Assign::enclosing());
    registry.register("&&", Logical::new(LogicalOp::And));
    registry.register("||", Logical::new(LogicalOp::Or));
    registry.register("try", TryCatch);
    registry.register("break", Jump::Break);
    registry.register("next", Jump::Next);
    registry.register("return", Return);
}
