//! Suspend points
//!
//! A suspend point hands a value to the driver and parks the rest of the body
//! as a `Resumption`. Which keyword is a suspend point depends on the driver:
//! generators register `yield`, async tasks register `await`.

use crate::executor::classify::Node;
use crate::executor::cont::{Cont, Conts, Resumption, Step};
use crate::executor::engine::{check_arity, Engine};
use crate::executor::errors::{self, ErrorInfo};
use crate::executor::frame::Frame;
use crate::executor::registry::Construct;
use crate::executor::types::{Control, Expr, Val};

#[derive(Debug, Clone, Copy)]
pub struct SuspendPoint {
    keyword: &'static str,
}

impl SuspendPoint {
    pub fn new(keyword: &'static str) -> Self {
        SuspendPoint { keyword }
    }

    pub fn keyword(&self) -> &'static str {
        self.keyword
    }
}

impl Construct for SuspendPoint {
    /// Only reachable when a construct evaluates its arguments by hand and
    /// bypasses classification; there is nothing to suspend to.
    fn eval(&self, _args: &[Expr], _frame: &Frame, _engine: &Engine) -> Result<Val, Control> {
        Err(ErrorInfo::new(
            errors::INTERNAL_ERROR,
            format!("{}() used outside a pausable position", self.keyword),
        )
        .into())
    }

    fn eval_cps(&self, args: &[Node], frame: &Frame, conts: Conts, engine: &Engine) -> Step {
        if let Err(err) = check_arity(self.keyword, args.len(), 0..=1) {
            return conts.fail(err);
        }

        let suspend = {
            let conts = conts.clone();
            Cont::new(move |value| Step::Suspend {
                value,
                resume: Resumption::new(conts.ok.clone(), conts.err.clone()),
            })
        };
        match args.first() {
            Some(arg) => engine.run(arg, frame, conts.with_ok(suspend)),
            None => suspend.call(Val::Null),
        }
    }

    fn is_suspend_point(&self) -> bool {
        true
    }
}
