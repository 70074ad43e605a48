//! Short-circuit logic: `&&` and `||`
//!
//! The right operand is only evaluated, in either form, when the left
//! operand's value does not already decide the result.

use crate::executor::classify::Node;
use crate::executor::cont::{Cont, Conts, Step};
use crate::executor::engine::{check_arity, Engine};
use crate::executor::frame::Frame;
use crate::executor::registry::Construct;
use crate::executor::types::{Control, Expr, Val};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    fn symbol(self) -> &'static str {
        match self {
            LogicalOp::And => "&&",
            LogicalOp::Or => "||",
        }
    }

    /// The result if the left operand alone decides it
    fn short_circuit(self, left: bool) -> Option<bool> {
        match (self, left) {
            (LogicalOp::And, false) => Some(false),
            (LogicalOp::Or, true) => Some(true),
            _ => None,
        }
    }
}

pub struct Logical {
    op: LogicalOp,
}

impl Logical {
    pub fn new(op: LogicalOp) -> Self {
        Logical { op }
    }
}

impl Construct for Logical {
    fn eval(&self, args: &[Expr], frame: &Frame, engine: &Engine) -> Result<Val, Control> {
        check_arity(self.op.symbol(), args.len(), 2..=2)?;
        let left = engine.eval(&args[0], frame)?.truthy()?;
        if let Some(decided) = self.op.short_circuit(left) {
            return Ok(Val::Bool(decided));
        }
        Ok(Val::Bool(engine.eval(&args[1], frame)?.truthy()?))
    }

    fn eval_cps(&self, args: &[Node], frame: &Frame, conts: Conts, engine: &Engine) -> Step {
        if let Err(err) = check_arity(self.op.symbol(), args.len(), 2..=2) {
            return conts.fail(err);
        }

        let op = self.op;
        let on_left = {
            let right = args[1].clone();
            let (frame, conts, engine) = (frame.clone(), conts.clone(), engine.clone());
            Cont::new(move |left| {
                let left = match left.truthy() {
                    Ok(left) => left,
                    Err(err) => return conts.fail(err),
                };
                if let Some(decided) = op.short_circuit(left) {
                    return conts.ok.call(Val::Bool(decided));
                }
                let on_right = {
                    let conts = conts.clone();
                    Cont::new(move |right| match right.truthy() {
                        Ok(right) => conts.ok.call(Val::Bool(right)),
                        Err(err) => conts.fail(err),
                    })
                };
                engine.run(&right, &frame, conts.with_ok(on_right))
            })
        };
        engine.run(&args[0], frame, conts.with_ok(on_left))
    }
}
