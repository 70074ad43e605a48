//! `break`, `next` and `return`

use crate::executor::classify::Node;
use crate::executor::cont::{Cont, Conts, Step};
use crate::executor::engine::{check_arity, Engine};
use crate::executor::frame::Frame;
use crate::executor::registry::Construct;
use crate::executor::types::{Control, Expr, Val};

/// Loop jumps. Outside a loop these fail with `CONTROL_OUTSIDE_LOOP`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jump {
    Break,
    Next,
}

impl Jump {
    fn keyword(self) -> &'static str {
        match self {
            Jump::Break => "break",
            Jump::Next => "next",
        }
    }

    fn control(self) -> Control {
        match self {
            Jump::Break => Control::Break,
            Jump::Next => Control::Next,
        }
    }
}

impl Construct for Jump {
    fn eval(&self, args: &[Expr], _frame: &Frame, _engine: &Engine) -> Result<Val, Control> {
        check_arity(self.keyword(), args.len(), 0..=0)?;
        Err(self.control())
    }

    fn eval_cps(&self, args: &[Node], _frame: &Frame, conts: Conts, _engine: &Engine) -> Step {
        if let Err(err) = check_arity(self.keyword(), args.len(), 0..=0) {
            return conts.fail(err);
        }
        conts.route(self.control())
    }
}

/// `return(value?)` - finish the whole body with `value` (NULL if omitted)
pub struct Return;

impl Construct for Return {
    fn eval(&self, args: &[Expr], frame: &Frame, engine: &Engine) -> Result<Val, Control> {
        check_arity("return", args.len(), 0..=1)?;
        let val = match args.first() {
            Some(arg) => engine.eval(arg, frame)?,
            None => Val::Null,
        };
        Err(Control::Return(val))
    }

    fn eval_cps(&self, args: &[Node], frame: &Frame, conts: Conts, engine: &Engine) -> Step {
        if let Err(err) = check_arity("return", args.len(), 0..=1) {
            return conts.fail(err);
        }
        let Some(arg) = args.first() else {
            return conts.ret.call(Val::Null);
        };
        let ret = conts.ret.clone();
        engine.run(arg, frame, conts.with_ok(Cont::new(move |val| ret.call(val))))
    }
}
