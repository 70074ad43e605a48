//! `if` - conditional with optional else

use crate::executor::classify::Node;
use crate::executor::cont::{Cont, Conts, Step};
use crate::executor::engine::{check_arity, Engine};
use crate::executor::frame::Frame;
use crate::executor::registry::Construct;
use crate::executor::types::{Control, Expr, Val};

/// `if(test, then, else?)`
pub struct If;

impl Construct for If {
    fn eval(&self, args: &[Expr], frame: &Frame, engine: &Engine) -> Result<Val, Control> {
        check_arity("if", args.len(), 2..=3)?;
        if engine.eval(&args[0], frame)?.truthy()? {
            engine.eval(&args[1], frame)
        } else if let Some(alternate) = args.get(2) {
            engine.eval(alternate, frame)
        } else {
            Ok(Val::Null)
        }
    }

    fn eval_cps(&self, args: &[Node], frame: &Frame, conts: Conts, engine: &Engine) -> Step {
        if let Err(err) = check_arity("if", args.len(), 2..=3) {
            return conts.fail(err);
        }

        // The test resolves fully before a branch is chosen; the other branch
        // is never evaluated.
        let choose = {
            let (consequent, alternate) = (args[1].clone(), args.get(2).cloned());
            let (frame, conts, engine) = (frame.clone(), conts.clone(), engine.clone());
            Cont::new(move |test| match test.truthy() {
                Err(err) => conts.fail(err),
                Ok(true) => engine.run(&consequent, &frame, conts.clone()),
                Ok(false) => match &alternate {
                    Some(alternate) => engine.run(alternate, &frame, conts.clone()),
                    None => conts.ok.call(Val::Null),
                },
            })
        };
        engine.run(&args[0], frame, conts.with_ok(choose))
    }
}
