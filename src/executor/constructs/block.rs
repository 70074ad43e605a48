//! `{` - evaluate expressions in order, value of the last

use std::rc::Rc;

use crate::executor::classify::{Node, NodeKind};
use crate::executor::cont::{Cont, Conts, Step};
use crate::executor::engine::Engine;
use crate::executor::frame::Frame;
use crate::executor::registry::Construct;
use crate::executor::types::{Control, Expr, Val};

pub struct Block;

impl Construct for Block {
    fn eval(&self, args: &[Expr], frame: &Frame, engine: &Engine) -> Result<Val, Control> {
        let mut last = Val::Null;
        for expr in args {
            last = engine.eval(expr, frame)?;
        }
        Ok(last)
    }

    fn eval_cps(&self, args: &[Node], frame: &Frame, conts: Conts, engine: &Engine) -> Step {
        if args.is_empty() {
            return conts.ok.call(Val::Null);
        }
        sequence(args.into(), 0, frame.clone(), conts, engine.clone())
    }
}

/// Run `stmts[idx..]`, handing the last value to `conts.ok`.
///
/// Ordinary statements run inline; only a pausable statement gets a
/// continuation for "the statements after me".
fn sequence(stmts: Rc<[Node]>, start: usize, frame: Frame, conts: Conts, engine: Engine) -> Step {
    let mut idx = start;
    loop {
        let node = &stmts[idx];
        if idx + 1 == stmts.len() {
            return engine.run(node, &frame, conts);
        }

        match node.kind() {
            NodeKind::Ordinary(expr) => {
                if let Err(control) = engine.eval(expr, &frame) {
                    return conts.route(control);
                }
                idx += 1;
            }
            NodeKind::Pausable { .. } => {
                let rest = {
                    let (stmts, frame, conts, engine) =
                        (stmts.clone(), frame.clone(), conts.clone(), engine.clone());
                    Cont::new(move |_| {
                        sequence(
                            stmts.clone(),
                            idx + 1,
                            frame.clone(),
                            conts.clone(),
                            engine.clone(),
                        )
                    })
                };
                return engine.run(node, &frame, conts.with_ok(rest));
            }
        }
    }
}
