//! `try` - failure handling with optional catch and finally
//!
//! Shape: `try(body, var, handler, finally)`, where `var`, `handler` and
//! `finally` may be NULL when absent.
//!
//! - A failure surfacing anywhere in `body`, from a suspend point or from
//!   ordinary evaluation, binds `var` and runs `handler` in place of the body.
//! - Cancellation failures skip the handler.
//! - `finally` runs on every exit: value, failure, break, next and return.
//!   A failure raised by `finally` itself replaces the outcome in flight.

use crate::executor::classify::Node;
use crate::executor::cont::{Cont, Conts, Step};
use crate::executor::engine::{check_arity, Engine};
use crate::executor::errors::{self, ErrorInfo};
use crate::executor::frame::Frame;
use crate::executor::registry::Construct;
use crate::executor::types::{Control, Expr, Val};

pub struct TryCatch;

fn is_cancellation(err: &Val) -> bool {
    matches!(err, Val::Error(info) if info.is_cancellation())
}

fn catch_variable(var: Option<&Expr>) -> Result<Option<String>, ErrorInfo> {
    match var {
        None | Some(Expr::LitNull) => Ok(None),
        Some(Expr::Ident { name, .. }) => Ok(Some(name.clone())),
        Some(_) => Err(ErrorInfo::new(
            errors::WRONG_ARG_TYPE,
            "try() catch variable must be an identifier",
        )),
    }
}

/// Treat a missing or NULL argument as absent
fn present<T>(arg: Option<&T>, is_null: impl Fn(&T) -> bool) -> Option<&T> {
    arg.filter(|arg| !is_null(arg))
}

impl Construct for TryCatch {
    fn eval(&self, args: &[Expr], frame: &Frame, engine: &Engine) -> Result<Val, Control> {
        check_arity("try", args.len(), 1..=4)?;
        let var = catch_variable(args.get(1))?;
        let handler = present(args.get(2), Expr::is_null);
        let finally = present(args.get(3), Expr::is_null);

        let outcome = match (engine.eval(&args[0], frame), handler) {
            (Err(Control::Throw(err)), Some(handler)) if !is_cancellation(&err) => {
                if let Some(var) = &var {
                    frame.set_local(var.as_str(), err);
                }
                engine.eval(handler, frame)
            }
            (outcome, _) => outcome,
        };

        if let Some(finally) = finally {
            engine.eval(finally, frame)?;
        }
        outcome
    }

    fn eval_cps(&self, args: &[Node], frame: &Frame, conts: Conts, engine: &Engine) -> Step {
        if let Err(err) = check_arity("try", args.len(), 1..=4) {
            return conts.fail(err);
        }
        let var = match catch_variable(args.get(1).and_then(Node::expr)) {
            Ok(var) => var,
            Err(err) => return conts.fail(err),
        };
        let handler = present(args.get(2), Node::is_null).cloned();

        // Every exit from body or handler passes through finally
        let exits = match present(args.get(3), Node::is_null) {
            Some(finally) => through_finally(&conts, finally, frame, engine),
            None => conts,
        };

        let body_conts = match handler {
            None => exits,
            Some(handler) => {
                let on_failure = {
                    let (frame, exits, engine) = (frame.clone(), exits.clone(), engine.clone());
                    Cont::new(move |err| {
                        if is_cancellation(&err) {
                            return exits.err.call(err);
                        }
                        if let Some(var) = &var {
                            frame.set_local(var.as_str(), err);
                        }
                        engine.run(&handler, &frame, exits.clone())
                    })
                };
                exits.with_err(on_failure)
            }
        };
        engine.run(&args[0], frame, body_conts)
    }
}

/// Wrap each exit in `conts` so that `finally` runs before it is taken.
///
/// `finally` itself runs with the unwrapped exits, so its own failures and
/// jumps go straight out.
fn through_finally(conts: &Conts, finally: &Node, frame: &Frame, engine: &Engine) -> Conts {
    let wrap = |exit: &Cont| -> Cont {
        let exit = exit.clone();
        let (finally, frame, conts, engine) =
            (finally.clone(), frame.clone(), conts.clone(), engine.clone());
        Cont::new(move |val| {
            let resume = {
                let exit = exit.clone();
                Cont::new(move |_| exit.call(val.clone()))
            };
            engine.run(&finally, &frame, conts.with_ok(resume))
        })
    };

    Conts {
        ok: wrap(&conts.ok),
        err: wrap(&conts.err),
        brk: conts.brk.as_ref().map(wrap),
        next: conts.next.as_ref().map(wrap),
        ret: wrap(&conts.ret),
    }
}
