//! Loop forms: `while`, `repeat`, `for`
//!
//! In continuation-passing form each iteration re-enters the loop's own check
//! through a fresh continuation. A suspend inside the body resumes into the
//! rest of that same iteration; the loop head only runs again once the body's
//! continuation fires. All loops evaluate to NULL.

use std::rc::Rc;

use crate::executor::classify::Node;
use crate::executor::cont::{Cont, Conts, Step};
use crate::executor::engine::{check_arity, Engine};
use crate::executor::errors::{self, ErrorInfo};
use crate::executor::frame::Frame;
use crate::executor::registry::Construct;
use crate::executor::types::{Control, Expr, Val};

/// Outcome of one ordinary iteration
enum Iteration {
    Continue,
    Exit,
}

fn ordinary_body(result: Result<Val, Control>) -> Result<Iteration, Control> {
    match result {
        Ok(_) | Err(Control::Next) => Ok(Iteration::Continue),
        Err(Control::Break) => Ok(Iteration::Exit),
        Err(other) => Err(other),
    }
}

/// Continuation that leaves the loop with NULL
fn exit(conts: &Conts) -> Cont {
    let ok = conts.ok.clone();
    Cont::new(move |_| ok.call(Val::Null))
}

/* ===================== while ===================== */

/// `while(test, body)`
pub struct While;

impl Construct for While {
    fn eval(&self, args: &[Expr], frame: &Frame, engine: &Engine) -> Result<Val, Control> {
        check_arity("while", args.len(), 2..=2)?;
        while engine.eval(&args[0], frame)?.truthy()? {
            if let Iteration::Exit = ordinary_body(engine.eval(&args[1], frame))? {
                break;
            }
        }
        Ok(Val::Null)
    }

    fn eval_cps(&self, args: &[Node], frame: &Frame, conts: Conts, engine: &Engine) -> Step {
        if let Err(err) = check_arity("while", args.len(), 2..=2) {
            return conts.fail(err);
        }
        Rc::new(WhileLoop {
            test: args[0].clone(),
            body: args[1].clone(),
            frame: frame.clone(),
            conts,
            engine: engine.clone(),
        })
        .check()
    }
}

struct WhileLoop {
    test: Node,
    body: Node,
    frame: Frame,
    conts: Conts,
    engine: Engine,
}

impl WhileLoop {
    fn check(self: Rc<Self>) -> Step {
        let on_test = {
            let this = self.clone();
            Cont::new(move |test| match test.truthy() {
                Err(err) => this.conts.fail(err),
                Ok(false) => this.conts.ok.call(Val::Null),
                Ok(true) => this.clone().iterate(),
            })
        };
        self.engine
            .run(&self.test, &self.frame, self.conts.with_ok(on_test))
    }

    fn iterate(self: Rc<Self>) -> Step {
        let again = {
            let this = self.clone();
            Cont::new(move |_| this.clone().check())
        };
        let body_conts = self
            .conts
            .with_ok(again.clone())
            .with_loop(exit(&self.conts), again);
        self.engine.run(&self.body, &self.frame, body_conts)
    }
}

/* ===================== repeat ===================== */

/// `repeat(body)` - loops until `break` or `return`
pub struct Repeat;

impl Construct for Repeat {
    fn eval(&self, args: &[Expr], frame: &Frame, engine: &Engine) -> Result<Val, Control> {
        check_arity("repeat", args.len(), 1..=1)?;
        loop {
            if let Iteration::Exit = ordinary_body(engine.eval(&args[0], frame))? {
                return Ok(Val::Null);
            }
        }
    }

    fn eval_cps(&self, args: &[Node], frame: &Frame, conts: Conts, engine: &Engine) -> Step {
        if let Err(err) = check_arity("repeat", args.len(), 1..=1) {
            return conts.fail(err);
        }
        Rc::new(RepeatLoop {
            body: args[0].clone(),
            frame: frame.clone(),
            conts,
            engine: engine.clone(),
        })
        .iterate()
    }
}

struct RepeatLoop {
    body: Node,
    frame: Frame,
    conts: Conts,
    engine: Engine,
}

impl RepeatLoop {
    fn iterate(self: Rc<Self>) -> Step {
        let again = {
            let this = self.clone();
            Cont::new(move |_| this.clone().iterate())
        };
        let body_conts = self
            .conts
            .with_ok(again.clone())
            .with_loop(exit(&self.conts), again);
        self.engine.run(&self.body, &self.frame, body_conts)
    }
}

/* ===================== for ===================== */

/// `for(var, iterable, body)` - the iterable is evaluated once
pub struct For;

fn loop_variable(target: Option<&str>) -> Result<String, ErrorInfo> {
    target.map(str::to_string).ok_or_else(|| {
        ErrorInfo::new(
            errors::WRONG_ARG_TYPE,
            "for() loop variable must be an identifier",
        )
    })
}

impl Construct for For {
    fn eval(&self, args: &[Expr], frame: &Frame, engine: &Engine) -> Result<Val, Control> {
        check_arity("for", args.len(), 3..=3)?;
        let var = loop_variable(args[0].as_ident())?;
        for item in engine.eval(&args[1], frame)?.into_items() {
            frame.set_local(var.as_str(), item);
            if let Iteration::Exit = ordinary_body(engine.eval(&args[2], frame))? {
                break;
            }
        }
        Ok(Val::Null)
    }

    fn eval_cps(&self, args: &[Node], frame: &Frame, conts: Conts, engine: &Engine) -> Step {
        if let Err(err) = check_arity("for", args.len(), 3..=3) {
            return conts.fail(err);
        }
        let var = match loop_variable(args[0].as_ident()) {
            Ok(var) => var,
            Err(err) => return conts.fail(err),
        };

        let start = {
            let body = args[2].clone();
            let (frame, conts, engine) = (frame.clone(), conts.clone(), engine.clone());
            Cont::new(move |iterable| {
                Rc::new(ForLoop {
                    var: var.clone(),
                    items: iterable.into_items().into(),
                    body: body.clone(),
                    frame: frame.clone(),
                    conts: conts.clone(),
                    engine: engine.clone(),
                })
                .iterate(0)
            })
        };
        engine.run(&args[1], frame, conts.with_ok(start))
    }
}

struct ForLoop {
    var: String,
    items: Rc<[Val]>,
    body: Node,
    frame: Frame,
    conts: Conts,
    engine: Engine,
}

impl ForLoop {
    fn iterate(self: Rc<Self>, idx: usize) -> Step {
        let Some(item) = self.items.get(idx) else {
            return self.conts.ok.call(Val::Null);
        };
        self.frame.set_local(self.var.as_str(), item.clone());

        let again = {
            let this = self.clone();
            Cont::new(move |_| this.clone().iterate(idx + 1))
        };
        let body_conts = self
            .conts
            .with_ok(again.clone())
            .with_loop(exit(&self.conts), again);
        self.engine.run(&self.body, &self.frame, body_conts)
    }
}
