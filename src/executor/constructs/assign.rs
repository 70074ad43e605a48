//! Assignment: `=`, `<-` (local) and `<<-` (enclosing)
//!
//! The right-hand side resolves first, possibly suspending; the binding is
//! written in the continuation that receives its value. Assignment evaluates
//! to the assigned value.

use crate::executor::classify::Node;
use crate::executor::cont::{Cont, Conts, Step};
use crate::executor::engine::{check_arity, Engine};
use crate::executor::errors::{self, ErrorInfo};
use crate::executor::frame::Frame;
use crate::executor::registry::Construct;
use crate::executor::types::{Control, Expr, Val};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Local,
    Enclosing,
}

pub struct Assign {
    target: Target,
}

impl Assign {
    /// Bind in the current frame
    pub fn local() -> Self {
        Assign {
            target: Target::Local,
        }
    }

    /// Bind in the nearest enclosing frame that already has the name
    pub fn enclosing() -> Self {
        Assign {
            target: Target::Enclosing,
        }
    }

    fn bind(&self, frame: &Frame, name: &str, val: Val) {
        match self.target {
            Target::Local => frame.set_local(name, val),
            Target::Enclosing => frame.set_enclosing(name, val),
        }
    }
}

fn target_name(target: Option<&str>) -> Result<String, ErrorInfo> {
    target.map(str::to_string).ok_or_else(|| {
        ErrorInfo::new(
            errors::WRONG_ARG_TYPE,
            "invalid assignment target: expected an identifier",
        )
    })
}

impl Construct for Assign {
    fn eval(&self, args: &[Expr], frame: &Frame, engine: &Engine) -> Result<Val, Control> {
        check_arity("=", args.len(), 2..=2)?;
        let name = target_name(args[0].as_ident())?;
        let val = engine.eval(&args[1], frame)?;
        self.bind(frame, &name, val.clone());
        Ok(val)
    }

    fn eval_cps(&self, args: &[Node], frame: &Frame, conts: Conts, engine: &Engine) -> Step {
        if let Err(err) = check_arity("=", args.len(), 2..=2) {
            return conts.fail(err);
        }
        let name = match target_name(args[0].as_ident()) {
            Ok(name) => name,
            Err(err) => return conts.fail(err),
        };

        let target = self.target;
        let write = {
            let (frame, ok) = (frame.clone(), conts.ok.clone());
            Cont::new(move |val| {
                Assign { target }.bind(&frame, &name, val.clone());
                ok.call(val)
            })
        };
        engine.run(&args[1], frame, conts.with_ok(write))
    }
}
