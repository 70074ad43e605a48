//! General-purpose functions: lists, strings, printing, errors

use tracing::info;

use super::{arity, num, Natives};
use crate::executor::errors::{self, ErrorInfo};
use crate::executor::types::Val;

pub(super) fn register(natives: &mut Natives) {
    natives.register("list", |args| Ok(Val::List(args.to_vec())));

    // c() flattens one level, the way R combines vectors
    natives.register("c", |args| {
        Ok(Val::List(
            args.iter().cloned().flat_map(Val::into_items).collect(),
        ))
    });

    natives.register("length", |args| {
        arity("length", args, 1)?;
        let len = match &args[0] {
            Val::Null => 0,
            Val::List(items) => items.len(),
            Val::Str(s) => s.chars().count(),
            _ => 1,
        };
        Ok(Val::Num(len as f64))
    });

    natives.register("at", |args| {
        arity("at", args, 2)?;
        let Val::List(items) = &args[0] else {
            return Err(ErrorInfo::new(
                errors::WRONG_ARG_TYPE,
                "at() expects a list as its first argument",
            ));
        };
        let index = num("at", &args[1])?;
        if index < 1.0 || index.fract() != 0.0 || index as usize > items.len() {
            return Err(ErrorInfo::new(
                errors::INDEX_OUT_OF_BOUNDS,
                format!("index {} out of bounds for list of length {}", index, items.len()),
            ));
        }
        Ok(items[index as usize - 1].clone())
    });

    natives.register("paste", |args| {
        let parts: Vec<String> = args.iter().map(Val::to_string).collect();
        Ok(Val::Str(parts.join(" ")))
    });

    natives.register("print", |args| {
        arity("print", args, 1)?;
        info!(value = %args[0], "print");
        Ok(args[0].clone())
    });

    natives.register("stop", |args| {
        let message: Vec<String> = args.iter().map(Val::to_string).collect();
        Err(ErrorInfo::new(errors::USER_ERROR, message.concat()))
    });

    natives.register("identity", |args| {
        arity("identity", args, 1)?;
        Ok(args[0].clone())
    });

    natives.register("is_null", |args| {
        arity("is_null", args, 1)?;
        Ok(Val::Bool(matches!(args[0], Val::Null)))
    });

    natives.register("conditionMessage", |args| {
        arity("conditionMessage", args, 1)?;
        match &args[0] {
            Val::Error(info) => Ok(Val::Str(info.message.clone())),
            other => Ok(Val::Str(other.to_string())),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[Val]) -> Result<Val, ErrorInfo> {
        Natives::standard().call(name, args)
    }

    #[test]
    fn test_c_flattens_one_level() {
        let nested = Val::List(vec![Val::Num(2.0), Val::Num(3.0)]);
        assert_eq!(
            call("c", &[Val::Num(1.0), nested]),
            Ok(Val::List(vec![Val::Num(1.0), Val::Num(2.0), Val::Num(3.0)]))
        );
    }

    #[test]
    fn test_at_is_one_based() {
        let list = Val::List(vec![Val::Str("a".into()), Val::Str("b".into())]);
        assert_eq!(call("at", &[list.clone(), Val::Num(2.0)]), Ok(Val::Str("b".into())));

        let err = call("at", &[list, Val::Num(3.0)]).unwrap_err();
        assert_eq!(err.code, errors::INDEX_OUT_OF_BOUNDS);
    }

    #[test]
    fn test_stop_raises_user_error() {
        let err = call("stop", &[Val::Str("bad ".into()), Val::Num(3.0)]).unwrap_err();
        assert_eq!(err.code, errors::USER_ERROR);
        assert_eq!(err.message, "bad 3");
    }

    #[test]
    fn test_paste_joins_with_spaces() {
        assert_eq!(
            call("paste", &[Val::Str("n =".into()), Val::Num(4.0)]),
            Ok(Val::Str("n = 4".into()))
        );
    }
}
