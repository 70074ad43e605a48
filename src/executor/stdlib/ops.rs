//! Operator functions: arithmetic, comparison, negation, ranges

use std::cmp::Ordering;

use super::{arity, num, Natives};
use crate::executor::errors::{self, ErrorInfo};
use crate::executor::types::Val;

pub(super) fn register(natives: &mut Natives) {
    natives.register("+", |args| match args {
        [x] => Ok(Val::Num(num("+", x)?)),
        _ => binary("+", args, |a, b| a + b),
    });
    natives.register("-", |args| match args {
        [x] => Ok(Val::Num(-num("-", x)?)),
        _ => binary("-", args, |a, b| a - b),
    });
    natives.register("*", |args| binary("*", args, |a, b| a * b));
    natives.register("/", |args| binary("/", args, |a, b| a / b));
    natives.register("^", |args| binary("^", args, f64::powf));
    natives.register("%%", |args| binary("%%", args, |a, b| a - b * (a / b).floor()));

    natives.register("==", |args| {
        arity("==", args, 2)?;
        Ok(Val::Bool(args[0] == args[1]))
    });
    natives.register("!=", |args| {
        arity("!=", args, 2)?;
        Ok(Val::Bool(args[0] != args[1]))
    });
    natives.register("<", |args| compare("<", args, Ordering::is_lt));
    natives.register(">", |args| compare(">", args, Ordering::is_gt));
    natives.register("<=", |args| compare("<=", args, Ordering::is_le));
    natives.register(">=", |args| compare(">=", args, Ordering::is_ge));

    natives.register("!", |args| {
        arity("!", args, 1)?;
        Ok(Val::Bool(!args[0].truthy()?))
    });

    natives.register(":", |args| {
        arity(":", args, 2)?;
        let (from, to) = (num(":", &args[0])?, num(":", &args[1])?);
        let count = range_len(from, to)?;
        let step = if to >= from { 1.0 } else { -1.0 };
        Ok(Val::List(
            (0..count)
                .map(|i| Val::Num(from + step * i as f64))
                .collect(),
        ))
    });
}

/// Longest list `:` will build
pub const MAX_RANGE_LEN: usize = 1_000_000;

/// Number of elements in `from:to`, checked before anything is allocated
fn range_len(from: f64, to: f64) -> Result<usize, ErrorInfo> {
    if !from.is_finite() || !to.is_finite() {
        return Err(ErrorInfo::new(
            errors::WRONG_ARG_TYPE,
            format!(":() needs finite bounds, got {} and {}", from, to),
        ));
    }
    let span = (to - from).abs().floor();
    if span >= MAX_RANGE_LEN as f64 {
        return Err(ErrorInfo::new(
            errors::WRONG_ARG_TYPE,
            format!("{}:{} exceeds the longest range of {} elements", from, to, MAX_RANGE_LEN),
        ));
    }
    (span as usize).checked_add(1).ok_or_else(|| {
        ErrorInfo::new(errors::INTERNAL_ERROR, format!("{}:{} length overflowed", from, to))
    })
}

fn binary(name: &str, args: &[Val], op: fn(f64, f64) -> f64) -> Result<Val, ErrorInfo> {
    arity(name, args, 2)?;
    Ok(Val::Num(op(num(name, &args[0])?, num(name, &args[1])?)))
}

fn compare(name: &str, args: &[Val], test: fn(Ordering) -> bool) -> Result<Val, ErrorInfo> {
    arity(name, args, 2)?;
    let ordering = match (&args[0], &args[1]) {
        (Val::Str(a), Val::Str(b)) => a.cmp(b),
        (a, b) => {
            let (a, b) = (num(name, a)?, num(name, b)?);
            a.partial_cmp(&b).ok_or_else(|| {
                ErrorInfo::new(errors::TYPE_ERROR, format!("{}() cannot order NaN", name))
            })?
        }
    };
    Ok(Val::Bool(test(ordering)))
}
