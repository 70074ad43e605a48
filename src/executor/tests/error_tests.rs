//! Tests for engine errors and their reporting

use std::collections::HashMap;

use super::helpers::{parse_and_build_generator, parse_body_roundtrip};
use crate::executor::constructs::SuspendPoint;
use crate::executor::{
    errors, Computation, ComputationOptions, ComputationState, EngineError, ErrorInfo, Event, Expr,
    Generator, Val,
};

#[test]
fn test_unsupported_position_reports_location() {
    let body = parse_body_roundtrip("x = 1\ny = print(yield(x))");
    let err = Generator::new(&body, ComputationOptions::new()).unwrap_err();

    let EngineError::UnsupportedSuspendPosition { span, .. } = &err else {
        unreachable!("expected UnsupportedSuspendPosition, got {:?}", err);
    };
    assert_eq!(span.start_line, 1);
    assert_eq!(
        err.to_string(),
        "yield() cannot be used inside the arguments of print() at line 2, col 11"
    );
}

#[test]
fn test_propagated_failure_exposes_code_and_value() {
    let mut generator = parse_and_build_generator("stop(\"bad \", \"thing\")", HashMap::new());
    let err = generator.advance().unwrap_err();

    assert_eq!(err.code(), Some(errors::USER_ERROR));
    assert_eq!(
        err.failure(),
        Some(&Val::Error(ErrorInfo::new(errors::USER_ERROR, "bad thing")))
    );
    assert_eq!(err.to_string(), "uncaught failure: USER_ERROR: bad thing");
}

#[test]
fn test_non_error_failure_value_has_no_code() {
    let body = parse_body_roundtrip("yield(1)");
    let mut generator = Generator::new(&body, ComputationOptions::new()).unwrap();
    generator.advance().unwrap();

    let err = generator.throw(Val::Str("plain".into())).unwrap_err();
    assert_eq!(err.code(), None);
    assert_eq!(err.failure(), Some(&Val::Str("plain".into())));
}

#[test]
fn test_resume_after_completion_is_reported_by_computation() {
    let body = parse_body_roundtrip("1");
    let comp = Computation::new(&body, SuspendPoint::new("yield"), ComputationOptions::new()).unwrap();

    assert_eq!(comp.resume(Ok(Val::Null)), Ok(Event::Completed(Val::Num(1.0))));
    let err = comp.resume(Ok(Val::Null)).unwrap_err();
    assert_eq!(err, EngineError::ResumeAfterCompletion);
    assert_eq!(
        err.to_string(),
        "computation has already settled and cannot be resumed"
    );
}

#[test]
fn test_wrong_arity_in_pausable_construct() {
    let mut generator = parse_and_build_generator("if (yield(TRUE)) 1 else 2", HashMap::new());
    generator.advance().unwrap();
    assert_eq!(generator.advance(), Ok(None));

    // Built directly: if() with one argument
    let body = Expr::call("if", vec![Expr::call("yield", vec![])]);
    let mut generator = Generator::new(&body, ComputationOptions::new()).unwrap();
    let err = generator.advance().unwrap_err();
    assert_eq!(err.code(), Some(errors::WRONG_ARG_COUNT));
}

#[test]
fn test_step_limit_error() {
    let body = parse_body_roundtrip("yield(0); repeat { if (FALSE) yield(1) }");
    let mut generator =
        Generator::new(&body, ComputationOptions::new().step_limit(Some(10_000))).unwrap();

    assert_eq!(generator.advance(), Ok(Some(Val::Num(0.0))));
    let err = generator.advance().unwrap_err();
    assert_eq!(err.code(), Some(errors::STEP_LIMIT));
}

#[test]
fn test_infinite_range_fails_the_generator_cleanly() {
    let mut generator = parse_and_build_generator("yield(1); x = 1:(1/0); yield(2)", HashMap::new());
    assert_eq!(generator.advance(), Ok(Some(Val::Num(1.0))));

    let err = generator.advance().unwrap_err();
    assert_eq!(err.code(), Some(errors::WRONG_ARG_TYPE));
    assert!(matches!(generator.state(), ComputationState::Failed(_)));

    // Settled as failed, so the failure is reported again
    assert_eq!(generator.advance(), Err(err));
}

#[test]
fn test_oversized_range_can_be_caught() {
    let source = "yield(0); try length(1:1e12) catch (e) yield(conditionMessage(e))";
    let mut generator = parse_and_build_generator(source, HashMap::new());
    assert_eq!(generator.advance(), Ok(Some(Val::Num(0.0))));

    let Ok(Some(Val::Str(message))) = generator.advance() else {
        unreachable!("expected the handler to yield the message");
    };
    assert!(message.contains("exceeds the longest range"), "{}", message);
    assert_eq!(generator.advance(), Ok(None));
}
