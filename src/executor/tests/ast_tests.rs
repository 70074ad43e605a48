//! Tests for bodies supplied as JSON ASTs

use serde_json::json;

use super::helpers::{drain, nums, parse_body_roundtrip};
use crate::executor::{ComputationOptions, Expr, Generator, Val};

/// The counting generator body, written directly as a JSON tree
fn counting_body_json() -> serde_json::Value {
    json!({
        "t": "Call", "func": "{", "args": [
            { "t": "Call", "func": "=", "args": [
                { "t": "Ident", "name": "x" },
                { "t": "LitNum", "v": 0.0 }
            ]},
            { "t": "Call", "func": "repeat", "args": [
                { "t": "Call", "func": "{", "args": [
                    { "t": "Call", "func": "=", "args": [
                        { "t": "Ident", "name": "x" },
                        { "t": "Call", "func": "yield", "args": [{ "t": "Ident", "name": "x" }] }
                    ]},
                    { "t": "Call", "func": "=", "args": [
                        { "t": "Ident", "name": "x" },
                        { "t": "Call", "func": "+", "args": [
                            { "t": "Ident", "name": "x" },
                            { "t": "LitNum", "v": 1.0 }
                        ]}
                    ]}
                ]}
            ]}
        ]
    })
}

fn strip_spans(expr: Expr) -> Expr {
    match expr {
        Expr::Ident { name, .. } => Expr::ident(name),
        Expr::Call { func, args, .. } => {
            Expr::call(func, args.into_iter().map(strip_spans).collect())
        }
        other => other,
    }
}

#[test]
fn test_json_body_matches_parsed_body() {
    let from_json: Expr = serde_json::from_value(counting_body_json()).expect("valid AST");
    let parsed = parse_body_roundtrip("{ x = 0; repeat { x = yield(x); x = x + 1 } }");
    assert_eq!(from_json, strip_spans(parsed));
}

#[test]
fn test_json_body_drives_generator() {
    let body: Expr = serde_json::from_value(counting_body_json()).expect("valid AST");
    let generator = Generator::new(&body, ComputationOptions::new()).unwrap();

    let values: Vec<Val> = generator.take(4).map(|v| v.unwrap()).collect();
    assert_eq!(values, nums(&[0.0, 1.0, 2.0, 3.0]));
}

#[test]
fn test_default_spans_are_not_serialized() {
    let body = Expr::call("yield", vec![Expr::ident("x")]);
    let json = serde_json::to_value(&body).unwrap();
    assert_eq!(
        json,
        json!({ "t": "Call", "func": "yield", "args": [{ "t": "Ident", "name": "x" }] })
    );
}

#[test]
fn test_literal_encoding() {
    let body: Expr = serde_json::from_value(json!({
        "t": "Call", "func": "{", "args": [
            { "t": "Call", "func": "yield", "args": [{ "t": "LitStr", "v": "s" }] },
            { "t": "Call", "func": "yield", "args": [{ "t": "LitBool", "v": true }] },
            { "t": "Call", "func": "yield", "args": [{ "t": "LitNull" }] }
        ]
    }))
    .unwrap();
    let mut generator = Generator::new(&body, ComputationOptions::new()).unwrap();
    assert_eq!(
        drain(&mut generator),
        vec![Val::Str("s".into()), Val::Bool(true), Val::Null]
    );
}
