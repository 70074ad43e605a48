//! Test helpers for executor tests
//!
//! Common utilities for parsing bodies and building drivers

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::executor::{ComputationOptions, Expr, Generator, Task, TurnQueue, Val};

/// Parse body source and round-trip it through JSON
///
/// Every test body goes through serialization so stored bodies are known to
/// evaluate the same as freshly parsed ones.
pub fn parse_body_roundtrip(source: &str) -> Expr {
    let body = crate::parser::parse_body(source).expect("Parse body failed");
    let json = serde_json::to_string(&body).expect("Body serialization failed");
    serde_json::from_str(&json).expect("Body deserialization failed")
}

/// Options binding each input in the computation's frame
pub fn options_with(inputs: HashMap<String, Val>) -> ComputationOptions {
    let mut names: Vec<_> = inputs.into_iter().collect();
    names.sort_by(|a, b| a.0.cmp(&b.0));
    names
        .into_iter()
        .fold(ComputationOptions::new(), |options, (name, val)| {
            options.input(name, val)
        })
}

/// Parse body source and build a generator over it
pub fn parse_and_build_generator(source: &str, inputs: HashMap<String, Val>) -> Generator {
    let body = parse_body_roundtrip(source);
    Generator::new(&body, options_with(inputs)).expect("Generator construction failed")
}

/// Parse body source and spawn a task on `queue`
pub fn parse_and_spawn_task(source: &str, queue: &TurnQueue, options: ComputationOptions) -> Task {
    let body = parse_body_roundtrip(source);
    Task::spawn(&body, queue.handle(), options).expect("Task construction failed")
}

/// Pull every value out of a generator, failing the test on an error
pub fn drain(generator: &mut Generator) -> Vec<Val> {
    let mut values = Vec::new();
    while let Some(val) = generator.advance().expect("generator failed") {
        values.push(val);
    }
    values
}

pub fn nums(values: &[f64]) -> Vec<Val> {
    values.iter().copied().map(Val::Num).collect()
}

pub fn text(s: &str) -> Val {
    Val::Str(s.to_string())
}

/// Add a native `name` that counts its calls
pub fn counting_native(options: ComputationOptions, name: &str) -> (ComputationOptions, Rc<Cell<u32>>) {
    let count = Rc::new(Cell::new(0));
    let counter = count.clone();
    let options = options.native(name.to_string(), move |_| {
        counter.set(counter.get() + 1);
        Ok(Val::Num(f64::from(counter.get())))
    });
    (options, count)
}
