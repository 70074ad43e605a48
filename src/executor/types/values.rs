//! Runtime value types

use serde_json::{json, Value as JsonValue};

use super::super::errors::{self, ErrorInfo};
use super::super::promise::Promise;

/// Runtime value type
#[derive(Debug, Clone, PartialEq)]
pub enum Val {
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    List(Vec<Val>),
    /// Handle to an eventually-settled external source
    Promise(Promise),
    /// Error value with code and message
    Error(ErrorInfo),
}

impl Val {
    /// Interpret a value as a condition.
    ///
    /// Only booleans and numbers are logical; everything else is a type error.
    pub fn truthy(&self) -> Result<bool, ErrorInfo> {
        match self {
            Val::Bool(b) => Ok(*b),
            Val::Num(n) => Ok(*n != 0.0),
            other => Err(ErrorInfo::new(
                errors::TYPE_ERROR,
                format!("argument is not interpretable as logical: {}", other.type_name()),
            )),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Val::Null => "null",
            Val::Bool(_) => "bool",
            Val::Num(_) => "number",
            Val::Str(_) => "string",
            Val::List(_) => "list",
            Val::Promise(_) => "promise",
            Val::Error(_) => "error",
        }
    }

    /// Elements a `for` loop iterates over
    pub fn into_items(self) -> Vec<Val> {
        match self {
            Val::Null => vec![],
            Val::List(items) => items,
            scalar => vec![scalar],
        }
    }

    /// Render as JSON for hosts that consume plain data
    pub fn to_json(&self) -> JsonValue {
        match self {
            Val::Null => JsonValue::Null,
            Val::Bool(b) => json!(b),
            Val::Num(n) => json!(n),
            Val::Str(s) => json!(s),
            Val::List(items) => JsonValue::Array(items.iter().map(Val::to_json).collect()),
            Val::Promise(p) => json!({ "promise": p.describe() }),
            Val::Error(info) => json!({ "code": info.code, "message": info.message }),
        }
    }
}

impl std::fmt::Display for Val {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Val::Null => write!(f, "NULL"),
            Val::Bool(true) => write!(f, "TRUE"),
            Val::Bool(false) => write!(f, "FALSE"),
            Val::Num(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Val::Num(n) => write!(f, "{}", n),
            Val::Str(s) => write!(f, "{}", s),
            Val::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Val::Promise(p) => write!(f, "<promise {}>", p.describe()),
            Val::Error(info) => write!(f, "<error {}>", info),
        }
    }
}

impl From<f64> for Val {
    fn from(n: f64) -> Self {
        Val::Num(n)
    }
}

impl From<bool> for Val {
    fn from(b: bool) -> Self {
        Val::Bool(b)
    }
}

impl From<&str> for Val {
    fn from(s: &str) -> Self {
        Val::Str(s.to_string())
    }
}
