//! Body parser - PEST-based parser for the body language
//!
//! Produces the call-shaped `Expr` tree the engine evaluates, with span
//! information for error reporting.

use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

use crate::executor::types::{Expr, Span};


/* ===================== PEST Parser ===================== */

#[derive(Parser)]
#[grammar = "parser/body.pest"]
struct BodyParser;

/* ===================== Error Types ===================== */

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{0}")]
    Syntax(String, Option<Span>),
    #[error("{0}")]
    Build(String, Option<Span>),
}

impl ParseError {
    pub fn span(&self) -> Option<Span> {
        match self {
            ParseError::Syntax(_, span) | ParseError::Build(_, span) => *span,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ParseError::Syntax(msg, _) | ParseError::Build(msg, _) => msg,
        }
    }
}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        let (start, end) = match err.line_col {
            pest::error::LineColLocation::Pos(pos) => (pos, (pos.0, pos.1 + 1)),
            pest::error::LineColLocation::Span(start, end) => (start, end),
        };
        let span = Span::new(
            0,
            0,
            start.0.saturating_sub(1),
            start.1.saturating_sub(1),
            end.0.saturating_sub(1),
            end.1.saturating_sub(1),
        );
        ParseError::Syntax(err.to_string(), Some(span))
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/* ===================== Span Helpers ===================== */

/// Convert a PEST pair's span to our Span type
fn pair_to_span(pair: &Pair<Rule>, source: &str) -> Span {
    let pest_span = pair.as_span();
    let start = pest_span.start();
    let end = pest_span.end();

    let (start_line, start_col) = offset_to_line_col(source, start);
    let (end_line, end_col) = offset_to_line_col(source, end);

    Span::new(start, end, start_line, start_col, end_line, end_col)
}

/// Convert byte offset to (line, column) - 0-indexed
fn offset_to_line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 0;
    let mut col = 0;

    for (idx, ch) in source.char_indices() {
        if idx >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 0;
        } else {
            col += 1;
        }
    }

    (line, col)
}

/* ===================== Public API ===================== */

/// Parse body source into an expression.
///
/// A single top-level expression is returned as is; several are wrapped in
/// a `{` block. An empty body is `NULL`.
pub fn parse_body(source: &str) -> ParseResult<Expr> {
    let program = BodyParser::parse(Rule::program, source)?
        .next()
        .ok_or_else(|| ParseError::Build("Empty parse result".to_string(), None))?;
    let span = pair_to_span(&program, source);

    let mut exprs = build_sequence(program.into_inner(), source)?;
    match exprs.len() {
        0 => Ok(Expr::LitNull),
        1 => Ok(exprs.remove(0)),
        _ => Ok(Expr::Call {
            func: "{".to_string(),
            args: exprs,
            span,
        }),
    }
}

/* ===================== AST Builder ===================== */

/// Take the next child, failing with a build error naming what was expected
fn expect_next<'i>(inner: &mut Pairs<'i, Rule>, what: &str, span: Span) -> ParseResult<Pair<'i, Rule>> {
    inner
        .next()
        .ok_or_else(|| ParseError::Build(format!("Expected {}", what), Some(span)))
}

fn call(func: &str, args: Vec<Expr>, span: Span) -> Expr {
    Expr::Call {
        func: func.to_string(),
        args,
        span,
    }
}

fn build_sequence(pairs: Pairs<Rule>, source: &str) -> ParseResult<Vec<Expr>> {
    pairs
        .filter(|pair| pair.as_rule() != Rule::EOI)
        .map(|pair| build_expression(pair, source))
        .collect()
}

fn build_identifier(pair: Pair<Rule>, source: &str) -> Expr {
    Expr::Ident {
        name: pair.as_str().to_string(),
        span: pair_to_span(&pair, source),
    }
}

/// Left-associative chain: `a op b op c` is `op(op(a, b), c)`
fn build_binary_chain(pair: Pair<Rule>, source: &str) -> ParseResult<Expr> {
    let span = pair_to_span(&pair, source);
    let mut inner = pair.into_inner();
    let mut left = build_expression(expect_next(&mut inner, "operand", span)?, source)?;

    while let Some(op) = inner.next() {
        let right_pair = expect_next(&mut inner, "right operand after operator", span)?;
        let right = build_expression(right_pair, source)?;
        let new_span = left.span().merge(&right.span());
        left = call(op.as_str(), vec![left, right], new_span);
    }

    Ok(left)
}

/// Zero or more prefix operators before an operand, applied innermost last
fn build_prefixed(pair: Pair<Rule>, source: &str, func: &str) -> ParseResult<Expr> {
    let span = pair_to_span(&pair, source);
    let mut prefixes = 0;
    let mut operand = None;

    for child in pair.into_inner() {
        match child.as_rule() {
            Rule::op_not | Rule::op_neg => prefixes += 1,
            _ => operand = Some(build_expression(child, source)?),
        }
    }

    let mut expr = operand
        .ok_or_else(|| ParseError::Build("Expected operand".to_string(), Some(span)))?;
    for _ in 0..prefixes {
        expr = call(func, vec![expr], span);
    }
    Ok(expr)
}

fn build_assignment(pair: Pair<Rule>, source: &str) -> ParseResult<Expr> {
    let span = pair_to_span(&pair, source);
    let mut inner = pair.into_inner();
    let target = build_expression(expect_next(&mut inner, "expression", span)?, source)?;

    let Some(op) = inner.next() else {
        return Ok(target);
    };
    if target.as_ident().is_none() {
        return Err(ParseError::Build(
            format!("Invalid assignment target before '{}'", op.as_str()),
            Some(span),
        ));
    }
    let value = build_expression(expect_next(&mut inner, "assigned value", span)?, source)?;
    Ok(call(op.as_str(), vec![target, value], span))
}

fn build_power(pair: Pair<Rule>, source: &str) -> ParseResult<Expr> {
    let span = pair_to_span(&pair, source);
    let mut inner = pair.into_inner();
    let base = build_expression(expect_next(&mut inner, "operand", span)?, source)?;

    match inner.next() {
        None => Ok(base),
        Some(_op) => {
            let exponent = build_expression(expect_next(&mut inner, "exponent", span)?, source)?;
            Ok(call("^", vec![base, exponent], span))
        }
    }
}

fn build_call(pair: Pair<Rule>, source: &str) -> ParseResult<Expr> {
    let span = pair_to_span(&pair, source);
    let mut inner = pair.into_inner();
    let func = expect_next(&mut inner, "function name", span)?;
    let args = inner
        .map(|arg| build_expression(arg, source))
        .collect::<ParseResult<Vec<_>>>()?;
    Ok(call(func.as_str(), args, span))
}

fn build_if(pair: Pair<Rule>, source: &str) -> ParseResult<Expr> {
    let span = pair_to_span(&pair, source);
    let mut args = Vec::with_capacity(3);

    for child in pair.into_inner() {
        match child.as_rule() {
            Rule::kw_if | Rule::kw_else => {}
            _ => args.push(build_expression(child, source)?),
        }
    }
    Ok(call("if", args, span))
}

fn build_while(pair: Pair<Rule>, source: &str) -> ParseResult<Expr> {
    let span = pair_to_span(&pair, source);
    let mut inner = pair.into_inner();
    expect_next(&mut inner, "while", span)?;

    let test = build_expression(expect_next(&mut inner, "loop condition", span)?, source)?;
    let body = build_expression(expect_next(&mut inner, "loop body", span)?, source)?;
    Ok(call("while", vec![test, body], span))
}

fn build_repeat(pair: Pair<Rule>, source: &str) -> ParseResult<Expr> {
    let span = pair_to_span(&pair, source);
    let mut inner = pair.into_inner();
    expect_next(&mut inner, "repeat", span)?;

    let body = build_expression(expect_next(&mut inner, "loop body", span)?, source)?;
    Ok(call("repeat", vec![body], span))
}

fn build_for(pair: Pair<Rule>, source: &str) -> ParseResult<Expr> {
    let span = pair_to_span(&pair, source);
    let mut inner = pair.into_inner();
    expect_next(&mut inner, "for", span)?;

    let var = build_identifier(expect_next(&mut inner, "loop variable", span)?, source);
    expect_next(&mut inner, "in", span)?;
    let iterable = build_expression(expect_next(&mut inner, "iterable", span)?, source)?;
    let body = build_expression(expect_next(&mut inner, "loop body", span)?, source)?;
    Ok(call("for", vec![var, iterable, body], span))
}

/// `try body catch (e) handler finally cleanup` becomes
/// `try(body, e, handler, cleanup)` with NULL for the absent parts
fn build_try(pair: Pair<Rule>, source: &str) -> ParseResult<Expr> {
    let span = pair_to_span(&pair, source);
    let mut inner = pair.into_inner();
    expect_next(&mut inner, "try", span)?;

    let body = build_expression(expect_next(&mut inner, "try body", span)?, source)?;
    let mut var = Expr::LitNull;
    let mut handler = Expr::LitNull;
    let mut finally = Expr::LitNull;

    while let Some(clause) = inner.next() {
        match clause.as_rule() {
            Rule::kw_catch => {
                var = build_identifier(expect_next(&mut inner, "catch variable", span)?, source);
                handler = build_expression(expect_next(&mut inner, "catch handler", span)?, source)?;
            }
            Rule::kw_finally => {
                finally = build_expression(expect_next(&mut inner, "finally body", span)?, source)?;
            }
            rule => {
                return Err(ParseError::Build(
                    format!("Unexpected try clause: {:?}", rule),
                    Some(pair_to_span(&clause, source)),
                ))
            }
        }
    }

    Ok(call("try", vec![body, var, handler, finally], span))
}

fn parse_string_literal(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn build_expression(pair: Pair<Rule>, source: &str) -> ParseResult<Expr> {
    let span = pair_to_span(&pair, source);

    match pair.as_rule() {
        Rule::expression => {
            let inner = expect_next(&mut pair.into_inner(), "expression", span)?;
            build_expression(inner, source)
        }
        Rule::assignment => build_assignment(pair, source),
        Rule::logical_or
        | Rule::logical_and
        | Rule::comparison
        | Rule::additive
        | Rule::multiplicative
        | Rule::range => build_binary_chain(pair, source),
        Rule::negation => build_prefixed(pair, source, "!"),
        Rule::unary => build_prefixed(pair, source, "-"),
        Rule::power => build_power(pair, source),
        Rule::call => build_call(pair, source),
        Rule::block => Ok(call("{", build_sequence(pair.into_inner(), source)?, span)),
        Rule::if_expr => build_if(pair, source),
        Rule::while_expr => build_while(pair, source),
        Rule::repeat_expr => build_repeat(pair, source),
        Rule::for_expr => build_for(pair, source),
        Rule::try_expr => build_try(pair, source),
        Rule::kw_break => Ok(call("break", vec![], span)),
        Rule::kw_next => Ok(call("next", vec![], span)),
        Rule::identifier => Ok(build_identifier(pair, source)),
        Rule::number => {
            let num_str = pair.as_str();
            let v = num_str.parse::<f64>().map_err(|e| {
                ParseError::Build(
                    format!("Failed to parse number '{}': {}", num_str, e),
                    Some(span),
                )
            })?;
            Ok(Expr::LitNum { v })
        }
        Rule::bool_lit => Ok(Expr::LitBool {
            v: matches!(pair.as_str(), "TRUE" | "true"),
        }),
        Rule::null_lit => Ok(Expr::LitNull),
        Rule::string => {
            let content = expect_next(&mut pair.into_inner(), "string content", span)?;
            Ok(Expr::LitStr {
                v: parse_string_literal(content.as_str()),
            })
        }
        rule => Err(ParseError::Build(
            format!("Unexpected expression rule: {:?}", rule),
            Some(span),
        )),
    }
}
