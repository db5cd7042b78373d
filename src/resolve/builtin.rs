// src/resolve/builtin.rs

//! Built-in resolvers.
//!
//! None of these is an expression language; each recognises one narrow form
//! and declines everything else, so they are meant to be combined in a
//! [`super::ResolverChain`].

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use super::context::{Binding, Context};
use super::value::{Resolution, Value};
use super::ExprResolver;
use crate::errors::{ProcrunError, Result};

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$")
        .expect("identifier pattern is valid")
});

/// Looks the (trimmed) expression up as a variable name in the context.
///
/// - unbound name -> `Declined`
/// - null binding -> `Absent`
/// - anything that isn't an identifier path (`a`, `a.b_c`) -> `Declined`
#[derive(Debug, Clone, Copy, Default)]
pub struct VariableResolver;

impl ExprResolver for VariableResolver {
    fn evaluate(&self, ctx: &dyn Context, expression: &str) -> Result<Resolution> {
        let name = expression.trim();
        if !IDENTIFIER.is_match(name) {
            return Ok(Resolution::Declined);
        }

        let res = match ctx.lookup(name) {
            Binding::Unbound => Resolution::Declined,
            Binding::Null => Resolution::Absent,
            Binding::Value(v) => Resolution::Resolved(v.clone()),
        };
        trace!(name, declined = res.is_declined(), "variable lookup");
        Ok(res)
    }
}

/// Parses literal expressions: `null`, booleans, numbers and quoted strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralResolver;

impl ExprResolver for LiteralResolver {
    fn evaluate(&self, _ctx: &dyn Context, expression: &str) -> Result<Resolution> {
        let expr = expression.trim();

        match expr {
            "null" => return Ok(Resolution::Absent),
            "true" => return Ok(Resolution::Resolved(Value::Bool(true))),
            "false" => return Ok(Resolution::Resolved(Value::Bool(false))),
            _ => {}
        }

        if let Some(quote) = expr.chars().next().filter(|c| *c == '"' || *c == '\'') {
            return parse_quoted(expr, quote).map(|s| Resolution::Resolved(Value::Str(s)));
        }

        let numeric_start = expr
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit() || c == '-' || c == '+');
        if !numeric_start {
            return Ok(Resolution::Declined);
        }

        if let Ok(i) = expr.parse::<i64>() {
            return Ok(Resolution::Resolved(Value::Int(i)));
        }
        if let Ok(x) = expr.parse::<f64>() {
            return Ok(Resolution::Resolved(Value::Float(x)));
        }

        Ok(Resolution::Declined)
    }
}

fn parse_quoted(expr: &str, quote: char) -> Result<String> {
    let mut out = String::with_capacity(expr.len());
    let mut chars = expr.chars().skip(1);

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => break,
            },
            c if c == quote => {
                if chars.next().is_some() {
                    return Err(ProcrunError::Expression(format!(
                        "unexpected characters after closing quote in {expr}"
                    )));
                }
                return Ok(out);
            }
            c => out.push(c),
        }
    }

    Err(ProcrunError::Expression(format!(
        "unterminated string literal: {expr}"
    )))
}

/// Resolves `env.NAME` to the value of the process environment variable
/// `NAME`. Unset variables and every other expression are declined.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvResolver;

impl ExprResolver for EnvResolver {
    fn evaluate(&self, _ctx: &dyn Context, expression: &str) -> Result<Resolution> {
        let Some(name) = expression.trim().strip_prefix("env.") else {
            return Ok(Resolution::Declined);
        };
        if name.is_empty() {
            return Ok(Resolution::Declined);
        }

        Ok(match std::env::var_os(name) {
            Some(v) => Resolution::Resolved(Value::Str(v.to_string_lossy().into_owned())),
            None => Resolution::Declined,
        })
    }
}
