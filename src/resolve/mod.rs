// src/resolve/mod.rs

//! Expression resolution hooks.
//!
//! A resolver is asked to produce a value for an expression against a
//! [`Context`]. It answers with one of three outcomes:
//!
//! - [`Resolution::Resolved`]: a concrete value,
//! - [`Resolution::Absent`]: the expression resolved, and the result is null,
//! - [`Resolution::Declined`]: this resolver does not handle the expression.
//!
//! Resolvers compose through [`ResolverChain`]: the first resolver that does
//! not decline wins.
//!
//! - [`value`] holds the `Value` type and the `Resolution` outcome.
//! - [`context`] defines the lookup environment.
//! - [`builtin`] contains the variable, literal and env resolvers.
//! - [`chain`] contains the ordered chain.

pub mod builtin;
pub mod chain;
pub mod context;
pub mod value;

pub use builtin::{EnvResolver, LiteralResolver, VariableResolver};
pub use chain::ResolverChain;
pub use context::{Binding, Context, MapContext};
pub use value::{Resolution, Value};

use crate::errors::Result;

/// A pluggable hook that resolves an expression against a context.
///
/// Implementations read from `ctx` but never mutate it. Malformed input may be
/// reported as [`crate::errors::ProcrunError::Expression`]; an expression the
/// resolver simply does not understand should yield
/// [`Resolution::Declined`] instead.
pub trait ExprResolver: Send + Sync {
    fn evaluate(&self, ctx: &dyn Context, expression: &str) -> Result<Resolution>;
}

impl<R: ExprResolver + ?Sized> ExprResolver for Box<R> {
    fn evaluate(&self, ctx: &dyn Context, expression: &str) -> Result<Resolution> {
        (**self).evaluate(ctx, expression)
    }
}

impl<R: ExprResolver + ?Sized> ExprResolver for std::sync::Arc<R> {
    fn evaluate(&self, ctx: &dyn Context, expression: &str) -> Result<Resolution> {
        (**self).evaluate(ctx, expression)
    }
}
