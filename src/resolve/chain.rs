// src/resolve/chain.rs

use std::collections::VecDeque;
use std::fmt;

use tracing::debug;

use super::builtin::{EnvResolver, LiteralResolver, VariableResolver};
use super::context::Context;
use super::value::Resolution;
use super::ExprResolver;
use crate::errors::Result;

/// Ordered list of resolvers; the first one that does not decline wins.
///
/// Resolvers can be placed in front of the existing ones (`push_front`) or
/// after them (`push_back`). An error from any resolver stops the chain. An
/// empty chain declines everything.
#[derive(Default)]
pub struct ResolverChain {
    resolvers: VecDeque<Box<dyn ExprResolver>>,
}

impl ResolverChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Variables first, then `env.NAME`, then literals.
    pub fn standard() -> Self {
        let mut chain = Self::new();
        chain
            .push_back(VariableResolver)
            .push_back(EnvResolver)
            .push_back(LiteralResolver);
        chain
    }

    pub fn push_front(&mut self, resolver: impl ExprResolver + 'static) -> &mut Self {
        self.resolvers.push_front(Box::new(resolver));
        self
    }

    pub fn push_back(&mut self, resolver: impl ExprResolver + 'static) -> &mut Self {
        self.resolvers.push_back(Box::new(resolver));
        self
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

impl ExprResolver for ResolverChain {
    fn evaluate(&self, ctx: &dyn Context, expression: &str) -> Result<Resolution> {
        for (idx, resolver) in self.resolvers.iter().enumerate() {
            let res = resolver.evaluate(ctx, expression)?;
            if !res.is_declined() {
                debug!(expression, resolver = idx, "expression resolved");
                return Ok(res);
            }
        }
        Ok(Resolution::Declined)
    }
}

impl fmt::Debug for ResolverChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverChain")
            .field("len", &self.resolvers.len())
            .finish()
    }
}
