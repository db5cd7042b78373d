// src/resolve/context.rs

use std::collections::BTreeMap;

use super::value::Value;

/// Result of looking a name up in a [`Context`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Binding<'a> {
    /// The name is not bound at all.
    Unbound,
    /// The name is bound to null.
    Null,
    Value(&'a Value),
}

/// Key/value environment that resolvers read variables from.
pub trait Context: Send + Sync {
    fn lookup(&self, name: &str) -> Binding<'_>;
}

/// Map-backed context. `None` entries are explicit null bindings.
#[derive(Debug, Clone, Default)]
pub struct MapContext {
    vars: BTreeMap<String, Option<Value>>,
}

impl MapContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.vars.insert(name.into(), Some(value.into()));
        self
    }

    pub fn set_null(&mut self, name: impl Into<String>) -> &mut Self {
        self.vars.insert(name.into(), None);
        self
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.vars.remove(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl Context for MapContext {
    fn lookup(&self, name: &str) -> Binding<'_> {
        match self.vars.get(name) {
            None => Binding::Unbound,
            Some(None) => Binding::Null,
            Some(Some(v)) => Binding::Value(v),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for MapContext {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut ctx = MapContext::new();
        for (k, v) in iter {
            ctx.set(k, v);
        }
        ctx
    }
}
