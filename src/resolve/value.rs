// src/resolve/value.rs

use std::fmt;

/// A value produced by a resolver or stored in a context.
///
/// There is deliberately no null variant: a null result is
/// [`Resolution::Absent`], and a null binding is [`super::Binding::Null`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

/// Outcome of [`super::ExprResolver::evaluate`].
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The expression resolved to a concrete value.
    Resolved(Value),
    /// The expression resolved, and its value is null.
    Absent,
    /// The resolver does not handle this expression.
    Declined,
}

impl Resolution {
    pub fn is_declined(&self) -> bool {
        matches!(self, Resolution::Declined)
    }

    /// Collapse into an optional value, or `None` when declined.
    ///
    /// The outer `Option` is `None` only for `Declined`; an `Absent` result is
    /// `Some(None)`.
    pub fn into_option(self) -> Option<Option<Value>> {
        match self {
            Resolution::Resolved(v) => Some(Some(v)),
            Resolution::Absent => Some(None),
            Resolution::Declined => None,
        }
    }
}

impl From<Option<Value>> for Resolution {
    fn from(v: Option<Value>) -> Self {
        match v {
            Some(v) => Resolution::Resolved(v),
            None => Resolution::Absent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_is_not_declined() {
        assert!(!Resolution::Absent.is_declined());
        assert_eq!(Resolution::Absent.into_option(), Some(None));
        assert_eq!(Resolution::Declined.into_option(), None);
    }

    #[test]
    fn list_display_joins_with_spaces() {
        let v = Value::List(vec![Value::from("a"), Value::Int(2), Value::Bool(true)]);
        assert_eq!(v.to_string(), "a 2 true");
    }
}
