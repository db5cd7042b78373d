// src/exec/policy.rs

use std::collections::BTreeSet;
use std::fmt;

/// Exit code reported when the process terminated without one (e.g. it was
/// killed by a signal).
pub const INVALID_EXIT_VALUE: i32 = i32::MAX;

/// Which exit codes count as success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitValuePolicy {
    /// Only the listed codes are accepted.
    AnyOf(BTreeSet<i32>),
    /// Every exit code is accepted.
    AcceptAll,
    /// Exit codes are not checked at all; the raw code is returned.
    Unchecked,
}

impl ExitValuePolicy {
    pub fn single(code: i32) -> Self {
        ExitValuePolicy::AnyOf(BTreeSet::from([code]))
    }

    /// Build a policy from an optional list of codes.
    ///
    /// - `None` disables checking.
    /// - an empty list accepts every code.
    /// - otherwise only the listed codes are accepted.
    pub fn from_values(values: Option<&[i32]>) -> Self {
        match values {
            None => ExitValuePolicy::Unchecked,
            Some([]) => ExitValuePolicy::AcceptAll,
            Some(codes) => ExitValuePolicy::AnyOf(codes.iter().copied().collect()),
        }
    }

    /// Whether the policy looks at exit codes at all.
    pub fn is_checked(&self) -> bool {
        !matches!(self, ExitValuePolicy::Unchecked)
    }

    /// `true` when `code` must be reported as a failure.
    pub fn is_failure(&self, code: i32) -> bool {
        match self {
            ExitValuePolicy::AnyOf(codes) => !codes.contains(&code),
            ExitValuePolicy::AcceptAll | ExitValuePolicy::Unchecked => false,
        }
    }
}

impl Default for ExitValuePolicy {
    fn default() -> Self {
        ExitValuePolicy::single(0)
    }
}

impl fmt::Display for ExitValuePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitValuePolicy::AnyOf(codes) => write!(f, "any of {codes:?}"),
            ExitValuePolicy::AcceptAll => f.write_str("accept all"),
            ExitValuePolicy::Unchecked => f.write_str("unchecked"),
        }
    }
}
