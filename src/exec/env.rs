// src/exec/env.rs

use std::collections::BTreeMap;

/// Complete environment for a child process.
///
/// When an `Environment` is passed to an execute call, the child sees exactly
/// these variables and nothing from our own environment.
pub type Environment = BTreeMap<String, String>;

/// Snapshot of the current process environment. Non-UTF-8 entries are
/// converted lossily.
pub fn current_environment() -> Environment {
    std::env::vars_os()
        .map(|(k, v)| {
            (
                k.to_string_lossy().into_owned(),
                v.to_string_lossy().into_owned(),
            )
        })
        .collect()
}

/// Current process environment with `overlay` applied on top.
pub fn inherit_with<I, K, V>(overlay: I) -> Environment
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut env = current_environment();
    env.extend(overlay.into_iter().map(|(k, v)| (k.into(), v.into())));
    env
}
